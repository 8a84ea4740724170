use enum_display::EnumDisplay;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::AccountId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize, Deserialize)]
pub enum MessageKind {
    Grievance,
    Compliment,
    #[serde(rename = "Good Memory")]
    GoodMemory,
    #[serde(rename = "How I Feel")]
    HowIFeel,
}

impl Default for MessageKind {
    fn default() -> Self {
        MessageKind::Grievance
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize, Deserialize)]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize, Deserialize)]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Neutral,
    Anxious,
    Grateful,
}

impl Default for Mood {
    fn default() -> Self {
        Mood::Neutral
    }
}

/// A unit of communication between the paired accounts. Created by compose,
/// mutated only to flip `is_read`, destroyed only by the privileged clear
/// operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub subject: String,
    pub content: String,
    pub kind: MessageKind,
    pub priority: Priority,
    pub mood: Mood,
    pub is_read: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Compose-form payload; the sender is supplied by the session.
#[derive(Debug, Clone)]
pub struct MessageDraft {
    pub receiver_id: AccountId,
    pub subject: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub priority: Priority,
    pub mood: Mood,
}

impl MessageDraft {
    pub fn new(receiver_id: AccountId, content: impl Into<String>) -> Self {
        Self {
            receiver_id,
            subject: None,
            content: content.into(),
            kind: MessageKind::default(),
            priority: Priority::default(),
            mood: Mood::default(),
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_mood(mut self, mood: Mood) -> Self {
        self.mood = mood;
        self
    }

    pub(crate) fn into_message(self, sender_id: AccountId) -> Message {
        let kind = self.kind;
        let subject = self.subject.unwrap_or_else(|| kind.to_string());
        Message {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id: self.receiver_id,
            subject,
            content: self.content,
            kind: self.kind,
            priority: self.priority,
            mood: self.mood,
            is_read: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }
}
