use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use uuid::Uuid;

use crate::account::{AccountId, Profile};
use crate::records::clear_request::{ClearRequest, ClearStatus, TransitionError};
use crate::records::message::{Message, MessageDraft};
use crate::states::clear::messages::ClearEvent;
use crate::states::feed::MessageWrapper;
use crate::store::notify::ChangeFan;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("clear request {0} not found")]
    RequestNotFound(Uuid),
    #[error("message {0} not found")]
    MessageNotFound(Uuid),
    #[error("no profile registered for account {0}")]
    ProfileNotFound(AccountId),
    #[error("no profile registered under {0}")]
    EmailNotFound(String),
    #[error("account {0} has no partner email configured")]
    NotPaired(AccountId),
    #[error("a pending clear request between these accounts already exists")]
    AlreadyPending,
    #[error(transparent)]
    Transition(#[from] TransitionError),
}

/// In-memory stand-in for the hosted relational backend: profiles, messages
/// and clear_requests tables behind a single lock, plus a change fan
/// replicating the backend's row-change push feed for clear requests.
///
/// Every mutation that touches more than one row holds the lock for its whole
/// duration, which is what makes the conversation delete atomic.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

struct Inner {
    profiles: Vec<Profile>,
    messages: Vec<Message>,
    clear_requests: Vec<ClearRequest>,
    changes: ChangeFan<ClearEvent>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                profiles: Vec::new(),
                messages: Vec::new(),
                clear_requests: Vec::new(),
                changes: ChangeFan::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // profiles

    pub fn register(&self, profile: Profile) -> Profile {
        let mut inner = self.lock();
        inner.profiles.retain(|p| p.id != profile.id);
        inner.profiles.push(profile.clone());
        profile
    }

    pub fn profile(&self, id: AccountId) -> Result<Profile, StoreError> {
        self.lock()
            .profiles
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(StoreError::ProfileNotFound(id))
    }

    pub fn profile_by_email(&self, email: &str) -> Result<Profile, StoreError> {
        self.lock()
            .profiles
            .iter()
            .find(|p| p.email == email)
            .cloned()
            .ok_or_else(|| StoreError::EmailNotFound(email.to_owned()))
    }

    pub fn update_profile(
        &self,
        id: AccountId,
        username: Option<String>,
        partner_email: Option<String>,
    ) -> Result<Profile, StoreError> {
        let mut inner = self.lock();
        let profile = inner
            .profiles
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(StoreError::ProfileNotFound(id))?;
        profile.username = username;
        profile.partner_email = partner_email;
        Ok(profile.clone())
    }

    /// Resolves the paired partner through the account's partner email. An
    /// account whose partner email is its own resolves to itself.
    pub fn resolve_partner(&self, id: AccountId) -> Result<Profile, StoreError> {
        let me = self.profile(id)?;
        let partner_email = me.partner_email.ok_or(StoreError::NotPaired(id))?;
        self.profile_by_email(&partner_email)
    }

    // messages

    pub fn send_message(
        &self,
        sender: AccountId,
        draft: MessageDraft,
    ) -> Result<Message, StoreError> {
        let mut inner = self.lock();
        if !inner.profiles.iter().any(|p| p.id == sender) {
            return Err(StoreError::ProfileNotFound(sender));
        }
        if !inner.profiles.iter().any(|p| p.id == draft.receiver_id) {
            return Err(StoreError::ProfileNotFound(draft.receiver_id));
        }
        let message = draft.into_message(sender);
        inner.messages.push(message.clone());
        Ok(message)
    }

    /// Messages addressed to `me`, newest first.
    pub fn inbox(&self, me: AccountId) -> Result<Vec<Message>, StoreError> {
        let mut messages: Vec<Message> = self
            .lock()
            .messages
            .iter()
            .filter(|m| m.receiver_id == me)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    /// Messages authored by `me`, newest first.
    pub fn sent(&self, me: AccountId) -> Result<Vec<Message>, StoreError> {
        let mut messages: Vec<Message> = self
            .lock()
            .messages
            .iter()
            .filter(|m| m.sender_id == me)
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(messages)
    }

    /// Flips the unread flag. Only the receiver of a message can see it, so
    /// anyone else gets a not-found.
    pub fn mark_read(&self, me: AccountId, message_id: Uuid) -> Result<Message, StoreError> {
        let mut inner = self.lock();
        let message = inner
            .messages
            .iter_mut()
            .find(|m| m.id == message_id && m.receiver_id == me)
            .ok_or(StoreError::MessageNotFound(message_id))?;
        message.is_read = true;
        Ok(message.clone())
    }

    pub fn conversation_len(&self, a: AccountId, b: AccountId) -> Result<usize, StoreError> {
        let related = conversation_predicate(a, b);
        let inner = self.lock();
        Ok(inner.messages.iter().filter(|m| related(m)).count())
    }

    /// Removes every message of the conversation in one pass and reports the
    /// exact count. The self-paired case targets the single `a -> a`
    /// direction; the paired case covers both directions at once.
    pub fn delete_conversation(&self, a: AccountId, b: AccountId) -> Result<usize, StoreError> {
        let mut inner = self.lock();
        let related = conversation_predicate(a, b);
        let before = inner.messages.len();
        inner.messages.retain(|m| !related(m));
        Ok(before - inner.messages.len())
    }

    // clear requests

    /// Inserts a pending clear request. At most one pending request may exist
    /// per ordered (sender, receiver) pair.
    pub fn open_request(
        &self,
        sender: AccountId,
        receiver: AccountId,
        note: Option<String>,
    ) -> Result<ClearRequest, StoreError> {
        let mut inner = self.lock();
        if !inner.profiles.iter().any(|p| p.id == sender) {
            return Err(StoreError::ProfileNotFound(sender));
        }
        if !inner.profiles.iter().any(|p| p.id == receiver) {
            return Err(StoreError::ProfileNotFound(receiver));
        }
        let duplicate = inner.clear_requests.iter().any(|r| {
            r.sender_id == sender && r.receiver_id == receiver && r.status == ClearStatus::Pending
        });
        if duplicate {
            return Err(StoreError::AlreadyPending);
        }
        let request = ClearRequest::open(sender, receiver, note);
        inner.clear_requests.push(request.clone());
        inner
            .changes
            .publish(sender, [sender, receiver], ClearEvent::Opened(request.clone()));
        Ok(request)
    }

    /// Records the receiver's decision on a pending request.
    pub fn respond(
        &self,
        responder: AccountId,
        request_id: Uuid,
        accept: bool,
        note: Option<String>,
    ) -> Result<ClearRequest, StoreError> {
        let mut inner = self.lock();
        let request = inner
            .clear_requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(StoreError::RequestNotFound(request_id))?;
        request.ensure_can_respond(responder)?;
        request.settle(accept, note);
        let updated = request.clone();
        inner.changes.publish(
            responder,
            [updated.sender_id, updated.receiver_id],
            ClearEvent::Settled(updated.clone()),
        );
        Ok(updated)
    }

    /// Advances an accepted request to completed once the deletion has gone
    /// through.
    pub fn complete(&self, request_id: Uuid) -> Result<ClearRequest, StoreError> {
        let mut inner = self.lock();
        let request = inner
            .clear_requests
            .iter_mut()
            .find(|r| r.id == request_id)
            .ok_or(StoreError::RequestNotFound(request_id))?;
        if request.status != ClearStatus::Accepted {
            return Err(TransitionError::NotAccepted(request.status).into());
        }
        request.complete();
        let updated = request.clone();
        inner.changes.publish(
            updated.sender_id,
            [updated.sender_id, updated.receiver_id],
            ClearEvent::Settled(updated.clone()),
        );
        Ok(updated)
    }

    pub fn clear_request(&self, id: Uuid) -> Result<ClearRequest, StoreError> {
        self.lock()
            .clear_requests
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or(StoreError::RequestNotFound(id))
    }

    /// Latest pending request addressed to `me`, if any.
    pub fn pending_for_receiver(&self, me: AccountId) -> Result<Option<ClearRequest>, StoreError> {
        Ok(self
            .lock()
            .clear_requests
            .iter()
            .filter(|r| r.receiver_id == me && r.status == ClearStatus::Pending)
            .max_by_key(|r| r.created_at)
            .cloned())
    }

    /// Latest answered (accepted or denied) request opened by `me`, if any.
    pub fn settled_for_sender(&self, me: AccountId) -> Result<Option<ClearRequest>, StoreError> {
        Ok(self
            .lock()
            .clear_requests
            .iter()
            .filter(|r| {
                r.sender_id == me
                    && matches!(r.status, ClearStatus::Accepted | ClearStatus::Denied)
            })
            .max_by_key(|r| r.updated_at)
            .cloned())
    }

    /// Opens a change subscription scoped to `scope`, mirroring the backend's
    /// filtered push feed. The sender half lets the session inject local
    /// input events into its own feed.
    pub fn subscribe(
        &self,
        scope: AccountId,
    ) -> (
        Sender<MessageWrapper<ClearEvent>>,
        Receiver<MessageWrapper<ClearEvent>>,
    ) {
        self.lock().changes.subscribe(scope)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn conversation_predicate(a: AccountId, b: AccountId) -> impl Fn(&Message) -> bool {
    move |m: &Message| {
        if a == b {
            m.sender_id == a && m.receiver_id == a
        } else {
            (m.sender_id == a && m.receiver_id == b) || (m.sender_id == b && m.receiver_id == a)
        }
    }
}
