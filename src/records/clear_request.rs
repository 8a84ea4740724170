use colored::Colorize;
use enum_display::EnumDisplay;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::account::AccountId;

/// Lifecycle of a clear request. `Pending` may move to `Accepted` or
/// `Denied`; `Accepted` may move to `Completed`; `Denied` and `Completed`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumDisplay, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClearStatus {
    Pending,
    Accepted,
    Denied,
    Completed,
}

impl ClearStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ClearStatus::Denied | ClearStatus::Completed)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("request is {0}, only a pending request can be answered")]
    NotPending(ClearStatus),
    #[error("request is {0}, only an accepted request can be finalized")]
    NotAccepted(ClearStatus),
    #[error("account {0} is not the designated receiver of this request")]
    NotReceiver(AccountId),
    #[error("account {0} did not open this request")]
    NotSender(AccountId),
}

/// One attempt to mutually authorize a bulk deletion of the conversation
/// between `sender_id` and `receiver_id`. The two sides may be the same
/// account (self-pairing).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearRequest {
    pub id: Uuid,
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub status: ClearStatus,
    pub sender_message: Option<String>,
    pub receiver_response_message: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl ClearRequest {
    pub fn open(
        sender_id: AccountId,
        receiver_id: AccountId,
        sender_message: Option<String>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        Self {
            id: Uuid::new_v4(),
            sender_id,
            receiver_id,
            status: ClearStatus::Pending,
            sender_message,
            receiver_response_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this request covers an account paired with itself, in which
    /// case deletion targets a single direction instead of two.
    pub fn is_self_clear(&self) -> bool {
        self.sender_id == self.receiver_id
    }

    pub fn log_target(&self) -> String {
        format!(
            "clear:{}",
            self.id.to_string().chars().take(8).collect::<String>().yellow()
        )
    }

    /// Only the designated receiver may answer, and only while pending.
    pub fn ensure_can_respond(&self, responder: AccountId) -> Result<(), TransitionError> {
        if responder != self.receiver_id {
            return Err(TransitionError::NotReceiver(responder));
        }
        if self.status != ClearStatus::Pending {
            return Err(TransitionError::NotPending(self.status));
        }
        Ok(())
    }

    /// Only the original requester may finalize; the caller check comes
    /// first so a foreign caller is always reported as unauthorized, never
    /// as a state problem.
    pub fn ensure_can_finalize(&self, caller: AccountId) -> Result<(), TransitionError> {
        if caller != self.sender_id {
            return Err(TransitionError::NotSender(caller));
        }
        if self.status != ClearStatus::Accepted {
            return Err(TransitionError::NotAccepted(self.status));
        }
        Ok(())
    }

    pub(crate) fn settle(&mut self, accept: bool, note: Option<String>) {
        self.status = if accept {
            ClearStatus::Accepted
        } else {
            ClearStatus::Denied
        };
        self.receiver_response_message = note;
        self.touch();
    }

    pub(crate) fn complete(&mut self) {
        self.status = ClearStatus::Completed;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = OffsetDateTime::now_utc();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ClearRequest {
        ClearRequest::open(AccountId::random(), AccountId::random(), None)
    }

    #[test]
    fn opens_pending() {
        let request = request();
        assert_eq!(request.status, ClearStatus::Pending);
        assert!(request.receiver_response_message.is_none());
    }

    #[test]
    fn only_receiver_may_respond() {
        let request = request();
        let stranger = AccountId::random();
        assert_eq!(
            request.ensure_can_respond(stranger),
            Err(TransitionError::NotReceiver(stranger))
        );
        assert!(request.ensure_can_respond(request.receiver_id).is_ok());
    }

    #[test]
    fn settled_request_cannot_be_answered_again() {
        let mut request = request();
        request.settle(true, Some("ok".into()));
        assert_eq!(request.status, ClearStatus::Accepted);
        assert_eq!(
            request.ensure_can_respond(request.receiver_id),
            Err(TransitionError::NotPending(ClearStatus::Accepted))
        );
    }

    #[test]
    fn finalize_requires_acceptance_and_the_original_sender() {
        let mut request = request();
        let sender = request.sender_id;
        assert_eq!(
            request.ensure_can_finalize(sender),
            Err(TransitionError::NotAccepted(ClearStatus::Pending))
        );

        request.settle(true, None);
        let stranger = AccountId::random();
        assert_eq!(
            request.ensure_can_finalize(stranger),
            Err(TransitionError::NotSender(stranger))
        );
        assert!(request.ensure_can_finalize(sender).is_ok());

        request.complete();
        assert_eq!(
            request.ensure_can_finalize(sender),
            Err(TransitionError::NotAccepted(ClearStatus::Completed))
        );
    }

    #[test]
    fn denial_is_terminal() {
        let mut request = request();
        request.settle(false, Some("not yet".into()));
        assert_eq!(request.status, ClearStatus::Denied);
        assert!(request.status.is_terminal());
        assert_eq!(
            request.ensure_can_respond(request.receiver_id),
            Err(TransitionError::NotPending(ClearStatus::Denied))
        );
    }

    #[test]
    fn self_pairing_is_detected() {
        let me = AccountId::random();
        let request = ClearRequest::open(me, me, None);
        assert!(request.is_self_clear());
    }
}
