use thiserror::Error;
use uuid::Uuid;

use crate::account::AccountId;
use crate::records::clear_request::TransitionError;
use crate::store::{MemoryStore, StoreError};

/// Subject of a privileged clear invocation. These fields name the request
/// and the conversation to act on; they are never proof of authorization,
/// which comes from the separately supplied caller identity.
#[derive(Debug, Clone)]
pub struct ClearCommand {
    pub clear_request_id: Uuid,
    pub user_id: AccountId,
    pub partner_id: AccountId,
}

#[derive(Debug, Clone)]
pub struct ClearOutcome {
    pub deleted: usize,
}

#[derive(Debug, Error)]
pub enum ClearError {
    #[error("clear request not found")]
    NotFound,
    #[error("clear request not accepted by partner")]
    NotAccepted,
    #[error("unauthorized to clear messages for this request")]
    Unauthorized,
    #[error("partner does not match the clear request")]
    PartnerMismatch,
    #[error("failed to delete messages: {0}")]
    Deletion(#[source] StoreError),
}

/// Runs the privileged bulk deletion. This is the only code path allowed to
/// delete messages in bulk, so it re-reads the request and re-checks every
/// precondition itself instead of trusting anything the caller asserted.
pub fn execute_clear(
    store: &MemoryStore,
    caller: AccountId,
    command: &ClearCommand,
) -> Result<ClearOutcome, ClearError> {
    let request = store
        .clear_request(command.clear_request_id)
        .map_err(|_| ClearError::NotFound)?;
    let target = request.log_target();

    if caller != command.user_id {
        log::error!(target: &target, "caller {} does not speak for {}", caller, command.user_id);
        return Err(ClearError::Unauthorized);
    }
    match request.ensure_can_finalize(caller) {
        Ok(()) => {}
        Err(TransitionError::NotSender(_)) => {
            log::error!(target: &target, "caller {} did not open this request", caller);
            return Err(ClearError::Unauthorized);
        }
        Err(e) => {
            log::error!(target: &target, "request is not ready to finalize: {}", e);
            return Err(ClearError::NotAccepted);
        }
    }
    if command.partner_id != request.receiver_id {
        log::error!(
            target: &target,
            "payload names partner {} but the request was addressed to {}",
            command.partner_id,
            request.receiver_id
        );
        return Err(ClearError::PartnerMismatch);
    }

    if request.is_self_clear() {
        log::info!(target: &target, "self-pairing detected, deleting the single direction");
    }
    let deleted = store
        .delete_conversation(request.sender_id, request.receiver_id)
        .map_err(ClearError::Deletion)?;
    log::info!(
        target: &target,
        "deleted {} messages between {} and {}",
        deleted,
        request.sender_id.short(),
        request.receiver_id.short()
    );

    // The messages are already gone; a bookkeeping failure here must not
    // turn the reported result into a failure.
    match store.complete(request.id) {
        Ok(_) => log::info!(target: &target, "clear request marked completed"),
        Err(e) => log::error!(
            target: &target,
            "request left uncompleted after a successful deletion: {}",
            e
        ),
    }

    Ok(ClearOutcome { deleted })
}
