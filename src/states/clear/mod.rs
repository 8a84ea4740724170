use crate::account::AccountId;
use crate::records::clear_request::{ClearRequest, ClearStatus};
use crate::states::fsm::StateMachineTypes;
use crate::store::{MemoryStore, StoreError};

mod awaiting;
pub mod messages;
mod reconfirming;
mod requesting;
mod responding;

pub use awaiting::AwaitingRequest;
pub use messages::{ClearEvent, Decision};
pub use reconfirming::Reconfirming;
pub use requesting::Requesting;
pub use responding::Responding;

/// Session run by the account that wants the conversation cleared.
pub struct RequesterTypes {}

impl StateMachineTypes for RequesterTypes {
    type Message = ClearEvent;
    type TerminalStates = RequesterOutcome;
}

/// Session run by the account answering an incoming request.
pub struct ReceiverTypes {}

impl StateMachineTypes for ReceiverTypes {
    type Message = ClearEvent;
    type TerminalStates = ReceiverOutcome;
}

#[derive(Debug)]
pub enum RequesterOutcome {
    /// The partner accepted and the privileged deletion went through.
    Cleared { deleted: usize },
    /// The partner denied; `note` carries their optional response.
    Denied { note: Option<String> },
    /// The privileged executor refused the finalization.
    Rejected { reason: String },
}

#[derive(Debug)]
pub enum ReceiverOutcome {
    Responded { accepted: bool },
}

/// The single prompt a client may legally show at a time.
#[derive(Debug)]
pub enum Prompt {
    /// Nothing in flight: offer to compose a new clear request.
    Compose,
    /// An incoming pending request awaits this account's answer.
    Respond(ClearRequest),
    /// An outgoing request was accepted and awaits the final confirmation.
    Reconfirm(ClearRequest),
    /// An outgoing request was denied; show the note once and move on.
    DeniedNotice(ClearRequest),
}

/// Reconciling fetch performed before consuming live feed events, so a
/// client that was disconnected cannot miss a transition. Incoming pending
/// requests take precedence over the fate of one's own outgoing request.
pub fn reconcile(store: &MemoryStore, me: AccountId) -> Result<Prompt, StoreError> {
    if let Some(incoming) = store.pending_for_receiver(me)? {
        return Ok(Prompt::Respond(incoming));
    }
    if let Some(outgoing) = store.settled_for_sender(me)? {
        return Ok(match outgoing.status {
            ClearStatus::Accepted => Prompt::Reconfirm(outgoing),
            _ => Prompt::DeniedNotice(outgoing),
        });
    }
    Ok(Prompt::Compose)
}
