use std::fmt::Display;

use anyhow::Error;

use crate::account::AccountId;
use crate::records::clear_request::ClearRequest;
use crate::states::clear::{ClearEvent, Decision, ReceiverOutcome, ReceiverTypes};
use crate::states::fsm::{DeliveryStatus, State, Transition};
use crate::store::MemoryStore;

/// Receiver side, answering: holds the incoming pending request until the
/// user's accept/deny decision arrives, then records it on the store.
pub struct Responding {
    store: MemoryStore,
    me: AccountId,
    request: ClearRequest,
    decision: Option<Decision>,
}

impl Responding {
    pub fn new(store: MemoryStore, me: AccountId, request: ClearRequest) -> Self {
        Self {
            store,
            me,
            request,
            decision: None,
        }
    }
}

impl Display for Responding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Responding")
    }
}

impl State<ReceiverTypes> for Responding {
    fn initialize(&mut self) -> Result<(), Error> {
        log::info!(
            target: &self.request.log_target(),
            "partner asks to clear the conversation{}",
            self.request
                .sender_message
                .as_deref()
                .map(|note| format!(": \"{note}\""))
                .unwrap_or_default()
        );
        Ok(())
    }

    fn deliver(&mut self, message: ClearEvent) -> DeliveryStatus<ClearEvent> {
        match message {
            ClearEvent::Respond(decision) => {
                if self.decision.is_none() {
                    self.decision = Some(decision);
                } else {
                    log::trace!(
                        target: &self.request.log_target(),
                        "ignoring a repeated decision"
                    );
                }
                DeliveryStatus::Delivered
            }
            // lifecycle echoes for this request carry no new information
            ClearEvent::Opened(request) | ClearEvent::Settled(request)
                if request.id == self.request.id =>
            {
                DeliveryStatus::Delivered
            }
            m => DeliveryStatus::Unexpected(m),
        }
    }

    fn advance(&mut self) -> Result<Transition<ReceiverTypes>, Error> {
        let decision = match &self.decision {
            None => return Ok(Transition::Same),
            Some(decision) => decision.clone(),
        };
        self.store
            .respond(self.me, self.request.id, decision.accept, decision.note)?;
        log::info!(
            target: &self.request.log_target(),
            "request {}",
            if decision.accept { "accepted" } else { "denied" }
        );
        Ok(Transition::Terminal(ReceiverOutcome::Responded {
            accepted: decision.accept,
        }))
    }
}
