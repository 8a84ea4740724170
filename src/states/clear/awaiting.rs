use std::fmt::Display;

use anyhow::Error;

use crate::account::AccountId;
use crate::records::clear_request::{ClearRequest, ClearStatus};
use crate::states::clear::{ClearEvent, ReceiverTypes, Responding};
use crate::states::fsm::{DeliveryStatus, State, Transition};
use crate::store::MemoryStore;

/// Receiver side, idle: waits for a pending clear request addressed to this
/// account. Entry performs the reconciling fetch so a request opened while
/// the client was offline is not missed.
pub struct AwaitingRequest {
    store: MemoryStore,
    me: AccountId,
    incoming: Option<ClearRequest>,
}

impl AwaitingRequest {
    pub fn new(store: MemoryStore, me: AccountId) -> Self {
        Self {
            store,
            me,
            incoming: None,
        }
    }
}

impl Display for AwaitingRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AwaitingRequest")
    }
}

impl State<ReceiverTypes> for AwaitingRequest {
    fn initialize(&mut self) -> Result<(), Error> {
        if self.incoming.is_none() {
            self.incoming = self.store.pending_for_receiver(self.me)?;
            if let Some(request) = &self.incoming {
                log::info!(
                    target: &request.log_target(),
                    "found a pending clear request while reconciling"
                );
            }
        }
        Ok(())
    }

    fn deliver(&mut self, message: ClearEvent) -> DeliveryStatus<ClearEvent> {
        match message {
            ClearEvent::Opened(request)
                if request.receiver_id == self.me && request.status == ClearStatus::Pending =>
            {
                self.incoming = Some(request);
                DeliveryStatus::Delivered
            }
            // settles of other requests scoped to us are informational here
            ClearEvent::Settled(_) => DeliveryStatus::Delivered,
            m => DeliveryStatus::Unexpected(m),
        }
    }

    fn advance(&mut self) -> Result<Transition<ReceiverTypes>, Error> {
        match self.incoming.take() {
            None => Ok(Transition::Same),
            Some(request) => Ok(Transition::Next(Box::new(Responding::new(
                self.store.clone(),
                self.me,
                request,
            )))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Profile;

    #[test]
    fn reconciling_picks_up_a_request_opened_while_offline() {
        let store = MemoryStore::new();
        let ana = store
            .register(Profile::new("ana@example.com").with_partner_email("bo@example.com"))
            .id;
        let bo = store
            .register(Profile::new("bo@example.com").with_partner_email("ana@example.com"))
            .id;
        store.open_request(ana, bo, None).unwrap();

        let mut state = AwaitingRequest::new(store, bo);
        state.initialize().unwrap();
        match state.advance().unwrap() {
            Transition::Next(next) => assert_eq!(next.to_string(), "Responding"),
            _ => panic!("expected a transition to Responding"),
        }
    }

    #[test]
    fn a_live_opened_event_wakes_the_state() {
        let store = MemoryStore::new();
        let ana = store
            .register(Profile::new("ana@example.com").with_partner_email("bo@example.com"))
            .id;
        let bo = store
            .register(Profile::new("bo@example.com").with_partner_email("ana@example.com"))
            .id;

        let mut state = AwaitingRequest::new(store.clone(), bo);
        state.initialize().unwrap();
        assert!(matches!(state.advance().unwrap(), Transition::Same));

        let request = store.open_request(ana, bo, None).unwrap();
        state.deliver(ClearEvent::Opened(request));
        assert!(matches!(state.advance().unwrap(), Transition::Next(_)));
    }
}
