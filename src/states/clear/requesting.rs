use std::fmt::Display;

use anyhow::Error;

use crate::account::AccountId;
use crate::api::ClearExecutor;
use crate::records::clear_request::{ClearRequest, ClearStatus};
use crate::states::clear::{ClearEvent, Reconfirming, RequesterOutcome, RequesterTypes};
use crate::states::fsm::{DeliveryStatus, State, Transition};
use crate::store::MemoryStore;

/// Requester side of the protocol: opens the clear request on entry, then
/// waits for the partner to settle it one way or the other.
pub struct Requesting {
    store: MemoryStore,
    me: AccountId,
    partner: AccountId,
    note: Option<String>,
    request: Option<ClearRequest>,
    settled: Option<ClearRequest>,
    executor: Option<ClearExecutor>,
}

impl Requesting {
    pub fn new(
        store: MemoryStore,
        me: AccountId,
        partner: AccountId,
        note: Option<String>,
        executor: ClearExecutor,
    ) -> Self {
        Self {
            store,
            me,
            partner,
            note,
            request: None,
            settled: None,
            executor: Some(executor),
        }
    }

    fn is_own(&self, request: &ClearRequest) -> bool {
        self.request
            .as_ref()
            .map(|own| own.id == request.id)
            .unwrap_or(false)
    }
}

impl Display for Requesting {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Requesting")
    }
}

impl State<RequesterTypes> for Requesting {
    fn initialize(&mut self) -> Result<(), Error> {
        if self.request.is_none() {
            let request = self
                .store
                .open_request(self.me, self.partner, self.note.clone())?;
            log::info!(target: &request.log_target(), "clear request sent to partner");
            self.request = Some(request);
        }
        Ok(())
    }

    fn deliver(&mut self, message: ClearEvent) -> DeliveryStatus<ClearEvent> {
        match message {
            // echo of our own insert coming back through the feed
            ClearEvent::Opened(request) if self.is_own(&request) => DeliveryStatus::Delivered,
            ClearEvent::Settled(request) if self.is_own(&request) => {
                self.settled = Some(request);
                DeliveryStatus::Delivered
            }
            m => DeliveryStatus::Unexpected(m),
        }
    }

    fn advance(&mut self) -> Result<Transition<RequesterTypes>, Error> {
        let settled = match &self.settled {
            None => return Ok(Transition::Same),
            Some(request) => request.clone(),
        };
        match settled.status {
            ClearStatus::Accepted => {
                let executor = self
                    .executor
                    .take()
                    .ok_or_else(|| Error::msg("executor already handed off"))?;
                Ok(Transition::Next(Box::new(Reconfirming::new(
                    settled, executor,
                ))))
            }
            ClearStatus::Denied => {
                log::info!(
                    target: &settled.log_target(),
                    "partner denied the request: \"{}\"",
                    settled
                        .receiver_response_message
                        .as_deref()
                        .unwrap_or("no message provided")
                );
                Ok(Transition::Terminal(RequesterOutcome::Denied {
                    note: settled.receiver_response_message,
                }))
            }
            _ => Ok(Transition::Same),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::Profile;

    fn paired_store() -> (MemoryStore, AccountId, AccountId) {
        let store = MemoryStore::new();
        let ana = store
            .register(Profile::new("ana@example.com").with_partner_email("bo@example.com"))
            .id;
        let bo = store
            .register(Profile::new("bo@example.com").with_partner_email("ana@example.com"))
            .id;
        (store, ana, bo)
    }

    fn local_executor(store: &MemoryStore, caller: AccountId) -> ClearExecutor {
        ClearExecutor::Local {
            store: store.clone(),
            caller,
        }
    }

    #[test]
    fn initialize_opens_a_pending_request() {
        let (store, ana, bo) = paired_store();
        let executor = local_executor(&store, ana);
        let mut state = Requesting::new(store.clone(), ana, bo, Some("please".into()), executor);
        state.initialize().unwrap();

        let pending = store.pending_for_receiver(bo).unwrap().unwrap();
        assert_eq!(pending.sender_message.as_deref(), Some("please"));
    }

    #[test]
    fn a_second_session_cannot_open_a_duplicate_request() {
        let (store, ana, bo) = paired_store();
        let mut first = Requesting::new(
            store.clone(),
            ana,
            bo,
            None,
            local_executor(&store, ana),
        );
        first.initialize().unwrap();

        let mut second = Requesting::new(
            store.clone(),
            ana,
            bo,
            None,
            local_executor(&store, ana),
        );
        assert!(second.initialize().is_err());
    }

    #[test]
    fn denial_terminates_with_the_partner_note() {
        let (store, ana, bo) = paired_store();
        let mut state = Requesting::new(store.clone(), ana, bo, None, local_executor(&store, ana));
        state.initialize().unwrap();

        let request = store.pending_for_receiver(bo).unwrap().unwrap();
        let denied = store
            .respond(bo, request.id, false, Some("not yet".into()))
            .unwrap();
        assert!(matches!(
            state.deliver(ClearEvent::Settled(denied)),
            DeliveryStatus::Delivered
        ));

        match state.advance().unwrap() {
            Transition::Terminal(RequesterOutcome::Denied { note }) => {
                assert_eq!(note.as_deref(), Some("not yet"));
            }
            _ => panic!("expected the denial to terminate the session"),
        }
    }

    #[test]
    fn acceptance_moves_the_session_to_reconfirmation() {
        let (store, ana, bo) = paired_store();
        let mut state = Requesting::new(store.clone(), ana, bo, None, local_executor(&store, ana));
        state.initialize().unwrap();

        let request = store.pending_for_receiver(bo).unwrap().unwrap();
        let accepted = store.respond(bo, request.id, true, None).unwrap();
        state.deliver(ClearEvent::Settled(accepted));

        match state.advance().unwrap() {
            Transition::Next(next) => assert_eq!(next.to_string(), "Reconfirming"),
            _ => panic!("expected a transition to Reconfirming"),
        }
    }

    #[test]
    fn foreign_events_are_delayed_not_consumed() {
        let (store, ana, bo) = paired_store();
        let mut state = Requesting::new(store.clone(), ana, bo, None, local_executor(&store, ana));
        state.initialize().unwrap();

        let status = state.deliver(ClearEvent::ConfirmClear);
        assert!(matches!(status, DeliveryStatus::Unexpected(_)));
        assert!(matches!(state.advance().unwrap(), Transition::Same));
    }
}
