use anyhow::{Error, Result};

use crate::account::{AccountId, Profile};
use crate::api::ClearExecutor;
use crate::records::message::{Message, MessageDraft};
use crate::states::clear::{
    AwaitingRequest, ClearEvent, Decision, ReceiverOutcome, ReceiverTypes, RequesterOutcome,
    RequesterTypes, Requesting,
};
use crate::states::feed::{Feed, MessageWrapper};
use crate::states::fsm::StateMachine;
use crate::store::MemoryStore;

/// One connected portal client: an account plus its handle on the store.
/// Each protocol session gets its own change subscription, so one account
/// can run the requester and receiver sides at the same time (the
/// self-paired configuration).
pub struct PortalClient {
    store: MemoryStore,
    profile: Profile,
}

impl PortalClient {
    pub fn new(store: MemoryStore, profile: Profile) -> Self {
        Self { store, profile }
    }

    pub fn id(&self) -> AccountId {
        self.profile.id
    }

    pub fn compose(&self, draft: MessageDraft) -> Result<Message> {
        Ok(self.store.send_message(self.profile.id, draft)?)
    }

    /// Runs a requester session to its terminal outcome. `script` stands in
    /// for the user's clicks and is queued as local input ahead of time; the
    /// state machine only consumes each event once the matching prompt is
    /// active.
    pub fn run_requester(
        self,
        note: Option<String>,
        executor: ClearExecutor,
        script: Vec<ClearEvent>,
    ) -> Result<RequesterOutcome> {
        let partner = self.store.resolve_partner(self.profile.id)?;
        let (input, events) = self.store.subscribe(self.profile.id);
        for event in script {
            input
                .send(MessageWrapper {
                    actor: AccountId::local_input(),
                    message: event,
                })
                .map_err(|e| Error::msg(format!("failed to queue input: {e}")))?;
        }

        let initial = Requesting::new(
            self.store.clone(),
            self.profile.id,
            partner.id,
            note,
            executor,
        );
        let mut machine: StateMachine<RequesterTypes> =
            StateMachine::new(Box::new(initial), Feed::new(events), self.profile.id);
        machine.run()
    }

    /// Runs a receiver session to its terminal outcome, answering the next
    /// incoming request with `decision`.
    pub fn run_receiver(self, decision: Decision) -> Result<ReceiverOutcome> {
        let (input, events) = self.store.subscribe(self.profile.id);
        input
            .send(MessageWrapper {
                actor: AccountId::local_input(),
                message: ClearEvent::Respond(decision),
            })
            .map_err(|e| Error::msg(format!("failed to queue input: {e}")))?;

        let initial = AwaitingRequest::new(self.store.clone(), self.profile.id);
        let mut machine: StateMachine<ReceiverTypes> =
            StateMachine::new(Box::new(initial), Feed::new(events), self.profile.id);
        machine.run()
    }
}
