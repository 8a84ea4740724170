use std::fmt::Display;

use anyhow::Error;

use crate::api::executor::ClearCommand;
use crate::api::ClearExecutor;
use crate::records::clear_request::ClearRequest;
use crate::states::clear::{ClearEvent, RequesterOutcome, RequesterTypes};
use crate::states::fsm::{DeliveryStatus, State, Transition};

/// Second, explicit confirmation gate before the irreversible deletion. The
/// privileged executor is only invoked once a `ConfirmClear` arrives while
/// this state is active.
pub struct Reconfirming {
    request: ClearRequest,
    executor: ClearExecutor,
    confirmed: bool,
}

impl Reconfirming {
    pub fn new(request: ClearRequest, executor: ClearExecutor) -> Self {
        Self {
            request,
            executor,
            confirmed: false,
        }
    }
}

impl Display for Reconfirming {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Reconfirming")
    }
}

impl State<RequesterTypes> for Reconfirming {
    fn initialize(&mut self) -> Result<(), Error> {
        log::info!(
            target: &self.request.log_target(),
            "partner accepted{}; waiting for the final confirmation before wiping the conversation",
            self.request
                .receiver_response_message
                .as_deref()
                .map(|note| format!(" (\"{note}\")"))
                .unwrap_or_default()
        );
        Ok(())
    }

    fn deliver(&mut self, message: ClearEvent) -> DeliveryStatus<ClearEvent> {
        match message {
            ClearEvent::ConfirmClear => {
                self.confirmed = true;
                DeliveryStatus::Delivered
            }
            // lifecycle echoes for this request are informational here
            ClearEvent::Opened(request) | ClearEvent::Settled(request)
                if request.id == self.request.id =>
            {
                DeliveryStatus::Delivered
            }
            m => DeliveryStatus::Unexpected(m),
        }
    }

    fn advance(&mut self) -> Result<Transition<RequesterTypes>, Error> {
        if !self.confirmed {
            return Ok(Transition::Same);
        }
        let command = ClearCommand {
            clear_request_id: self.request.id,
            user_id: self.request.sender_id,
            partner_id: self.request.receiver_id,
        };
        match self.executor.invoke(&command) {
            Ok(outcome) => {
                log::info!(
                    target: &self.request.log_target(),
                    "conversation cleared, {} messages deleted",
                    outcome.deleted
                );
                Ok(Transition::Terminal(RequesterOutcome::Cleared {
                    deleted: outcome.deleted,
                }))
            }
            Err(e) => {
                log::error!(
                    target: &self.request.log_target(),
                    "privileged clear failed: {}",
                    e
                );
                Ok(Transition::Terminal(RequesterOutcome::Rejected {
                    reason: e.to_string(),
                }))
            }
        }
    }
}
