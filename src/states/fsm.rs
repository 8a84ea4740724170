use std::fmt::Display;

use anyhow::Error;
use colored::Colorize;
use serde::{de::DeserializeOwned, Serialize};

use crate::account::AccountId;
use crate::states::feed::{Feed, FeedError};

pub type BoxedState<T> = Box<dyn State<T>>;

pub enum DeliveryStatus<M> {
    Delivered,
    Unexpected(M),
    Error(Error),
}

pub enum Transition<T: StateMachineTypes> {
    Same,
    Next(BoxedState<T>),
    Terminal(T::TerminalStates),
}

/// One step of a protocol session. `initialize` performs the state's opening
/// action against the store, `deliver` absorbs feed events, `advance` decides
/// the next transition.
pub trait State<T: StateMachineTypes>: Display + Send {
    fn initialize(&mut self) -> Result<(), Error>;
    fn deliver(&mut self, message: T::Message) -> DeliveryStatus<T::Message>;
    fn advance(&mut self) -> Result<Transition<T>, Error>;
}

pub trait StateMachineTypes {
    type Message: Clone + Display + Send + Sync + 'static + Serialize + DeserializeOwned;
    type TerminalStates;
}

pub struct StateMachine<T: StateMachineTypes> {
    key: AccountId,
    state: BoxedState<T>,
    message_input: Feed<T::Message>,
}

impl<T: StateMachineTypes> StateMachine<T> {
    fn log_target(&self) -> String {
        format!("fsm:{}", self.key.short())
    }

    pub fn new(
        initial_state: BoxedState<T>,
        input_channel: Feed<T::Message>,
        key: AccountId,
    ) -> StateMachine<T> {
        Self {
            key,
            state: initial_state,
            message_input: input_channel,
        }
    }

    pub fn run(&mut self) -> Result<T::TerminalStates, Error> {
        loop {
            self.state
                .initialize()
                .map_err(|e| Error::msg(format!("[{}] failed to initialize: {}", self.state, e)))?;
            self.message_input.refresh();
            log::info!(
                target: &self.log_target(),
                "entering state {}",
                self.state.to_string().cyan()
            );
            loop {
                let transition: Transition<T> = self
                    .state
                    .advance()
                    .map_err(|e| Error::msg(format!("[{}] failed transition: {}", self.state, e)))?;
                match transition {
                    Transition::Same => {
                        match self.message_input.next() {
                            Ok(next_message) => match self.state.deliver(next_message) {
                                DeliveryStatus::Delivered => {}
                                DeliveryStatus::Unexpected(m) => {
                                    log::warn!(
                                        target: &self.log_target(),
                                        "delaying unexpected message: {}", m
                                    );
                                    self.message_input.delay(m);
                                }
                                DeliveryStatus::Error(e) => {
                                    return Err(Error::msg(format!(
                                        "[{}][{}] {}",
                                        self.key.short(),
                                        self.state,
                                        e
                                    )));
                                }
                            },
                            Err(FeedError::ChannelClosed) => {
                                return Err(Error::msg(format!(
                                    "[{}] feed closed while waiting in state {}",
                                    self.key.short(),
                                    self.state
                                )));
                            }
                        };
                    }
                    Transition::Next(next_state) => {
                        log::trace!(
                            target: &self.log_target(),
                            "transitioning state: {} => {}", self.state, next_state
                        );
                        self.state = next_state;
                        break;
                    }
                    Transition::Terminal(final_state) => {
                        log::info!(
                            target: &self.log_target(),
                            "completed"
                        );
                        return Ok(final_state);
                    }
                }
            }
        }
    }
}
