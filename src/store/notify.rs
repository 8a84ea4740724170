use std::fmt::Display;
use std::sync::mpsc::{channel, Receiver, Sender};

use crate::account::AccountId;
use crate::states::feed::MessageWrapper;

/// Fans row-change events out to per-session subscription channels, each
/// scoped to one account. An account may hold several subscriptions at once
/// (one per running session).
pub struct ChangeFan<T: Display> {
    subscribers: Vec<Subscriber<T>>,
}

struct Subscriber<T: Display> {
    scope: AccountId,
    sender: Sender<MessageWrapper<T>>,
}

impl<T: Clone + Display> ChangeFan<T> {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }

    /// Opens a subscription scoped to `scope`. The returned sender feeds the
    /// same channel and lets the session inject local input events.
    pub fn subscribe(&mut self, scope: AccountId) -> (Sender<MessageWrapper<T>>, Receiver<MessageWrapper<T>>) {
        let (sender, receiver) = channel();
        self.subscribers.push(Subscriber {
            scope,
            sender: sender.clone(),
        });
        (sender, receiver)
    }

    /// Delivers `event` to every subscription scoped to one of `parties`.
    /// Disconnected subscribers are dropped on the way.
    pub fn publish(&mut self, actor: AccountId, parties: [AccountId; 2], event: T) {
        self.subscribers.retain(|subscriber| {
            if !parties.contains(&subscriber.scope) {
                return true;
            }
            let wrapped = MessageWrapper {
                actor,
                message: event.clone(),
            };
            match subscriber.sender.send(wrapped) {
                Ok(()) => true,
                Err(e) => {
                    log::trace!("dropping disconnected subscriber: {}", e);
                    false
                }
            }
        });
    }
}
