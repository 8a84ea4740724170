use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt::{Debug, Display};
use std::sync::mpsc::{Receiver, RecvError};
use thiserror::Error;

use crate::account::AccountId;

/// [Feed] combines polling from a queue of messages and a channel. Messages
/// can be delayed and later placed in the queue.
#[derive(Debug)]
pub struct Feed<T: Display> {
    /// Messages from [queue] will be delivered first.
    queue: VecDeque<T>,

    /// Channel to receive messages to deliver.
    receiver: Receiver<MessageWrapper<T>>,

    /// Any message drawn from [Feed] can be delayed and later placed in the [queue].
    delayed: Vec<T>,
}

impl<T: Display> Feed<T> {
    pub fn new(receiver: Receiver<MessageWrapper<T>>) -> Self {
        Self {
            queue: VecDeque::new(),
            receiver,
            delayed: Vec::new(),
        }
    }

    /// Draw the next message either from [queue] or the channel.
    pub(crate) fn next(&mut self) -> Result<T, FeedError> {
        if let Some(message) = self.queue.pop_front() {
            return Ok(message);
        }

        let wrapped_message = self.receiver.recv().map_err(|e| match e {
            RecvError => FeedError::ChannelClosed,
        })?;
        Ok(wrapped_message.message)
    }

    pub(crate) fn delay(&mut self, message: T) {
        self.delayed.push(message);
    }

    /// Place [delayed] messages in the [queue].
    pub(crate) fn refresh(&mut self) {
        self.delayed
            .drain(..)
            .rev()
            .for_each(|message| self.queue.push_front(message));
    }
}

/// A feed item tagged with the account whose action produced it.
/// [AccountId::local_input] marks events injected by local user input.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MessageWrapper<T: Display> {
    pub actor: AccountId,
    pub message: T,
}

impl<T: Display> Display for MessageWrapper<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&format!("From {}: {}", self.actor.short(), self.message))
    }
}

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("channel has been closed prematurely; more messages were expected")]
    ChannelClosed,
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc::channel;

    use super::*;

    #[test]
    fn delayed_messages_come_back_first_after_a_refresh() {
        let (sender, receiver) = channel();
        let mut feed: Feed<String> = Feed::new(receiver);

        sender
            .send(MessageWrapper {
                actor: AccountId::local_input(),
                message: "live".to_owned(),
            })
            .unwrap();

        feed.delay("early".to_owned());
        feed.refresh();

        assert_eq!(feed.next().unwrap(), "early");
        assert_eq!(feed.next().unwrap(), "live");
    }

    #[test]
    fn closed_channel_is_reported() {
        let (sender, receiver) = channel::<MessageWrapper<String>>();
        drop(sender);
        let mut feed = Feed::new(receiver);
        assert!(matches!(feed.next(), Err(FeedError::ChannelClosed)));
    }
}
