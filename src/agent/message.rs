//! Inter-agent message envelope.

use crate::atom::AtomHandle;

use super::agent::AgentId;

/// A queued message. Owns one reference on its content atom; the sender is
/// recorded by id only.
#[derive(Debug, Clone)]
pub struct Message {
    sender: AgentId,
    content: AtomHandle,
    priority: i32,
    timestamp: u64,
}

impl Message {
    pub(crate) fn new(sender: AgentId, content: AtomHandle, timestamp: u64) -> Self {
        Self {
            sender,
            content,
            priority: 0,
            timestamp,
        }
    }

    pub fn sender(&self) -> AgentId {
        self.sender
    }

    pub fn content(&self) -> &AtomHandle {
        &self.content
    }

    /// Carried for callers; the queue itself is strict FIFO.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Logical arrival order at the recipient, starting at 0.
    pub fn timestamp(&self) -> u64 {
        self.timestamp
    }

    /// Unwrap the envelope, handing its content reference to the caller.
    pub fn into_content(self) -> AtomHandle {
        self.content
    }
}
