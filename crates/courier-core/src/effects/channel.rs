//! Raw message channel effects
//!
//! The host platform supplies an asynchronous, string-keyed message channel
//! with no request/response pairing, no schema and no multiplexing. This
//! module is the narrow contract Courier consumes from it:
//!
//! - [`RawChannel::send`] delivers an envelope to one or all listening
//!   contexts and resolves with the first reply any listener supplies.
//! - [`RawChannel::on_message`] / [`RawChannel::off_message`] attach and
//!   detach a [`RawListener`].
//!
//! # Effect Classification
//!
//! - **Category**: Infrastructure Effect
//! - **Implementation**: `courier-transport` (in-memory hub) or a platform binding
//! - **Usage**: the dispatch bus; nothing else talks to the channel directly

use crate::context::{Destination, SenderInfo};
use crate::envelope::{Envelope, Reply};
use crate::errors::ChannelError;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Handle identifying an attached listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw listener number
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw listener number
    pub const fn raw(self) -> u64 {
        self.0
    }
}

/// One-shot reply slot handed to a listener with each inbound envelope
///
/// Calling [`Responder::respond`] answers the envelope. Dropping the responder
/// without answering declines; the channel decides what the sender observes
/// once every listener has declined.
pub struct Responder {
    reply: Box<dyn FnOnce(Reply) + Send>,
}

impl Responder {
    /// Wrap the channel's reply callback
    pub fn new<F>(reply: F) -> Self
    where
        F: FnOnce(Reply) + Send + 'static,
    {
        Self {
            reply: Box::new(reply),
        }
    }

    /// Deliver the reply
    pub fn respond(self, reply: Reply) {
        (self.reply)(reply);
    }
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Responder(..)")
    }
}

/// Receives every inbound envelope for one context
pub trait RawListener: Send + Sync {
    /// Called once per inbound envelope
    fn on_message(&self, envelope: Envelope, sender: SenderInfo, responder: Responder);
}

/// Raw message channel of one context
#[async_trait]
pub trait RawChannel: Send + Sync {
    /// Deliver an envelope and wait for the first reply
    async fn send(&self, envelope: Envelope, destination: Destination)
        -> Result<Reply, ChannelError>;

    /// Attach a listener for inbound envelopes
    fn on_message(&self, listener: Arc<dyn RawListener>) -> ListenerId;

    /// Detach a previously attached listener; unknown ids are ignored
    fn off_message(&self, id: ListenerId);
}
