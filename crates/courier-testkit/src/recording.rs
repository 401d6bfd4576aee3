//! Recording raw channel
//!
//! Wraps another [`RawChannel`] and keeps a log of every envelope sent
//! through it, so tests can assert on what actually crossed the channel.

use async_trait::async_trait;
use courier_core::effects::{ListenerId, RawChannel, RawListener};
use courier_core::{ChannelError, Destination, Envelope, MessageId, Reply};
use parking_lot::Mutex;
use std::sync::Arc;

/// One envelope observed leaving a context
#[derive(Debug, Clone, PartialEq)]
pub struct SentEnvelope {
    /// Envelope id
    pub id: MessageId,
    /// Envelope type
    pub message_type: String,
    /// Where it was addressed
    pub destination: Destination,
}

/// [`RawChannel`] decorator logging outbound envelopes
#[derive(Clone)]
pub struct RecordingChannel {
    inner: Arc<dyn RawChannel>,
    sent: Arc<Mutex<Vec<SentEnvelope>>>,
}

impl RecordingChannel {
    /// Record everything sent through `inner`
    pub fn new(inner: Arc<dyn RawChannel>) -> Self {
        Self {
            inner,
            sent: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Envelopes sent so far, oldest first
    pub fn sent(&self) -> Vec<SentEnvelope> {
        self.sent.lock().clone()
    }

    /// Number of envelopes sent so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().len()
    }

    /// Forget everything recorded
    pub fn clear(&self) {
        self.sent.lock().clear();
    }
}

#[async_trait]
impl RawChannel for RecordingChannel {
    async fn send(
        &self,
        envelope: Envelope,
        destination: Destination,
    ) -> Result<Reply, ChannelError> {
        self.sent.lock().push(SentEnvelope {
            id: envelope.id,
            message_type: envelope.message_type.clone(),
            destination,
        });
        self.inner.send(envelope, destination).await
    }

    fn on_message(&self, listener: Arc<dyn RawListener>) -> ListenerId {
        self.inner.on_message(listener)
    }

    fn off_message(&self, id: ListenerId) {
        self.inner.off_message(id);
    }
}
