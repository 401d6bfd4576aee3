//! Dispatch bus
//!
//! One bus per context routes inbound envelopes to the registered handlers
//! and outbound sends to the raw channel.
//!
//! The raw-channel listener exists only while at least one handler is
//! registered: it is attached on the 0→1 transition of the handler count and
//! detached on 1→0, never in between.
//!
//! For every inbound envelope all handlers are run. At most one may claim it.
//! A single claim is awaited and its reply delivered; several claims are a
//! protocol violation, logged here, and the envelope goes unanswered.
//!
//! Claiming is synchronous and answering is not: a handler claims by
//! returning its future, and the work behind that future only starts when
//! the bus polls it. On a violation every claimed future is dropped
//! unpolled, so none of the conflicting handlers' methods run at all.

use courier_core::effects::{ListenerId, RawChannel, RawListener, Responder};
use courier_core::{
    CourierError, Destination, Envelope, Handler, HandlerFuture, Result, SenderInfo, Value,
};
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use tracing::{debug, error, trace, warn};

/// Options for [`DispatchBus::send`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Where the envelope is delivered
    pub destination: Destination,
}

impl SendOptions {
    /// Deliver to every listening context
    pub fn broadcast() -> Self {
        Self::default()
    }

    /// Deliver to one context
    pub fn to(destination: impl Into<Destination>) -> Self {
        Self {
            destination: destination.into(),
        }
    }
}

#[derive(Default)]
struct BusState {
    handlers: Vec<(u64, Arc<dyn Handler>)>,
    next_handler_id: u64,
    listener: Option<ListenerId>,
}

struct BusShared {
    channel: Arc<dyn RawChannel>,
    state: Mutex<BusState>,
}

/// Per-context message router
#[derive(Clone)]
pub struct DispatchBus {
    shared: Arc<BusShared>,
}

impl DispatchBus {
    /// Create a bus over a raw channel; no listener is attached yet
    pub fn new(channel: Arc<dyn RawChannel>) -> Self {
        Self {
            shared: Arc::new(BusShared {
                channel,
                state: Mutex::new(BusState::default()),
            }),
        }
    }

    /// Send an envelope and wait for its single reply
    ///
    /// A raw channel failure surfaces as [`CourierError::Channel`] with the
    /// original error preserved; a handler failure on the remote side
    /// surfaces as the error it raised.
    pub async fn send(&self, message_type: &str, data: Value, options: SendOptions) -> Result<Value> {
        let envelope = Envelope::new(message_type, data);
        let message_id = envelope.id;
        debug!(
            message_type,
            %message_id,
            destination = %options.destination,
            "Sending envelope"
        );

        match self.shared.channel.send(envelope, options.destination).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(remote)) => {
                debug!(message_type, %message_id, error = %remote, "Remote handler failed");
                Err(remote)
            }
            Err(channel) => {
                warn!(message_type, %message_id, error = %channel, "Raw channel send failed");
                Err(CourierError::Channel(channel))
            }
        }
    }

    /// Register a handler, attaching the channel listener if it is the first
    pub fn watch(&self, handler: Arc<dyn Handler>) -> Subscription {
        let mut state = self.shared.state.lock();
        let id = state.next_handler_id;
        state.next_handler_id += 1;
        state.handlers.push((id, handler));

        if state.handlers.len() == 1 {
            let listener = Arc::new(BusListener {
                shared: Arc::downgrade(&self.shared),
            });
            state.listener = Some(self.shared.channel.on_message(listener));
            debug!("Attached raw channel listener");
        }

        Subscription {
            id,
            shared: Arc::downgrade(&self.shared),
        }
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.shared.state.lock().handlers.len()
    }

    /// Whether the raw channel listener is attached
    pub fn is_listening(&self) -> bool {
        self.shared.state.lock().listener.is_some()
    }
}

impl fmt::Debug for DispatchBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("DispatchBus")
            .field("handlers", &state.handlers.len())
            .field("listener", &state.listener)
            .finish()
    }
}

/// Handle returned by [`DispatchBus::watch`]
///
/// The handler stays registered until [`Subscription::unsubscribe`] is
/// called; dropping the handle does not remove it.
#[must_use = "keep the subscription to be able to remove the handler"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    shared: Weak<BusShared>,
}

impl Subscription {
    /// Remove the handler, detaching the listener if it was the last one
    ///
    /// Calling this more than once is harmless.
    pub fn unsubscribe(&self) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let mut state = shared.state.lock();
        let before = state.handlers.len();
        state.handlers.retain(|(id, _)| *id != self.id);
        if state.handlers.len() == before {
            return;
        }

        if state.handlers.is_empty() {
            if let Some(listener) = state.listener.take() {
                shared.channel.off_message(listener);
                debug!("Detached raw channel listener");
            }
        }
    }
}

struct BusListener {
    shared: Weak<BusShared>,
}

impl RawListener for BusListener {
    fn on_message(&self, envelope: Envelope, sender: SenderInfo, responder: Responder) {
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let handlers: Vec<Arc<dyn Handler>> = shared
            .state
            .lock()
            .handlers
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        let mut answers: Vec<HandlerFuture> = handlers
            .iter()
            .filter_map(|handler| handler.run(&envelope.message_type, &envelope.data, &sender))
            .collect();

        match answers.len() {
            0 => {
                trace!(
                    message_type = %envelope.message_type,
                    message_id = %envelope.id,
                    "No handler answered"
                );
            }
            1 => {
                let Some(answer) = answers.pop() else {
                    return;
                };
                deliver(envelope, answer, responder);
            }
            count => {
                let violation = CourierError::multiple_responders(&envelope.message_type, count);
                error!(
                    message_type = %envelope.message_type,
                    message_id = %envelope.id,
                    error = %violation,
                    "Protocol violation, envelope left unanswered"
                );
            }
        }
    }
}

fn deliver(envelope: Envelope, answer: HandlerFuture, responder: Responder) {
    match tokio::runtime::Handle::try_current() {
        Ok(runtime) => {
            runtime.spawn(async move {
                let reply = answer.await;
                if let Err(err) = &reply {
                    debug!(
                        message_type = %envelope.message_type,
                        message_id = %envelope.id,
                        error = %err,
                        "Handler failed"
                    );
                }
                responder.respond(reply);
            });
        }
        Err(_) => {
            error!(
                message_type = %envelope.message_type,
                message_id = %envelope.id,
                "No async runtime on the delivering thread, envelope left unanswered"
            );
        }
    }
}
