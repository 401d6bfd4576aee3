//! In-memory raw channel
//!
//! A [`MemoryHub`] stands in for the platform's message routing between
//! contexts that live in the same process, for tests and simulation. Each
//! context connects with its [`Endpoint`] and receives a [`MemoryChannel`].
//!
//! Delivery follows the platform's rules:
//!
//! - a broadcast reaches the listeners of every endpoint except the sender;
//! - a targeted send reaches only the named endpoint's listeners;
//! - the first reply wins, later replies are discarded;
//! - if no listener is reachable the send fails with
//!   [`ChannelError::Unreachable`]; if every listener drops its responder it
//!   fails with [`ChannelError::NoResponse`].

use async_trait::async_trait;
use courier_core::effects::{ListenerId, RawChannel, RawListener, Responder};
use courier_core::{ChannelError, Destination, Endpoint, Envelope, Reply, SenderInfo};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Attach/detach counters for one endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerStats {
    /// Number of `on_message` calls
    pub attached: u64,
    /// Number of `off_message` calls that removed a listener
    pub detached: u64,
}

#[derive(Default)]
struct EndpointState {
    url: Option<String>,
    listeners: Vec<(ListenerId, Arc<dyn RawListener>)>,
    stats: ListenerStats,
}

#[derive(Default)]
struct HubState {
    endpoints: HashMap<Endpoint, EndpointState>,
    next_listener: u64,
}

/// Shared router connecting in-process contexts
#[derive(Clone, Default)]
pub struct MemoryHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryHub {
    /// Create a hub with no endpoints
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect an endpoint; reconnecting keeps its listeners
    pub fn connect(&self, endpoint: Endpoint) -> MemoryChannel {
        self.state.lock().endpoints.entry(endpoint).or_default();
        MemoryChannel {
            hub: self.clone(),
            endpoint,
        }
    }

    /// Connect an endpoint that reports a document URL as sender info
    pub fn connect_with_url(&self, endpoint: Endpoint, url: impl Into<String>) -> MemoryChannel {
        let channel = self.connect(endpoint);
        if let Some(state) = self.state.lock().endpoints.get_mut(&endpoint) {
            state.url = Some(url.into());
        }
        channel
    }

    /// Tear an endpoint down, dropping its listeners
    pub fn disconnect(&self, endpoint: Endpoint) {
        self.state.lock().endpoints.remove(&endpoint);
    }

    /// Whether an endpoint is connected
    pub fn is_connected(&self, endpoint: Endpoint) -> bool {
        self.state.lock().endpoints.contains_key(&endpoint)
    }

    /// Listeners currently attached at an endpoint
    pub fn listener_count(&self, endpoint: Endpoint) -> usize {
        self.state
            .lock()
            .endpoints
            .get(&endpoint)
            .map_or(0, |state| state.listeners.len())
    }

    /// Attach/detach counters of an endpoint
    pub fn listener_stats(&self, endpoint: Endpoint) -> ListenerStats {
        self.state
            .lock()
            .endpoints
            .get(&endpoint)
            .map(|state| state.stats)
            .unwrap_or_default()
    }
}

impl fmt::Debug for MemoryHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        let mut endpoints: Vec<(String, usize)> = state
            .endpoints
            .iter()
            .map(|(endpoint, target)| (endpoint.to_string(), target.listeners.len()))
            .collect();
        endpoints.sort();
        f.debug_struct("MemoryHub")
            .field("endpoints", &endpoints)
            .finish()
    }
}

/// Raw channel of one endpoint on a [`MemoryHub`]
#[derive(Clone)]
pub struct MemoryChannel {
    hub: MemoryHub,
    endpoint: Endpoint,
}

impl MemoryChannel {
    /// Endpoint this channel sends from
    pub fn endpoint(&self) -> Endpoint {
        self.endpoint
    }

    fn route(
        &self,
        destination: Destination,
    ) -> Result<(SenderInfo, Vec<Arc<dyn RawListener>>), ChannelError> {
        let state = self.hub.state.lock();
        let own = state
            .endpoints
            .get(&self.endpoint)
            .ok_or(ChannelError::Disconnected)?;
        let sender = SenderInfo {
            endpoint: self.endpoint,
            url: own.url.clone(),
        };

        let listeners: Vec<Arc<dyn RawListener>> = match destination {
            Destination::Broadcast => state
                .endpoints
                .iter()
                .filter(|(endpoint, _)| **endpoint != self.endpoint)
                .flat_map(|(_, target)| target.listeners.iter())
                .map(|(_, listener)| Arc::clone(listener))
                .collect(),
            Destination::Endpoint(endpoint) => state
                .endpoints
                .get(&endpoint)
                .ok_or_else(|| ChannelError::unreachable(endpoint))?
                .listeners
                .iter()
                .map(|(_, listener)| Arc::clone(listener))
                .collect(),
        };

        if listeners.is_empty() {
            return Err(ChannelError::unreachable(destination));
        }
        Ok((sender, listeners))
    }
}

#[async_trait]
impl RawChannel for MemoryChannel {
    async fn send(
        &self,
        envelope: Envelope,
        destination: Destination,
    ) -> Result<Reply, ChannelError> {
        let (sender, listeners) = self.route(destination)?;

        let (reply_tx, mut reply_rx) = mpsc::unbounded_channel::<Reply>();
        for listener in listeners {
            let reply_tx = reply_tx.clone();
            let responder = Responder::new(move |reply| {
                let _ = reply_tx.send(reply);
            });
            listener.on_message(envelope.clone(), sender.clone(), responder);
        }
        drop(reply_tx);

        reply_rx.recv().await.ok_or(ChannelError::NoResponse)
    }

    fn on_message(&self, listener: Arc<dyn RawListener>) -> ListenerId {
        let mut state = self.hub.state.lock();
        let id = ListenerId::new(state.next_listener);
        state.next_listener += 1;

        let endpoint = state.endpoints.entry(self.endpoint).or_default();
        endpoint.listeners.push((id, listener));
        endpoint.stats.attached += 1;
        id
    }

    fn off_message(&self, id: ListenerId) {
        let mut state = self.hub.state.lock();
        if let Some(endpoint) = state.endpoints.get_mut(&self.endpoint) {
            let before = endpoint.listeners.len();
            endpoint.listeners.retain(|(listener, _)| *listener != id);
            if endpoint.listeners.len() < before {
                endpoint.stats.detached += 1;
            }
        }
    }
}
