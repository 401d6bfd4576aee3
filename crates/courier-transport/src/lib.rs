#![deny(clippy::await_holding_lock)]
//! # Courier Transport - Layer 2: Dispatch and Remote Calls
//!
//! Turns a raw, unpaired message channel into request/response calls between
//! contexts:
//!
//! - [`bus`]: per-context dispatch bus with the single-responder rule and a
//!   lazily attached channel listener
//! - [`proxy`]: client-side call proxies accumulating property paths
//! - [`binder`]: exposing a local object under a name and answering calls
//! - [`relay`]: forwarding envelopes between two channels
//! - [`memory`]: in-process raw channel for tests and simulation

pub mod binder;
pub mod bus;
pub mod memory;
pub mod proxy;
pub mod relay;

pub use binder::{ProxyService, ServiceBinding};
pub use bus::{DispatchBus, SendOptions, Subscription};
pub use memory::{ListenerStats, MemoryChannel, MemoryHub};
pub use proxy::{is_proxy, BusTarget, CallProxy, CallTarget};
pub use relay::RelayForwarder;
