//! # Courier Core - Layer 1: Protocol Types and Effect Traits
//!
//! Shared vocabulary for calling across isolated execution contexts over a
//! plain asynchronous message channel:
//!
//! - [`envelope`]: the wire unit `{id, type, data, timestamp}` and call payloads
//! - [`handler`]: the three interchangeable handler shapes
//! - [`registry`]: per-context named service registries
//! - [`service`]: how a local object exposes values and methods by path
//! - [`effects`]: the raw channel and auxiliary-host primitives Courier consumes
//! - [`config`]: serde/TOML configuration
//!
//! Higher layers (`courier-transport`, `courier-offscreen`) build the dispatch
//! bus, call proxy, service binder and auxiliary bridge on top of these types.

pub mod config;
pub mod context;
pub mod effects;
pub mod envelope;
pub mod errors;
pub mod handler;
pub mod registry;
pub mod service;

pub use config::CourierConfig;
pub use context::{ContextKind, Destination, Endpoint, SenderInfo};
pub use envelope::{CallData, Envelope, MessageId, Reply};
pub use errors::{ChannelError, CourierError, Result};
pub use handler::{GeneralHandler, Handler, HandlerFuture, MapHandler, SingleHandler};
pub use registry::Registry;
pub use service::{Args, CallContext, Member, Method, Service, ServiceObject};

/// Re-exported so downstream crates name payloads without a direct dependency
pub use serde_json::Value;
