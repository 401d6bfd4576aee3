//! Call proxy
//!
//! A [`CallProxy`] is the client-side stand-in for a remote service. Rust has
//! no transparent member interception, so the chain `proxy.obj.concat(a, b)`
//! is spelled
//!
//! ```rust,ignore
//! proxy.get("obj").get("concat").call_with(("Hello", "world")).await?
//! ```
//!
//! [`CallProxy::get`] only extends the path; it never touches the channel.
//! Only [`CallProxy::call`] (and its typed variants) or the explicit
//! [`CallProxy::fetch`] cross it. There is no retry: a failed send fails the
//! call.
//!
//! Where the call goes is decided by a [`CallTarget`]. The default
//! [`BusTarget`] sends straight through a dispatch bus; other layers wrap it
//! with work that must happen before every call.

use crate::bus::{DispatchBus, SendOptions};
use async_trait::async_trait;
use courier_core::{CallData, CourierError, Destination, Result, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Where a proxy's calls are delivered
#[async_trait]
pub trait CallTarget: Send + Sync {
    /// Deliver one call and wait for its result
    async fn invoke(&self, call: CallData) -> Result<Value>;

    /// Short description for logs and debug output
    fn describe(&self) -> String;
}

/// Target that sends calls through a dispatch bus under a fixed message type
#[derive(Debug, Clone)]
pub struct BusTarget {
    bus: DispatchBus,
    message_type: String,
    destination: Destination,
}

impl BusTarget {
    /// Create a target for `message_type` at `destination`
    pub fn new(bus: DispatchBus, message_type: impl Into<String>, destination: Destination) -> Self {
        Self {
            bus,
            message_type: message_type.into(),
            destination,
        }
    }

    /// Message type calls are sent under
    pub fn message_type(&self) -> &str {
        &self.message_type
    }
}

#[async_trait]
impl CallTarget for BusTarget {
    async fn invoke(&self, call: CallData) -> Result<Value> {
        let data = call.to_value()?;
        self.bus
            .send(&self.message_type, data, SendOptions::to(self.destination))
            .await
    }

    fn describe(&self) -> String {
        format!("{} @ {}", self.message_type, self.destination)
    }
}

/// Client-side proxy accumulating a property path
#[derive(Clone)]
pub struct CallProxy {
    target: Arc<dyn CallTarget>,
    path: Option<String>,
}

impl CallProxy {
    /// Proxy for the root of a target
    pub fn new(target: Arc<dyn CallTarget>) -> Self {
        Self { target, path: None }
    }

    /// Proxy one property deeper; purely local
    pub fn get(&self, property: &str) -> CallProxy {
        let path = match &self.path {
            Some(parent) => format!("{parent}.{property}"),
            None => property.to_string(),
        };
        CallProxy {
            target: Arc::clone(&self.target),
            path: Some(path),
        }
    }

    /// Dotted path of this proxy, `None` at the root
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Invoke the member at this path with raw arguments
    pub async fn call(&self, args: Vec<Value>) -> Result<Value> {
        tracing::trace!(call_target = %self.target.describe(), path = ?self.path, "Proxy call");
        self.target
            .invoke(CallData::new(self.path.clone(), args))
            .await
    }

    /// Invoke with arguments given as one serializable value
    ///
    /// Tuples and sequences are spread into positional arguments, `()` means
    /// no arguments and any other value becomes the single argument. Wrap a
    /// lone sequence argument in a one-element tuple to keep it whole.
    pub async fn call_with<A: Serialize>(&self, args: A) -> Result<Value> {
        let args = match serde_json::to_value(args)? {
            Value::Array(values) => values,
            Value::Null => Vec::new(),
            single => vec![single],
        };
        self.call(args).await
    }

    /// Invoke and deserialize the result
    pub async fn call_as<T: DeserializeOwned>(&self, args: Vec<Value>) -> Result<T> {
        let value = self.call(args).await?;
        serde_json::from_value(value).map_err(|e| {
            CourierError::serialization(format!("unexpected result shape: {e}"))
        })
    }

    /// Read the value at this path without arguments
    pub async fn fetch(&self) -> Result<Value> {
        self.call(Vec::new()).await
    }
}

impl fmt::Debug for CallProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallProxy")
            .field("target", &self.target.describe())
            .field("path", &self.path)
            .finish()
    }
}

/// Whether a value is a call proxy, decided without any remote call
pub fn is_proxy(value: &dyn Any) -> bool {
    value.is::<CallProxy>()
}
