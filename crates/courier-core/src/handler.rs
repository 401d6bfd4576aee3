//! Handler variants
//!
//! A handler attempts to answer an envelope of a given type. Returning `None`
//! declines; returning `Some(future)` claims the envelope. The dispatch bus
//! only sees the [`Handler`] trait, so the three shapes here are
//! interchangeable:
//!
//! - [`SingleHandler`]: answers one fixed type
//! - [`MapHandler`]: dispatches by a type → callback table
//! - [`GeneralHandler`]: sees every envelope and decides for itself

use crate::context::SenderInfo;
use crate::envelope::Reply;
use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Pending answer produced by a handler that claimed an envelope
pub type HandlerFuture = BoxFuture<'static, Reply>;

/// Callback shape shared by [`SingleHandler`] and [`MapHandler`] entries
pub type TypedCallback = Arc<dyn Fn(Value, SenderInfo) -> HandlerFuture + Send + Sync>;

/// Callback shape of a [`GeneralHandler`]
pub type GeneralCallback =
    Arc<dyn Fn(&str, Value, SenderInfo) -> Option<HandlerFuture> + Send + Sync>;

/// Attempt to answer an envelope of a given type
pub trait Handler: Send + Sync {
    /// Run against one inbound envelope; `None` declines to answer
    fn run(&self, message_type: &str, data: &Value, sender: &SenderInfo) -> Option<HandlerFuture>;
}

/// Handler that answers exactly one message type
pub struct SingleHandler {
    message_type: String,
    callback: TypedCallback,
}

impl SingleHandler {
    /// Create a handler for `message_type`
    pub fn new<F>(message_type: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Value, SenderInfo) -> HandlerFuture + Send + Sync + 'static,
    {
        Self {
            message_type: message_type.into(),
            callback: Arc::new(callback),
        }
    }

    /// The type this handler answers
    pub fn message_type(&self) -> &str {
        &self.message_type
    }
}

impl Handler for SingleHandler {
    fn run(&self, message_type: &str, data: &Value, sender: &SenderInfo) -> Option<HandlerFuture> {
        if message_type != self.message_type {
            return None;
        }
        Some((self.callback)(data.clone(), sender.clone()))
    }
}

/// Handler backed by a type → callback table
#[derive(Default)]
pub struct MapHandler {
    callbacks: HashMap<String, TypedCallback>,
}

impl MapHandler {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry; a later entry for the same type replaces the earlier one
    pub fn on<F>(mut self, message_type: impl Into<String>, callback: F) -> Self
    where
        F: Fn(Value, SenderInfo) -> HandlerFuture + Send + Sync + 'static,
    {
        self.callbacks.insert(message_type.into(), Arc::new(callback));
        self
    }

    /// Types present in the table
    pub fn message_types(&self) -> impl Iterator<Item = &str> {
        self.callbacks.keys().map(String::as_str)
    }
}

impl Handler for MapHandler {
    fn run(&self, message_type: &str, data: &Value, sender: &SenderInfo) -> Option<HandlerFuture> {
        self.callbacks
            .get(message_type)
            .map(|callback| callback(data.clone(), sender.clone()))
    }
}

/// Handler invoked for every envelope
pub struct GeneralHandler {
    callback: GeneralCallback,
}

impl GeneralHandler {
    /// Create a catch-all handler
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&str, Value, SenderInfo) -> Option<HandlerFuture> + Send + Sync + 'static,
    {
        Self {
            callback: Arc::new(callback),
        }
    }
}

impl Handler for GeneralHandler {
    fn run(&self, message_type: &str, data: &Value, sender: &SenderInfo) -> Option<HandlerFuture> {
        (self.callback)(message_type, data.clone(), sender.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Endpoint;
    use futures::FutureExt;
    use serde_json::json;

    fn sender() -> SenderInfo {
        SenderInfo::new(Endpoint::background())
    }

    fn echo(data: Value, _sender: SenderInfo) -> HandlerFuture {
        async move { Ok(data) }.boxed()
    }

    #[tokio::test]
    async fn test_single_handler_matches_only_its_type() {
        let handler = SingleHandler::new("ping", echo);
        assert!(handler.run("pong", &json!(1), &sender()).is_none());

        let reply = handler.run("ping", &json!(1), &sender()).unwrap().await;
        assert_eq!(reply.unwrap(), json!(1));
    }

    #[tokio::test]
    async fn test_map_handler_dispatches_by_lookup() {
        let handler = MapHandler::new()
            .on("a", |_, _| async { Ok(json!("from a")) }.boxed())
            .on("b", |_, _| async { Ok(json!("from b")) }.boxed());

        assert!(handler.run("c", &Value::Null, &sender()).is_none());
        let reply = handler.run("b", &Value::Null, &sender()).unwrap().await;
        assert_eq!(reply.unwrap(), json!("from b"));
    }

    #[tokio::test]
    async fn test_general_handler_sees_type() {
        let handler = GeneralHandler::new(|message_type, _, _| {
            if message_type.starts_with("log.") {
                let message_type = message_type.to_string();
                Some(async move { Ok(json!(message_type)) }.boxed())
            } else {
                None
            }
        });

        assert!(handler.run("other", &Value::Null, &sender()).is_none());
        let reply = handler.run("log.info", &Value::Null, &sender()).unwrap().await;
        assert_eq!(reply.unwrap(), json!("log.info"));
    }

    #[test]
    fn test_variants_are_interchangeable() {
        let handlers: Vec<Arc<dyn Handler>> = vec![
            Arc::new(SingleHandler::new("x", echo)),
            Arc::new(MapHandler::new().on("x", echo)),
            Arc::new(GeneralHandler::new(|_, data, s| Some(echo(data, s)))),
        ];
        let answered = handlers
            .iter()
            .filter(|h| h.run("x", &Value::Null, &sender()).is_some())
            .count();
        assert_eq!(answered, 3);
    }
}
