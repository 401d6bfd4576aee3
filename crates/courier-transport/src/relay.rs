//! Relay forwarding
//!
//! A relay context sits between two channels it can both reach, for example
//! a content script between an embedded page and the background. Envelopes
//! whose type starts with a configured prefix are re-sent upstream unchanged
//! and the upstream reply is handed back to the original caller.

use crate::bus::{DispatchBus, SendOptions, Subscription};
use courier_core::{Destination, GeneralHandler};
use futures::FutureExt;
use std::sync::Arc;
use tracing::debug;

/// Installs forwarding handlers on a relay context's downstream bus
pub struct RelayForwarder;

impl RelayForwarder {
    /// Forward every envelope with a type starting with `prefix` from
    /// `downstream` to `upstream`, delivered at `destination`
    ///
    /// Channel failures upstream reach the original caller as its reply.
    pub fn install(
        downstream: &DispatchBus,
        upstream: DispatchBus,
        prefix: impl Into<String>,
        destination: Destination,
    ) -> Subscription {
        let prefix = prefix.into();
        let handler = GeneralHandler::new(move |message_type, data, sender| {
            if !message_type.starts_with(prefix.as_str()) {
                return None;
            }
            debug!(
                message_type,
                from = %sender.endpoint,
                to = %destination,
                "Relaying envelope"
            );
            let upstream = upstream.clone();
            let message_type = message_type.to_string();
            Some(
                async move {
                    upstream
                        .send(&message_type, data, SendOptions::to(destination))
                        .await
                }
                .boxed(),
            )
        });
        downstream.watch(Arc::new(handler))
    }
}
