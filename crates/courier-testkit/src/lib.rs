//! Test utilities for Courier
//!
//! Standard fixtures used across the workspace's integration tests:
//!
//! - a tracing subscriber that tolerates repeated initialization, and
//!   [`LogCapture`] for asserting on what was logged;
//! - in-process contexts wired to one hub;
//! - [`RecordingChannel`], a raw channel wrapper logging sent envelopes;
//! - the sample services the behaviour tests call into.

pub mod logs;
pub mod recording;

pub use logs::LogCapture;
pub use recording::{RecordingChannel, SentEnvelope};

use courier_core::{
    Args, CallContext, ContextKind, CourierError, Endpoint, Registry, ServiceObject, Value,
};
use courier_transport::{DispatchBus, MemoryHub};
use serde_json::json;
use std::sync::Arc;

/// Install a test tracing subscriber honoring `RUST_LOG`
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// One in-process context: its bus and its own registry
#[derive(Debug, Clone)]
pub struct TestContext {
    /// Address on the hub
    pub endpoint: Endpoint,
    /// Dispatch bus over the hub channel
    pub bus: DispatchBus,
    /// Registry owned by this context
    pub registry: Arc<Registry>,
}

impl TestContext {
    /// Connect a context to `hub`
    pub fn connect(hub: &MemoryHub, endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            bus: DispatchBus::new(Arc::new(hub.connect(endpoint))),
            registry: Arc::new(Registry::new(endpoint.kind)),
        }
    }

    /// Connect a context whose outbound envelopes are recorded
    pub fn connect_recording(hub: &MemoryHub, endpoint: Endpoint) -> (Self, RecordingChannel) {
        let recorder = RecordingChannel::new(Arc::new(hub.connect(endpoint)));
        let ctx = Self {
            endpoint,
            bus: DispatchBus::new(Arc::new(recorder.clone())),
            registry: Arc::new(Registry::new(endpoint.kind)),
        };
        (ctx, recorder)
    }
}

/// A hub with a background, a view and one content page connected
#[derive(Debug, Clone)]
pub struct TestContexts {
    /// Shared router
    pub hub: MemoryHub,
    /// Background context
    pub background: TestContext,
    /// Popup/view context
    pub view: TestContext,
    /// Content page in tab 1
    pub content: TestContext,
}

impl TestContexts {
    /// Wire up the standard contexts
    pub fn new() -> Self {
        init_tracing();
        let hub = MemoryHub::new();
        Self {
            background: TestContext::connect(&hub, Endpoint::background()),
            view: TestContext::connect(&hub, Endpoint::singleton(ContextKind::View)),
            content: TestContext::connect(&hub, Endpoint::instance(ContextKind::Content, 1)),
            hub,
        }
    }
}

impl Default for TestContexts {
    fn default() -> Self {
        Self::new()
    }
}

/// `{ sum(a, b), one: 1, obj: { concat(a, b) } }`
pub fn math_service() -> ServiceObject {
    ServiceObject::builder()
        .method("sum", |_ctx: CallContext, args: Args| async move {
            let a: i64 = args.get(0)?;
            let b: i64 = args.get(1)?;
            Ok::<_, CourierError>(json!(a + b))
        })
        .value("one", 1)
        .object(
            "obj",
            ServiceObject::builder()
                .method("concat", |_ctx: CallContext, args: Args| async move {
                    let a: String = args.get(0)?;
                    let b: String = args.get(1)?;
                    Ok::<_, CourierError>(json!(format!("{a} {b}")))
                })
                .build(),
        )
        .build()
}

/// Service whose `whoami` method reports the caller's sender info
pub fn introspection_service() -> ServiceObject {
    ServiceObject::builder()
        .method("whoami", |ctx: CallContext, _args: Args| async move {
            Ok::<_, CourierError>(json!({
                "service": ctx.service,
                "path": ctx.path,
                "endpoint": ctx.sender.endpoint,
                "url": ctx.sender.url,
            }))
        })
        .method("fail", |_ctx: CallContext, args: Args| async move {
            let reason: String = args.get(0)?;
            Err::<Value, _>(CourierError::handler(reason))
        })
        .build()
}
