//! End-to-end calls between in-process contexts
//!
//! Every test wires real dispatch buses to a shared memory hub and goes
//! through the full proxy → envelope → binder → reply path.

use assert_matches::assert_matches;
use courier_core::{
    Args, CallContext, ChannelError, ContextKind, CourierError, Destination, Endpoint,
    ServiceObject, SingleHandler, Value,
};
use courier_testkit::{
    introspection_service, math_service, LogCapture, TestContext, TestContexts,
};
use courier_transport::{is_proxy, ProxyService, SendOptions};
use futures::FutureExt;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tracing::Level;

#[tokio::test]
async fn test_sum_round_trip() {
    let ctx = TestContexts::new();
    let math = ProxyService::new("math");
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    let proxy = math.proxy(&ctx.view.bus);
    assert_eq!(proxy.get("sum").call_with((2, 3)).await.unwrap(), json!(5));
    assert_eq!(proxy.get("one").call(vec![]).await.unwrap(), json!(1));
}

#[tokio::test]
async fn test_nested_path_resolution() {
    let ctx = TestContexts::new();
    let math = ProxyService::new("math");
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    let concat = math.proxy(&ctx.content.bus).get("obj").get("concat");
    assert!(is_proxy(&concat));
    let joined: String = concat
        .call_as(vec![json!("Hello"), json!("world")])
        .await
        .unwrap();
    assert_eq!(joined, "Hello world");
}

#[tokio::test]
async fn test_registration_uniqueness_across_services() {
    let ctx = TestContexts::new();
    let first = ProxyService::new("math");
    let binding = first
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    let err = ProxyService::new("math")
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap_err();
    assert_matches!(err, CourierError::NameCollision { name } if name == "math");

    binding.destroy();
    first
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();
}

#[tokio::test]
async fn test_handler_error_reaches_caller() {
    let ctx = TestContexts::new();
    let svc = ProxyService::new("introspect");
    let _binding = svc
        .register(
            &ctx.background.bus,
            &ctx.background.registry,
            introspection_service,
        )
        .unwrap();

    let err = svc
        .proxy(&ctx.view.bus)
        .get("fail")
        .call_with("disk full")
        .await
        .unwrap_err();
    assert_eq!(err, CourierError::handler("disk full"));

    let err = svc.proxy(&ctx.view.bus).get("fail").fetch().await.unwrap_err();
    assert_matches!(err, CourierError::InvalidCall { .. });
}

#[tokio::test]
async fn test_sender_metadata_is_call_scoped() {
    let ctx = TestContexts::new();
    let svc = ProxyService::new("introspect");
    let _binding = svc
        .register(
            &ctx.background.bus,
            &ctx.background.registry,
            introspection_service,
        )
        .unwrap();

    let seen = svc
        .proxy(&ctx.content.bus)
        .get("whoami")
        .fetch()
        .await
        .unwrap();
    assert_eq!(seen["service"], "introspect");
    assert_eq!(seen["path"], "whoami");
    assert_eq!(
        seen["endpoint"],
        serde_json::to_value(ctx.content.endpoint).unwrap()
    );

    // Nothing about the caller is left on the instance once the call settled
    let root = svc.proxy(&ctx.view.bus).fetch().await.unwrap();
    assert_eq!(root, json!({}));
}

#[tokio::test]
async fn test_overlapping_calls_keep_their_own_sender() {
    let ctx = TestContexts::new();
    let svc = ProxyService::new("slow");
    let _binding = svc
        .register(&ctx.background.bus, &ctx.background.registry, || {
            ServiceObject::builder()
                .method("echo_sender", |ctx: CallContext, args: Args| async move {
                    let delay_ms: u64 = args.get(0)?;
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    Ok::<_, CourierError>(json!(ctx.sender.endpoint.to_string()))
                })
                .build()
        })
        .unwrap();

    let from_view = svc.proxy(&ctx.view.bus).get("echo_sender");
    let from_content = svc.proxy(&ctx.content.bus).get("echo_sender");
    let (slow, fast) = tokio::join!(from_view.call_with(30u64), from_content.call_with(0u64));

    assert_eq!(slow.unwrap(), json!("view"));
    assert_eq!(fast.unwrap(), json!("content#1"));
}

#[tokio::test]
async fn test_two_answering_handlers_deliver_nothing() {
    let ctx = TestContexts::new();
    let math = ProxyService::new("math");
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();
    let _rogue = ctx.background.bus.watch(Arc::new(SingleHandler::new(
        math.message_type(),
        |_, _| async { Ok(json!("rogue")) }.boxed(),
    )));

    let err = math
        .proxy(&ctx.view.bus)
        .get("sum")
        .call_with((1, 1))
        .await
        .unwrap_err();
    assert_eq!(err, CourierError::Channel(ChannelError::NoResponse));
}

#[tokio::test]
async fn test_two_answering_handlers_log_one_violation() {
    let logs = LogCapture::new();
    let _guard = logs.install();
    let ctx = TestContexts::new();
    let math = ProxyService::new("math");
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();
    let _rogue = ctx.background.bus.watch(Arc::new(SingleHandler::new(
        math.message_type(),
        |_, _| async { Ok(json!("rogue")) }.boxed(),
    )));

    let _ = math.proxy(&ctx.view.bus).get("one").fetch().await;

    let violations: Vec<String> = logs
        .lines_at(Level::ERROR)
        .into_iter()
        .filter(|line| line.contains("Multiple responders"))
        .collect();
    assert_eq!(violations.len(), 1, "{}", logs.contents());
    assert!(violations[0].contains("proxy-service.math"));
}

#[tokio::test]
async fn test_only_calls_cross_the_channel() {
    let ctx = TestContexts::new();
    let (popup, recorder) =
        TestContext::connect_recording(&ctx.hub, Endpoint::instance(ContextKind::View, 2));
    let math = ProxyService::new("math").with_destination(Endpoint::background());
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    let concat = math.proxy(&popup.bus).get("obj").get("concat");
    assert_eq!(recorder.sent_count(), 0);

    concat.call_with(("a", "b")).await.unwrap();
    concat.call_with(("c", "d")).await.unwrap();

    let sent = recorder.sent();
    assert_eq!(sent.len(), 2);
    assert_ne!(sent[0].id, sent[1].id);
    for envelope in &sent {
        assert_eq!(envelope.message_type, "proxy-service.math");
        assert_eq!(envelope.destination, Destination::Endpoint(Endpoint::background()));
    }
}

#[tokio::test]
async fn test_listener_follows_handler_count() {
    let ctx = TestContexts::new();
    let endpoint = ctx.background.endpoint;

    let bindings: Vec<_> = ["a", "b", "c"]
        .into_iter()
        .map(|name| {
            ProxyService::new(name)
                .register(&ctx.background.bus, &ctx.background.registry, || {
                    json!({"name": name})
                })
                .unwrap()
        })
        .collect();
    assert_eq!(ctx.hub.listener_count(endpoint), 1);

    for binding in bindings {
        binding.destroy();
    }
    let stats = ctx.hub.listener_stats(endpoint);
    assert_eq!((stats.attached, stats.detached), (1, 1));
    assert_eq!(ctx.hub.listener_count(endpoint), 0);
}

#[tokio::test]
async fn test_gone_destination_rejects_call() {
    let ctx = TestContexts::new();
    let math = ProxyService::new("math").with_destination(Endpoint::background());
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    ctx.hub.disconnect(Endpoint::background());
    let err = math
        .proxy(&ctx.view.bus)
        .get("one")
        .fetch()
        .await
        .unwrap_err();
    assert_eq!(
        err,
        CourierError::Channel(ChannelError::unreachable(Endpoint::background()))
    );
}

#[tokio::test]
async fn test_unanswered_type_is_not_routed() {
    let ctx = TestContexts::new();
    let _binding = ProxyService::new("math")
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    let err = ctx
        .view
        .bus
        .send("proxy-service.unknown", Value::Null, SendOptions::broadcast())
        .await
        .unwrap_err();
    assert!(err.is_channel_failure());
}

/// Hand-written typed stub over the generic proxy
struct MathClient {
    proxy: courier_transport::CallProxy,
}

#[derive(Debug, Deserialize, PartialEq)]
struct Snapshot {
    one: i64,
}

impl MathClient {
    async fn sum(&self, a: i64, b: i64) -> courier_core::Result<i64> {
        self.proxy.get("sum").call_as(vec![json!(a), json!(b)]).await
    }

    async fn snapshot(&self) -> courier_core::Result<Snapshot> {
        self.proxy.call_as(vec![]).await
    }
}

#[tokio::test]
async fn test_typed_client_stub() {
    let ctx = TestContexts::new();
    let math = ProxyService::new("math");
    let _binding = math
        .register(&ctx.background.bus, &ctx.background.registry, math_service)
        .unwrap();

    let client = MathClient {
        proxy: math.proxy(&ctx.view.bus),
    };
    assert_eq!(client.sum(40, 2).await.unwrap(), 42);
    assert_eq!(client.snapshot().await.unwrap(), Snapshot { one: 1 });
}
