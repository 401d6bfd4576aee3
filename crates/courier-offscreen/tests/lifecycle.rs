//! Auxiliary context lifecycle around real calls
//!
//! The memory host's launcher plays the part of the hidden document: on
//! create it connects an auxiliary context to the hub and registers the
//! service named by the document URL; on close it disconnects it again.

use assert_matches::assert_matches;
use courier_core::effects::{AuxiliaryConfig, AuxiliaryHost, StaticCatalog};
use courier_core::{ContextKind, CourierError, Endpoint, ServiceObject};
use courier_offscreen::{
    serve_auxiliary_host, HostAccess, HostEvent, MemoryAuxiliaryHost, OffscreenService,
};
use courier_testkit::{introspection_service, math_service, TestContext, TestContexts};
use courier_transport::MemoryHub;
use parking_lot::Mutex;
use serde_json::json;
use std::sync::Arc;

fn document(name: &str) -> AuxiliaryConfig {
    AuxiliaryConfig {
        url: format!("{name}.html"),
        ..AuxiliaryConfig::default()
    }
}

fn launching_host(hub: &MemoryHub) -> Arc<MemoryAuxiliaryHost> {
    let live: Arc<Mutex<Option<TestContext>>> = Arc::new(Mutex::new(None));
    let launch_hub = hub.clone();
    let launch_live = Arc::clone(&live);
    let teardown_hub = hub.clone();

    let host = MemoryAuxiliaryHost::new()
        .with_launcher(move |config| {
            let name = config.url.trim_end_matches(".html");
            let factory: fn() -> ServiceObject = match name {
                "math" => math_service,
                "introspect" => introspection_service,
                other => return Err(CourierError::host(format!("no document for {other}"))),
            };
            let ctx = TestContext::connect(&launch_hub, Endpoint::auxiliary());
            OffscreenService::new(name, config.clone()).register_inside(
                ContextKind::Auxiliary,
                &ctx.bus,
                &ctx.registry,
                factory,
            )?;
            *launch_live.lock() = Some(ctx);
            Ok(())
        })
        .with_teardown(move || {
            teardown_hub.disconnect(Endpoint::auxiliary());
            live.lock().take();
        });
    Arc::new(host)
}

#[tokio::test]
async fn test_every_call_recreates_the_context() {
    let ctx = TestContexts::new();
    let host = launching_host(&ctx.hub);
    let math = OffscreenService::new("math", document("math"));
    let proxy = math
        .proxy(
            ContextKind::Background,
            &ctx.background.bus,
            HostAccess::Direct(host.clone()),
        )
        .unwrap();

    assert_eq!(proxy.get("sum").call_with((2, 3)).await.unwrap(), json!(5));
    assert_eq!(host.events(), vec![HostEvent::Created(document("math"))]);

    assert_eq!(proxy.get("one").fetch().await.unwrap(), json!(1));
    assert_eq!(
        host.events(),
        vec![
            HostEvent::Created(document("math")),
            HostEvent::Closed,
            HostEvent::Created(document("math")),
        ]
    );
    assert_eq!((host.create_count(), host.close_count()), (2, 1));
}

#[tokio::test]
async fn test_switching_services_replaces_the_context() {
    let ctx = TestContexts::new();
    let host = launching_host(&ctx.hub);
    let access = HostAccess::Direct(host.clone());
    let math = OffscreenService::new("math", document("math"))
        .proxy(ContextKind::Background, &ctx.background.bus, access.clone())
        .unwrap();
    let introspect = OffscreenService::new("introspect", document("introspect"))
        .proxy(ContextKind::Background, &ctx.background.bus, access)
        .unwrap();

    math.get("one").fetch().await.unwrap();
    let seen = introspect.get("whoami").fetch().await.unwrap();

    assert_eq!(seen["service"], "introspect");
    assert_eq!(
        seen["endpoint"],
        serde_json::to_value(Endpoint::background()).unwrap()
    );
    assert_eq!(host.current(), Some(document("introspect")));
    assert_eq!(host.close_count(), 1);
}

#[tokio::test]
async fn test_view_reaches_host_through_background() {
    let ctx = TestContexts::new();
    let host = launching_host(&ctx.hub);
    let _served =
        serve_auxiliary_host(&ctx.background.bus, &ctx.background.registry, host.clone()).unwrap();

    let access = HostAccess::select(ContextKind::View, None, &ctx.view.bus).unwrap();
    assert_matches!(access, HostAccess::Remote(_));
    let introspect = OffscreenService::new("introspect", document("introspect"))
        .proxy(ContextKind::View, &ctx.view.bus, access)
        .unwrap();

    let seen = introspect.get("whoami").fetch().await.unwrap();
    assert_eq!(seen["endpoint"], serde_json::to_value(ctx.view.endpoint).unwrap());

    introspect.get("whoami").fetch().await.unwrap();
    assert_eq!((host.create_count(), host.close_count()), (2, 1));
}

#[tokio::test]
async fn test_failed_create_sends_nothing() {
    let ctx = TestContexts::new();
    let host = launching_host(&ctx.hub);
    let proxy = OffscreenService::new("missing", document("missing"))
        .proxy(
            ContextKind::Background,
            &ctx.background.bus,
            HostAccess::Direct(host.clone()),
        )
        .unwrap();

    let err = proxy.get("anything").fetch().await.unwrap_err();
    assert_matches!(err, CourierError::Host { .. });
    assert!(host.events().is_empty());
    assert!(!ctx.hub.is_connected(Endpoint::auxiliary()));
}

#[tokio::test]
async fn test_created_context_carries_localized_justification() {
    let ctx = TestContexts::new();
    let host = launching_host(&ctx.hub);
    let math = OffscreenService::new("math", document("math")).with_localizer(Arc::new(
        StaticCatalog::new().with("auxiliary_justification", "Runs page parsing"),
    ));

    math.proxy(
        ContextKind::Background,
        &ctx.background.bus,
        HostAccess::Direct(host.clone()),
    )
    .unwrap()
    .get("one")
    .fetch()
    .await
    .unwrap();

    let created = host.current().unwrap();
    assert_eq!(created.justification, "Runs page parsing");
    assert_eq!(created.url, "math.html");
}

#[tokio::test]
async fn test_host_selection_rules() {
    let ctx = TestContexts::new();
    let platform: Arc<dyn AuxiliaryHost> = Arc::new(MemoryAuxiliaryHost::new());

    assert_matches!(
        HostAccess::select(ContextKind::Background, None, &ctx.background.bus),
        Err(CourierError::Misuse { .. })
    );
    assert_matches!(
        HostAccess::select(
            ContextKind::Background,
            Some(Arc::clone(&platform)),
            &ctx.background.bus
        ),
        Ok(HostAccess::Direct(_))
    );
    assert_matches!(
        HostAccess::select(ContextKind::Content, Some(platform.clone()), &ctx.content.bus),
        Ok(HostAccess::Remote(_))
    );
    assert_matches!(
        serve_auxiliary_host(&ctx.view.bus, &ctx.view.registry, platform),
        Err(CourierError::Misuse { .. })
    );
}
