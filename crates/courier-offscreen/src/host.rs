//! Reaching the auxiliary host from any context
//!
//! Only the background context may drive the platform's hidden-document
//! primitives. Everyone else goes through [`RemoteAuxiliaryHost`], a thin
//! [`AuxiliaryHost`] over a call proxy to the host service the background
//! exposes with [`serve_auxiliary_host`].

use async_trait::async_trait;
use courier_core::effects::{AuxiliaryConfig, AuxiliaryHost};
use courier_core::{
    ContextKind, CourierConfig, CourierError, Endpoint, Registry, Result, ServiceObject,
};
use courier_transport::{CallProxy, DispatchBus, ProxyService, ServiceBinding};
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Name the background registers its host service under
pub const AUXILIARY_HOST_SERVICE: &str = "auxiliary-host";

/// How a context reaches the auxiliary host
#[derive(Clone)]
pub enum HostAccess {
    /// The platform host itself; only valid in a privileged context
    Direct(Arc<dyn AuxiliaryHost>),
    /// Calls forwarded to the background's host service
    Remote(Arc<RemoteAuxiliaryHost>),
}

impl HostAccess {
    /// Pick the access path for `current`
    ///
    /// A privileged context must supply the platform host; any other context
    /// gets a remote host over `bus`, and a supplied `platform` is ignored.
    pub fn select(
        current: ContextKind,
        platform: Option<Arc<dyn AuxiliaryHost>>,
        bus: &DispatchBus,
    ) -> Result<Self> {
        if current.can_host_auxiliary() {
            return platform.map(HostAccess::Direct).ok_or_else(|| {
                CourierError::misuse(format!(
                    "{current} context must drive the platform auxiliary host directly"
                ))
            });
        }
        Ok(HostAccess::Remote(Arc::new(RemoteAuxiliaryHost::new(bus))))
    }

    /// The host behind this access path
    pub fn host(&self) -> Arc<dyn AuxiliaryHost> {
        match self {
            HostAccess::Direct(host) => Arc::clone(host),
            HostAccess::Remote(remote) => Arc::clone(remote) as Arc<dyn AuxiliaryHost>,
        }
    }

    /// Check that `current` may use this access path
    pub(crate) fn check(&self, current: ContextKind) -> Result<()> {
        match self {
            HostAccess::Direct(_) if !current.can_host_auxiliary() => Err(CourierError::misuse(
                format!("{current} context cannot drive the auxiliary host directly"),
            )),
            _ => Ok(()),
        }
    }
}

impl fmt::Debug for HostAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostAccess::Direct(_) => f.write_str("HostAccess::Direct"),
            HostAccess::Remote(remote) => f.debug_tuple("HostAccess::Remote").field(remote).finish(),
        }
    }
}

/// [`AuxiliaryHost`] forwarding to the background's host service
#[derive(Debug, Clone)]
pub struct RemoteAuxiliaryHost {
    proxy: CallProxy,
}

impl RemoteAuxiliaryHost {
    /// Remote host using the default configuration
    pub fn new(bus: &DispatchBus) -> Self {
        Self::with_config(bus, &CourierConfig::default())
    }

    /// Remote host whose service type follows `config`
    pub fn with_config(bus: &DispatchBus, config: &CourierConfig) -> Self {
        let service = host_service(config);
        Self {
            proxy: service.proxy(bus),
        }
    }
}

#[async_trait]
impl AuxiliaryHost for RemoteAuxiliaryHost {
    async fn has_context(&self) -> Result<bool> {
        self.proxy.get("has_context").call_as(Vec::new()).await
    }

    async fn create_context(&self, config: &AuxiliaryConfig) -> Result<()> {
        self.proxy
            .get("create_context")
            .call(vec![serde_json::to_value(config)?])
            .await?;
        Ok(())
    }

    async fn close_context(&self) -> Result<()> {
        self.proxy.get("close_context").fetch().await?;
        Ok(())
    }
}

fn host_service(config: &CourierConfig) -> ProxyService {
    ProxyService::with_config(AUXILIARY_HOST_SERVICE, config).with_destination(Endpoint::background())
}

/// Service object exposing `host` as `has_context`, `create_context(config)`
/// and `close_context`
pub fn auxiliary_host_service(host: Arc<dyn AuxiliaryHost>) -> ServiceObject {
    let has = Arc::clone(&host);
    let create = Arc::clone(&host);
    let close = host;

    ServiceObject::builder()
        .method("has_context", move |_, _| {
            let host = Arc::clone(&has);
            async move { Ok::<_, CourierError>(json!(host.has_context().await?)) }
        })
        .method("create_context", move |ctx, args| {
            let host = Arc::clone(&create);
            async move {
                let config: AuxiliaryConfig = args.get(0)?;
                debug!(from = %ctx.sender.endpoint, url = %config.url, "Remote auxiliary create");
                host.create_context(&config).await?;
                Ok::<_, CourierError>(json!(null))
            }
        })
        .method("close_context", move |ctx, _| {
            let host = Arc::clone(&close);
            async move {
                debug!(from = %ctx.sender.endpoint, "Remote auxiliary close");
                host.close_context().await?;
                Ok::<_, CourierError>(json!(null))
            }
        })
        .build()
}

/// Expose the platform host to non-privileged contexts
///
/// Must be called in the background context, on its bus and registry.
pub fn serve_auxiliary_host(
    bus: &DispatchBus,
    registry: &Arc<Registry>,
    host: Arc<dyn AuxiliaryHost>,
) -> Result<ServiceBinding<ServiceObject>> {
    serve_auxiliary_host_with_config(bus, registry, host, &CourierConfig::default())
}

/// [`serve_auxiliary_host`] with an explicit configuration
pub fn serve_auxiliary_host_with_config(
    bus: &DispatchBus,
    registry: &Arc<Registry>,
    host: Arc<dyn AuxiliaryHost>,
    config: &CourierConfig,
) -> Result<ServiceBinding<ServiceObject>> {
    if !registry.kind().can_host_auxiliary() {
        return Err(CourierError::misuse(format!(
            "auxiliary host service cannot be served from the {} context",
            registry.kind()
        )));
    }
    host_service(config).register(bus, registry, || auxiliary_host_service(host))
}
