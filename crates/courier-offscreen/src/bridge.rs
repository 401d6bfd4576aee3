//! Offscreen service bridge
//!
//! An [`OffscreenService`] is a service that lives in the auxiliary context.
//! It has two roles:
//!
//! - inside, running in the auxiliary context: [`OffscreenService::register_inside`]
//!   exposes the instance like any other service;
//! - outside, anywhere else: [`OffscreenService::proxy`] hands out a call
//!   proxy whose every call first makes sure a fresh auxiliary context for
//!   this service exists.
//!
//! The lifecycle before each outside call is: ask the host whether a
//! context exists, close it if so, then always create one with this
//! service's configuration, then send. A context left behind by another
//! service is therefore never reused. Two overlapping calls may interleave
//! these steps; nothing serializes them.

use crate::host::HostAccess;
use async_trait::async_trait;
use courier_core::effects::{localize_or_literal, AuxiliaryConfig, AuxiliaryHost, Localizer};
use courier_core::registry;
use courier_core::{
    CallData, ContextKind, CourierConfig, CourierError, Endpoint, Registry, Result, Service, Value,
};
use courier_transport::{BusTarget, CallProxy, CallTarget, DispatchBus, ProxyService, ServiceBinding};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A service hosted in the auxiliary context
#[derive(Clone)]
pub struct OffscreenService {
    service: ProxyService,
    config: AuxiliaryConfig,
    localizer: Arc<dyn Localizer>,
}

impl OffscreenService {
    /// Service `name` whose context is created with `config`
    pub fn new(name: impl Into<String>, config: AuxiliaryConfig) -> Self {
        Self::build(name.into(), config, &CourierConfig::default())
    }

    /// Service `name` taking both its message type prefix and its
    /// auxiliary configuration from `config`
    pub fn from_config(name: impl Into<String>, config: &CourierConfig) -> Self {
        Self::build(name.into(), config.auxiliary.clone(), config)
    }

    fn build(name: String, config: AuxiliaryConfig, courier: &CourierConfig) -> Self {
        Self {
            service: ProxyService::with_config(name, courier)
                .with_destination(Endpoint::auxiliary()),
            config,
            localizer: Arc::new(courier_core::effects::NoLocalization),
        }
    }

    /// Localize the justification through `localizer`
    pub fn with_localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    /// Registered name
    pub fn name(&self) -> &str {
        self.service.name()
    }

    /// Underlying service definition
    pub fn service(&self) -> &ProxyService {
        &self.service
    }

    /// Configuration handed to the host, justification localized
    pub fn context_config(&self) -> AuxiliaryConfig {
        AuxiliaryConfig {
            justification: localize_or_literal(self.localizer.as_ref(), &self.config.justification),
            ..self.config.clone()
        }
    }

    /// Expose the instance from inside the auxiliary context
    pub fn register_inside<S, F>(
        &self,
        current: ContextKind,
        bus: &DispatchBus,
        registry: &Arc<Registry>,
        factory: F,
    ) -> Result<ServiceBinding<S>>
    where
        S: Service,
        F: FnOnce() -> S,
    {
        ensure_inside(current, "register_inside")?;
        if registry.kind() != ContextKind::Auxiliary {
            return Err(CourierError::misuse(format!(
                "offscreen service {} must be registered in the auxiliary registry, not {}",
                self.name(),
                registry.kind()
            )));
        }
        self.service.register(bus, registry, factory)
    }

    /// The auxiliary context's process-wide registry
    pub fn local_registry(&self, current: ContextKind) -> Result<Arc<Registry>> {
        ensure_inside(current, "local_registry")?;
        Ok(registry::global(ContextKind::Auxiliary))
    }

    /// Outside proxy that recreates the auxiliary context before each call
    pub fn proxy(
        &self,
        current: ContextKind,
        bus: &DispatchBus,
        host: HostAccess,
    ) -> Result<CallProxy> {
        if current == ContextKind::Auxiliary {
            return Err(CourierError::misuse(format!(
                "offscreen service {} cannot be proxied from inside the auxiliary context",
                self.name()
            )));
        }
        host.check(current)?;

        let target = AuxiliaryTarget {
            service: self.name().to_string(),
            host: host.host(),
            config: self.context_config(),
            inner: self.service.target(bus),
        };
        Ok(CallProxy::new(Arc::new(target)))
    }
}

impl fmt::Debug for OffscreenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffscreenService")
            .field("service", &self.service)
            .field("config", &self.config)
            .finish()
    }
}

fn ensure_inside(current: ContextKind, operation: &str) -> Result<()> {
    if current == ContextKind::Auxiliary {
        Ok(())
    } else {
        Err(CourierError::misuse(format!(
            "{operation} is only available inside the auxiliary context, called from {current}"
        )))
    }
}

/// Call target running the close-then-create lifecycle before sending
struct AuxiliaryTarget {
    service: String,
    host: Arc<dyn AuxiliaryHost>,
    config: AuxiliaryConfig,
    inner: BusTarget,
}

#[async_trait]
impl CallTarget for AuxiliaryTarget {
    async fn invoke(&self, call: CallData) -> Result<Value> {
        if self.host.has_context().await? {
            debug!(service = %self.service, "Closing existing auxiliary context");
            self.host.close_context().await?;
        }
        debug!(service = %self.service, url = %self.config.url, "Creating auxiliary context");
        self.host.create_context(&self.config).await?;
        self.inner.invoke(call).await
    }

    fn describe(&self) -> String {
        format!("auxiliary {}", self.inner.describe())
    }
}
