//! Service binder
//!
//! [`ProxyService`] names a service and pairs its two sides:
//!
//! - `register` (owning context): builds the instance, adds it to the
//!   context's registry and installs exactly one handler for the service's
//!   reserved message type;
//! - `proxy` (calling context): returns a [`CallProxy`] that sends to that
//!   message type.
//!
//! The handler only claims a call while the registry still maps the name to
//! its own instance. Once the entry is removed, or replaced by a newer
//! registration, the old handler declines and cannot collide with the new
//! one.
//!
//! On each inbound call the handler resolves the dotted path against the
//! instance. Nothing there is [`CourierError::PropertyNotFound`]; a method is
//! invoked with the call's arguments; a plain value is returned as-is.
//!
//! The caller's sender info reaches methods as part of the explicit
//! [`CallContext`] argument rather than through state on the instance.

use crate::bus::{DispatchBus, Subscription};
use crate::proxy::{BusTarget, CallProxy};
use courier_core::{
    Args, CallContext, CallData, CourierConfig, CourierError, Destination, Handler, HandlerFuture,
    Member, Registry, Result, SenderInfo, Service, Value,
};
use futures::FutureExt;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A named service definition shared by the owning and calling contexts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyService {
    name: String,
    message_type: String,
    destination: Destination,
}

impl ProxyService {
    /// Define a service with the default configuration
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, &CourierConfig::default())
    }

    /// Define a service using `config` to derive its message type
    pub fn with_config(name: impl Into<String>, config: &CourierConfig) -> Self {
        let name = name.into();
        Self {
            message_type: config.service_message_type(&name),
            name,
            destination: Destination::Broadcast,
        }
    }

    /// Address calls to a specific context instead of broadcasting
    pub fn with_destination(mut self, destination: impl Into<Destination>) -> Self {
        self.destination = destination.into();
        self
    }

    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Reserved message type
    pub fn message_type(&self) -> &str {
        &self.message_type
    }

    /// Where proxies send calls
    pub fn destination(&self) -> Destination {
        self.destination
    }

    /// Build the instance with `factory` and expose it
    pub fn register<S, F>(
        &self,
        bus: &DispatchBus,
        registry: &Arc<Registry>,
        factory: F,
    ) -> Result<ServiceBinding<S>>
    where
        S: Service,
        F: FnOnce() -> S,
    {
        self.bind(bus, registry, Arc::new(factory()))
    }

    /// Expose an existing instance
    ///
    /// Fails with [`CourierError::NameCollision`] if the registry already
    /// holds the name; no handler is installed in that case.
    pub fn bind<S: Service>(
        &self,
        bus: &DispatchBus,
        registry: &Arc<Registry>,
        instance: Arc<S>,
    ) -> Result<ServiceBinding<S>> {
        let erased: Arc<dyn Service> = instance.clone();
        registry.add(self.name.clone(), Arc::clone(&erased))?;

        let handler = ServiceHandler {
            name: self.name.clone(),
            message_type: self.message_type.clone(),
            instance: Arc::clone(&erased),
            registry: Arc::clone(registry),
        };
        let subscription = bus.watch(Arc::new(handler));
        debug!(service = %self.name, message_type = %self.message_type, "Service registered");

        Ok(ServiceBinding {
            name: self.name.clone(),
            instance,
            erased,
            registry: Arc::clone(registry),
            subscription,
        })
    }

    /// Client-side proxy for this service
    pub fn proxy(&self, bus: &DispatchBus) -> CallProxy {
        CallProxy::new(Arc::new(self.target(bus)))
    }

    /// Bus target this service's proxies send through
    pub fn target(&self, bus: &DispatchBus) -> BusTarget {
        BusTarget::new(bus.clone(), self.message_type.clone(), self.destination)
    }
}

/// Answers one service's message type while its registry entry is live
struct ServiceHandler {
    name: String,
    message_type: String,
    instance: Arc<dyn Service>,
    registry: Arc<Registry>,
}

impl Handler for ServiceHandler {
    fn run(&self, message_type: &str, data: &Value, sender: &SenderInfo) -> Option<HandlerFuture> {
        if message_type != self.message_type {
            return None;
        }
        if !self.registry.holds(&self.name, &self.instance) {
            debug!(service = %self.name, "Registry entry gone, declining call");
            return None;
        }
        Some(answer_call(
            self.name.clone(),
            Arc::clone(&self.instance),
            data.clone(),
            sender.clone(),
        ))
    }
}

fn answer_call(
    service: String,
    instance: Arc<dyn Service>,
    data: Value,
    sender: SenderInfo,
) -> HandlerFuture {
    async move {
        let call = CallData::from_value(data)?;
        let member = {
            let segments = call.segments();
            instance.lookup(&segments)
        };
        let path = call.path.clone();
        debug!(service = %service, path = ?path, args = call.args.len(), "Handling call");

        match member {
            None => Err(CourierError::property_not_found(
                service,
                path.unwrap_or_default(),
            )),
            Some(Member::Value(value)) => Ok(value),
            Some(Member::Method(method)) => {
                let ctx = CallContext {
                    service,
                    path,
                    sender,
                };
                method.invoke(ctx, Args::new(call.args)).await
            }
        }
    }
    .boxed()
}

/// A live registration returned by [`ProxyService::register`]
pub struct ServiceBinding<S> {
    name: String,
    instance: Arc<S>,
    erased: Arc<dyn Service>,
    registry: Arc<Registry>,
    subscription: Subscription,
}

impl<S: fmt::Debug> fmt::Debug for ServiceBinding<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceBinding")
            .field("name", &self.name)
            .field("instance", &self.instance)
            .field("registry", &self.registry.kind())
            .field("subscription", &self.subscription)
            .finish()
    }
}

impl<S> ServiceBinding<S> {
    /// Registered name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The exposed instance
    pub fn instance(&self) -> &Arc<S> {
        &self.instance
    }

    /// Stop answering calls and release the name
    ///
    /// The registry entry is only removed while it still belongs to this
    /// binding; a later registration under the same name survives.
    pub fn destroy(self) -> Arc<S> {
        self.subscription.unsubscribe();
        self.registry.remove_instance(&self.name, &self.erased);
        debug!(service = %self.name, "Service destroyed");
        self.instance
    }
}
