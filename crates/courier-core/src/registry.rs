//! Named service registry
//!
//! One [`Registry`] per context kind maps service names to live instances.
//! Registries of different kinds are never merged: the background, the
//! auxiliary context and a relay each own an independent map, even when they
//! happen to share a process (as in tests).
//!
//! Components take a registry by injection. For code that needs a
//! process-wide handle, [`global`] lazily creates one registry per kind and
//! [`teardown_globals`] empties them again.

use crate::context::ContextKind;
use crate::errors::{CourierError, Result};
use crate::service::Service;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Per-context map of live service instances
pub struct Registry {
    kind: ContextKind,
    entries: RwLock<HashMap<String, Arc<dyn Service>>>,
}

impl Registry {
    /// Create an empty registry owned by a context kind
    pub fn new(kind: ContextKind) -> Self {
        Self {
            kind,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Context kind that owns this registry
    pub fn kind(&self) -> ContextKind {
        self.kind
    }

    /// Insert an instance; fails if the name is already taken
    pub fn add(&self, name: impl Into<String>, instance: Arc<dyn Service>) -> Result<()> {
        let name = name.into();
        let mut entries = self.entries.write();
        if entries.contains_key(&name) {
            return Err(CourierError::name_collision(name));
        }
        tracing::debug!(registry = %self.kind, service = %name, "Service added");
        entries.insert(name, instance);
        Ok(())
    }

    /// Instance registered under `name`
    pub fn get(&self, name: &str) -> Option<Arc<dyn Service>> {
        self.entries.read().get(name).cloned()
    }

    /// Whether `name` is registered
    pub fn has(&self, name: &str) -> bool {
        self.entries.read().contains_key(name)
    }

    /// Remove and return the instance under `name`
    pub fn remove(&self, name: &str) -> Option<Arc<dyn Service>> {
        let removed = self.entries.write().remove(name);
        if removed.is_some() {
            tracing::debug!(registry = %self.kind, service = %name, "Service removed");
        }
        removed
    }

    /// Whether `name` is currently bound to exactly `instance`
    pub fn holds(&self, name: &str, instance: &Arc<dyn Service>) -> bool {
        self.entries
            .read()
            .get(name)
            .is_some_and(|current| same_instance(current, instance))
    }

    /// Remove `name` only if it is still bound to `instance`
    ///
    /// Returns whether an entry was removed. A newer registration under the
    /// same name is left in place.
    pub fn remove_instance(&self, name: &str, instance: &Arc<dyn Service>) -> bool {
        let mut entries = self.entries.write();
        if !entries
            .get(name)
            .is_some_and(|current| same_instance(current, instance))
        {
            return false;
        }
        entries.remove(name);
        tracing::debug!(registry = %self.kind, service = %name, "Service removed");
        true
    }

    /// Remove every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of registered services
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("kind", &self.kind)
            .field("names", &self.names())
            .finish()
    }
}

/// Identity of two instances, ignoring vtable pointers
pub fn same_instance(a: &Arc<dyn Service>, b: &Arc<dyn Service>) -> bool {
    std::ptr::eq(Arc::as_ptr(a).cast::<()>(), Arc::as_ptr(b).cast::<()>())
}

static GLOBAL_REGISTRIES: Lazy<RwLock<HashMap<ContextKind, Arc<Registry>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

/// Process-wide registry for a context kind, created on first access
pub fn global(kind: ContextKind) -> Arc<Registry> {
    if let Some(registry) = GLOBAL_REGISTRIES.read().get(&kind) {
        return Arc::clone(registry);
    }
    let mut registries = GLOBAL_REGISTRIES.write();
    Arc::clone(
        registries
            .entry(kind)
            .or_insert_with(|| Arc::new(Registry::new(kind))),
    )
}

/// Empty every process-wide registry
///
/// Handles obtained from [`global`] stay valid and observe the cleared state.
pub fn teardown_globals() {
    for registry in GLOBAL_REGISTRIES.read().values() {
        registry.clear();
    }
}
