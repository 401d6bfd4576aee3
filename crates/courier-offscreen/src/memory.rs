//! In-memory auxiliary host
//!
//! Simulates the platform's singleton hidden-document primitives: at most one
//! context exists at a time, creating a second one fails, and closing when
//! none exists fails. Optional hooks let a test actually start and stop the
//! auxiliary context's bus when the host creates or closes it.

use async_trait::async_trait;
use courier_core::effects::{AuxiliaryConfig, AuxiliaryHost};
use courier_core::{CourierError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Lifecycle event recorded by [`MemoryAuxiliaryHost`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A context was created with this configuration
    Created(AuxiliaryConfig),
    /// The current context was closed
    Closed,
}

type LaunchHook = Arc<dyn Fn(&AuxiliaryConfig) -> Result<()> + Send + Sync>;
type TeardownHook = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct HostState {
    current: Option<AuxiliaryConfig>,
    events: Vec<HostEvent>,
}

/// Singleton auxiliary-context host living in process memory
#[derive(Default)]
pub struct MemoryAuxiliaryHost {
    state: Mutex<HostState>,
    launch: Option<LaunchHook>,
    teardown: Option<TeardownHook>,
}

impl MemoryAuxiliaryHost {
    /// Host with no hooks
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `launch` whenever a context is created; a failure aborts creation
    pub fn with_launcher<F>(mut self, launch: F) -> Self
    where
        F: Fn(&AuxiliaryConfig) -> Result<()> + Send + Sync + 'static,
    {
        self.launch = Some(Arc::new(launch));
        self
    }

    /// Run `teardown` whenever the context is closed
    pub fn with_teardown<F>(mut self, teardown: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.teardown = Some(Arc::new(teardown));
        self
    }

    /// Configuration of the live context, if any
    pub fn current(&self) -> Option<AuxiliaryConfig> {
        self.state.lock().current.clone()
    }

    /// Every lifecycle event so far, oldest first
    pub fn events(&self) -> Vec<HostEvent> {
        self.state.lock().events.clone()
    }

    /// Number of creations so far
    pub fn create_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, HostEvent::Created(_)))
            .count()
    }

    /// Number of closes so far
    pub fn close_count(&self) -> usize {
        self.state
            .lock()
            .events
            .iter()
            .filter(|event| matches!(event, HostEvent::Closed))
            .count()
    }
}

impl fmt::Debug for MemoryAuxiliaryHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("MemoryAuxiliaryHost")
            .field("current", &state.current)
            .field("events", &state.events.len())
            .finish()
    }
}

#[async_trait]
impl AuxiliaryHost for MemoryAuxiliaryHost {
    async fn has_context(&self) -> Result<bool> {
        Ok(self.state.lock().current.is_some())
    }

    async fn create_context(&self, config: &AuxiliaryConfig) -> Result<()> {
        if self.state.lock().current.is_some() {
            return Err(CourierError::host(
                "Only a single auxiliary context may exist at a time",
            ));
        }
        if let Some(launch) = &self.launch {
            launch(config)?;
        }

        let mut state = self.state.lock();
        state.current = Some(config.clone());
        state.events.push(HostEvent::Created(config.clone()));
        Ok(())
    }

    async fn close_context(&self) -> Result<()> {
        {
            let mut state = self.state.lock();
            if state.current.take().is_none() {
                return Err(CourierError::host("No auxiliary context to close"));
            }
            state.events.push(HostEvent::Closed);
        }
        if let Some(teardown) = &self.teardown {
            teardown();
        }
        Ok(())
    }
}
