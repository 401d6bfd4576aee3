//! Auxiliary-context host effects
//!
//! The platform allows at most one hidden-document (auxiliary) context at a
//! time, and it runs nothing until explicitly created. These primitives are
//! what the offscreen bridge drives before every outside call.

use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Configuration bag passed to [`AuxiliaryHost::create_context`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxiliaryConfig {
    /// Document to load in the hidden context
    pub url: String,
    /// Platform reason codes justifying the context
    pub reasons: Vec<String>,
    /// Human-readable justification shown by the platform
    pub justification: String,
}

impl Default for AuxiliaryConfig {
    fn default() -> Self {
        Self {
            url: "offscreen.html".to_string(),
            reasons: vec!["DOM_PARSER".to_string()],
            justification: "auxiliary_justification".to_string(),
        }
    }
}

/// Lifecycle primitives of the singleton auxiliary context
#[async_trait]
pub trait AuxiliaryHost: Send + Sync {
    /// Whether an auxiliary context currently exists
    async fn has_context(&self) -> Result<bool>;

    /// Create the auxiliary context; fails if one already exists
    async fn create_context(&self, config: &AuxiliaryConfig) -> Result<()>;

    /// Close the current auxiliary context
    async fn close_context(&self) -> Result<()>;
}

/// Message catalog lookup for user-visible strings
///
/// The localization provider itself lives outside Courier; this is the only
/// surface the bridge needs from it.
pub trait Localizer: Send + Sync {
    /// Localized text for `key`, `None` when the catalog has no entry
    fn localize(&self, key: &str) -> Option<String>;
}

/// Localizer with no catalog; every key falls back to its literal text
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocalization;

impl Localizer for NoLocalization {
    fn localize(&self, _key: &str) -> Option<String> {
        None
    }
}

/// In-memory message catalog
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    messages: HashMap<String, String>,
}

impl StaticCatalog {
    /// Create an empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a message
    pub fn with(mut self, key: impl Into<String>, text: impl Into<String>) -> Self {
        self.messages.insert(key.into(), text.into());
        self
    }
}

impl Localizer for StaticCatalog {
    fn localize(&self, key: &str) -> Option<String> {
        self.messages.get(key).cloned()
    }
}

/// Resolve `key` through `localizer`, falling back to the key itself
pub fn localize_or_literal(localizer: &dyn Localizer, key: &str) -> String {
    localizer.localize(key).unwrap_or_else(|| key.to_string())
}
