//! Execution contexts and addressing
//!
//! A context is an isolated execution environment. Contexts never share
//! memory; the only thing one knows about another is the [`Endpoint`] the raw
//! channel reports as the sender of an envelope.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of an isolated execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextKind {
    /// Long-lived background/service context
    Background,
    /// Script running inside a content page
    Content,
    /// Popup, options page or other extension view
    View,
    /// Singleton hidden document context
    Auxiliary,
    /// Context that forwards envelopes between two channels
    Relay,
}

impl ContextKind {
    /// Every context kind, in declaration order
    pub const ALL: [ContextKind; 5] = [
        ContextKind::Background,
        ContextKind::Content,
        ContextKind::View,
        ContextKind::Auxiliary,
        ContextKind::Relay,
    ];

    /// Whether this context may drive the auxiliary-context host primitives
    /// itself instead of asking another context to do so.
    pub fn can_host_auxiliary(self) -> bool {
        matches!(self, ContextKind::Background)
    }

    /// Stable lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            ContextKind::Background => "background",
            ContextKind::Content => "content",
            ContextKind::View => "view",
            ContextKind::Auxiliary => "auxiliary",
            ContextKind::Relay => "relay",
        }
    }
}

impl fmt::Display for ContextKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Address of one concrete context on the raw channel
///
/// `instance` distinguishes several contexts of the same kind, e.g. the tab
/// id of a content page. Singleton contexts leave it empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Endpoint {
    /// Kind of the context
    pub kind: ContextKind,
    /// Instance discriminator for non-singleton kinds
    pub instance: Option<u64>,
}

impl Endpoint {
    /// Endpoint of a singleton context kind
    pub const fn singleton(kind: ContextKind) -> Self {
        Self {
            kind,
            instance: None,
        }
    }

    /// Endpoint of one instance of a context kind
    pub const fn instance(kind: ContextKind, instance: u64) -> Self {
        Self {
            kind,
            instance: Some(instance),
        }
    }

    /// The background context
    pub const fn background() -> Self {
        Self::singleton(ContextKind::Background)
    }

    /// The auxiliary hidden-document context
    pub const fn auxiliary() -> Self {
        Self::singleton(ContextKind::Auxiliary)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.instance {
            Some(id) => write!(f, "{}#{id}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Information about the sender of an inbound envelope
///
/// Produced by the raw channel on delivery; a sender cannot forge it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderInfo {
    /// Endpoint the envelope came from
    pub endpoint: Endpoint,
    /// Document URL of the sending context, when it has one
    pub url: Option<String>,
}

impl SenderInfo {
    /// Sender info for an endpoint without a document URL
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            url: None,
        }
    }

    /// Attach a document URL
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// Where an outbound envelope is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Destination {
    /// Every listening context except the sender
    #[default]
    Broadcast,
    /// One specific context
    Endpoint(Endpoint),
}

impl From<Endpoint> for Destination {
    fn from(endpoint: Endpoint) -> Self {
        Destination::Endpoint(endpoint)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Destination::Broadcast => f.write_str("broadcast"),
            Destination::Endpoint(endpoint) => write!(f, "{endpoint}"),
        }
    }
}
