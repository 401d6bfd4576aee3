//! Unified error system for Courier
//!
//! A single error type covers every failure the substrate can report. Errors
//! are serializable because a handler's failure travels back over the raw
//! channel as part of the reply and must be reconstructed on the caller side
//! with its variant intact.

use serde::{Deserialize, Serialize};

/// Failures reported by the raw message channel itself.
///
/// These never originate in a handler; they describe delivery-level problems
/// such as a torn-down context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ChannelError {
    /// The destination endpoint is not connected to the channel
    #[error("Could not establish connection: receiving end {endpoint} does not exist")]
    Unreachable {
        /// Display form of the missing endpoint
        endpoint: String,
    },

    /// The local endpoint was disconnected before or during the send
    #[error("Channel disconnected")]
    Disconnected,

    /// Every listener released the message without answering
    #[error("The message port closed before a response was received")]
    NoResponse,

    /// Platform-specific delivery failure
    #[error("Platform error: {message}")]
    Platform {
        /// Message reported by the platform
        message: String,
    },
}

impl ChannelError {
    /// Create an unreachable-endpoint error
    pub fn unreachable(endpoint: impl std::fmt::Display) -> Self {
        Self::Unreachable {
            endpoint: endpoint.to_string(),
        }
    }

    /// Create a platform error
    pub fn platform(message: impl Into<String>) -> Self {
        Self::Platform {
            message: message.into(),
        }
    }
}

/// Unified error type for all Courier operations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum CourierError {
    /// A registry already holds an instance under this name
    #[error("Name collision: service '{name}' is already registered")]
    NameCollision {
        /// The colliding service name
        name: String,
    },

    /// The requested path does not exist on the target instance
    #[error("Property not found: '{path}' on service '{service}'")]
    PropertyNotFound {
        /// Service the call was addressed to
        service: String,
        /// Dotted path that failed to resolve (empty for the root)
        path: String,
    },

    /// More than one handler answered the same envelope
    #[error("Multiple responders: {count} handlers answered message type '{message_type}'")]
    MultipleResponders {
        /// Routing key of the offending envelope
        message_type: String,
        /// Number of handlers that produced a result
        count: usize,
    },

    /// The raw channel rejected the send
    #[error("Channel failure: {0}")]
    Channel(#[from] ChannelError),

    /// An accessor was used from a context it does not belong to
    #[error("Misuse: {message}")]
    Misuse {
        /// Description of the misuse
        message: String,
    },

    /// Inbound call data could not be understood
    #[error("Invalid call: {message}")]
    InvalidCall {
        /// Description of what was wrong with the call
        message: String,
    },

    /// Serialization or deserialization failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message from the serializer
        message: String,
    },

    /// A service method failed while executing
    #[error("Handler error: {message}")]
    Handler {
        /// Error message raised by the method
        message: String,
    },

    /// The auxiliary-context host failed to create or close a context
    #[error("Host error: {message}")]
    Host {
        /// Error message reported by the host
        message: String,
    },

    /// Configuration could not be parsed or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration problem
        message: String,
    },
}

impl CourierError {
    /// Create a name collision error
    pub fn name_collision(name: impl Into<String>) -> Self {
        Self::NameCollision { name: name.into() }
    }

    /// Create a property not found error
    pub fn property_not_found(service: impl Into<String>, path: impl Into<String>) -> Self {
        Self::PropertyNotFound {
            service: service.into(),
            path: path.into(),
        }
    }

    /// Create a multiple responders error
    pub fn multiple_responders(message_type: impl Into<String>, count: usize) -> Self {
        Self::MultipleResponders {
            message_type: message_type.into(),
            count,
        }
    }

    /// Create a misuse error
    pub fn misuse(message: impl Into<String>) -> Self {
        Self::Misuse {
            message: message.into(),
        }
    }

    /// Create an invalid call error
    pub fn invalid_call(message: impl Into<String>) -> Self {
        Self::InvalidCall {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a handler error
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler {
            message: message.into(),
        }
    }

    /// Create a host error
    pub fn host(message: impl Into<String>) -> Self {
        Self::Host {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True when the error came from the raw channel rather than a handler
    pub fn is_channel_failure(&self) -> bool {
        matches!(self, Self::Channel(_))
    }
}

/// Standard Result type for Courier operations
pub type Result<T> = std::result::Result<T, CourierError>;

impl From<serde_json::Error> for CourierError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

impl From<toml::de::Error> for CourierError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = CourierError::name_collision("math");
        assert!(matches!(err, CourierError::NameCollision { .. }));
        assert_eq!(
            err.to_string(),
            "Name collision: service 'math' is already registered"
        );
    }

    #[test]
    fn test_channel_error_preserved() {
        let err: CourierError = ChannelError::Disconnected.into();
        assert!(err.is_channel_failure());
        assert_eq!(err, CourierError::Channel(ChannelError::Disconnected));
    }

    #[test]
    fn test_error_survives_wire_encoding() {
        let err = CourierError::property_not_found("math", "obj.missing");
        let encoded = serde_json::to_value(&err).unwrap();
        let decoded: CourierError = serde_json::from_value(encoded).unwrap();
        assert_eq!(decoded, err);
    }
}
