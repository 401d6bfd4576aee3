//! # Courier Offscreen - Layer 3: Auxiliary-Context Services
//!
//! Services that must run in the platform's singleton hidden-document
//! context. The context does not exist until created and at most one may
//! exist at a time, so every outside call recreates it for the service
//! being called.
//!
//! - [`bridge`]: [`OffscreenService`] with its inside and outside roles
//! - [`host`]: direct or remote access to the [`AuxiliaryHost`] primitives
//! - [`memory`]: in-process singleton host for tests and simulation
//!
//! [`AuxiliaryHost`]: courier_core::effects::AuxiliaryHost

pub mod bridge;
pub mod host;
pub mod memory;

pub use bridge::OffscreenService;
pub use host::{
    auxiliary_host_service, serve_auxiliary_host, serve_auxiliary_host_with_config, HostAccess,
    RemoteAuxiliaryHost, AUXILIARY_HOST_SERVICE,
};
pub use memory::{HostEvent, MemoryAuxiliaryHost};
