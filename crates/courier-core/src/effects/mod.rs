//! Effect traits consumed from the host platform
//!
//! Courier never reaches the platform directly. Everything it needs is one of
//! these traits, implemented by a platform binding in production and by the
//! in-memory handlers in tests and simulation.

pub mod auxiliary;
pub mod channel;

pub use auxiliary::{
    localize_or_literal, AuxiliaryConfig, AuxiliaryHost, Localizer, NoLocalization, StaticCatalog,
};
pub use channel::{ListenerId, RawChannel, RawListener, Responder};
