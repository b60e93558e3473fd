//! Service Manager Bridge Library
//!
//! Broker protocol client and binding-credential persistence for a
//! cluster-resident control plane talking to a remote service broker.
//!
//! ## Quick Start
//!
//! ```rust
//! use service_manager_bridge::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod auth;
pub mod bindings;
pub mod broker;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod error;
pub mod observability;
pub mod prelude;

pub use error::{BridgeError, Result};
