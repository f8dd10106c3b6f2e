//! rh-core: Core abstractions and configuration for rcon-hub
//!
//! This crate provides the configuration structures, the static connection
//! registry, the error taxonomy and the collaborator traits shared by the
//! hub's SSH front end and its console multiplexer.

pub mod config;
pub mod error;
pub mod registry;
pub mod traits;

pub use config::{ConnectionSpec, HubConfig};
pub use error::{ConfigError, LinkError, ShellError};
pub use registry::ConnectionRegistry;
