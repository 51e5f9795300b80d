//! Configuration types for missive.
//!
//! ## Modules
//!
//! - [`defaults`]: Default sender, recipients and subject seeded into new
//!   email builders

pub mod defaults;

use std::io;

use thiserror::Error;

pub use defaults::{DefaultRecipient, EmailDefaults};

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read configuration from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// The configuration could not be deserialized.
    #[error("Invalid configuration: {0}")]
    Toml(#[from] toml::de::Error),
}
