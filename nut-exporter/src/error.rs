//! CLI error types and exit codes.

use std::net::SocketAddr;

use nut_exporter_core::{ConfigError, TracingError};

/// Exit codes for CLI operations
pub mod exit_codes {
    /// General error - configuration, validation, logging setup
    pub const GENERAL_ERROR: i32 = 1;
    /// Runtime failure - the HTTP endpoint could not be bound or failed
    pub const RUNTIME_FAILURE: i32 = 2;
}

/// CLI error type
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Logging could not be set up
    #[error("Logging error: {0}")]
    Tracing(#[from] TracingError),

    /// Listen address could not be bound
    #[error("Failed to listen on {address}: {reason}")]
    Bind {
        /// Requested address
        address: SocketAddr,
        /// I/O error text
        reason: String,
    },

    /// HTTP server stopped with an error
    #[error("HTTP server error: {0}")]
    Server(String),
}

impl CliError {
    /// Returns the appropriate exit code for this error type.
    ///
    /// Exit codes:
    /// - 0: Success (not an error)
    /// - 1: General error (configuration, logging)
    /// - 2: Runtime failure (bind, HTTP server)
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Bind { .. } | Self::Server(_) => exit_codes::RUNTIME_FAILURE,
            Self::Config(_) | Self::Tracing(_) => exit_codes::GENERAL_ERROR,
        }
    }
}
