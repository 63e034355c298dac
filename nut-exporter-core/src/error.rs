//! Error types for the NUT exporter core
//!
//! [`NutError`] covers everything that can go wrong during one poll cycle.
//! None of these are fatal to the process: the poll scheduler logs them and
//! the registry keeps whatever it held before.

use thiserror::Error;

/// Errors raised by the protocol session, the synchronizer and the registry
#[derive(Debug, Error)]
pub enum NutError {
    /// Dial or transport failure
    #[error("Connection to {host}:{port} failed: {reason}")]
    Connection {
        /// Server host
        host: String,
        /// Server port
        port: u16,
        /// Underlying I/O error text
        reason: String,
    },

    /// A command did not complete within the per-command deadline
    #[error("Command '{command}' timed out after {secs}s")]
    Timeout {
        /// Command verb that stalled
        command: String,
        /// Deadline in seconds
        secs: u64,
    },

    /// A data command was issued while the session was not `Ready`
    #[error("Cannot send '{command}': session is not logged in")]
    NotConnected {
        /// Command verb that was refused
        command: String,
    },

    /// Handshake reply was not the literal `OK`
    #[error("{command} rejected by server: expected OK, got '{reply}'")]
    Authentication {
        /// Handshake step (`USERNAME`, `PASSWORD`, `LOGIN`)
        command: String,
        /// Reply line as received
        reply: String,
    },

    /// Reply or list line did not have the expected shape
    #[error("Malformed reply to '{command}': {reason} (line: '{line}')")]
    ProtocolParse {
        /// Command whose reply was malformed
        command: String,
        /// Offending line
        line: String,
        /// What was wrong with it
        reason: String,
    },

    /// Server answered with `ERR <message>`
    #[error("Server returned error for '{command}': {message}")]
    Server {
        /// Command that failed
        command: String,
        /// Error token(s) after `ERR`
        message: String,
    },

    /// A single series could not be updated
    #[error("Failed to update series '{series}': {reason}")]
    MetricUpdate {
        /// Target series id
        series: String,
        /// Conversion or registry failure
        reason: String,
    },

    /// Registry contents could not be rendered for scraping
    #[error("Failed to encode metrics: {0}")]
    Exposition(String),
}

impl NutError {
    /// Returns `true` for dial, transport and deadline failures
    #[must_use]
    pub const fn is_connection(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. } | Self::Timeout { .. } | Self::NotConnected { .. }
        )
    }

    /// Returns `true` for handshake rejections
    #[must_use]
    pub const fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication { .. })
    }
}

/// Result type for protocol and synchronization operations
pub type NutResult<T> = Result<T, NutError>;

/// Configuration loading and validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file exists but could not be read
    #[error("Failed to read config file '{path}': {reason}")]
    Read {
        /// File path
        path: String,
        /// I/O error text
        reason: String,
    },

    /// Config file content could not be deserialized
    #[error("Failed to parse config file '{path}': {reason}")]
    Parse {
        /// File path
        path: String,
        /// Deserializer error text
        reason: String,
    },

    /// Server address is neither an IPv4 address nor a host name
    #[error("NUT server address '{0}' isn't a valid FQDN or IP address")]
    InvalidServer(String),

    /// A required field is empty
    #[error("{0} must be defined")]
    Missing(&'static str),

    /// A numeric field is outside its allowed range
    #[error("{field} {value} is out of range ({min}-{max})")]
    OutOfRange {
        /// Field name
        field: &'static str,
        /// Rejected value
        value: u64,
        /// Inclusive lower bound
        min: u64,
        /// Inclusive upper bound
        max: u64,
    },
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;
