//! Error types for netvault.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for netvault operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Transport-level errors (connect, authenticate)
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Expect-session errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Driver-level errors
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    /// Platform/vendor errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Scheduler task-boundary errors
    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    /// Configuration loading errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Credential cipher errors
    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    /// Staging or repository file errors
    #[error("Artifact error: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Transport layer errors (SSH/telnet connection, authentication).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the one recorded in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Expect-session errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// No qualifying output arrived before the step deadline
    #[error("No qualifying output for step '{step}' within {timeout:?}")]
    ProtocolTimeout { step: String, timeout: Duration },

    /// The session was told to stop at a step boundary
    #[error("Session cancelled")]
    Cancelled,
}

/// Driver layer errors (action execution, result classification).
#[derive(Error, Debug)]
pub enum DriverError {
    /// Driver not connected
    #[error("Driver not connected - call open() first")]
    NotConnected,

    /// Driver already connected
    #[error("Driver already connected")]
    AlreadyConnected,

    /// The platform cannot be reached with this access method
    #[error("Access method '{method}' is not supported for {platform} devices")]
    UnsupportedAccessMethod { platform: String, method: String },

    /// The platform has no script for this action
    #[error("Action '{action}' is not implemented for {platform} devices")]
    UnsupportedAction { platform: String, action: String },

    /// The device reported an error or never confirmed the transfer
    #[error("Transfer failed: {reason}")]
    TransferFailed { reason: String },

    /// The received artifact could not be moved into the device directory
    #[error("Could not relocate {from} to {to}: {source}")]
    Relocation {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Platform/vendor definition errors.
#[derive(Error, Debug)]
pub enum PlatformError {
    /// No driver is registered for the manufacturer tag
    #[error("Device manufacturer '{name}' not implemented")]
    UnknownManufacturer { name: String },

    /// A tag is already taken by another platform
    #[error("Platform '{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// Invalid platform definition
    #[error("Invalid platform definition: {message}")]
    InvalidDefinition { message: String },
}

/// Errors raised at the scheduler's task boundary.
#[derive(Error, Debug)]
pub enum TaskError {
    /// The task ran past its hard deadline and was aborted
    #[error("Task exceeded its deadline of {0:?}")]
    DeadlineExceeded(Duration),

    /// The task panicked
    #[error("Task panicked: {0}")]
    Panicked(String),

    /// The run was stopped before the task started
    #[error("Run stopped before the task started")]
    Cancelled,

    /// The scheduler no longer accepts submissions
    #[error("Scheduler is not accepting new tasks")]
    Rejected,
}

/// Configuration loading errors. These abort the run.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read
    #[error("Cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The configuration file is not valid YAML for the expected schema
    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A semantic problem in the configuration
    #[error("{0}")]
    Invalid(String),
}

/// Credential cipher errors.
#[derive(Error, Debug)]
pub enum SecretError {
    /// Decoded ciphertext is not a whole number of cipher blocks
    #[error("Ciphertext must be a multiple of {block} bytes, got {len}")]
    InvalidLength { len: usize, block: usize },

    /// Ciphertext is not valid base64
    #[error("Ciphertext is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),

    /// The padded key is not a valid AES key size
    #[error("Key must pad to 16 or 32 bytes, got {0}")]
    InvalidKey(usize),

    /// Decrypted bytes are not UTF-8 (usually a wrong password)
    #[error("Decrypted value is not valid UTF-8")]
    NotUtf8,
}

/// Artifact tree errors.
#[derive(Error, Debug)]
pub enum ArtifactError {
    /// A filesystem operation on the artifact tree failed
    #[error("{op} {path}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A device name cannot be used as a directory name
    #[error("Device name '{0}' is not a valid directory name")]
    InvalidName(String),
}

/// Result type alias using netvault's Error.
pub type Result<T> = std::result::Result<T, Error>;
