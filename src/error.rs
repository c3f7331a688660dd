//! Error types for the haptics core and the robot link.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while building a haptic scene or controller.
#[derive(Debug, Error)]
pub enum HapticError {
    /// A stiffness or damping gain was negative or not finite.
    #[error("invalid gains kp={kp}, kd={kd}: both must be finite and non-negative")]
    InvalidGains { kp: f32, kd: f32 },

    /// A shape dimension was negative or not finite.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// A configuration value was out of range.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// The configuration file could not be read.
    #[error("failed to read config {path:?}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse config")]
    ConfigParse(#[from] serde_json::Error),

    /// The robot link reported an error.
    #[error(transparent)]
    Link(#[from] LinkError),
}

/// Errors reported by a [`RobotLink`](crate::link::RobotLink).
#[derive(Debug, Error)]
pub enum LinkError {
    /// The link (or its worker thread) is gone.
    #[error("robot link disconnected")]
    Disconnected,

    /// A force command could not be delivered.
    #[error("failed to send tool force: {0}")]
    SendFailed(String),

    /// Pending commands were not acknowledged in time.
    #[error("flush timed out after {0:?}")]
    FlushTimeout(std::time::Duration),

    /// Enabling or disabling the arm failed.
    #[error("robot activation failed: {0}")]
    Activation(String),
}

/// Convenience alias for results in this crate.
pub type Result<T> = std::result::Result<T, HapticError>;
