//! Error type for fallible wildfire operations
//!
//! Soft conditions (missing world data, a skipped config entry, a starved cell
//! task) are logged and absorbed by the simulation; only operations a host
//! calls explicitly (settings reload, engine construction, config table
//! building) report them through `WildfireError`.

/// Errors surfaced by the wildfire core
#[derive(Debug, Clone, PartialEq)]
pub enum WildfireError {
    /// A tunable is outside its valid domain
    InvalidSetting {
        /// Setting name
        name: &'static str,
        /// Rejected value
        value: f32,
    },
    /// A single configuration entry could not be used
    MalformedConfigEntry {
        /// Entry name as written in the configuration
        name: String,
        /// Why the entry was rejected
        reason: String,
    },
    /// A lock was poisoned by a panic on another thread
    LockPoisoned(&'static str),
    /// The worker pool could not be started
    ThreadPool(String),
}

impl std::fmt::Display for WildfireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WildfireError::InvalidSetting { name, value } => {
                write!(f, "Invalid setting {name}: {value}")
            }
            WildfireError::MalformedConfigEntry { name, reason } => {
                write!(f, "Malformed config entry '{name}': {reason}")
            }
            WildfireError::LockPoisoned(lock) => {
                write!(f, "Lock '{lock}' was poisoned by a panic in another thread")
            }
            WildfireError::ThreadPool(msg) => write!(f, "Failed to start worker pool: {msg}"),
        }
    }
}

impl std::error::Error for WildfireError {}
