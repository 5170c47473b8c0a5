// src/error.rs
//
// Errors for the fallible outer surfaces (settings files, stdio link).
// The session core itself never fails: transport absence, decode failures
// and missing consumers all degrade to logged no-ops.

/// Errors raised outside the session core.
#[derive(Debug)]
pub enum BridgeError {
    /// Filesystem or stream I/O failed.
    Io(String),
    /// Settings content could not be parsed or serialized.
    Settings(String),
    /// The host link was closed.
    Closed,
}

impl std::fmt::Display for BridgeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Settings(msg) => write!(f, "Settings error: {msg}"),
            Self::Closed => write!(f, "Host link closed"),
        }
    }
}

impl std::error::Error for BridgeError {}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(e: serde_json::Error) -> Self {
        Self::Settings(e.to_string())
    }
}
