//! Error types for oobswap.
//!
//! Library crates use [`OobError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Malformed markup, unresolved targets and unknown strategies are never errors;
//! they degrade gracefully inside the engine. A selector that cannot be evaluated
//! is the one authoring mistake reported back to the caller.

use std::path::PathBuf;

/// Top-level error type for all oobswap operations.
#[derive(Debug, thiserror::Error)]
pub enum OobError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// A target selector from the markup could not be parsed or evaluated.
    #[error("invalid OOB target selector `{selector}`: {message}")]
    Selector { selector: String, message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OobError>;

impl OobError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a selector error for `selector`.
    pub fn selector(selector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = OobError::config("bad settle delay");
        assert_eq!(err.to_string(), "config error: bad settle delay");

        let err = OobError::selector("div[", "unexpected end of input");
        assert!(err.to_string().contains("`div[`"));
        assert!(err.to_string().contains("unexpected end"));

        let err = OobError::io("/nope/oobswap.toml", std::io::ErrorKind::NotFound.into());
        assert!(err.to_string().starts_with("I/O error at \"/nope/oobswap.toml\""));
    }
}
