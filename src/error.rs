//! Error types for the nocap library.
//!
//! Every failure a submission can hit maps to exactly one [`NoCapError`]
//! variant. The orchestrator stores the last error in its single message
//! slot and also returns it, so callers can either poll the state or match
//! on the `Err` directly.
//!
//! | Variant | When | Request sent? |
//! |---------|------|---------------|
//! | `AuthRequired` | no active session | never |
//! | `Validation` | missing input, mode/payload mismatch | never |
//! | `MediaAccess` | camera denied / missing / broken | never |
//! | `Decode` | unreadable file, bad image, unexpected body | maybe |
//! | `Transport` | no HTTP response at all | attempted |
//! | `AnalysisFailed` | server answered non-2xx | yes |
//!
//! None of these are retried automatically and none are fatal: the
//! orchestrator always returns to a state that accepts a new attempt.

use std::path::PathBuf;
use thiserror::Error;

/// All errors returned by the nocap library.
#[derive(Debug, Error)]
pub enum NoCapError {
    // ── Pre-flight errors ─────────────────────────────────────────────────
    /// No authenticated session; the request was never sent.
    #[error("Authentication required: {reason}\nSign in again to obtain a fresh token.")]
    AuthRequired { reason: String },

    /// Required input for the active mode is absent or inconsistent.
    #[error("Invalid input: {0}")]
    Validation(String),

    /// The camera could not be acquired or produced no frame.
    #[error("Failed to access camera: {detail}\nCheck device permissions.")]
    MediaAccess { detail: String },

    // ── Encoding errors ───────────────────────────────────────────────────
    /// A payload or response body could not be read or decoded.
    #[error("Failed to decode {what}: {detail}")]
    Decode { what: String, detail: String },

    /// Input file was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Picked file is not accepted by the active mode's file filter.
    #[error("File '{path}' is not accepted here (expected {accept})")]
    UnsupportedFile { path: PathBuf, accept: String },

    // ── Network errors ────────────────────────────────────────────────────
    /// The HTTP call did not complete (DNS, connect, reset, timeout).
    #[error("Request to '{endpoint}' failed: {detail}\nCheck your internet connection.")]
    Transport { endpoint: String, detail: String },

    /// The inference service answered with a non-success status.
    #[error("Analysis failed: HTTP {status}{}", paren_detail(.detail))]
    AnalysisFailed { status: u16, detail: Option<String> },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

fn paren_detail(detail: &Option<String>) -> String {
    detail
        .as_deref()
        .map(|d| format!(" ({d})"))
        .unwrap_or_default()
}

impl NoCapError {
    /// Shorthand for a [`NoCapError::Decode`] error.
    pub fn decode(what: impl Into<String>, detail: impl ToString) -> Self {
        Self::Decode {
            what: what.into(),
            detail: detail.to_string(),
        }
    }

    /// True when the request never left the client.
    pub fn is_pre_flight(&self) -> bool {
        matches!(
            self,
            Self::AuthRequired { .. }
                | Self::Validation(_)
                | Self::MediaAccess { .. }
                | Self::FileNotFound { .. }
                | Self::UnsupportedFile { .. }
                | Self::InvalidConfig(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_failed_display_without_detail() {
        let e = NoCapError::AnalysisFailed {
            status: 500,
            detail: None,
        };
        assert_eq!(e.to_string(), "Analysis failed: HTTP 500");
    }

    #[test]
    fn analysis_failed_display_with_detail() {
        let e = NoCapError::AnalysisFailed {
            status: 400,
            detail: Some("Invalid URL format".into()),
        };
        let msg = e.to_string();
        assert!(msg.contains("400"), "got: {msg}");
        assert!(msg.contains("Invalid URL format"), "got: {msg}");
    }

    #[test]
    fn transport_display() {
        let e = NoCapError::Transport {
            endpoint: "/mode/text".into(),
            detail: "connection refused".into(),
        };
        assert!(e.to_string().contains("/mode/text"));
        assert!(e.to_string().contains("connection refused"));
    }

    #[test]
    fn pre_flight_classification() {
        assert!(NoCapError::AuthRequired {
            reason: "no session".into()
        }
        .is_pre_flight());
        assert!(NoCapError::Validation("empty".into()).is_pre_flight());
        assert!(!NoCapError::AnalysisFailed {
            status: 500,
            detail: None
        }
        .is_pre_flight());
        assert!(!NoCapError::decode("file", "eof").is_pre_flight());
    }
}
