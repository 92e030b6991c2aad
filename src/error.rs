//! Error types for the SAP gateway
//!
//! `SapError` is what a work-order search can fail with. Every variant carries
//! a user-facing message that never contains raw SAP payloads; the details are
//! logged where the error is produced.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a work-order search against the SAP OData service.
#[derive(Debug, Error)]
pub enum SapError {
    /// The SAP host could not be reached.
    #[error("SAP backend unavailable: {0}")]
    Unavailable(String),

    /// The configured deadline elapsed before SAP answered.
    #[error("SAP request timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// SAP rejected the service credentials (401/403).
    #[error("SAP rejected credentials (HTTP {status})")]
    Authentication { status: u16 },

    /// The body could not be read as Atom XML or OData JSON, or SAP refused
    /// both representations.
    #[error("unsupported SAP response format: {detail}")]
    Format { detail: String },

    /// Any other non-success status.
    #[error("SAP returned HTTP {status}")]
    Remote { status: u16 },

    /// The client could not be constructed from its configuration.
    #[error("SAP client misconfigured: {0}")]
    Config(String),
}

impl SapError {
    /// Classify a non-success status after content negotiation is exhausted.
    pub fn from_status(status: StatusCode) -> Self {
        match status.as_u16() {
            401 | 403 => Self::Authentication { status: status.as_u16() },
            406 | 415 => Self::Format {
                detail: format!("server refused both Atom and JSON (HTTP {})", status.as_u16()),
            },
            other => Self::Remote { status: other },
        }
    }

    /// Stable label for logs and API envelopes.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "unavailable",
            Self::Timeout(_) => "timeout",
            Self::Authentication { .. } => "authentication",
            Self::Format { .. } => "format",
            Self::Remote { .. } => "remote",
            Self::Config(_) => "config",
        }
    }

    /// Message safe to hand to the frontend.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable(_) => "SAP backend is not accessible. Please check your network \
                                     connection and SAP server status."
                .to_string(),
            Self::Timeout(_) => {
                "SAP request timed out. The SAP server may be experiencing high load.".to_string()
            }
            Self::Authentication { .. } => {
                "SAP rejected the service credentials. Please contact your administrator."
                    .to_string()
            }
            Self::Format { .. } => "Invalid response format from SAP server.".to_string(),
            Self::Remote { status } => format!("SAP server returned error {status}."),
            Self::Config(_) => "SAP integration is not configured correctly.".to_string(),
        }
    }

    /// Classify a transport failure. `timeout` is the deadline that was in force.
    pub fn from_transport(err: &reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_builder() {
            Self::Config(err.to_string())
        } else {
            Self::Unavailable(err.to_string())
        }
    }

    /// Classify a failure while reading a body SAP already answered with a
    /// success status. The host was reachable, so only a timeout keeps its
    /// own kind; anything else is an unreadable response.
    pub fn from_body(err: &reqwest::Error, timeout: std::time::Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else {
            Self::Format { detail: format!("response body could not be read: {err}") }
        }
    }
}

/// Result alias for SAP operations.
pub type Result<T> = std::result::Result<T, SapError>;
