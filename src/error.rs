//! Error types with fix suggestions
//!
//! Every failure the dashboard can observe is turned into an event at the
//! boundary of the loop that produced it. These variants are what those
//! boundaries see before conversion.

use thiserror::Error;

use crate::tui::OperationKind;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, DashError>;

#[derive(Error, Debug)]
pub enum DashError {
    // ─────────────────────────────────────────────────────────────
    // Operation lifecycle (DASH-010 to DASH-011)
    // ─────────────────────────────────────────────────────────────
    #[error("DASH-010: {kind} is already running")]
    AlreadyRunning { kind: OperationKind },

    #[error("DASH-011: {kind} failed: {reason}")]
    OperationFailure { kind: OperationKind, reason: String },

    // ─────────────────────────────────────────────────────────────
    // Terminal (DASH-020 to DASH-021)
    // ─────────────────────────────────────────────────────────────
    #[error("DASH-020: Render failed: {reason}")]
    RenderFailure { reason: String },

    #[error("DASH-021: Raw input unavailable: {reason}")]
    InputSetupFailure { reason: String },

    // ─────────────────────────────────────────────────────────────
    // Setup (DASH-030 to DASH-031)
    // ─────────────────────────────────────────────────────────────
    #[error("DASH-030: Config error: {reason}")]
    ConfigError { reason: String },

    #[error("DASH-031: Dashboard state actor has stopped")]
    ChannelClosed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DashError {
    /// Short stable code, used in log lines
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning { .. } => "DASH-010",
            Self::OperationFailure { .. } => "DASH-011",
            Self::RenderFailure { .. } => "DASH-020",
            Self::InputSetupFailure { .. } => "DASH-021",
            Self::ConfigError { .. } => "DASH-030",
            Self::ChannelClosed => "DASH-031",
            Self::Io(_) => "DASH-099",
        }
    }
}

impl FixSuggestion for DashError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            DashError::AlreadyRunning { .. } => {
                Some("Wait for the current run to finish before starting another")
            }
            DashError::OperationFailure { .. } => Some("Check the event log for the failing step"),
            DashError::RenderFailure { .. } => Some("Check terminal compatibility and size"),
            DashError::InputSetupFailure { .. } => {
                Some("Run inside an interactive terminal or pass --line-input")
            }
            DashError::ConfigError { .. } => {
                Some("Fix the config file or delete it to fall back to defaults")
            }
            DashError::ChannelClosed => None,
            DashError::Io(_) => Some("Check file path and permissions"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_already_running_message() {
        let err = DashError::AlreadyRunning {
            kind: OperationKind::Download,
        };
        assert_eq!(err.to_string(), "DASH-010: Download is already running");
        assert_eq!(err.code(), "DASH-010");
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: DashError = io.into();
        assert!(matches!(err, DashError::Io(_)));
        assert_eq!(err.code(), "DASH-099");
    }
}
