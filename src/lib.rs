//! pipedash - terminal dashboard for a data/training/prediction pipeline
//!
//! Supervises four long-running operations (download, upload, training,
//! prediction) and lets an operator drive them with single keystrokes.

pub mod config;
pub mod error;
pub mod event_log;
pub mod tui;

pub use config::{DashboardConfig, InputMode};
pub use error::{DashError, FixSuggestion, Result};
pub use event_log::{Event, EventKind, EventLog, NewEvent, Severity};
pub use tui::{
    Dashboard, DashboardHandle, DashboardState, OperationKind, OperationStatus, RunningDashboard,
};
