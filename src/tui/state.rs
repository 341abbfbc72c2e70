//! DashboardState - Domain Layer
//!
//! The single source of truth for operation status, the event log, modal
//! flags and auto-train progress. Only the state actor holds a mutable
//! reference; everything else sees `Arc<DashboardState>` snapshots.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};

use crate::config::DashboardConfig;
use crate::event_log::{Event, EventLog, Severity};

use super::auto_train::AutoTrainConfig;

/// Free-form operation metadata (file name, speed, epoch, loss, ...)
pub type Metadata = Map<String, Value>;

// ─────────────────────────────────────────────────────────────────────────────
// Core State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct DashboardState {
    pub operations: BTreeMap<OperationKind, OperationState>,
    pub events: EventLog,
    pub running: bool,
    pub modal: ModalState,
    pub auto_train: AutoTrainConfig,
    /// Render cadence currently chosen by the scheduler
    pub refresh_interval: Duration,

    pub started_at: Instant,
    pub uptime: Duration,
}

impl DashboardState {
    pub fn new(config: &DashboardConfig) -> Self {
        let operations = OperationKind::ALL
            .into_iter()
            .map(|kind| (kind, OperationState::default()))
            .collect();

        Self {
            operations,
            events: EventLog::new(config.display.max_events),
            running: true,
            modal: ModalState::default(),
            auto_train: AutoTrainConfig::new(
                config.auto_train.enabled,
                config.auto_train.required_artifacts.iter().cloned(),
            ),
            refresh_interval: config.refresh.slow(),
            started_at: Instant::now(),
            uptime: Duration::ZERO,
        }
    }

    pub fn operation(&self, kind: OperationKind) -> &OperationState {
        // Every kind is inserted at construction and never removed.
        &self.operations[&kind]
    }

    pub(crate) fn operation_mut(&mut self, kind: OperationKind) -> &mut OperationState {
        self.operations.entry(kind).or_default()
    }

    pub fn any_running(&self) -> bool {
        self.operations
            .values()
            .any(|op| op.status == OperationStatus::Running)
    }

    pub fn running_count(&self) -> usize {
        self.operations
            .values()
            .filter(|op| op.status == OperationStatus::Running)
            .count()
    }

    /// Most recent `n` events, oldest first
    pub fn recent_events(&self, n: usize) -> Vec<&Event> {
        self.events.recent(n).collect()
    }

    /// Update elapsed time
    pub fn tick(&mut self) {
        self.uptime = self.started_at.elapsed();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Operations
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKind {
    Download,
    Upload,
    Training,
    Prediction,
}

impl OperationKind {
    pub const ALL: [OperationKind; 4] = [
        OperationKind::Download,
        OperationKind::Upload,
        OperationKind::Training,
        OperationKind::Prediction,
    ];

    pub fn icon(&self) -> &'static str {
        match self {
            Self::Download => "⬇",
            Self::Upload => "⬆",
            Self::Training => "🧠",
            Self::Prediction => "🔮",
        }
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Download => write!(f, "Download"),
            Self::Upload => write!(f, "Upload"),
            Self::Training => write!(f, "Training"),
            Self::Prediction => write!(f, "Prediction"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperationStatus {
    #[default]
    Idle,
    Running,
    Complete,
    Failed,
}

impl std::fmt::Display for OperationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Running => write!(f, "RUNNING"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationState {
    pub status: OperationStatus,
    /// Percentage in [0, 100], non-decreasing within a run
    pub progress: f64,
    pub metadata: Metadata,
    pub last_error: Option<ErrorInfo>,
    pub started_at: Option<Instant>,
    pub finished_at: Option<Instant>,
}

impl OperationState {
    pub fn is_running(&self) -> bool {
        self.status == OperationStatus::Running
    }

    /// Time spent in the current or last run
    pub fn elapsed(&self) -> Option<Duration> {
        let start = self.started_at?;
        Some(match self.finished_at {
            Some(end) => end.saturating_duration_since(start),
            None => start.elapsed(),
        })
    }

    /// Metadata value rendered as plain text (strings without quotes)
    pub fn meta_str(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(|v| match v {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// Description of a failed run, as reported by the operation service
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorInfo {
    pub message: String,
    pub severity: Severity,
    pub category: String,
}

impl ErrorInfo {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity: Severity::High,
            category: "operation".to_string(),
        }
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Modal State
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModalMode {
    #[default]
    Normal,
    CommandMode,
    WizardActive,
}

impl ModalMode {
    /// Returns the mode indicator for the status bar
    pub fn indicator(&self) -> &'static str {
        match self {
            ModalMode::Normal => "N",
            ModalMode::CommandMode => "/",
            ModalMode::WizardActive => "W",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModalState {
    pub command_mode: bool,
    pub wizard_active: bool,
    pub command_buffer: String,
}

impl ModalState {
    pub fn mode(&self) -> ModalMode {
        if self.command_mode {
            ModalMode::CommandMode
        } else if self.wizard_active {
            ModalMode::WizardActive
        } else {
            ModalMode::Normal
        }
    }

    /// Normal single-key commands are suppressed while a sub-mode is active
    pub fn suppresses_commands(&self) -> bool {
        self.mode() != ModalMode::Normal
    }
}
