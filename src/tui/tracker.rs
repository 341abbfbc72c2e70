//! Operation Tracker - per-kind lifecycle state machine
//!
//! `Idle → Running → {Complete, Failed}`; a finished run goes back to `Idle`
//! only through `reset`, which `start` performs for the next run. Progress is
//! clamped to [0, 100] and never moves backwards within a run.
//!
//! The tracker borrows `DashboardState` mutably, so it can only be used from
//! inside the state actor.

use std::time::Instant;

use crate::error::{DashError, Result};
use crate::event_log::NewEvent;

use super::state::{DashboardState, ErrorInfo, Metadata, OperationKind, OperationStatus};

/// Progress milestones that produce an event (avoids one event per tick)
const PROGRESS_MILESTONES: [f64; 3] = [25.0, 50.0, 75.0];

/// What happened to a progress report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ProgressUpdate {
    /// Stored; carries the new value
    Applied(f64),
    /// Lower than the stored value; carries the value kept
    Discarded(f64),
    /// The operation is not running
    Ignored,
}

pub struct OperationTracker<'a> {
    state: &'a mut DashboardState,
}

impl<'a> OperationTracker<'a> {
    pub fn new(state: &'a mut DashboardState) -> Self {
        Self { state }
    }

    /// Begin a run. Fails with `AlreadyRunning` (and logs a warning event)
    /// if one is in flight.
    pub fn start(&mut self, kind: OperationKind, metadata: Metadata) -> Result<()> {
        if self.state.operation(kind).is_running() {
            tracing::warn!(%kind, "start ignored: already running");
            self.state.events.append(
                NewEvent::warning(format!("{} already running, request ignored", kind))
                    .with_category("already_running"),
            );
            return Err(DashError::AlreadyRunning { kind });
        }

        self.reset(kind);

        let op = self.state.operation_mut(kind);
        op.status = OperationStatus::Running;
        op.progress = 0.0;
        op.metadata = metadata;
        op.started_at = Some(Instant::now());

        let message = match subject(&op.metadata) {
            Some(subject) => format!("{} started: {}", kind, subject),
            None => format!("{} started", kind),
        };
        tracing::info!(%kind, "operation started");
        self.state.events.append(NewEvent::info(message));
        Ok(())
    }

    /// Record progress. Values are clamped to [0, 100]; values below the
    /// stored progress are discarded. Metadata is merged either way.
    ///
    /// Every accepted value is stored, but an event is only appended when
    /// progress crosses 25, 50 or 75 percent.
    pub fn update_progress(
        &mut self,
        kind: OperationKind,
        progress: f64,
        metadata: Metadata,
    ) -> ProgressUpdate {
        let op = self.state.operation_mut(kind);
        if !op.is_running() {
            tracing::debug!(%kind, progress, "progress ignored: not running");
            return ProgressUpdate::Ignored;
        }

        op.metadata.extend(metadata);

        if progress.is_nan() {
            return ProgressUpdate::Discarded(op.progress);
        }
        let clamped = progress.clamp(0.0, 100.0);
        if clamped < op.progress {
            tracing::debug!(%kind, kept = op.progress, got = clamped, "progress regression discarded");
            return ProgressUpdate::Discarded(op.progress);
        }

        let previous = op.progress;
        op.progress = clamped;
        tracing::debug!(%kind, progress = clamped, "progress");

        if let Some(milestone) = PROGRESS_MILESTONES
            .iter()
            .rev()
            .find(|m| previous < **m && clamped >= **m)
        {
            self.state
                .events
                .append(NewEvent::info(format!("{}: {:.0}%", kind, milestone)));
        }
        ProgressUpdate::Applied(clamped)
    }

    /// Merge metadata without touching progress
    pub fn annotate(&mut self, kind: OperationKind, metadata: Metadata) {
        let op = self.state.operation_mut(kind);
        if op.is_running() {
            op.metadata.extend(metadata);
        }
    }

    /// Mark the run complete. Returns false if it was not running.
    pub fn complete(&mut self, kind: OperationKind) -> bool {
        let op = self.state.operation_mut(kind);
        if !op.is_running() {
            tracing::debug!(%kind, status = %op.status, "complete ignored: not running");
            return false;
        }
        op.status = OperationStatus::Complete;
        op.progress = 100.0;
        op.finished_at = Some(Instant::now());

        let message = match subject(&op.metadata) {
            Some(subject) => format!("{} complete: {}", kind, subject),
            None => format!("{} complete", kind),
        };
        tracing::info!(%kind, "operation complete");
        self.state.events.append(NewEvent::success(message));
        true
    }

    /// Mark the run failed. Returns false if it was not running.
    pub fn fail(&mut self, kind: OperationKind, error: ErrorInfo) -> bool {
        let op = self.state.operation_mut(kind);
        if !op.is_running() {
            tracing::debug!(%kind, status = %op.status, "fail ignored: not running");
            return false;
        }
        op.status = OperationStatus::Failed;
        op.finished_at = Some(Instant::now());

        let err = DashError::OperationFailure {
            kind,
            reason: error.message.clone(),
        };
        tracing::error!(code = err.code(), severity = %error.severity, "{}", err);
        self.state.events.append(NewEvent::enhanced_error(
            error.severity,
            error.category.clone(),
            format!("{} failed: {}", kind, error.message),
        ));
        self.state.operation_mut(kind).last_error = Some(error);
        true
    }

    /// Return a finished run to `Idle`. Running operations are left alone.
    pub fn reset(&mut self, kind: OperationKind) -> bool {
        let op = self.state.operation_mut(kind);
        match op.status {
            OperationStatus::Complete | OperationStatus::Failed => {
                op.status = OperationStatus::Idle;
                op.progress = 0.0;
                op.metadata.clear();
                op.last_error = None;
                op.started_at = None;
                op.finished_at = None;
                true
            }
            OperationStatus::Idle | OperationStatus::Running => false,
        }
    }
}

/// The most descriptive metadata value for event messages
fn subject(metadata: &Metadata) -> Option<String> {
    ["file", "model", "name"]
        .iter()
        .find_map(|key| metadata.get(*key))
        .map(|v| match v.as_str() {
            Some(s) => s.to_string(),
            None => v.to_string(),
        })
}
