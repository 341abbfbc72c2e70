//! Runtime Bridge - Connector Layer
//!
//! Abstracts the long-running operations the dashboard supervises. A service
//! reports its phases through a `PhaseReporter`; the runner turns the
//! service's final result into `complete` or `fail`.

mod mock;

pub use mock::{ProgressScript, ScriptStep, SimulatedPerformance, SimulatedService};

use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use thiserror::Error;

use crate::event_log::Severity;

use super::actor::DashboardHandle;
use super::state::{ErrorInfo, Metadata, OperationKind};

// ─────────────────────────────────────────────────────────────────────────────
// Service Traits
// ─────────────────────────────────────────────────────────────────────────────

/// One long-running operation (download, upload, training, prediction)
#[async_trait]
pub trait OperationService: Send + Sync {
    /// Metadata recorded when a run starts
    fn describe(&self) -> Metadata {
        Metadata::new()
    }

    /// Perform the operation, reporting phases through `reporter`.
    /// `Ok` completes the run, `Err` fails it.
    async fn run(&self, reporter: PhaseReporter) -> anyhow::Result<()>;
}

/// Source for the model-performance refresh (`r`)
#[async_trait]
pub trait PerformanceProvider: Send + Sync {
    /// Fetch fresh performance data and return a one-line summary
    async fn refresh(&self) -> anyhow::Result<String>;
}

/// Typed failure a service can return for an enhanced error event
#[derive(Debug, Error)]
#[error("{message}")]
pub struct OperationError {
    pub message: String,
    pub severity: Severity,
    pub category: String,
}

impl OperationError {
    pub fn new(severity: Severity, category: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            severity,
            category: category.into(),
        }
    }
}

impl From<&anyhow::Error> for ErrorInfo {
    fn from(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<OperationError>() {
            Some(op) => ErrorInfo::new(op.message.clone())
                .with_severity(op.severity)
                .with_category(op.category.clone()),
            None => ErrorInfo::new(format!("{:#}", err)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Phase Reporter
// ─────────────────────────────────────────────────────────────────────────────

/// Phase callbacks handed to a running service. Sends are fire-and-forget:
/// once the dashboard has shut down they are dropped silently.
#[derive(Clone)]
pub struct PhaseReporter {
    kind: OperationKind,
    handle: DashboardHandle,
}

impl PhaseReporter {
    pub(crate) fn new(kind: OperationKind, handle: DashboardHandle) -> Self {
        Self { kind, handle }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The service has begun its work; merges `metadata` into the run
    pub fn started(&self, metadata: Metadata) {
        let _ = self.handle.annotate(self.kind, metadata);
    }

    pub fn progress(&self, value: f64, metadata: Metadata) {
        let _ = self.handle.progress(self.kind, value, metadata);
    }

    /// A single downloaded artifact is complete (feeds auto-train)
    pub fn artifact_completed(&self, artifact: impl Into<String>) {
        let _ = self.handle.artifact_completed(artifact);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Service Registry
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct ServiceRegistry {
    services: BTreeMap<OperationKind, Arc<dyn OperationService>>,
    performance: Option<Arc<dyn PerformanceProvider>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, kind: OperationKind, service: impl OperationService + 'static) -> Self {
        self.services.insert(kind, Arc::new(service));
        self
    }

    pub fn with_performance(mut self, provider: impl PerformanceProvider + 'static) -> Self {
        self.performance = Some(Arc::new(provider));
        self
    }

    pub fn get(&self, kind: OperationKind) -> Option<Arc<dyn OperationService>> {
        self.services.get(&kind).cloned()
    }

    pub fn performance(&self) -> Option<Arc<dyn PerformanceProvider>> {
        self.performance.clone()
    }

    /// Simulated services for every kind (demo binary)
    pub fn simulated(fail_rate: f64) -> Self {
        let required = ["train.parquet", "validation.parquet", "live.parquet"];
        Self::new()
            .register(
                OperationKind::Download,
                SimulatedService::new(ProgressScript::jittered(20, 150).with_artifacts(required))
                    .with_name("dataset")
                    .with_fail_rate(fail_rate),
            )
            .register(
                OperationKind::Upload,
                SimulatedService::new(ProgressScript::jittered(10, 200))
                    .with_name("predictions.csv")
                    .with_fail_rate(fail_rate),
            )
            .register(
                OperationKind::Training,
                SimulatedService::new(ProgressScript::jittered(25, 250).with_epochs())
                    .with_name("lgbm-v1")
                    .with_fail_rate(fail_rate),
            )
            .register(
                OperationKind::Prediction,
                SimulatedService::new(ProgressScript::jittered(15, 120))
                    .with_name("lgbm-v1")
                    .with_fail_rate(fail_rate),
            )
            .with_performance(SimulatedPerformance::default())
    }
}

impl std::fmt::Debug for ServiceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceRegistry")
            .field("services", &self.services.keys().collect::<Vec<_>>())
            .field("performance", &self.performance.is_some())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Runner
// ─────────────────────────────────────────────────────────────────────────────

/// Drive one service run to completion and report the outcome. A panic in
/// the service becomes a critical failure instead of a silently dead task.
pub(crate) async fn run_operation(
    service: Arc<dyn OperationService>,
    kind: OperationKind,
    handle: DashboardHandle,
) {
    let reporter = PhaseReporter::new(kind, handle.clone());
    let outcome = AssertUnwindSafe(service.run(reporter)).catch_unwind().await;

    let _ = match outcome {
        Ok(Ok(())) => handle.complete(kind),
        Ok(Err(err)) => handle.fail(kind, ErrorInfo::from(&err)),
        Err(panic) => {
            let reason = panic
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| panic.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "unknown panic".to_string());
            tracing::error!(%kind, "operation service panicked: {}", reason);
            handle.fail(
                kind,
                ErrorInfo::new(format!("service panicked: {}", reason))
                    .with_severity(Severity::Critical)
                    .with_category("panic"),
            )
        }
    };
}

/// Run a performance refresh and log its outcome
pub(crate) async fn run_refresh(provider: Arc<dyn PerformanceProvider>, handle: DashboardHandle) {
    use crate::event_log::NewEvent;

    let event = match AssertUnwindSafe(provider.refresh()).catch_unwind().await {
        Ok(Ok(summary)) => NewEvent::success(format!("Model performance: {}", summary)),
        Ok(Err(err)) => {
            tracing::warn!("performance refresh failed: {:#}", err);
            NewEvent::enhanced_error(
                Severity::Low,
                "performance",
                format!("Performance refresh failed: {:#}", err),
            )
        }
        Err(_) => NewEvent::enhanced_error(
            Severity::High,
            "panic",
            "Performance refresh panicked",
        ),
    };
    let _ = handle.log(event);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_info_from_typed_error() {
        let err = anyhow::Error::new(OperationError::new(
            Severity::Critical,
            "auth",
            "API key rejected",
        ));
        let info = ErrorInfo::from(&err);
        assert_eq!(info.message, "API key rejected");
        assert_eq!(info.severity, Severity::Critical);
        assert_eq!(info.category, "auth");
    }

    #[test]
    fn test_error_info_from_plain_error() {
        let err = anyhow::anyhow!("disk full").context("writing predictions");
        let info = ErrorInfo::from(&err);
        assert_eq!(info.message, "writing predictions: disk full");
        assert_eq!(info.severity, Severity::High);
        assert_eq!(info.category, "operation");
    }

    #[test]
    fn test_simulated_registry_covers_every_kind() {
        let registry = ServiceRegistry::simulated(0.0);
        for kind in OperationKind::ALL {
            assert!(registry.get(kind).is_some(), "missing {}", kind);
        }
        assert!(registry.performance().is_some());
    }
}
