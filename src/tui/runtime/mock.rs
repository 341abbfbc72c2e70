//! Simulated services - for testing and demo purposes
//!
//! A `ProgressScript` is the synthetic progress source: tests build
//! deterministic scripts, the demo binary uses jittered ones.

use async_trait::async_trait;
use rand::Rng;
use serde_json::json;
use tokio::time::{self, Duration};

use super::{OperationError, OperationService, PerformanceProvider, PhaseReporter};
use crate::event_log::Severity;
use crate::tui::state::Metadata;

/// One progress report, sent after `delay`
#[derive(Debug, Clone)]
pub struct ScriptStep {
    pub progress: f64,
    pub delay: Duration,
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressScript {
    steps: Vec<ScriptStep>,
    artifacts: Vec<String>,
    fail_at: Option<usize>,
}

impl ProgressScript {
    /// Report each value in order, `delay` apart
    pub fn from_values(values: impl IntoIterator<Item = f64>, delay: Duration) -> Self {
        Self {
            steps: values
                .into_iter()
                .map(|progress| ScriptStep {
                    progress,
                    delay,
                    metadata: Metadata::new(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Evenly spaced progress with randomised delays around `base_ms`
    pub fn jittered(steps: usize, base_ms: u64) -> Self {
        let steps = steps.max(1);
        let mut rng = rand::thread_rng();
        Self {
            steps: (1..=steps)
                .map(|i| ScriptStep {
                    progress: (i as f64 / steps as f64) * 100.0,
                    delay: Duration::from_millis(rng.gen_range(base_ms / 2..=base_ms * 3 / 2)),
                    metadata: Metadata::new(),
                })
                .collect(),
            ..Self::default()
        }
    }

    /// Report these artifacts, in order, after the last step
    pub fn with_artifacts<S: Into<String>>(mut self, artifacts: impl IntoIterator<Item = S>) -> Self {
        self.artifacts = artifacts.into_iter().map(Into::into).collect();
        self
    }

    /// Fail instead of sending step `index`
    pub fn failing_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Attach training-style epoch/loss metadata to every step
    pub fn with_epochs(mut self) -> Self {
        for (i, step) in self.steps.iter_mut().enumerate() {
            let loss = (1.0 / (i as f64 + 2.0) * 1000.0).round() / 1000.0;
            step.metadata.insert("epoch".into(), json!(i + 1));
            step.metadata.insert("loss".into(), json!(loss));
        }
        self
    }

    pub fn steps(&self) -> &[ScriptStep] {
        &self.steps
    }
}

/// Operation service that replays a `ProgressScript`
#[derive(Debug, Clone)]
pub struct SimulatedService {
    script: ProgressScript,
    name: Option<String>,
    fail_rate: f64,
}

impl SimulatedService {
    pub fn new(script: ProgressScript) -> Self {
        Self {
            script,
            name: None,
            fail_rate: 0.0,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Probability in [0, 1] that a run fails at a random step
    pub fn with_fail_rate(mut self, rate: f64) -> Self {
        self.fail_rate = rate.clamp(0.0, 1.0);
        self
    }

    fn pick_failure(&self) -> Option<usize> {
        if self.script.fail_at.is_some() {
            return self.script.fail_at;
        }
        if self.fail_rate <= 0.0 || self.script.steps.is_empty() {
            return None;
        }
        let mut rng = rand::thread_rng();
        rng.gen_bool(self.fail_rate)
            .then(|| rng.gen_range(0..self.script.steps.len()))
    }
}

#[async_trait]
impl OperationService for SimulatedService {
    fn describe(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(name) = &self.name {
            metadata.insert("name".into(), json!(name));
        }
        metadata
    }

    async fn run(&self, reporter: PhaseReporter) -> anyhow::Result<()> {
        let fail_at = self.pick_failure();
        let mut started = Metadata::new();
        started.insert("steps".into(), json!(self.script.steps.len()));
        reporter.started(started);

        for (i, step) in self.script.steps.iter().enumerate() {
            time::sleep(step.delay).await;
            if fail_at == Some(i) {
                return Err(OperationError::new(
                    Severity::Medium,
                    "simulated",
                    format!("simulated failure at step {}", i + 1),
                )
                .into());
            }
            reporter.progress(step.progress, step.metadata.clone());
        }

        for artifact in &self.script.artifacts {
            reporter.artifact_completed(artifact.clone());
        }
        Ok(())
    }
}

/// Performance provider returning made-up correlation scores
#[derive(Debug, Clone, Default)]
pub struct SimulatedPerformance {
    failing: bool,
}

impl SimulatedPerformance {
    pub fn failing() -> Self {
        Self { failing: true }
    }
}

#[async_trait]
impl PerformanceProvider for SimulatedPerformance {
    async fn refresh(&self) -> anyhow::Result<String> {
        time::sleep(Duration::from_millis(50)).await;
        if self.failing {
            anyhow::bail!("performance endpoint unavailable");
        }
        let (corr, mmc) = {
            let mut rng = rand::thread_rng();
            (rng.gen_range(-0.02..0.06), rng.gen_range(-0.01..0.03))
        };
        Ok(format!("corr {:.4}, mmc {:.4}", corr, mmc))
    }
}
