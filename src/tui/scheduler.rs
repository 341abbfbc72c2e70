//! Adaptive render scheduling
//!
//! Renders at the fast interval while any operation is running and at the
//! slow interval otherwise. Between renders the loop sleeps in `tick`
//! increments so a status change or a quit is picked up promptly.

use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use crate::config::RefreshSettings;
use crate::error::DashError;
use crate::event_log::NewEvent;

use super::actor::DashboardHandle;
use super::state::DashboardState;

/// Draws one frame from a read-only snapshot
pub trait Renderer: Send {
    fn render(&mut self, state: &DashboardState) -> anyhow::Result<()>;
}

/// Fast interval when work is in flight, slow interval otherwise
pub fn choose_interval(state: &DashboardState, refresh: &RefreshSettings) -> Duration {
    if state.any_running() {
        refresh.fast()
    } else {
        refresh.slow()
    }
}

pub struct AdaptiveRenderScheduler {
    renderer: Box<dyn Renderer>,
    handle: DashboardHandle,
    refresh: RefreshSettings,
}

impl AdaptiveRenderScheduler {
    pub fn new(renderer: Box<dyn Renderer>, handle: DashboardHandle, refresh: RefreshSettings) -> Self {
        Self {
            renderer,
            handle,
            refresh,
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) {
        tracing::debug!("render loop started");
        let mut last_render: Option<Instant> = None;

        loop {
            let state = self.handle.snapshot();
            if !state.running {
                break;
            }

            let interval = choose_interval(&state, &self.refresh);
            if interval != state.refresh_interval {
                let _ = self.handle.set_refresh_interval(interval);
            }

            if last_render.map_or(true, |at| at.elapsed() >= interval) {
                self.render(&state);
                last_render = Some(Instant::now());
            }

            tokio::select! {
                _ = tokio::time::sleep(self.refresh.tick()) => {}
                _ = self.handle.stopped() => break,
            }
        }
        tracing::debug!("render loop stopped");
    }

    fn render(&mut self, state: &DashboardState) {
        if let Err(e) = self.renderer.render(state) {
            let err = DashError::RenderFailure {
                reason: format!("{:#}", e),
            };
            tracing::error!(code = err.code(), "{}", err);
            let _ = self.handle.log(
                NewEvent::error(format!("Render failed: {:#}", e)).with_category("render"),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::tui::actor::StateActor;
    use crate::tui::runtime::ServiceRegistry;
    use crate::tui::state::{OperationKind, OperationStatus};

    struct FailingRenderer;

    impl Renderer for FailingRenderer {
        fn render(&mut self, _state: &DashboardState) -> anyhow::Result<()> {
            anyhow::bail!("terminal too small")
        }
    }

    #[test]
    fn test_interval_follows_running_operations() {
        let config = DashboardConfig::default();
        let mut state = DashboardState::new(&config);
        assert_eq!(choose_interval(&state, &config.refresh), config.refresh.slow());

        state.operation_mut(OperationKind::Training).status = OperationStatus::Running;
        assert_eq!(choose_interval(&state, &config.refresh), config.refresh.fast());

        state.operation_mut(OperationKind::Training).status = OperationStatus::Complete;
        assert_eq!(choose_interval(&state, &config.refresh), config.refresh.slow());
    }

    #[tokio::test]
    async fn test_render_failure_is_logged_and_loop_continues() {
        let config = DashboardConfig::default();
        let (actor, handle) = StateActor::new(&config, ServiceRegistry::new());
        actor.spawn();

        let refresh = RefreshSettings {
            slow_ms: 20,
            fast_ms: 20,
            tick_ms: 5,
            ..RefreshSettings::default()
        };
        let task = AdaptiveRenderScheduler::new(Box::new(FailingRenderer), handle.clone(), refresh)
            .spawn();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!task.is_finished());

        handle.quit().unwrap();
        tokio::time::timeout(Duration::from_millis(150), task)
            .await
            .expect("render loop did not stop")
            .unwrap();

        let state = handle.sync().await.unwrap();
        let failures = state
            .events
            .iter()
            .filter(|e| e.category.as_deref() == Some("render"))
            .count();
        assert!(failures >= 2, "expected repeated render failures, got {}", failures);
    }
}
