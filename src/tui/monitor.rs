//! Monitor loop
//!
//! Operation progress arrives from the services through `PhaseReporter`;
//! this loop only keeps time-derived state (uptime) current and stops with
//! everything else.

use std::time::Duration;

use tokio::task::JoinHandle;

use super::actor::DashboardHandle;

pub struct MonitorLoop {
    handle: DashboardHandle,
    tick: Duration,
}

impl MonitorLoop {
    pub fn new(handle: DashboardHandle, tick: Duration) -> Self {
        Self { handle, tick }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    pub async fn run(self) {
        tracing::debug!("monitor loop started");
        while self.handle.is_running() {
            if self.handle.tick().is_err() {
                break;
            }
            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                _ = self.handle.stopped() => break,
            }
        }
        tracing::debug!("monitor loop stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DashboardConfig;
    use crate::tui::actor::StateActor;
    use crate::tui::runtime::ServiceRegistry;

    #[tokio::test]
    async fn test_ticks_advance_uptime() {
        let (actor, handle) = StateActor::new(&DashboardConfig::default(), ServiceRegistry::new());
        actor.spawn();
        let task = MonitorLoop::new(handle.clone(), Duration::from_millis(10)).spawn();

        tokio::time::sleep(Duration::from_millis(60)).await;
        let state = handle.sync().await.unwrap();
        assert!(state.uptime >= Duration::from_millis(30));

        handle.quit().unwrap();
        tokio::time::timeout(Duration::from_millis(150), task)
            .await
            .expect("monitor loop did not stop")
            .unwrap();
    }
}
