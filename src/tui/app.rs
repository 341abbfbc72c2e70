//! TUI Application - wiring and lifecycle
//!
//! `Dashboard` assembles the state actor and the three loops (monitor,
//! render, input). `RunningDashboard` is what `start` returns: a handle for
//! programmatic control plus the loop tasks to wait on.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::DashboardConfig;
use crate::error::{DashError, Result};
use crate::event_log::NewEvent;

use super::actor::{DashboardHandle, StateActor};
use super::events::CommandDispatcher;
use super::input::{select_strategy, InputStrategy, RawInputReader};
use super::monitor::MonitorLoop;
use super::runtime::ServiceRegistry;
use super::scheduler::{AdaptiveRenderScheduler, Renderer};
use super::state::DashboardState;
use super::widgets::HeadlessRenderer;

/// Dashboard builder
pub struct Dashboard {
    config: DashboardConfig,
    services: ServiceRegistry,
    renderer: Option<Box<dyn Renderer>>,
    input: Option<Box<dyn InputStrategy>>,
}

impl Dashboard {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            services: ServiceRegistry::new(),
            renderer: None,
            input: None,
        }
    }

    pub fn with_services(mut self, services: ServiceRegistry) -> Self {
        self.services = services;
        self
    }

    /// Defaults to `HeadlessRenderer`
    pub fn with_renderer(mut self, renderer: impl Renderer + 'static) -> Self {
        self.renderer = Some(Box::new(renderer));
        self
    }

    /// Defaults to the strategy selected by `config.input.mode`
    pub fn with_input(mut self, input: impl InputStrategy + 'static) -> Self {
        self.input = Some(Box::new(input));
        self
    }

    /// Spawn the actor and all loops. Must be called inside a tokio runtime.
    pub fn start(self) -> Result<RunningDashboard> {
        self.config.validate()?;

        let (actor, handle) = StateActor::new(&self.config, self.services);
        actor.spawn();

        handle.log(NewEvent::info("Dashboard started"))?;
        if self.config.display.help_on_start {
            handle.key('h')?;
        }

        let input = match self.input {
            Some(input) => input,
            None => select_strategy(self.config.input.mode, &handle),
        };
        tracing::info!(input = input.name(), "dashboard started");

        let renderer = self
            .renderer
            .unwrap_or_else(|| Box::new(HeadlessRenderer::new()));

        let loops = vec![
            (
                "monitor",
                MonitorLoop::new(handle.clone(), self.config.refresh.monitor_tick()).spawn(),
            ),
            (
                "render",
                AdaptiveRenderScheduler::new(renderer, handle.clone(), self.config.refresh.clone())
                    .spawn(),
            ),
            (
                "input",
                RawInputReader::new(
                    input,
                    CommandDispatcher::new(handle.clone()),
                    self.config.input.poll(),
                )
                .spawn(),
            ),
        ];

        Ok(RunningDashboard { handle, loops })
    }

    /// Start, stop on `q` or Ctrl+C, and return the final state
    pub async fn run(self) -> Result<Arc<DashboardState>> {
        let running = self.start()?;

        let handle = running.handle().clone();
        tokio::spawn(async move {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if signal.is_ok() {
                        tracing::info!("interrupt received");
                        let _ = handle.quit();
                    }
                }
                _ = handle.stopped() => {}
            }
        });

        running.wait().await
    }
}

pub struct RunningDashboard {
    handle: DashboardHandle,
    loops: Vec<(&'static str, JoinHandle<()>)>,
}

impl RunningDashboard {
    pub fn handle(&self) -> &DashboardHandle {
        &self.handle
    }

    /// Names of loops that have not exited yet
    pub fn live_loops(&self) -> Vec<&'static str> {
        self.loops
            .iter()
            .filter(|(_, task)| !task.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }

    /// Wait for every loop to exit and return the final snapshot.
    /// Operation tasks still in flight are left to finish on their own.
    pub async fn wait(self) -> Result<Arc<DashboardState>> {
        for (name, task) in self.loops {
            if let Err(e) = task.await {
                tracing::error!(name, "loop terminated abnormally: {}", e);
            }
        }
        match self.handle.sync().await {
            Ok(state) => Ok(state),
            Err(DashError::ChannelClosed) => Ok(self.handle.snapshot()),
            Err(e) => Err(e),
        }
    }
}
