//! TUI Module - Pipeline Dashboard
//!
//! Terminal dashboard supervising download, upload, training and prediction
//! runs, driven by single keystrokes.
//!
//! Architecture:
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                 UI LAYER (widgets/, scheduler.rs)                   │
//! │  Pure rendering from snapshots, at an activity-driven cadence.      │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ watch<Arc<DashboardState>>
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │         DOMAIN LAYER (actor.rs, state.rs, tracker.rs, ...)          │
//! │  One actor owns DashboardState and applies every Message in order.  │
//! └─────────────────────────────────────────────────────────────────────┘
//!                               ▲
//!                               │ mpsc<Message>
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │          CONNECTOR LAYER (runtime/, input.rs, monitor.rs)           │
//! │  Operation services, keystroke input, periodic ticks.               │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

mod actor;
mod app;
mod auto_train;
mod events;
mod input;
mod monitor;
mod scheduler;
mod state;
mod terminal;
mod theme;
mod tracker;

pub mod runtime;
pub mod widgets;

pub use actor::{DashboardHandle, StateActor};
pub use app::{Dashboard, RunningDashboard};
pub use auto_train::{AutoTrainConfig, AutoTrainCoordinator, AutoTrainDecision};
pub use events::{resolve_key, Action, CommandDispatcher, HELP_LINES};
pub use input::{
    key_to_char, select_strategy, ChannelInput, InputStrategy, LineBufferedInput, RawInputReader,
    RawTerminalInput,
};
pub use monitor::MonitorLoop;
pub use scheduler::{choose_interval, AdaptiveRenderScheduler, Renderer};
pub use state::{
    DashboardState, ErrorInfo, Metadata, ModalMode, ModalState, OperationKind, OperationState,
    OperationStatus,
};
pub use terminal::{install_panic_hook, RawModeGuard};
pub use theme::DashTheme;
pub use tracker::{OperationTracker, ProgressUpdate};

use crate::config::DashboardConfig;
use crate::error::Result;

/// Run the dashboard with simulated operation services
pub async fn run(config: DashboardConfig, fail_rate: f64) -> Result<std::sync::Arc<DashboardState>> {
    let dashboard =
        Dashboard::new(config).with_services(runtime::ServiceRegistry::simulated(fail_rate));

    let dashboard = if terminal::stdout_is_terminal() {
        match widgets::TerminalRenderer::new() {
            Ok(renderer) => dashboard.with_renderer(renderer),
            Err(e) => {
                tracing::warn!("terminal renderer unavailable, running headless: {:#}", e);
                dashboard
            }
        }
    } else {
        dashboard
    };

    dashboard.run().await
}
