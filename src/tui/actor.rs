//! State Actor - single owner of `DashboardState`
//!
//! Every mutation arrives as a `Message` on one channel and is applied in
//! arrival order by one task, so tracker updates, event appends, auto-train
//! check-and-clear and modal toggles never interleave. After each batch the
//! actor publishes an immutable snapshot on a `watch` channel; readers
//! (renderer, loops, tests) never lock.
//!
//! ```text
//!  input thread ─┐                       ┌─▶ watch<Arc<DashboardState>> ─▶ render loop
//!  op services ──┼─▶ mpsc<Message> ─▶ StateActor                          monitor loop
//!  loops ────────┘                       └─▶ spawns operation/refresh tasks
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use crate::config::DashboardConfig;
use crate::error::{DashError, Result};
use crate::event_log::NewEvent;

use super::auto_train::{AutoTrainCoordinator, AutoTrainDecision};
use super::events::{resolve_key, Action, HELP_LINES};
use super::runtime::{self, ServiceRegistry};
use super::state::{DashboardState, ErrorInfo, Metadata, OperationKind};
use super::tracker::OperationTracker;

/// Upper bound on messages applied before a snapshot is published
const MAX_BATCH: usize = 64;

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub(crate) enum Message {
    Trigger {
        kind: OperationKind,
        reply: Option<oneshot::Sender<Result<()>>>,
    },
    Progress {
        kind: OperationKind,
        progress: f64,
        metadata: Metadata,
    },
    Annotate {
        kind: OperationKind,
        metadata: Metadata,
    },
    Complete {
        kind: OperationKind,
    },
    Fail {
        kind: OperationKind,
        error: ErrorInfo,
    },
    Reset {
        kind: OperationKind,
    },
    ArtifactCompleted {
        artifact: String,
    },
    Key(char),
    Log(NewEvent),
    SetRefreshInterval(Duration),
    SetAutoTrain(bool),
    FinishWizard,
    Tick,
    Quit,
    Sync(oneshot::Sender<Arc<DashboardState>>),
}

// ─────────────────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────────────────

/// Cloneable handle to the state actor. All sends are non-blocking, so it is
/// usable from the blocking input thread as well as from async tasks.
#[derive(Clone, Debug)]
pub struct DashboardHandle {
    tx: mpsc::UnboundedSender<Message>,
    snapshot: watch::Receiver<Arc<DashboardState>>,
}

impl DashboardHandle {
    fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| DashError::ChannelClosed)
    }

    /// Start an operation and wait for the verdict (`AlreadyRunning` or Ok)
    pub async fn trigger(&self, kind: OperationKind) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Trigger {
            kind,
            reply: Some(reply),
        })?;
        rx.await.map_err(|_| DashError::ChannelClosed)?
    }

    /// Start an operation without waiting; the outcome lands in the event log
    pub fn request_trigger(&self, kind: OperationKind) -> Result<()> {
        self.send(Message::Trigger { kind, reply: None })
    }

    pub fn key(&self, ch: char) -> Result<()> {
        self.send(Message::Key(ch))
    }

    pub fn progress(&self, kind: OperationKind, progress: f64, metadata: Metadata) -> Result<()> {
        self.send(Message::Progress {
            kind,
            progress,
            metadata,
        })
    }

    pub fn annotate(&self, kind: OperationKind, metadata: Metadata) -> Result<()> {
        self.send(Message::Annotate { kind, metadata })
    }

    pub fn complete(&self, kind: OperationKind) -> Result<()> {
        self.send(Message::Complete { kind })
    }

    pub fn fail(&self, kind: OperationKind, error: ErrorInfo) -> Result<()> {
        self.send(Message::Fail { kind, error })
    }

    pub fn reset(&self, kind: OperationKind) -> Result<()> {
        self.send(Message::Reset { kind })
    }

    pub fn artifact_completed(&self, artifact: impl Into<String>) -> Result<()> {
        self.send(Message::ArtifactCompleted {
            artifact: artifact.into(),
        })
    }

    pub fn log(&self, event: NewEvent) -> Result<()> {
        self.send(Message::Log(event))
    }

    pub fn set_refresh_interval(&self, interval: Duration) -> Result<()> {
        self.send(Message::SetRefreshInterval(interval))
    }

    pub fn set_auto_train(&self, enabled: bool) -> Result<()> {
        self.send(Message::SetAutoTrain(enabled))
    }

    /// Programmatic exit path for the wizard subsystem
    pub fn finish_wizard(&self) -> Result<()> {
        self.send(Message::FinishWizard)
    }

    pub fn tick(&self) -> Result<()> {
        self.send(Message::Tick)
    }

    pub fn quit(&self) -> Result<()> {
        self.send(Message::Quit)
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<DashboardState> {
        self.snapshot.borrow().clone()
    }

    /// Snapshot taken after every message sent before this call is applied
    pub async fn sync(&self) -> Result<Arc<DashboardState>> {
        let (reply, rx) = oneshot::channel();
        self.send(Message::Sync(reply))?;
        rx.await.map_err(|_| DashError::ChannelClosed)
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<DashboardState>> {
        self.snapshot.clone()
    }

    pub fn is_running(&self) -> bool {
        self.snapshot.borrow().running
    }

    /// Resolves once `running` turns false (or the actor is gone)
    pub async fn stopped(&self) {
        let mut rx = self.snapshot.clone();
        let _ = rx.wait_for(|state| !state.running).await;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Actor
// ─────────────────────────────────────────────────────────────────────────────

pub struct StateActor {
    state: DashboardState,
    rx: mpsc::UnboundedReceiver<Message>,
    tx: mpsc::WeakUnboundedSender<Message>,
    snapshot_tx: watch::Sender<Arc<DashboardState>>,
    snapshot_rx: watch::Receiver<Arc<DashboardState>>,
    services: ServiceRegistry,
}

impl StateActor {
    /// Build the actor and its first handle. Nothing runs until `spawn`.
    pub fn new(config: &DashboardConfig, services: ServiceRegistry) -> (Self, DashboardHandle) {
        let state = DashboardState::new(config);
        let (tx, rx) = mpsc::unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(state.clone()));

        let handle = DashboardHandle {
            tx: tx.clone(),
            snapshot: snapshot_rx.clone(),
        };
        let actor = Self {
            state,
            rx,
            tx: tx.downgrade(),
            snapshot_tx,
            snapshot_rx,
            services,
        };
        (actor, handle)
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Process messages until every handle has been dropped
    pub async fn run(mut self) {
        tracing::debug!("state actor started");
        while let Some(message) = self.rx.recv().await {
            self.apply(message);
            for _ in 1..MAX_BATCH {
                match self.rx.try_recv() {
                    Ok(message) => self.apply(message),
                    Err(_) => break,
                }
            }
            self.publish();
        }
        tracing::debug!("state actor stopped");
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(Arc::new(self.state.clone()));
    }

    /// A handle for tasks the actor spawns; `None` once all handles are gone
    fn own_handle(&self) -> Option<DashboardHandle> {
        self.tx.upgrade().map(|tx| DashboardHandle {
            tx,
            snapshot: self.snapshot_rx.clone(),
        })
    }

    fn apply(&mut self, message: Message) {
        match message {
            Message::Trigger { kind, reply } => {
                let result = self.trigger(kind);
                if let Some(reply) = reply {
                    let _ = reply.send(result);
                }
            }
            Message::Progress {
                kind,
                progress,
                metadata,
            } => {
                OperationTracker::new(&mut self.state).update_progress(kind, progress, metadata);
            }
            Message::Annotate { kind, metadata } => {
                OperationTracker::new(&mut self.state).annotate(kind, metadata);
            }
            Message::Complete { kind } => {
                OperationTracker::new(&mut self.state).complete(kind);
            }
            Message::Fail { kind, error } => {
                OperationTracker::new(&mut self.state).fail(kind, error);
            }
            Message::Reset { kind } => {
                OperationTracker::new(&mut self.state).reset(kind);
            }
            Message::ArtifactCompleted { artifact } => self.artifact_completed(&artifact),
            Message::Key(ch) => {
                let action = resolve_key(ch, &self.state.modal);
                self.apply_action(action);
            }
            Message::Log(event) => {
                self.state.events.append(event);
            }
            Message::SetRefreshInterval(interval) => {
                if self.state.refresh_interval != interval {
                    tracing::debug!(?interval, "refresh interval changed");
                    self.state.refresh_interval = interval;
                }
            }
            Message::SetAutoTrain(enabled) => {
                AutoTrainCoordinator::set_enabled(&mut self.state, enabled);
            }
            Message::FinishWizard => self.apply_action(Action::ExitMode),
            Message::Tick => self.state.tick(),
            Message::Quit => self.apply_action(Action::Quit),
            Message::Sync(reply) => {
                let _ = reply.send(Arc::new(self.state.clone()));
            }
        }
    }

    /// The one start path shared by keys, auto-train and the programmatic
    /// surface
    fn trigger(&mut self, kind: OperationKind) -> Result<()> {
        let service = self.services.get(kind);
        let metadata = service.as_ref().map(|s| s.describe()).unwrap_or_default();

        let handle = self.own_handle();

        let mut tracker = OperationTracker::new(&mut self.state);
        tracker.start(kind, metadata)?;

        match (service, handle) {
            (Some(service), Some(handle)) => {
                tokio::spawn(runtime::run_operation(service, kind, handle));
            }
            (None, _) => {
                tracker.fail(
                    kind,
                    ErrorInfo::new("no service registered").with_category("config"),
                );
            }
            (Some(_), None) => {
                tracker.fail(
                    kind,
                    ErrorInfo::new("dashboard is shutting down").with_category("shutdown"),
                );
            }
        }
        Ok(())
    }

    fn artifact_completed(&mut self, artifact: &str) {
        self.state
            .events
            .append(NewEvent::success(format!("Download complete: {}", artifact)));

        if AutoTrainCoordinator::observe(&mut self.state, artifact) == AutoTrainDecision::Fire {
            // AlreadyRunning is logged by the tracker; the cycle is consumed.
            let _ = self.trigger(OperationKind::Training);
        }
    }

    fn apply_action(&mut self, action: Action) {
        let modal = &mut self.state.modal;
        match action {
            Action::Quit => {
                if self.state.running {
                    tracing::info!("quit requested");
                    self.state.running = false;
                    self.state.events.append(NewEvent::info("Shutting down"));
                }
            }
            Action::Start(kind) => {
                let _ = self.trigger(kind);
            }
            Action::RefreshPerformance => self.refresh_performance(),
            Action::Help => {
                for line in HELP_LINES {
                    self.state.events.append(NewEvent::info(*line));
                }
            }
            Action::EnterWizard => {
                modal.wizard_active = true;
                self.state
                    .events
                    .append(NewEvent::info("Model wizard opened (Esc to close)"));
            }
            Action::EnterCommandMode => {
                modal.command_mode = true;
                modal.command_buffer.clear();
            }
            Action::CommandInput(ch) => modal.command_buffer.push(ch),
            Action::CommandBackspace => {
                modal.command_buffer.pop();
            }
            Action::CommandSubmit => {
                let command = std::mem::take(&mut modal.command_buffer);
                modal.command_mode = false;
                let command = command.trim();
                if !command.is_empty() {
                    self.state
                        .events
                        .append(NewEvent::info(format!("Command: {}", command)));
                }
            }
            Action::ExitMode => {
                modal.command_mode = false;
                modal.wizard_active = false;
                modal.command_buffer.clear();
            }
            Action::None => {}
        }
    }

    fn refresh_performance(&mut self) {
        match (self.services.performance(), self.own_handle()) {
            (Some(provider), Some(handle)) => {
                self.state
                    .events
                    .append(NewEvent::info("Refreshing model performance..."));
                tokio::spawn(runtime::run_refresh(provider, handle));
            }
            (None, _) => {
                self.state
                    .events
                    .append(NewEvent::warning("No performance provider configured"));
            }
            (Some(_), None) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event_log::EventKind;
    use crate::tui::runtime::{ProgressScript, SimulatedService};
    use crate::tui::state::OperationStatus;

    fn spawn_with(services: ServiceRegistry) -> DashboardHandle {
        let (actor, handle) = StateActor::new(&DashboardConfig::default(), services);
        actor.spawn();
        handle
    }

    fn slow_download() -> ServiceRegistry {
        ServiceRegistry::new().register(
            OperationKind::Download,
            SimulatedService::new(ProgressScript::from_values([10.0], Duration::from_secs(60))),
        )
    }

    #[tokio::test]
    async fn test_trigger_twice_reports_already_running() {
        let handle = spawn_with(slow_download());
        handle.trigger(OperationKind::Download).await.unwrap();
        let err = handle.trigger(OperationKind::Download).await.unwrap_err();
        assert!(matches!(err, DashError::AlreadyRunning { .. }));

        let state = handle.sync().await.unwrap();
        assert_eq!(state.running_count(), 1);
        assert_eq!(state.events.count_kind(EventKind::Warning), 1);
    }

    #[tokio::test]
    async fn test_trigger_without_service_fails_run() {
        let handle = spawn_with(ServiceRegistry::new());
        handle.trigger(OperationKind::Upload).await.unwrap();
        let state = handle.sync().await.unwrap();
        let op = state.operation(OperationKind::Upload);
        assert_eq!(op.status, OperationStatus::Failed);
        assert_eq!(op.last_error.as_ref().unwrap().category, "config");
    }

    #[tokio::test]
    async fn test_progress_messages_apply_in_order() {
        let handle = spawn_with(slow_download());
        handle.trigger(OperationKind::Download).await.unwrap();
        for p in [0.0, 40.0, 30.0, 60.0] {
            handle
                .progress(OperationKind::Download, p, Metadata::new())
                .unwrap();
        }
        let state = handle.sync().await.unwrap();
        assert_eq!(state.operation(OperationKind::Download).progress, 60.0);
    }

    #[tokio::test]
    async fn test_snapshot_published_after_batch() {
        let handle = spawn_with(ServiceRegistry::new());
        let mut rx = handle.subscribe();
        handle.log(NewEvent::info("hello")).unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().events.last().unwrap().message, "hello");
    }

    #[tokio::test]
    async fn test_quit_flips_running_once() {
        let handle = spawn_with(ServiceRegistry::new());
        handle.quit().unwrap();
        handle.quit().unwrap();
        handle.stopped().await;
        let state = handle.sync().await.unwrap();
        assert!(!state.running);
        let shutdowns = state
            .events
            .iter()
            .filter(|e| e.message == "Shutting down")
            .count();
        assert_eq!(shutdowns, 1);
    }

    #[tokio::test]
    async fn test_refresh_without_provider_warns() {
        let handle = spawn_with(ServiceRegistry::new());
        handle.key('r').unwrap();
        let state = handle.sync().await.unwrap();
        assert_eq!(
            state.events.last().unwrap().message,
            "No performance provider configured"
        );
    }
}
