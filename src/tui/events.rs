//! Event Handling - single-keystroke command dispatch
//!
//! `resolve_key` is the pure key → action table. It runs inside the state
//! actor against the live modal flags, so a mode switch and the key after it
//! can never be evaluated out of order. `CommandDispatcher` is the sending
//! side used by the input loop.

use crate::error::Result;

use super::actor::DashboardHandle;
use super::state::{ModalMode, ModalState, OperationKind};

pub const KEY_ESCAPE: char = '\x1b';
pub const KEY_INTERRUPT: char = '\x03';
pub const KEY_BACKSPACE: char = '\x08';
pub const KEY_DELETE: char = '\x7f';

/// Text emitted into the event log by `h`
pub const HELP_LINES: &[&str] = &[
    "Keys: q quit | d download | u upload | s/t train | p predict",
    "      r refresh performance | h help | n model wizard | / command",
    "Keys act immediately, no Enter needed. Esc leaves command/wizard mode.",
];

/// Actions that can be triggered by user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Quit,
    Start(OperationKind),
    RefreshPerformance,
    Help,
    EnterWizard,
    EnterCommandMode,
    CommandInput(char),
    CommandBackspace,
    CommandSubmit,
    /// Leave command or wizard mode
    ExitMode,
    None,
}

/// Map one character to an action under the current modal state
pub fn resolve_key(ch: char, modal: &ModalState) -> Action {
    // Interrupt quits from any mode
    if ch == KEY_INTERRUPT {
        return Action::Quit;
    }

    if !modal.suppresses_commands() {
        return resolve_normal(ch);
    }

    match modal.mode() {
        ModalMode::CommandMode => match ch {
            KEY_ESCAPE => Action::ExitMode,
            '\n' | '\r' => Action::CommandSubmit,
            KEY_BACKSPACE | KEY_DELETE => Action::CommandBackspace,
            c if c.is_control() => Action::None,
            c => Action::CommandInput(c),
        },
        // Wizard: only Escape gets through
        _ => match ch {
            KEY_ESCAPE => Action::ExitMode,
            _ => Action::None,
        },
    }
}

fn resolve_normal(ch: char) -> Action {
    if ch == '/' {
        return Action::EnterCommandMode;
    }
    match ch.to_ascii_lowercase() {
        'q' => Action::Quit,
        'd' => Action::Start(OperationKind::Download),
        'u' => Action::Start(OperationKind::Upload),
        's' | 't' => Action::Start(OperationKind::Training),
        'p' => Action::Start(OperationKind::Prediction),
        'r' => Action::RefreshPerformance,
        'h' => Action::Help,
        'n' => Action::EnterWizard,
        _ => Action::None,
    }
}

/// Hands keystrokes and programmatic triggers to the state actor
#[derive(Clone, Debug)]
pub struct CommandDispatcher {
    handle: DashboardHandle,
}

impl CommandDispatcher {
    pub fn new(handle: DashboardHandle) -> Self {
        Self { handle }
    }

    /// Dispatch one keystroke. Errors only if the dashboard has stopped.
    pub fn dispatch(&self, ch: char) -> Result<()> {
        tracing::trace!(?ch, "key");
        self.handle.key(ch)
    }

    /// Same idempotent start path the keys use
    pub fn trigger(&self, kind: OperationKind) -> Result<()> {
        self.handle.request_trigger(kind)
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn handle(&self) -> &DashboardHandle {
        &self.handle
    }
}
