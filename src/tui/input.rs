//! Keystroke input
//!
//! `RawInputReader` runs on a blocking thread and feeds one character at a
//! time to the `CommandDispatcher`. Where the characters come from is an
//! `InputStrategy` chosen once at startup:
//!
//! - `RawTerminalInput`: crossterm raw mode, keys delivered without Enter
//! - `LineBufferedInput`: fallback when raw mode is unavailable
//! - `ChannelInput`: scripted keys for tests and embedding

use std::io::BufRead;
use std::sync::mpsc as std_mpsc;
use std::thread;
use std::time::Duration;

use crossterm::event::{self, Event as TermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use tokio::task::JoinHandle;

use crate::config::InputMode;
use crate::error::{DashError, Result};
use crate::event_log::NewEvent;

use super::actor::DashboardHandle;
use super::events::{CommandDispatcher, KEY_DELETE, KEY_ESCAPE, KEY_INTERRUPT};
use super::terminal::RawModeGuard;

// ─────────────────────────────────────────────────────────────────────────────
// Strategies
// ─────────────────────────────────────────────────────────────────────────────

/// Source of single characters
pub trait InputStrategy: Send {
    fn name(&self) -> &'static str;

    /// Wait at most `timeout` for the next character
    fn next_char(&mut self, timeout: Duration) -> Result<Option<char>>;
}

/// Raw-mode terminal input. Raw mode is released when this is dropped.
pub struct RawTerminalInput {
    _guard: RawModeGuard,
}

impl RawTerminalInput {
    pub fn acquire() -> Result<Self> {
        Ok(Self {
            _guard: RawModeGuard::acquire()?,
        })
    }
}

impl InputStrategy for RawTerminalInput {
    fn name(&self) -> &'static str {
        "raw"
    }

    fn next_char(&mut self, timeout: Duration) -> Result<Option<char>> {
        if !event::poll(timeout)? {
            return Ok(None);
        }
        match event::read()? {
            TermEvent::Key(key) => Ok(key_to_char(key)),
            _ => Ok(None),
        }
    }
}

/// Translate a key press into the character the dispatcher understands
pub fn key_to_char(key: KeyEvent) -> Option<char> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => Some(KEY_INTERRUPT),
        KeyCode::Char(c) => Some(c),
        KeyCode::Enter => Some('\n'),
        KeyCode::Esc => Some(KEY_ESCAPE),
        KeyCode::Backspace => Some(KEY_DELETE),
        KeyCode::Tab => Some('\t'),
        _ => None,
    }
}

/// Line-buffered fallback. A detached thread reads stdin lines and forwards
/// their characters followed by `'\n'`.
pub struct LineBufferedInput {
    rx: std_mpsc::Receiver<char>,
}

impl LineBufferedInput {
    pub fn spawn() -> Self {
        let (tx, rx) = std_mpsc::channel();
        let spawned = thread::Builder::new()
            .name("pipedash-stdin".into())
            .spawn(move || {
                let stdin = std::io::stdin();
                for line in stdin.lock().lines() {
                    let Ok(line) = line else { break };
                    for ch in line.chars().chain(std::iter::once('\n')) {
                        if tx.send(ch).is_err() {
                            return;
                        }
                    }
                }
                tracing::debug!("stdin closed");
            });
        if let Err(e) = spawned {
            tracing::error!("failed to spawn stdin reader: {}", e);
        }
        Self { rx }
    }
}

impl InputStrategy for LineBufferedInput {
    fn name(&self) -> &'static str {
        "line"
    }

    fn next_char(&mut self, timeout: Duration) -> Result<Option<char>> {
        recv_char(&self.rx, timeout)
    }
}

/// Characters pushed through a channel
pub struct ChannelInput {
    rx: std_mpsc::Receiver<char>,
}

impl ChannelInput {
    pub fn new() -> (std_mpsc::Sender<char>, Self) {
        let (tx, rx) = std_mpsc::channel();
        (tx, Self { rx })
    }
}

impl InputStrategy for ChannelInput {
    fn name(&self) -> &'static str {
        "channel"
    }

    fn next_char(&mut self, timeout: Duration) -> Result<Option<char>> {
        recv_char(&self.rx, timeout)
    }
}

fn recv_char(rx: &std_mpsc::Receiver<char>, timeout: Duration) -> Result<Option<char>> {
    match rx.recv_timeout(timeout) {
        Ok(ch) => Ok(Some(ch)),
        Err(std_mpsc::RecvTimeoutError::Timeout) => Ok(None),
        Err(std_mpsc::RecvTimeoutError::Disconnected) => {
            // Source is gone; keep honouring the poll bound without spinning
            thread::sleep(timeout);
            Ok(None)
        }
    }
}

/// Pick the strategy for `mode`. A failed raw-mode setup degrades to
/// line-buffered input and says so in the event log.
pub fn select_strategy(mode: InputMode, handle: &DashboardHandle) -> Box<dyn InputStrategy> {
    match mode {
        InputMode::Raw => match RawTerminalInput::acquire() {
            Ok(raw) => Box::new(raw),
            Err(e) => {
                let reason = match &e {
                    DashError::InputSetupFailure { reason } => reason.clone(),
                    other => other.to_string(),
                };
                tracing::warn!("raw input unavailable: {}", reason);
                let _ = handle.log(
                    NewEvent::warning(format!(
                        "Raw input unavailable ({}), using line input: press Enter after each key",
                        reason
                    ))
                    .with_category("input"),
                );
                Box::new(LineBufferedInput::spawn())
            }
        },
        InputMode::Line => Box::new(LineBufferedInput::spawn()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Reader loop
// ─────────────────────────────────────────────────────────────────────────────

pub struct RawInputReader {
    strategy: Box<dyn InputStrategy>,
    dispatcher: CommandDispatcher,
    poll: Duration,
}

impl RawInputReader {
    pub fn new(strategy: Box<dyn InputStrategy>, dispatcher: CommandDispatcher, poll: Duration) -> Self {
        Self {
            strategy,
            dispatcher,
            poll,
        }
    }

    /// Blocking loop; returns once the dashboard stops running. Dropping
    /// the strategy on return releases raw mode.
    pub fn run(mut self) {
        tracing::debug!(strategy = self.strategy.name(), "input loop started");
        while self.dispatcher.is_running() {
            match self.strategy.next_char(self.poll) {
                Ok(Some(ch)) => {
                    if self.dispatcher.dispatch(ch).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::error!("input read failed: {}", e);
                    let _ = self.dispatcher.handle().log(
                        NewEvent::error(format!("Input read failed: {}", e)).with_category("input"),
                    );
                    thread::sleep(self.poll);
                }
            }
        }
        tracing::debug!("input loop stopped");
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::task::spawn_blocking(move || self.run())
    }
}
