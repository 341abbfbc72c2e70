//! Terminal resource handling
//!
//! Raw mode and the alternate screen are process-wide terminal state. They
//! are acquired through guards whose `Drop` restores the terminal, and a
//! panic hook (installed once) restores it before the panic message prints.

use std::io::{self, IsTerminal};
use std::sync::atomic::{AtomicBool, Ordering};

use crossterm::{
    cursor, execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use once_cell::sync::OnceCell;

use crate::error::{DashError, Result};

static PANIC_HOOK: OnceCell<()> = OnceCell::new();
static ALTERNATE_SCREEN: AtomicBool = AtomicBool::new(false);

/// Holds the terminal in raw (unbuffered, no-echo) mode until dropped
#[derive(Debug)]
pub struct RawModeGuard {
    _private: (),
}

impl RawModeGuard {
    /// Enter raw mode. Fails with `InputSetupFailure` when stdin is not a
    /// terminal or the platform refuses.
    pub fn acquire() -> Result<Self> {
        if !io::stdin().is_terminal() {
            return Err(DashError::InputSetupFailure {
                reason: "stdin is not a terminal".into(),
            });
        }
        install_panic_hook();
        terminal::enable_raw_mode().map_err(|e| DashError::InputSetupFailure {
            reason: e.to_string(),
        })?;
        tracing::debug!("raw mode enabled");
        Ok(Self { _private: () })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = terminal::disable_raw_mode() {
            tracing::warn!("failed to restore terminal mode: {}", e);
        } else {
            tracing::debug!("raw mode disabled");
        }
    }
}

/// Holds the alternate screen until dropped
#[derive(Debug)]
pub struct AlternateScreenGuard {
    _private: (),
}

impl AlternateScreenGuard {
    pub fn enter() -> Result<Self> {
        install_panic_hook();
        execute!(io::stdout(), EnterAlternateScreen, cursor::Hide).map_err(|e| {
            DashError::RenderFailure {
                reason: e.to_string(),
            }
        })?;
        ALTERNATE_SCREEN.store(true, Ordering::SeqCst);
        Ok(Self { _private: () })
    }
}

impl Drop for AlternateScreenGuard {
    fn drop(&mut self) {
        leave_alternate_screen();
    }
}

fn leave_alternate_screen() {
    if ALTERNATE_SCREEN.swap(false, Ordering::SeqCst) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

/// Best-effort restore of everything this module may have changed
pub fn restore() {
    if terminal::is_raw_mode_enabled().unwrap_or(false) {
        let _ = terminal::disable_raw_mode();
    }
    leave_alternate_screen();
}

/// Chain a terminal-restoring hook in front of the current panic hook.
/// Safe to call repeatedly; only the first call installs.
pub fn install_panic_hook() {
    PANIC_HOOK.get_or_init(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            restore();
            previous(info);
        }));
    });
}

/// Whether stdout can host the full-screen renderer
pub fn stdout_is_terminal() -> bool {
    io::stdout().is_terminal()
}
