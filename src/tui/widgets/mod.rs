//! TUI Widgets - renderers
//!
//! Rendering is pure: `draw` takes a snapshot and produces ratatui
//! primitives. Business logic stays in the state actor.

use std::io::{self, Stdout};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};

use super::scheduler::Renderer;
use super::state::{DashboardState, ModalMode, OperationKind, OperationStatus};
use super::terminal::AlternateScreenGuard;
use super::theme::{icons, DashTheme};

// ─────────────────────────────────────────────────────────────────────────────
// Renderers
// ─────────────────────────────────────────────────────────────────────────────

/// Full-screen renderer on the alternate screen
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    theme: DashTheme,
    // Dropped after `terminal`, leaving the alternate screen last
    _screen: AlternateScreenGuard,
}

impl TerminalRenderer {
    pub fn new() -> anyhow::Result<Self> {
        let screen = AlternateScreenGuard::enter()?;
        let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        terminal.clear()?;
        Ok(Self {
            terminal,
            theme: DashTheme::new(),
            _screen: screen,
        })
    }
}

impl Renderer for TerminalRenderer {
    fn render(&mut self, state: &DashboardState) -> anyhow::Result<()> {
        let theme = &self.theme;
        self.terminal.draw(|frame| draw(frame, state, theme))?;
        Ok(())
    }
}

/// Counts frames without drawing anything
#[derive(Debug, Clone, Default)]
pub struct HeadlessRenderer {
    frames: Arc<AtomicU64>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> u64 {
        self.frames.load(Ordering::Relaxed)
    }
}

impl Renderer for HeadlessRenderer {
    fn render(&mut self, _state: &DashboardState) -> anyhow::Result<()> {
        self.frames.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Layout
// ─────────────────────────────────────────────────────────────────────────────

/// Draw one dashboard frame
pub fn draw(frame: &mut Frame, state: &DashboardState, theme: &DashTheme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                                  // Header
            Constraint::Length(OperationKind::ALL.len() as u16 + 2), // Operations
            Constraint::Min(3),                                     // Events
            Constraint::Length(1),                                  // Footer
        ])
        .split(frame.area());

    render_header(frame, chunks[0], state, theme);
    render_operations(frame, chunks[1], state, theme);
    render_events(frame, chunks[2], state, theme);
    render_footer(frame, chunks[3], state, theme);
}

fn render_header(frame: &mut Frame, area: Rect, state: &DashboardState, theme: &DashTheme) {
    let mode = state.modal.mode();
    let auto = &state.auto_train;
    let auto_label = if auto.enabled {
        format!(
            "auto-train on ({}/{})",
            auto.completed().len(),
            auto.required().len()
        )
    } else {
        "auto-train off".to_string()
    };

    let mut spans = vec![
        Span::styled("PIPEDASH", theme.header()),
        Span::raw("  │  "),
        Span::styled(
            format!("{} {}", icons::CLOCK, utils::format_duration(state.uptime.as_secs())),
            theme.text(),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} {}ms", icons::REFRESH, state.refresh_interval.as_millis()),
            theme.dimmed(),
        ),
        Span::raw("  │  "),
        Span::styled(format!("{} {}", icons::AUTO_TRAIN, auto_label), theme.accent()),
        Span::raw("  │  "),
        Span::styled(format!(" {} ", mode.indicator()), theme.mode(mode)),
    ];
    if mode == ModalMode::CommandMode {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(
            format!("/{}_", state.modal.command_buffer),
            theme.accent(),
        ));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.dimmed())
        .title(" PIPELINE DASHBOARD ");
    frame.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

fn render_operations(frame: &mut Frame, area: Rect, state: &DashboardState, theme: &DashTheme) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.dimmed())
        .title(" OPERATIONS ");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints(OperationKind::ALL.map(|_| Constraint::Length(1)))
        .split(inner);

    for (kind, row) in OperationKind::ALL.into_iter().zip(rows.iter()) {
        let op = state.operation(kind);
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(26),
                Constraint::Min(10),
                Constraint::Percentage(40),
            ])
            .split(*row);

        let label = Line::from(vec![
            Span::raw(format!(" {} {:<11}", kind.icon(), kind.to_string())),
            Span::styled(format!("{:<9}", op.status), theme.status(op.status)),
        ]);
        frame.render_widget(Paragraph::new(label), cols[0]);

        let gauge = Gauge::default()
            .gauge_style(ratatui::style::Style::default().fg(theme.gauge_color(op.status)))
            .ratio((op.progress / 100.0).clamp(0.0, 1.0))
            .label(format!("{:.0}%", op.progress));
        frame.render_widget(gauge, cols[1]);

        let detail = match (&op.status, &op.last_error) {
            (OperationStatus::Failed, Some(err)) => {
                Span::styled(format!(" {}", err.message), theme.status(op.status))
            }
            _ => Span::styled(format!(" {}", utils::metadata_summary(op)), theme.dimmed()),
        };
        frame.render_widget(Paragraph::new(Line::from(detail)), cols[2]);
    }
}

fn render_events(frame: &mut Frame, area: Rect, state: &DashboardState, theme: &DashTheme) {
    let visible = area.height.saturating_sub(2) as usize;
    let width = area.width.saturating_sub(16) as usize;

    // Most recent last
    let lines: Vec<Line> = state
        .recent_events(visible)
        .into_iter()
        .map(|e| {
            let mut message = e.message.clone();
            if let Some(severity) = e.severity {
                message = format!("{} [{}]", message, severity);
            }
            Line::from(vec![
                Span::styled(e.timestamp.format(" %H:%M:%S ").to_string(), theme.dimmed()),
                Span::styled(e.kind.icon(), theme.event(e.kind, e.severity)),
                Span::raw(" "),
                Span::styled(utils::truncate(&message, width), theme.text()),
            ])
        })
        .collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme.dimmed())
        .title(format!(" EVENTS ({}) ", state.events.len()));
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_footer(frame: &mut Frame, area: Rect, state: &DashboardState, theme: &DashTheme) {
    let hints: &[(&str, &str)] = match state.modal.mode() {
        ModalMode::Normal => &[
            ("q", "uit"),
            ("d", "ownload"),
            ("u", "pload"),
            ("s/t", " train"),
            ("p", "redict"),
            ("r", "efresh"),
            ("h", "elp"),
            ("n", " wizard"),
            ("/", " command"),
        ],
        ModalMode::CommandMode => &[("Enter", " submit"), ("Esc", " cancel")],
        ModalMode::WizardActive => &[("Esc", " close wizard")],
    };

    let mut spans = vec![Span::raw(" ")];
    for (key, rest) in hints {
        spans.push(Span::styled(format!("[{}]", key), theme.accent()));
        spans.push(Span::styled(format!("{}  ", rest), theme.dimmed()));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Common widget utilities
pub mod utils {
    use crate::tui::state::OperationState;

    /// Metadata keys shown next to a gauge, in display order
    const SUMMARY_KEYS: &[&str] = &["file", "model", "name", "epoch", "loss", "speed", "rows"];

    /// Format duration as HH:MM:SS
    pub fn format_duration(secs: u64) -> String {
        format!(
            "{:02}:{:02}:{:02}",
            secs / 3600,
            (secs % 3600) / 60,
            secs % 60
        )
    }

    /// Truncate string with ellipsis (char-aware)
    pub fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else if max_len <= 3 {
            s.chars().take(max_len).collect()
        } else {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        }
    }

    /// `key=value` pairs for the well-known metadata keys
    pub fn metadata_summary(op: &OperationState) -> String {
        SUMMARY_KEYS
            .iter()
            .filter_map(|key| op.meta_str(key).map(|v| format!("{}={}", key, v)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[cfg(test)]
mod tests {
    use super::utils::*;
    use super::*;
    use crate::config::DashboardConfig;
    use crate::event_log::NewEvent;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    fn buffer_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "00:00:00");
        assert_eq!(format_duration(61), "00:01:01");
        assert_eq!(format_duration(3661), "01:01:01");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello...");
        assert_eq!(truncate("hi", 2), "hi");
        assert_eq!(truncate("⬇⬇⬇⬇⬇⬇", 5), "⬇⬇...");
    }

    #[test]
    fn test_metadata_summary_order() {
        let mut state = DashboardState::new(&DashboardConfig::default());
        let op = state.operation_mut(OperationKind::Training);
        op.metadata.insert("loss".into(), json!(0.25));
        op.metadata.insert("epoch".into(), json!(3));
        op.metadata.insert("ignored".into(), json!(true));
        assert_eq!(metadata_summary(op), "epoch=3 loss=0.25");
    }

    #[test]
    fn test_draw_shows_operations_and_events() {
        let mut state = DashboardState::new(&DashboardConfig::default());
        state.operation_mut(OperationKind::Download).status = OperationStatus::Running;
        state.operation_mut(OperationKind::Download).progress = 40.0;
        state.events.append(NewEvent::info("Download started"));

        let mut terminal = Terminal::new(TestBackend::new(100, 20)).unwrap();
        let theme = DashTheme::new();
        terminal.draw(|f| draw(f, &state, &theme)).unwrap();

        let text = buffer_text(&terminal);
        assert!(text.contains("Download"));
        assert!(text.contains("RUNNING"));
        assert!(text.contains("40%"));
        assert!(text.contains("Download started"));
    }

    #[test]
    fn test_headless_renderer_counts_frames() {
        let state = DashboardState::new(&DashboardConfig::default());
        let mut renderer = HeadlessRenderer::new();
        let probe = renderer.clone();
        renderer.render(&state).unwrap();
        renderer.render(&state).unwrap();
        assert_eq!(probe.frames(), 2);
    }
}
