//! Dashboard Theme - colours and symbols for the terminal renderer

use ratatui::style::{Color, Modifier, Style};

use crate::event_log::{EventKind, Severity};

use super::state::{ModalMode, OperationStatus};

/// Colour palette
pub struct DashTheme {
    pub accent: Color,
    pub highlight: Color,
    pub text: Color,
    pub muted: Color,

    pub success_green: Color,
    pub warning_orange: Color,
    pub error_red: Color,
    pub info_blue: Color,
}

impl Default for DashTheme {
    fn default() -> Self {
        Self {
            accent: Color::Rgb(255, 191, 0),     // #FFBF00
            highlight: Color::Rgb(0, 215, 215),  // #00D7D7
            text: Color::Rgb(230, 237, 243),     // #E6EDF3
            muted: Color::Rgb(128, 128, 128),

            success_green: Color::Rgb(63, 185, 80),   // #3FB950
            warning_orange: Color::Rgb(210, 153, 34), // #D29922
            error_red: Color::Rgb(248, 81, 73),       // #F85149
            info_blue: Color::Rgb(88, 166, 255),      // #58A6FF
        }
    }
}

impl DashTheme {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> Style {
        Style::default().fg(self.text)
    }

    pub fn dimmed(&self) -> Style {
        Style::default().fg(self.muted)
    }

    pub fn header(&self) -> Style {
        Style::default()
            .fg(self.highlight)
            .add_modifier(Modifier::BOLD)
    }

    pub fn accent(&self) -> Style {
        Style::default().fg(self.accent)
    }

    pub fn status(&self, status: OperationStatus) -> Style {
        match status {
            OperationStatus::Idle => self.dimmed(),
            OperationStatus::Running => Style::default()
                .fg(self.highlight)
                .add_modifier(Modifier::BOLD),
            OperationStatus::Complete => Style::default().fg(self.success_green),
            OperationStatus::Failed => Style::default()
                .fg(self.error_red)
                .add_modifier(Modifier::BOLD),
        }
    }

    pub fn gauge_color(&self, status: OperationStatus) -> Color {
        match status {
            OperationStatus::Idle => self.muted,
            OperationStatus::Running => self.highlight,
            OperationStatus::Complete => self.success_green,
            OperationStatus::Failed => self.error_red,
        }
    }

    /// Event colour; enhanced errors below High are shown as warnings
    pub fn event(&self, kind: EventKind, severity: Option<Severity>) -> Style {
        let color = match (kind, severity) {
            (EventKind::Error, Some(Severity::Low | Severity::Medium)) => self.warning_orange,
            (EventKind::Error, _) => self.error_red,
            (EventKind::Warning, _) => self.warning_orange,
            (EventKind::Success, _) => self.success_green,
            (EventKind::Info, _) => self.info_blue,
        };
        Style::default().fg(color)
    }

    pub fn mode(&self, mode: ModalMode) -> Style {
        match mode {
            ModalMode::Normal => self.dimmed(),
            ModalMode::CommandMode | ModalMode::WizardActive => Style::default()
                .fg(self.accent)
                .add_modifier(Modifier::BOLD | Modifier::REVERSED),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Icons and Symbols
// ─────────────────────────────────────────────────────────────────────────────

pub mod icons {
    pub const CLOCK: &str = "⏱";
    pub const REFRESH: &str = "↻";
    pub const AUTO_TRAIN: &str = "⚙";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_colors() {
        let theme = DashTheme::new();
        assert_eq!(theme.gauge_color(OperationStatus::Failed), theme.error_red);
        assert_eq!(theme.gauge_color(OperationStatus::Complete), theme.success_green);
        assert_eq!(theme.gauge_color(OperationStatus::Idle), theme.muted);
    }

    #[test]
    fn test_low_severity_error_uses_warning_color() {
        let theme = DashTheme::new();
        assert_eq!(
            theme.event(EventKind::Error, Some(Severity::Low)).fg,
            Some(theme.warning_orange)
        );
        assert_eq!(
            theme.event(EventKind::Error, Some(Severity::Critical)).fg,
            Some(theme.error_red)
        );
        assert_eq!(theme.event(EventKind::Error, None).fg, Some(theme.error_red));
    }
}
