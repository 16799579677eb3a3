//! Theme configuration for the TUI.

use ratatui::style::{Color, Modifier, Style};

/// How serious a status line message is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// Color theme for the application
#[derive(Debug, Clone)]
pub struct Theme {
    pub bg: Color,
    pub fg: Color,
    pub highlight_bg: Color,
    pub highlight_fg: Color,
    pub border: Color,
    pub title: Color,
    pub marked: Color,
    pub header: Color,
    pub info: Color,
    pub success: Color,
    pub warning: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            bg: Color::Reset,
            fg: Color::White,
            highlight_bg: Color::Rgb(60, 60, 80),
            highlight_fg: Color::White,
            border: Color::Rgb(100, 100, 120),
            title: Color::Cyan,
            marked: Color::Green,
            header: Color::Yellow,
            info: Color::Cyan,
            success: Color::Green,
            warning: Color::Yellow,
            error: Color::Red,
        }
    }
}

impl Theme {
    /// Base surface style used to paint widget backgrounds
    pub fn surface_style(&self) -> Style {
        Style::default().fg(self.fg).bg(self.bg)
    }

    /// Convenience helper returning (border_style, title_style) for focus state
    pub fn panel_styles(&self, focused: bool) -> (Style, Style) {
        if focused {
            (self.focused_border_style(), self.focused_border_style())
        } else {
            (self.border_style(), self.dimmed_title_style())
        }
    }

    /// Get style for highlighted/selected items
    pub fn highlight_style(&self) -> Style {
        Style::default()
            .fg(self.highlight_fg)
            .bg(self.highlight_bg)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for borders
    pub fn border_style(&self) -> Style {
        Style::default().fg(self.border)
    }

    /// Get style for focused panel borders (distinct from normal borders)
    pub fn focused_border_style(&self) -> Style {
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for titles
    pub fn title_style(&self) -> Style {
        Style::default()
            .fg(self.title)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for unfocused/dimmed titles
    pub fn dimmed_title_style(&self) -> Style {
        Style::default()
            .fg(self.border)
            .add_modifier(Modifier::DIM)
    }

    /// Style for marked multiselect entries
    pub fn marked_style(&self) -> Style {
        Style::default().fg(self.marked)
    }

    /// Style for table header cells
    pub fn header_style(&self) -> Style {
        Style::default()
            .fg(self.header)
            .add_modifier(Modifier::BOLD)
    }

    /// Get style for a status message
    pub fn severity_style(&self, severity: Severity) -> Style {
        let color = match severity {
            Severity::Info => self.info,
            Severity::Success => self.success,
            Severity::Warning => self.warning,
            Severity::Error => self.error,
        };
        Style::default().fg(color)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severities_are_distinct() {
        let theme = Theme::default();
        let styles = [
            theme.severity_style(Severity::Info),
            theme.severity_style(Severity::Success),
            theme.severity_style(Severity::Warning),
            theme.severity_style(Severity::Error),
        ];
        assert_ne!(styles[1], styles[2], "Success and warning should differ");
        assert_ne!(styles[2], styles[3], "Warning and error should differ");
        assert_ne!(styles[0], styles[3], "Info and error should differ");
    }

    #[test]
    fn test_focus_changes_border() {
        let theme = Theme::default();
        let (focused, _) = theme.panel_styles(true);
        let (plain, _) = theme.panel_styles(false);
        assert_ne!(focused, plain);
    }
}
