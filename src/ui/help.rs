//! Help overlay listing the dashboard's keys, grouped by the panel they act on.

use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Padding, Paragraph},
    Frame,
};

use super::theme::Theme;

const INTRO: &str = "Pick a dataset, narrow it, preview it, export it to Excel.";

/// (group, [(keys, action)])
const KEY_GROUPS: &[(&str, &[(&str, &str)])] = &[
    (
        "Panels",
        &[
            ("Tab / S-Tab", "next / previous panel"),
            ("j k ↑ ↓", "move in the focused list"),
            ("Enter", "run the query (datasets panel)"),
        ],
    ),
    (
        "Leagues and clubs",
        &[
            ("space", "mark or unmark"),
            ("S", "unmark everything"),
            ("PgUp PgDn", "jump ten clubs"),
        ],
    ),
    (
        "Filters",
        &[
            ("d / D", "type the date range / reset it"),
            ("/", "search COLUMN=VALUE, repeatable"),
            ("x", "drop every search"),
        ],
    ),
    (
        "Preview and export",
        &[
            ("r", "run the query"),
            ("PgUp PgDn Home", "scroll the preview"),
            ("p / w / c", "prepare / write / discard the workbook"),
        ],
    ),
    (
        "App",
        &[
            ("R", "clear caches, reload clubs"),
            ("? h F1", "toggle this help"),
            ("q", "quit"),
        ],
    ),
];

/// Width of the key column
const KEY_WIDTH: usize = 16;

/// Horizontal padding inside the popup border
const PADDING: u16 = 2;

/// Help overlay showing all keyboard shortcuts
pub struct HelpOverlay<'a> {
    theme: &'a Theme,
}

impl<'a> HelpOverlay<'a> {
    pub fn new(theme: &'a Theme) -> Self {
        HelpOverlay { theme }
    }

    fn lines(&self) -> Vec<Line<'static>> {
        let mut lines = vec![
            Line::from(Span::styled(
                INTRO,
                Style::default().add_modifier(Modifier::ITALIC),
            )),
            Line::from(""),
        ];
        for (group, keys) in KEY_GROUPS {
            lines.push(Line::from(Span::styled(
                *group,
                Style::default().add_modifier(Modifier::BOLD),
            )));
            lines.extend(keys.iter().map(|(key, action)| {
                Line::from(vec![
                    Span::styled(
                        format!("  {key:<KEY_WIDTH$}"),
                        Style::default().fg(self.theme.title),
                    ),
                    Span::raw(*action),
                ])
            }));
        }
        lines
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let lines = self.lines();
        let width = lines.iter().map(Line::width).max().unwrap_or(0) as u16 + 2 * PADDING + 2;
        let height = lines.len() as u16 + 2;
        let popup_area = centered_box(width, height, area);

        frame.render_widget(Clear, popup_area);
        let paragraph = Paragraph::new(lines)
            .block(
                Block::default()
                    .title(" keys ")
                    .title_alignment(Alignment::Center)
                    .borders(Borders::ALL)
                    .border_style(self.theme.border_style())
                    .title_style(self.theme.title_style())
                    .padding(Padding::horizontal(PADDING)),
            )
            .style(self.theme.surface_style());

        frame.render_widget(paragraph, popup_area);
    }
}

/// A `width` x `height` box centered in `area`, shrunk to fit
fn centered_box(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}
