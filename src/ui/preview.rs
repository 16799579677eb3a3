//! Tabular preview of a query result.

use ratatui::{
    layout::{Constraint, Rect},
    text::Line,
    widgets::{Block, BorderType, Borders, Paragraph, Row, Table, Wrap},
    Frame,
};

use crate::data::QueryResult;
use crate::export::friendly_name;

use super::theme::{Severity, Theme};

/// Widest a preview column gets, in characters
const MAX_COLUMN_WIDTH: usize = 24;

/// Rows of a query result, scrolled to `offset`
pub struct PreviewTable<'a> {
    result: Option<&'a QueryResult>,
    offset: usize,
    theme: &'a Theme,
}

impl<'a> PreviewTable<'a> {
    pub fn new(result: Option<&'a QueryResult>, offset: usize, theme: &'a Theme) -> Self {
        PreviewTable {
            result,
            offset,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let (border_style, title_style) = self.theme.panel_styles(focused);
        let block = |title: String| {
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_type(if focused {
                    BorderType::Double
                } else {
                    BorderType::Plain
                })
                .border_style(border_style)
                .title_style(title_style)
        };

        let Some(result) = self.result else {
            let hint = Paragraph::new("Select a dataset and filters, then press Enter to preview.")
                .style(self.theme.dimmed_title_style())
                .block(block(" Preview ".to_string()));
            frame.render_widget(hint, area);
            return;
        };

        if let Some(error) = &result.error {
            let mut lines = vec![Line::styled(
                error.to_string(),
                self.theme.severity_style(Severity::Error),
            )];
            if !result.sql.is_empty() {
                lines.push(Line::from(""));
                lines.push(Line::from(result.sql.clone()));
                lines.push(Line::from(format!("params: {}", result.params.join(", "))));
            }
            let paragraph = Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .block(block(" Preview ".to_string()));
            frame.render_widget(paragraph, area);
            return;
        }

        let title = if result.truncated() {
            format!(
                " Preview: {} of {} rows (limited) ",
                result.row_count(),
                result.total_rows
            )
        } else {
            format!(" Preview: {} rows ", result.row_count())
        };

        let table = &result.table;
        let widths: Vec<Constraint> = table
            .columns
            .iter()
            .enumerate()
            .map(|(idx, name)| {
                let values = table
                    .rows
                    .iter()
                    .skip(self.offset)
                    .take(area.height as usize)
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.to_string().chars().count());
                let width = values
                    .chain(std::iter::once(friendly_name(name).chars().count()))
                    .max()
                    .unwrap_or(1)
                    .min(MAX_COLUMN_WIDTH);
                Constraint::Length(width as u16)
            })
            .collect();

        let header = Row::new(table.columns.iter().map(|c| friendly_name(c).to_string()))
            .style(self.theme.header_style());

        let rows = table
            .rows
            .iter()
            .skip(self.offset)
            .take(area.height as usize)
            .map(|row| Row::new(row.iter().map(|cell| cell.to_string())));

        let widget = Table::new(rows, widths)
            .header(header)
            .column_spacing(2)
            .block(block(title));

        frame.render_widget(widget, area);
    }
}
