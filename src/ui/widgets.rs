//! UI widgets for the dataset dashboard.

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame,
};

use crate::data::{Asset, ColumnMatch};
use crate::selection::Selection;

use super::theme::{Severity, Theme};

fn panel_block<'a>(title: String, focused: bool, theme: &Theme) -> Block<'a> {
    let (border_style, title_style) = theme.panel_styles(focused);
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
}

/// Asset list panel widget
pub struct AssetList<'a> {
    assets: &'a [Asset],
    selected: usize,
    theme: &'a Theme,
}

impl<'a> AssetList<'a> {
    pub fn new(assets: &'a [Asset], selected: usize, theme: &'a Theme) -> Self {
        AssetList {
            assets,
            selected,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let items: Vec<ListItem> = self
            .assets
            .iter()
            .map(|a| ListItem::new(a.display_name.clone()))
            .collect();

        let list = List::new(items)
            .block(panel_block(" Datasets ".to_string(), focused, self.theme))
            .highlight_style(self.theme.highlight_style())
            .highlight_symbol("> ");

        let mut state = ListState::default();
        state.select(Some(self.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Multiselect list used for leagues and clubs
pub struct SelectList<'a> {
    title: &'a str,
    options: &'a [String],
    cursor: usize,
    marked: &'a Selection,
    disabled: Option<&'a str>,
    theme: &'a Theme,
}

impl<'a> SelectList<'a> {
    pub fn new(
        title: &'a str,
        options: &'a [String],
        cursor: usize,
        marked: &'a Selection,
        theme: &'a Theme,
    ) -> Self {
        SelectList {
            title,
            options,
            cursor,
            marked,
            disabled: None,
            theme,
        }
    }

    /// Show a note instead of the options
    pub fn disabled(mut self, reason: Option<&'a str>) -> Self {
        self.disabled = reason;
        self
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, focused: bool) {
        let title = if self.marked.is_empty() {
            format!(" {} ({}) ", self.title, self.options.len())
        } else {
            format!(
                " {} ({} of {}) ",
                self.title,
                self.marked.len(),
                self.options.len()
            )
        };
        let block = panel_block(title, focused, self.theme);

        if let Some(reason) = self.disabled {
            let paragraph = Paragraph::new(reason)
                .style(self.theme.dimmed_title_style())
                .wrap(Wrap { trim: true })
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .options
            .iter()
            .map(|option| {
                if self.marked.is_marked(option) {
                    ListItem::new(format!("[x] {option}")).style(self.theme.marked_style())
                } else {
                    ListItem::new(format!("[ ] {option}"))
                }
            })
            .collect();

        let list = List::new(items)
            .block(block)
            .highlight_style(self.theme.highlight_style())
            .highlight_symbol("> ");

        let mut state = ListState::default();
        if !self.options.is_empty() {
            state.select(Some(self.cursor.min(self.options.len() - 1)));
        }
        frame.render_stateful_widget(list, area, &mut state);
    }
}

/// Date input being typed by the user
pub struct DateInput<'a> {
    pub label: &'a str,
    pub buffer: &'a str,
}

/// Summary of the active filters and the prepared export
pub struct FilterPanel<'a> {
    asset: &'a Asset,
    date_range: Option<String>,
    editing: Option<DateInput<'a>>,
    clubs: &'a Selection,
    matches: &'a [ColumnMatch],
    search: Option<&'a str>,
    prepared: Option<String>,
    theme: &'a Theme,
}

impl<'a> FilterPanel<'a> {
    pub fn new(
        asset: &'a Asset,
        date_range: Option<String>,
        editing: Option<DateInput<'a>>,
        clubs: &'a Selection,
        prepared: Option<String>,
        theme: &'a Theme,
    ) -> Self {
        FilterPanel {
            asset,
            date_range,
            editing,
            clubs,
            matches: &[],
            search: None,
            prepared,
            theme,
        }
    }

    /// Show the column matches, and the search being typed if any
    pub fn search(mut self, matches: &'a [ColumnMatch], editing: Option<&'a str>) -> Self {
        self.matches = matches;
        self.search = editing;
        self
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let label = |text: &'static str| Span::styled(text, self.theme.title_style());

        let date_line = match (&self.editing, &self.asset.date_column, &self.date_range) {
            (Some(input), _, _) => Line::from(vec![
                label("Date: "),
                Span::raw(format!("{} ", input.label)),
                Span::styled(format!("{}_", input.buffer), self.theme.highlight_style()),
                Span::raw("  (YYYY-MM-DD, Enter to confirm, Esc to cancel)"),
            ]),
            (None, Some(column), Some(range)) => Line::from(vec![
                label("Date: "),
                Span::raw(format!("{range}  on '{}'", crate::export::friendly_name(column))),
            ]),
            (None, Some(_), None) => Line::from(vec![
                label("Date: "),
                Span::raw("no dates found in this dataset"),
            ]),
            (None, None, _) => Line::from(vec![
                label("Date: "),
                Span::styled("not date-filterable", self.theme.dimmed_title_style()),
            ]),
        };

        let club_line = if !self.asset.is_club_filterable() {
            Line::from(vec![
                label("Clubs: "),
                Span::styled("not club-filterable", self.theme.dimmed_title_style()),
            ])
        } else if self.clubs.is_empty() {
            Line::from(vec![label("Clubs: "), Span::raw("all")])
        } else {
            Line::from(vec![label("Clubs: "), Span::raw(self.clubs.marked().join(", "))])
        };

        let search_line = match self.search {
            Some(buffer) => Line::from(vec![
                label("Search: "),
                Span::styled(format!("{buffer}_"), self.theme.highlight_style()),
                Span::raw("  (COLUMN=VALUE, Enter to add, Esc to cancel)"),
            ]),
            None if self.matches.is_empty() => {
                Line::from(vec![label("Search: "), Span::raw("none [/]")])
            }
            None => {
                let terms: Vec<String> = self.matches.iter().map(|m| m.to_string()).collect();
                Line::from(vec![label("Search: "), Span::raw(terms.join(", "))])
            }
        };

        let export_line = match &self.prepared {
            Some(text) => Line::from(vec![
                label("Export: "),
                Span::styled(text.clone(), self.theme.severity_style(Severity::Success)),
            ]),
            None => Line::from(vec![label("Export: "), Span::raw("nothing prepared [p]")]),
        };

        let lines = vec![
            Line::from(Span::raw(self.asset.description.clone())),
            date_line,
            club_line,
            search_line,
            export_line,
        ];

        let paragraph = Paragraph::new(lines)
            .block(panel_block(
                format!(" {} ", self.asset.display_name),
                false,
                self.theme,
            ))
            .wrap(Wrap { trim: true });

        frame.render_widget(paragraph, area);
    }
}

/// Status bar widget
pub struct StatusBar<'a> {
    asset: Option<&'a str>,
    message: Option<(Severity, &'a str)>,
    theme: &'a Theme,
}

impl<'a> StatusBar<'a> {
    pub fn new(
        asset: Option<&'a str>,
        message: Option<(Severity, &'a str)>,
        theme: &'a Theme,
    ) -> Self {
        StatusBar {
            asset,
            message,
            theme,
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect) {
        let line = match self.message {
            Some((severity, text)) => {
                Line::from(Span::styled(text.to_string(), self.theme.severity_style(severity)))
            }
            None => match self.asset {
                Some(a) => Line::from(format!("transfermarkt-tui: {a} | [h] Help [q] Quit")),
                None => Line::from("transfermarkt-tui | [h] Help [q] Quit"),
            },
        };

        let paragraph = Paragraph::new(line).block(Block::default().borders(Borders::TOP));

        frame.render_widget(paragraph, area);
    }
}
