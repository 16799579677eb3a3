//! Main application logic and TUI event loop.

use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::cli::AppConfig;
use crate::data::{
    Catalog, ClubDirectory, ColumnMatch, DateRange, FilterSpec, QueryResult, Storage, TOP_LEAGUES,
};
use crate::export::{self, ExcelExport, ExportLimits};
use crate::selection::Selection;
use crate::ui::{
    preview::PreviewTable,
    widgets::{AssetList, DateInput, FilterPanel, SelectList, StatusBar},
    HelpOverlay, Severity, Theme,
};

const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Columns suggested when a search starts
const SEARCH_HINT_COLUMNS: usize = 4;

/// Which panel is currently focused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusedPanel {
    Assets,
    Leagues,
    Clubs,
    Preview,
}

impl FocusedPanel {
    fn next(self) -> Self {
        match self {
            FocusedPanel::Assets => FocusedPanel::Leagues,
            FocusedPanel::Leagues => FocusedPanel::Clubs,
            FocusedPanel::Clubs => FocusedPanel::Preview,
            FocusedPanel::Preview => FocusedPanel::Assets,
        }
    }

    fn prev(self) -> Self {
        match self {
            FocusedPanel::Assets => FocusedPanel::Preview,
            FocusedPanel::Leagues => FocusedPanel::Assets,
            FocusedPanel::Clubs => FocusedPanel::Leagues,
            FocusedPanel::Preview => FocusedPanel::Clubs,
        }
    }
}

/// Date range being typed in
#[derive(Debug, Clone, PartialEq, Eq)]
enum DateEdit {
    Start(String),
    End { start: String, buffer: String },
}

/// Move a list cursor by one, wrapping around
fn step(cursor: usize, len: usize, down: bool) -> usize {
    if len == 0 {
        0
    } else if down {
        (cursor + 1) % len
    } else {
        cursor.checked_sub(1).unwrap_or(len - 1)
    }
}

/// Application state
pub struct App {
    // Configuration
    config: AppConfig,
    theme: Theme,

    // Data context
    catalog: Catalog,
    storage: Storage,
    clubs: ClubDirectory,

    // Filters
    selected_asset: usize,
    league_names: Vec<String>,
    league_cursor: usize,
    leagues: Selection,
    club_options: Vec<String>,
    club_cursor: usize,
    club_selection: Selection,
    date_bounds: Option<(NaiveDate, NaiveDate)>,
    date_range: Option<DateRange>,
    date_edit: Option<DateEdit>,
    matches: Vec<ColumnMatch>,
    search_edit: Option<String>,

    // Results
    result: Option<QueryResult>,
    preview_offset: usize,
    prepared: Option<ExcelExport>,

    // UI State
    focused: FocusedPanel,
    show_help: bool,
    should_quit: bool,

    // Message to display in the status bar (non-fatal)
    status: Option<(Severity, String)>,
}

impl App {
    /// Create a new App instance
    pub fn new(config: AppConfig) -> Result<Self> {
        let catalog = Catalog::new(config.data_dir.clone());
        catalog.validate().with_context(|| {
            format!(
                "The dataset in {} is incomplete, pull the data or pass --data-dir",
                catalog.prep_dir().display()
            )
        })?;

        let storage = Storage::new();
        let clubs = ClubDirectory::load(&storage, &catalog);

        let selected_asset = config
            .initial_asset
            .as_deref()
            .and_then(|name| catalog.assets().iter().position(|a| a.name == name))
            .or_else(|| catalog.assets().iter().position(|a| a.name == "games"))
            .unwrap_or(0);

        let mut app = App {
            config,
            theme: Theme::default(),
            catalog,
            storage,
            clubs,
            selected_asset,
            league_names: TOP_LEAGUES.iter().map(|(name, _)| name.to_string()).collect(),
            league_cursor: 0,
            leagues: Selection::new(),
            club_options: Vec::new(),
            club_cursor: 0,
            club_selection: Selection::new(),
            date_bounds: None,
            date_range: None,
            date_edit: None,
            matches: Vec::new(),
            search_edit: None,
            result: None,
            preview_offset: 0,
            prepared: None,
            focused: FocusedPanel::Assets,
            show_help: false,
            should_quit: false,
            status: None,
        };

        if app.clubs.is_empty() {
            app.set_status(
                Severity::Warning,
                "Club data is not available, club filtering is disabled".to_string(),
            );
        }
        app.refresh_club_options();
        app.select_asset(selected_asset);

        Ok(app)
    }

    /// Set a message to display (non-fatal)
    pub fn set_status(&mut self, severity: Severity, message: String) {
        match severity {
            Severity::Error => log::error!("{message}"),
            Severity::Warning => log::warn!("{message}"),
            _ => log::info!("{message}"),
        }
        self.status = Some((severity, message));
    }

    /// Switch asset and reset every filter that belongs to the previous one
    fn select_asset(&mut self, idx: usize) {
        self.selected_asset = idx;
        self.club_selection.clear();
        self.club_cursor = 0;
        self.result = None;
        self.preview_offset = 0;
        self.prepared = None;
        self.date_edit = None;
        self.matches.clear();
        self.search_edit = None;

        let asset = &self.catalog.assets()[idx];
        self.date_bounds = self.storage.date_bounds(asset);
        self.date_range = self
            .date_bounds
            .map(|(first, last)| DateRange::new(first, last));
    }

    /// Rebuild the club list from the league selection
    fn refresh_club_options(&mut self) {
        let codes: Vec<&str> = TOP_LEAGUES
            .iter()
            .filter(|(name, _)| self.leagues.is_marked(name))
            .map(|(_, code)| *code)
            .collect();

        if codes.is_empty() {
            self.club_options = self.clubs.names().to_vec();
        } else {
            let today = Local::now().date_naive();
            match self
                .clubs
                .clubs_for_leagues(&self.storage, &self.catalog, &codes, today)
            {
                Ok(names) if !names.is_empty() => self.club_options = names,
                Ok(_) => {
                    self.club_options = self.clubs.names().to_vec();
                    self.set_status(
                        Severity::Warning,
                        "No clubs found for the selected leagues and recent seasons, showing all clubs"
                            .to_string(),
                    );
                }
                Err(e) => {
                    self.club_options = self.clubs.names().to_vec();
                    self.set_status(Severity::Error, format!("Error fetching clubs for leagues: {e}"));
                }
            }
        }

        let dropped = self.club_selection.prune_to(&self.club_options);
        if dropped > 0 {
            log::info!("Dropped {dropped} selected clubs outside the chosen leagues");
        }
        if self.club_cursor >= self.club_options.len() {
            self.club_cursor = self.club_options.len().saturating_sub(1);
        }
    }

    /// Filters for the current asset as chosen in the UI
    fn current_spec(&self) -> FilterSpec {
        let asset = &self.catalog.assets()[self.selected_asset];
        let club_ids = self.clubs.resolve(&self.club_selection.marked());
        FilterSpec::for_asset(asset, self.date_range, &club_ids).with_matches(self.matches.iter().cloned())
    }

    /// Run the filtered read and show it in the preview
    fn run_query(&mut self) {
        let spec = self.current_spec();
        let asset = &self.catalog.assets()[self.selected_asset];
        let result = self.storage.query(asset, &spec);

        let status = match &result.error {
            Some(e) => (Severity::Error, e.to_string()),
            None if result.table.is_empty() => (
                Severity::Warning,
                "No data matches the current filters".to_string(),
            ),
            None if result.truncated() => (
                Severity::Warning,
                format!(
                    "Found {} rows, limited to {} for performance",
                    result.total_rows,
                    result.row_count()
                ),
            ),
            None => (Severity::Info, format!("{} rows", result.row_count())),
        };
        self.set_status(status.0, status.1);
        self.result = Some(result);
        self.preview_offset = 0;
    }

    /// Query and build the Excel bytes, keeping them until written or cleared
    fn prepare_export(&mut self) {
        self.prepared = None;
        self.run_query();

        let Some(result) = &self.result else {
            return;
        };
        if result.error.is_some() || result.table.is_empty() {
            return;
        }

        let asset = &self.catalog.assets()[self.selected_asset];
        let limits = ExportLimits::for_asset(asset, self.config.max_export_bytes);
        match export::build_excel(
            &self.config.file_prefix,
            &asset.name,
            &result.table,
            limits,
            Local::now().naive_local(),
        ) {
            Ok(prepared) => {
                let mut message = format!(
                    "Prepared {} rows x {} columns ({:.1} MB), press [w] to write",
                    prepared.rows,
                    prepared.columns,
                    prepared.size_mb()
                );
                if let Some(total) = prepared.truncated_from {
                    message.push_str(&format!(", export limited to the first {} of {total} rows", prepared.rows));
                }
                let severity = if prepared.truncated_from.is_some() {
                    Severity::Warning
                } else {
                    Severity::Success
                };
                self.prepared = Some(prepared);
                self.set_status(severity, message);
            }
            Err(e) => self.set_status(Severity::Error, e.to_string()),
        }
    }

    fn write_export(&mut self) {
        let saved = match &self.prepared {
            Some(prepared) => export::save_export(prepared, &self.config.output_dir),
            None => {
                self.set_status(Severity::Info, "Nothing prepared, press [p] first".to_string());
                return;
            }
        };
        match saved {
            Ok(path) => self.set_status(Severity::Success, format!("Saved {}", path.display())),
            Err(e) => self.set_status(Severity::Error, format!("{e:#}")),
        }
    }

    /// Drop caches and reload club data
    fn reload(&mut self) {
        self.storage.clear_cache();
        self.clubs = ClubDirectory::load(&self.storage, &self.catalog);
        self.refresh_club_options();
        self.select_asset(self.selected_asset);
        self.set_status(Severity::Info, "Reloaded club data".to_string());
    }

    fn start_date_edit(&mut self) {
        if !self.catalog.assets()[self.selected_asset].is_date_filterable() {
            self.set_status(Severity::Info, "This dataset is not date-filterable".to_string());
            return;
        }
        let start = self
            .date_range
            .map(|r| r.start().format(crate::data::DATE_FORMAT).to_string())
            .unwrap_or_default();
        self.date_edit = Some(DateEdit::Start(start));
    }

    fn handle_date_input(&mut self, key: KeyCode) {
        let Some(edit) = self.date_edit.take() else {
            return;
        };
        let edit = match (edit, key) {
            (_, KeyCode::Esc) => None,
            (DateEdit::Start(mut buffer), KeyCode::Char(c)) if c.is_ascii_digit() || c == '-' => {
                buffer.push(c);
                Some(DateEdit::Start(buffer))
            }
            (DateEdit::End { start, mut buffer }, KeyCode::Char(c)) if c.is_ascii_digit() || c == '-' => {
                buffer.push(c);
                Some(DateEdit::End { start, buffer })
            }
            (DateEdit::Start(mut buffer), KeyCode::Backspace) => {
                buffer.pop();
                Some(DateEdit::Start(buffer))
            }
            (DateEdit::End { start, mut buffer }, KeyCode::Backspace) => {
                buffer.pop();
                Some(DateEdit::End { start, buffer })
            }
            (DateEdit::Start(start), KeyCode::Enter) => {
                let buffer = self
                    .date_range
                    .map(|r| r.end().format(crate::data::DATE_FORMAT).to_string())
                    .unwrap_or_default();
                Some(DateEdit::End { start, buffer })
            }
            (DateEdit::End { start, buffer }, KeyCode::Enter) => {
                match DateRange::parse(&start, &buffer) {
                    Ok((range, swapped)) => {
                        self.date_range = Some(range);
                        self.prepared = None;
                        if swapped {
                            self.set_status(
                                Severity::Warning,
                                format!("Start date was after end date, swapped to {range}"),
                            );
                        } else {
                            self.set_status(Severity::Info, format!("Date range set to {range}"));
                        }
                        None
                    }
                    Err(e) => {
                        self.set_status(Severity::Error, e.to_string());
                        Some(DateEdit::End { start, buffer })
                    }
                }
            }
            (edit, _) => Some(edit),
        };
        self.date_edit = edit;
    }

    fn start_search(&mut self) {
        let hint = self
            .result
            .as_ref()
            .map(|r| &r.table.columns)
            .filter(|columns| !columns.is_empty())
            .map(|columns| {
                let shown: Vec<&str> = columns
                    .iter()
                    .take(SEARCH_HINT_COLUMNS)
                    .map(String::as_str)
                    .collect();
                format!("Search by column, e.g. {}", shown.join(", "))
            })
            .unwrap_or_else(|| "Search by column, run [r] once to see the columns".to_string());
        self.set_status(Severity::Info, hint);
        self.search_edit = Some(String::new());
    }

    fn handle_search_input(&mut self, key: KeyCode) {
        let Some(mut buffer) = self.search_edit.take() else {
            return;
        };
        match key {
            KeyCode::Esc => return,
            KeyCode::Char(c) => buffer.push(c),
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Enter => match ColumnMatch::parse(&buffer) {
                Ok(m) => {
                    self.set_status(Severity::Info, format!("Searching {m}"));
                    self.matches.push(m);
                    self.prepared = None;
                    return;
                }
                Err(e) => self.set_status(Severity::Error, e.to_string()),
            },
            _ => {}
        }
        self.search_edit = Some(buffer);
    }

    /// Handle keyboard input
    fn handle_input(&mut self, key: KeyCode, _modifiers: KeyModifiers) -> Result<()> {
        if self.date_edit.is_some() {
            self.handle_date_input(key);
            return Ok(());
        }
        if self.search_edit.is_some() {
            self.handle_search_input(key);
            return Ok(());
        }

        // Global shortcuts
        match key {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Char('?') | KeyCode::Char('h') | KeyCode::F(1) => {
                self.show_help = !self.show_help;
                return Ok(());
            }
            KeyCode::Esc if self.show_help => {
                self.show_help = false;
                return Ok(());
            }
            KeyCode::Tab => {
                self.focused = self.focused.next();
                return Ok(());
            }
            KeyCode::BackTab => {
                self.focused = self.focused.prev();
                return Ok(());
            }
            _ => {}
        }

        // If help is shown, don't process other keys
        if self.show_help {
            return Ok(());
        }

        match key {
            KeyCode::Char('r') => {
                self.run_query();
                return Ok(());
            }
            KeyCode::Char('p') => {
                self.prepare_export();
                return Ok(());
            }
            KeyCode::Char('w') => {
                self.write_export();
                return Ok(());
            }
            KeyCode::Char('c') => {
                if self.prepared.take().is_some() {
                    self.set_status(Severity::Success, "Prepared export cleared".to_string());
                }
                return Ok(());
            }
            KeyCode::Char('d') => {
                self.start_date_edit();
                return Ok(());
            }
            KeyCode::Char('D') => {
                self.date_range = self.date_bounds.map(|(first, last)| DateRange::new(first, last));
                self.prepared = None;
                return Ok(());
            }
            KeyCode::Char('R') => {
                self.reload();
                return Ok(());
            }
            KeyCode::Char('/') => {
                self.start_search();
                return Ok(());
            }
            KeyCode::Char('x') => {
                if !self.matches.is_empty() {
                    self.matches.clear();
                    self.prepared = None;
                    self.set_status(Severity::Info, "Search cleared".to_string());
                }
                return Ok(());
            }
            _ => {}
        }

        // Panel-specific navigation
        match self.focused {
            FocusedPanel::Assets => self.handle_asset_navigation(key),
            FocusedPanel::Leagues => self.handle_league_navigation(key),
            FocusedPanel::Clubs => self.handle_club_navigation(key),
            FocusedPanel::Preview => self.handle_preview_navigation(key),
        }

        Ok(())
    }

    fn handle_asset_navigation(&mut self, key: KeyCode) {
        let len = self.catalog.assets().len();
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                self.select_asset(step(self.selected_asset, len, true));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.select_asset(step(self.selected_asset, len, false));
            }
            KeyCode::Enter => {
                self.run_query();
            }
            _ => {}
        }
    }

    fn handle_league_navigation(&mut self, key: KeyCode) {
        let len = self.league_names.len();
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                self.league_cursor = step(self.league_cursor, len, true);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.league_cursor = step(self.league_cursor, len, false);
            }
            KeyCode::Char(' ') => {
                if let Some(name) = self.league_names.get(self.league_cursor) {
                    self.leagues.toggle(name);
                    self.refresh_club_options();
                }
            }
            KeyCode::Char('S') => {
                self.leagues.clear();
                self.refresh_club_options();
            }
            _ => {}
        }
    }

    fn handle_club_navigation(&mut self, key: KeyCode) {
        if !self.catalog.assets()[self.selected_asset].is_club_filterable() {
            return;
        }
        let len = self.club_options.len();
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                self.club_cursor = step(self.club_cursor, len, true);
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.club_cursor = step(self.club_cursor, len, false);
            }
            KeyCode::PageDown => {
                self.club_cursor = (self.club_cursor + 10).min(len.saturating_sub(1));
            }
            KeyCode::PageUp => {
                self.club_cursor = self.club_cursor.saturating_sub(10);
            }
            KeyCode::Char(' ') => {
                if let Some(name) = self.club_options.get(self.club_cursor) {
                    self.club_selection.toggle(name);
                    self.prepared = None;
                }
            }
            KeyCode::Char('S') => {
                self.club_selection.clear();
                self.prepared = None;
            }
            _ => {}
        }
    }

    fn handle_preview_navigation(&mut self, key: KeyCode) {
        let rows = self.result.as_ref().map(|r| r.row_count()).unwrap_or(0);
        match key {
            KeyCode::Down | KeyCode::Char('j') => {
                self.preview_offset = (self.preview_offset + 1).min(rows.saturating_sub(1));
            }
            KeyCode::Up | KeyCode::Char('k') => {
                self.preview_offset = self.preview_offset.saturating_sub(1);
            }
            KeyCode::PageDown => {
                self.preview_offset = (self.preview_offset + 20).min(rows.saturating_sub(1));
            }
            KeyCode::PageUp => {
                self.preview_offset = self.preview_offset.saturating_sub(20);
            }
            KeyCode::Home => {
                self.preview_offset = 0;
            }
            _ => {}
        }
    }

    /// Render the UI
    fn render(&self, frame: &mut ratatui::Frame) {
        let size = frame.area();

        // Main layout: body and status bar
        let main_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(3),    // Body
                Constraint::Length(2), // Status bar
            ])
            .split(size);

        // Body layout: sidebar (left) and content (right)
        let body_chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(34), // Sidebar
                Constraint::Min(40),    // Content
            ])
            .split(main_chunks[0]);

        // Sidebar layout: datasets, leagues, clubs
        let sidebar_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(12), // Datasets
                Constraint::Length(7),  // Leagues
                Constraint::Min(5),     // Clubs
            ])
            .split(body_chunks[0]);

        // Content layout: filter summary and preview
        let content_chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7), // Filters
                Constraint::Min(5),    // Preview
            ])
            .split(body_chunks[1]);

        let asset = &self.catalog.assets()[self.selected_asset];

        AssetList::new(self.catalog.assets(), self.selected_asset, &self.theme)
            .render(frame, sidebar_chunks[0], self.focused == FocusedPanel::Assets);

        SelectList::new(
            "Top leagues, last 20 seasons",
            &self.league_names,
            self.league_cursor,
            &self.leagues,
            &self.theme,
        )
        .render(frame, sidebar_chunks[1], self.focused == FocusedPanel::Leagues);

        let clubs_disabled = if !asset.is_club_filterable() {
            Some("Club filtering is not applicable for this dataset")
        } else if self.club_options.is_empty() {
            Some("No clubs available for filtering")
        } else {
            None
        };
        SelectList::new(
            "Clubs",
            &self.club_options,
            self.club_cursor,
            &self.club_selection,
            &self.theme,
        )
        .disabled(clubs_disabled)
        .render(frame, sidebar_chunks[2], self.focused == FocusedPanel::Clubs);

        let editing = self.date_edit.as_ref().map(|edit| match edit {
            DateEdit::Start(buffer) => DateInput {
                label: "from",
                buffer,
            },
            DateEdit::End { buffer, .. } => DateInput {
                label: "to",
                buffer,
            },
        });
        let prepared = self.prepared.as_ref().map(|p| {
            format!("{} ({} rows, {:.1} MB)", p.filename, p.rows, p.size_mb())
        });
        FilterPanel::new(
            asset,
            self.date_range.map(|r| r.to_string()),
            editing,
            &self.club_selection,
            prepared,
            &self.theme,
        )
        .search(&self.matches, self.search_edit.as_deref())
        .render(frame, content_chunks[0]);

        PreviewTable::new(self.result.as_ref(), self.preview_offset, &self.theme)
            .render(frame, content_chunks[1], self.focused == FocusedPanel::Preview);

        let status = self
            .status
            .as_ref()
            .map(|(severity, text)| (*severity, text.as_str()));
        StatusBar::new(Some(asset.display_name.as_str()), status, &self.theme)
            .render(frame, main_chunks[1]);

        if self.show_help {
            HelpOverlay::new(&self.theme).render(frame, size);
        }
    }
}

/// Restore terminal to normal state
fn restore_terminal() {
    // Best effort cleanup - ignore errors since we may be in a panic
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
}

/// Run the TUI application
pub fn run(config: AppConfig) -> Result<()> {
    // Build the app before touching the terminal so startup errors print normally
    let mut app = App::new(config).context("Failed to initialize application")?;

    enable_raw_mode().context("Failed to enable raw mode")?;
    let mut stdout = io::stdout();
    if let Err(e) = execute!(stdout, EnterAlternateScreen, EnableMouseCapture) {
        restore_terminal();
        return Err(e).context("Failed to setup terminal");
    }
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = match Terminal::new(backend) {
        Ok(t) => t,
        Err(e) => {
            restore_terminal();
            return Err(e).context("Failed to create terminal");
        }
    };

    let result = run_main_loop(&mut terminal, &mut app);

    // Always restore terminal, regardless of result
    restore_terminal();
    terminal.show_cursor().ok();

    result
}

/// Main application loop
fn run_main_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> Result<()> {
    loop {
        terminal.draw(|f| app.render(f))?;

        if event::poll(POLL_INTERVAL)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    if let Err(e) = app.handle_input(key.code, key.modifiers) {
                        app.set_status(Severity::Error, format!("Input error: {e}"));
                    }
                }
            }
        }

        if app.should_quit {
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::testing::fixture_catalog;

    fn test_app() -> (tempfile::TempDir, App) {
        let (dir, catalog) = fixture_catalog();
        let config = AppConfig::from_cli(
            Some(catalog.prep_dir().display().to_string()),
            Some(dir.path().join("out").display().to_string()),
            false,
        );
        let app = App::new(config).unwrap();
        (dir, app)
    }

    fn press(app: &mut App, keys: &[KeyCode]) {
        for key in keys {
            app.handle_input(*key, KeyModifiers::NONE).unwrap();
        }
    }

    #[test]
    fn test_focus_cycles() {
        let mut focus = FocusedPanel::Assets;
        for _ in 0..4 {
            focus = focus.next();
        }
        assert_eq!(focus, FocusedPanel::Assets);
        assert_eq!(FocusedPanel::Assets.prev(), FocusedPanel::Preview);
    }

    #[test]
    fn test_step_wraps() {
        assert_eq!(step(2, 3, true), 0);
        assert_eq!(step(0, 3, false), 2);
        assert_eq!(step(0, 0, true), 0);
    }

    #[test]
    fn test_starts_on_games_with_full_date_range() {
        let (_dir, app) = test_app();
        let asset = &app.catalog.assets()[app.selected_asset];
        assert_eq!(asset.name, "games");
        let range = app.date_range.unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2019, 8, 10).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2021, 3, 1).unwrap());
        assert_eq!(app.club_options.len(), 6);
    }

    #[test]
    fn test_reversed_dates_are_swapped() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('d')]);
        // Clear the seeded start date and type a later one
        press(&mut app, &[KeyCode::Backspace; 10]);
        let start: Vec<KeyCode> = "2020-12-31".chars().map(KeyCode::Char).collect();
        press(&mut app, &start);
        press(&mut app, &[KeyCode::Enter]);
        press(&mut app, &[KeyCode::Backspace; 10]);
        let end: Vec<KeyCode> = "2020-01-01".chars().map(KeyCode::Char).collect();
        press(&mut app, &end);
        press(&mut app, &[KeyCode::Enter]);

        assert!(app.date_edit.is_none());
        let range = app.date_range.unwrap();
        assert_eq!(range.start(), NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert_eq!(range.end(), NaiveDate::from_ymd_opt(2020, 12, 31).unwrap());
        assert_eq!(app.status.as_ref().map(|s| s.0), Some(Severity::Warning));

        press(&mut app, &[KeyCode::Char('r')]);
        assert_eq!(app.result.as_ref().unwrap().row_count(), 3);
    }

    #[test]
    fn test_league_selection_narrows_clubs() {
        let (_dir, mut app) = test_app();
        // Premier League is the first league option
        press(&mut app, &[KeyCode::Tab, KeyCode::Char(' ')]);
        assert_eq!(app.club_options, vec!["Arsenal FC", "Chelsea FC"]);

        press(&mut app, &[KeyCode::Char('S')]);
        assert_eq!(app.club_options.len(), 6);
    }

    #[test]
    fn test_club_filter_and_export_flow() {
        let (dir, mut app) = test_app();
        // Arsenal FC is the first club option
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Char(' ')]);
        assert!(app.club_selection.is_marked("Arsenal FC"));

        press(&mut app, &[KeyCode::Char('p')]);
        let prepared = app.prepared.as_ref().expect("export prepared");
        assert_eq!(prepared.rows, 3);
        assert!(prepared.filename.starts_with("transfermarkt_games_"));

        press(&mut app, &[KeyCode::Char('w')]);
        let written = std::fs::read_dir(dir.path().join("out")).unwrap().count();
        assert_eq!(written, 1);

        press(&mut app, &[KeyCode::Char('c')]);
        assert!(app.prepared.is_none());
    }

    #[test]
    fn test_switching_asset_resets_filters() {
        let (_dir, mut app) = test_app();
        app.matches.push(ColumnMatch::parse("season=2020").unwrap());
        press(&mut app, &[KeyCode::Tab, KeyCode::Tab, KeyCode::Char(' ')]);
        assert!(!app.club_selection.is_empty());

        press(&mut app, &[KeyCode::BackTab, KeyCode::BackTab, KeyCode::Char('j')]);
        let asset = &app.catalog.assets()[app.selected_asset];
        assert_eq!(asset.name, "player_valuations");
        assert!(app.club_selection.is_empty());
        assert!(app.matches.is_empty());
        // No player_valuations.csv in the fixture
        assert!(app.date_range.is_none());
    }

    #[test]
    fn test_search_narrows_preview() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('r'), KeyCode::Char('/')]);
        let hint = app.status.as_ref().map(|s| s.1.clone()).unwrap();
        assert!(hint.contains("game_id, competition_id, season, round"));

        let typed: Vec<KeyCode> = "competition_id=GB1".chars().map(KeyCode::Char).collect();
        press(&mut app, &typed);
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('r')]);
        assert!(app.search_edit.is_none());
        assert_eq!(app.result.as_ref().unwrap().row_count(), 3);

        // A second match narrows further
        press(&mut app, &[KeyCode::Char('/')]);
        let typed: Vec<KeyCode> = "season=2020".chars().map(KeyCode::Char).collect();
        press(&mut app, &typed);
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('r')]);
        assert_eq!(app.result.as_ref().unwrap().row_count(), 1);

        press(&mut app, &[KeyCode::Char('x'), KeyCode::Char('r')]);
        assert!(app.matches.is_empty());
        assert_eq!(app.result.as_ref().unwrap().row_count(), 6);
    }

    #[test]
    fn test_malformed_search_keeps_editing() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('/'), KeyCode::Char('q'), KeyCode::Enter]);
        // 'q' was typed into the search, not taken as quit
        assert!(!app.should_quit);
        assert_eq!(app.search_edit.as_deref(), Some("q"));
        assert_eq!(app.status.as_ref().map(|s| s.0), Some(Severity::Error));

        press(&mut app, &[KeyCode::Esc]);
        assert!(app.search_edit.is_none());
        assert!(app.matches.is_empty());
    }

    #[test]
    fn test_unknown_search_column_reports_error() {
        let (_dir, mut app) = test_app();
        press(&mut app, &[KeyCode::Char('/')]);
        let typed: Vec<KeyCode> = "venue=Emirates".chars().map(KeyCode::Char).collect();
        press(&mut app, &typed);
        press(&mut app, &[KeyCode::Enter, KeyCode::Char('r')]);
        assert!(app.result.as_ref().unwrap().error.is_some());
        assert_eq!(app.status.as_ref().map(|s| s.0), Some(Severity::Error));
    }

    #[test]
    fn test_missing_required_assets_fail_startup() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::from_cli(Some(dir.path().display().to_string()), None, false);
        assert!(App::new(config).is_err());
    }
}
