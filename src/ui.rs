// Review screen - the display shell around the triage engine
// Renders both lists from snapshots after every command; all state changes go
// through Triage and export, never through the widgets.

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ledger_triage::{
    export, needs_confirmation, Command, Config, Direction, IngestReport, ListId, Overwrite, Row,
    Triage,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as Split, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use std::collections::BTreeSet;
use std::io;
use tracing::{info, warn};

const PAGE: usize = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Browse,
    /// Export target exists; waiting for y/n
    ConfirmOverwrite,
    Issues,
}

/// Cursor and multi-selection of one pane
#[derive(Debug, Default)]
pub struct Pane {
    pub state: ListState,
    pub selected: BTreeSet<usize>,
}

impl Pane {
    fn cursor(&self) -> Option<usize> {
        self.state.selected()
    }

    /// Keep the cursor inside a list of `len` rows
    fn clamp(&mut self, len: usize) {
        match (self.state.selected(), len) {
            (_, 0) => self.state.select(None),
            (None, _) => self.state.select(Some(0)),
            (Some(i), _) if i >= len => self.state.select(Some(len - 1)),
            _ => {}
        }
    }
}

pub struct App {
    pub triage: Triage,
    pub report: IngestReport,
    pub config: Config,
    pub focus: ListId,
    pub unsorted: Pane,
    pub approved: Pane,
    pub mode: Mode,
    pub status: String,
}

impl App {
    pub fn new(triage: Triage, report: IngestReport, config: Config) -> Self {
        let status = report.summary();
        let mut app = Self {
            triage,
            report,
            config,
            focus: ListId::Unsorted,
            unsorted: Pane::default(),
            approved: Pane::default(),
            mode: Mode::Browse,
            status,
        };
        app.clamp_cursors();
        app
    }

    fn pane(&self, id: ListId) -> &Pane {
        match id {
            ListId::Unsorted => &self.unsorted,
            ListId::Approved => &self.approved,
        }
    }

    fn pane_mut(&mut self, id: ListId) -> &mut Pane {
        match id {
            ListId::Unsorted => &mut self.unsorted,
            ListId::Approved => &mut self.approved,
        }
    }

    fn focused_len(&self) -> usize {
        self.triage.list(self.focus).len()
    }

    fn clamp_cursors(&mut self) {
        let unsorted_len = self.triage.unsorted().len();
        let approved_len = self.triage.approved().len();
        self.unsorted.clamp(unsorted_len);
        self.approved.clamp(approved_len);
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            ListId::Unsorted => ListId::Approved,
            ListId::Approved => ListId::Unsorted,
        };
    }

    pub fn next(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let pane = self.pane_mut(self.focus);
        let i = match pane.cursor() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        pane.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let pane = self.pane_mut(self.focus);
        let i = match pane.cursor() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        pane.state.select(Some(i));
    }

    pub fn page_down(&mut self) {
        let len = self.focused_len();
        if len == 0 {
            return;
        }
        let pane = self.pane_mut(self.focus);
        let i = pane.cursor().map(|i| (i + PAGE).min(len - 1)).unwrap_or(0);
        pane.state.select(Some(i));
    }

    pub fn page_up(&mut self) {
        let pane = self.pane_mut(self.focus);
        let i = pane.cursor().map(|i| i.saturating_sub(PAGE)).unwrap_or(0);
        pane.state.select(Some(i));
    }

    pub fn home(&mut self) {
        if self.focused_len() > 0 {
            self.pane_mut(self.focus).state.select(Some(0));
        }
    }

    pub fn end(&mut self) {
        let len = self.focused_len();
        if len > 0 {
            self.pane_mut(self.focus).state.select(Some(len - 1));
        }
    }

    /// Toggle the row under the cursor; sentinel rows cannot be selected
    pub fn toggle_selection(&mut self) {
        let focus = self.focus;
        let Some(i) = self.pane(focus).cursor() else {
            return;
        };
        if self.triage.list(focus).get(i).map_or(true, Row::is_sentinel) {
            return;
        }
        let pane = self.pane_mut(focus);
        if !pane.selected.remove(&i) {
            pane.selected.insert(i);
        }
    }

    pub fn select_all(&mut self) {
        let focus = self.focus;
        let all: BTreeSet<usize> = self
            .triage
            .list(focus)
            .rows()
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_sentinel())
            .map(|(i, _)| i)
            .collect();
        self.pane_mut(focus).selected = all;
    }

    pub fn clear_selection(&mut self) {
        self.pane_mut(self.focus).selected.clear();
    }

    /// Explicit selection of a pane, or its cursor row when it has focus
    fn selection(&self, id: ListId) -> Vec<usize> {
        let pane = self.pane(id);
        if !pane.selected.is_empty() {
            return pane.selected.iter().copied().collect();
        }
        match (self.focus == id, pane.cursor()) {
            (true, Some(i)) => vec![i],
            _ => Vec::new(),
        }
    }

    /// Drop both panes' selections; indices go stale once either list changes
    fn reset_selections(&mut self) {
        self.unsorted.selected.clear();
        self.approved.selected.clear();
    }

    /// Run a command against the selection of the list it reads from
    fn dispatch(&mut self, command: &Command) -> ledger_triage::Result<usize> {
        let selected = self.selection(Triage::source_of(command));
        let result = self.triage.apply(command, &selected);
        self.reset_selections();
        self.clamp_cursors();
        result
    }

    pub fn move_selection(&mut self, direction: Direction) {
        self.status = match self.dispatch(&Command::Move(direction)) {
            Ok(0) => "Nothing to move".to_string(),
            Ok(n) if direction == Direction::ToApproved => format!("Approved {} rows", n),
            Ok(n) => format!("Returned {} rows to unsorted", n),
            Err(e) => format!("Move failed: {}", e),
        };
    }

    /// Apply palette entry `slot` (0-based) to the approved selection
    pub fn change_category(&mut self, slot: usize) {
        let Some(category) = self.config.categories.get(slot).cloned() else {
            return;
        };
        self.status = match self.dispatch(&Command::ChangeCategory(category.clone())) {
            Ok(n) => format!("Set {} rows to {}", n, category),
            Err(e) => format!("Category change failed: {}", e),
        };
    }

    /// Start an export; asks for confirmation when the target exists
    pub fn request_export(&mut self) {
        if needs_confirmation(&self.config.output_path()) {
            self.mode = Mode::ConfirmOverwrite;
        } else {
            self.run_export(Overwrite::Refuse);
        }
    }

    pub fn answer_overwrite(&mut self, confirmed: bool) {
        self.mode = Mode::Browse;
        if confirmed {
            self.run_export(Overwrite::Confirmed);
        } else {
            info!("export cancelled by user");
            self.status = "Export cancelled, file left unchanged".to_string();
        }
    }

    fn run_export(&mut self, overwrite: Overwrite) {
        let path = self.config.output_path();
        self.status = match export(self.triage.approved(), &path, overwrite) {
            Ok(n) => format!("Exported {} rows to {}", n, path.display()),
            Err(e) => {
                warn!("export failed: {}", e);
                format!("Export failed: {}", e)
            }
        };
        self.reset_selections();
    }

    /// Handle one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        match self.mode {
            Mode::ConfirmOverwrite => {
                match key.code {
                    KeyCode::Char('y') | KeyCode::Char('Y') => self.answer_overwrite(true),
                    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                        self.answer_overwrite(false)
                    }
                    _ => {}
                }
                return false;
            }
            Mode::Issues => {
                if matches!(key.code, KeyCode::Char('i') | KeyCode::Esc | KeyCode::Enter) {
                    self.mode = Mode::Browse;
                }
                return false;
            }
            Mode::Browse => {}
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab | KeyCode::BackTab => self.toggle_focus(),
            KeyCode::Down | KeyCode::Char('j') => self.next(),
            KeyCode::Up | KeyCode::Char('k') => self.previous(),
            KeyCode::PageDown => self.page_down(),
            KeyCode::PageUp => self.page_up(),
            KeyCode::Home => self.home(),
            KeyCode::End => self.end(),
            KeyCode::Char(' ') => self.toggle_selection(),
            KeyCode::Char('a') => self.select_all(),
            KeyCode::Char('c') => self.clear_selection(),
            KeyCode::Right | KeyCode::Char('l') => self.move_selection(Direction::ToApproved),
            KeyCode::Left | KeyCode::Char('h') => self.move_selection(Direction::ToUnapproved),
            KeyCode::Char('e') => self.request_export(),
            KeyCode::Char('i') => self.mode = Mode::Issues,
            KeyCode::Char(d @ '1'..='9') => {
                let slot = d as usize - '1' as usize;
                self.change_category(slot);
            }
            _ => {}
        }
        false
    }
}

pub fn run_ui(app: &mut App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let res = run_app(&mut terminal, app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }
            if app.handle_key(key) {
                return Ok(());
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Split::Vertical)
        .constraints([
            Constraint::Length(3), // Header with palette
            Constraint::Min(0),    // Both lists
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_header(f, chunks[0], app);

    let panes = Layout::default()
        .direction(Split::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);

    render_list(f, panes[0], app, ListId::Unsorted);
    render_list(f, panes[1], app, ListId::Approved);

    render_status_bar(f, chunks[2], app);

    match app.mode {
        Mode::ConfirmOverwrite => render_confirm(f, app),
        Mode::Issues => render_issues(f, app),
        Mode::Browse => {}
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![Span::styled(
        "Categories: ",
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
    )];
    for (i, category) in app.config.categories.iter().enumerate() {
        spans.push(Span::styled(
            format!("{}", i + 1),
            Style::default().fg(Color::Yellow),
        ));
        spans.push(Span::raw(format!(" {}  ", category)));
    }

    spans.push(Span::raw(" |  "));
    let issues = app.report.issues.len();
    let issue_style = if issues == 0 {
        Style::default().fg(Color::Green)
    } else {
        Style::default().fg(Color::Red)
    };
    spans.push(Span::styled(format!("{} issues", issues), issue_style));

    let header = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(" Ledger Triage "),
    );

    f.render_widget(header, area);
}

fn render_list(f: &mut Frame, area: Rect, app: &mut App, id: ListId) {
    let lines = app.triage.rendered(id);
    let selected = app.pane(id).selected.clone();

    let items: Vec<ListItem> = app
        .triage
        .list(id)
        .rows()
        .iter()
        .zip(lines)
        .enumerate()
        .map(|(i, (row, line))| {
            let style = match row {
                Row::Header => Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
                Row::Separator | Row::Blank => Style::default().fg(Color::DarkGray),
                Row::Data(data) if data.amount().is_sign_negative() => {
                    Style::default().fg(Color::Red)
                }
                Row::Data(_) => Style::default().fg(Color::Green),
            };
            let marker = if selected.contains(&i) { "● " } else { "  " };
            let style = if selected.contains(&i) {
                style.add_modifier(Modifier::BOLD)
            } else {
                style
            };
            ListItem::new(format!("{}{}", marker, line)).style(style)
        })
        .collect();

    let (title, border) = match id {
        ListId::Unsorted => (
            format!(" Unsorted ({}) ", app.triage.unsorted().data_len()),
            Color::White,
        ),
        ListId::Approved => (
            format!(" Approved ({}) ", app.triage.approved().data_len()),
            Color::Green,
        ),
    };
    let border = if app.focus == id { Color::Yellow } else { border };

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border))
                .title(title),
        )
        .highlight_style(Style::default().bg(Color::DarkGray))
        .highlight_symbol("→ ");

    f.render_stateful_widget(list, area, &mut app.pane_mut(id).state);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let status_spans = vec![
        Span::styled(
            format!(" Export to: {} ", app.config.output_file),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw("| "),
        Span::styled(app.status.clone(), Style::default().fg(Color::White)),
        Span::raw(" | "),
        Span::styled("Space", Style::default().fg(Color::Yellow)),
        Span::raw(" Select "),
        Span::styled("→/←", Style::default().fg(Color::Yellow)),
        Span::raw(" Move "),
        Span::styled("Tab", Style::default().fg(Color::Yellow)),
        Span::raw(" Pane "),
        Span::styled("e", Style::default().fg(Color::Yellow)),
        Span::raw(" Export "),
        Span::styled("i", Style::default().fg(Color::Yellow)),
        Span::raw(" Issues "),
        Span::styled("q", Style::default().fg(Color::Red)),
        Span::raw(" Quit"),
    ];

    let status_bar = Paragraph::new(Line::from(status_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::White)),
    );

    f.render_widget(status_bar, area);
}

fn render_confirm(f: &mut Frame, app: &App) {
    let area = centered_rect(50, 20, f.size());
    let content = vec![
        Line::from(""),
        Line::from(format!(
            "  The file {} already exists.",
            app.config.output_file
        )),
        Line::from("  Do you want to overwrite it?"),
        Line::from(""),
        Line::from(vec![
            Span::raw("  "),
            Span::styled("y", Style::default().fg(Color::Yellow)),
            Span::raw(" overwrite   "),
            Span::styled("n", Style::default().fg(Color::Yellow)),
            Span::raw(" cancel"),
        ]),
    ];

    let popup = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Confirmation "),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn render_issues(f: &mut Frame, app: &App) {
    let area = centered_rect(80, 60, f.size());
    let mut content = vec![Line::from(Span::styled(
        format!(" {}", app.report.summary()),
        Style::default().fg(Color::Cyan),
    ))];
    for file in &app.report.loaded {
        content.push(Line::from(format!(
            "  loaded {} ({}, {} rows)",
            file.path.display(),
            file.layout.name(),
            file.rows
        )));
    }
    for issue in &app.report.issues {
        content.push(Line::from(Span::styled(
            format!("  {}", issue),
            Style::default().fg(Color::Red),
        )));
    }

    let popup = Paragraph::new(content).wrap(Wrap { trim: false }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Yellow))
            .title(" Ingestion Report "),
    );

    f.render_widget(Clear, area);
    f.render_widget(popup, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Split::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Split::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
