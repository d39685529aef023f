use std::{io, sync::mpsc as std_mpsc, thread, time::Duration};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use gamelog_core::{
    models::known,
    report::{self, COMPARISON_HEADERS},
    CacheKey, Lookup, MetadataRecord, Origin,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Row, Table, Wrap},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{error, info};

use crate::worker::{WorkerEvent, WorkerRequest};

const TICK_RATE: Duration = Duration::from_millis(250);
const MAX_INPUT_LEN: usize = 80;

#[derive(Debug, Clone)]
struct Theme {
    primary_fg: Color,
    accent: Color,
    muted: Color,
    selection_bg: Color,
    selection_fg: Color,
    success: Color,
    warning: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            primary_fg: Color::White,
            accent: Color::Cyan,
            muted: Color::DarkGray,
            selection_bg: Color::DarkGray,
            selection_fg: Color::White,
            success: Color::Green,
            warning: Color::Yellow,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Focus {
    Subject,
    Platform,
    History,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Subject => Focus::Platform,
            Focus::Platform => Focus::History,
            Focus::History => Focus::Subject,
        }
    }

    fn previous(self) -> Self {
        match self {
            Focus::Subject => Focus::History,
            Focus::Platform => Focus::Subject,
            Focus::History => Focus::Platform,
        }
    }
}

/// Single-line text input with a character-based cursor.
#[derive(Debug, Clone, Default)]
struct InputField {
    input: String,
    cursor: usize,
}

impl InputField {
    fn char_len(&self) -> usize {
        self.input.chars().count()
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.input
            .char_indices()
            .nth(char_index)
            .map(|(idx, _)| idx)
            .unwrap_or(self.input.len())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.char_len() as isize;
        self.cursor = (self.cursor as isize + delta).clamp(0, len) as usize;
    }

    fn move_home(&mut self) {
        self.cursor = 0;
    }

    fn move_end(&mut self) {
        self.cursor = self.char_len();
    }

    fn insert(&mut self, ch: char) {
        if self.char_len() >= MAX_INPUT_LEN || ch.is_control() {
            return;
        }
        let idx = self.byte_index(self.cursor);
        self.input.insert(idx, ch);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let idx = self.byte_index(self.cursor);
            self.input.remove(idx);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.char_len() {
            let idx = self.byte_index(self.cursor);
            self.input.remove(idx);
        }
    }

    /// Trimmed contents, `None` when blank.
    fn value(&self) -> Option<String> {
        let trimmed = self.input.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }
}

#[derive(Debug, Clone)]
struct HistoryEntry {
    subject: String,
    platform: Option<String>,
    lookup: Lookup,
    at: DateTime<Local>,
}

impl HistoryEntry {
    fn cache_key(&self) -> CacheKey {
        CacheKey::new(&self.subject, self.platform.as_deref())
    }

    fn label(&self) -> String {
        match &self.platform {
            Some(platform) => format!("{} ({platform})", self.lookup.record.display_title()),
            None => self.lookup.record.display_title(),
        }
    }
}

pub enum AppEvent {
    Input(Event),
    Tick,
    Worker(WorkerEvent),
}

/// High-level application state for the lookup console.
pub struct GamelogApp {
    worker: std_mpsc::Sender<WorkerRequest>,
    state: UiState,
    theme: Theme,
}

impl GamelogApp {
    pub fn new(worker: std_mpsc::Sender<WorkerRequest>) -> Self {
        Self {
            worker,
            state: UiState::default(),
            theme: Theme::default(),
        }
    }

    pub async fn run(
        &mut self,
        mut event_rx: mpsc::Receiver<AppEvent>,
        event_tx: mpsc::Sender<AppEvent>,
    ) -> Result<()> {
        let mut stdout = io::stdout();
        enable_raw_mode().context("failed to enter raw mode")?;
        execute!(stdout, EnterAlternateScreen).context("failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed to create terminal")?;
        terminal.clear()?;

        spawn_input_thread(event_tx);

        loop {
            terminal.draw(|frame| self.draw(frame))?;
            if self.state.should_quit {
                break;
            }
            let maybe_event = event_rx.recv().await;
            if !self.process_app_event(maybe_event) {
                break;
            }
        }

        restore_terminal(&mut terminal)
    }

    fn process_app_event(&mut self, maybe_event: Option<AppEvent>) -> bool {
        match maybe_event {
            Some(AppEvent::Input(event)) => {
                if let Err(err) = self.handle_input(event) {
                    self.state.set_status(format!("Error: {err}"));
                }
                true
            }
            Some(AppEvent::Tick) => {
                self.handle_tick();
                true
            }
            Some(AppEvent::Worker(event)) => {
                self.handle_worker_event(event);
                true
            }
            None => false,
        }
    }

    fn handle_tick(&mut self) {
        if self.state.pending {
            self.state.spinner = self.state.spinner.wrapping_add(1);
        }
    }

    fn handle_worker_event(&mut self, event: WorkerEvent) {
        match event {
            WorkerEvent::Ready {
                provider,
                online,
                cached,
            } => {
                self.state.cached_entries = cached;
                let status = match (&provider, online) {
                    (Some(name), true) => format!("Connected to {name} • {cached} cached lookups"),
                    (Some(name), false) => {
                        format!("{name} did not answer the probe; running in limited mode")
                    }
                    (None, _) => "No API key configured; only cached lookups are available"
                        .to_string(),
                };
                self.state.provider = provider;
                self.state.online = online;
                self.state.set_status(status);
            }
            WorkerEvent::LookupFinished {
                subject,
                platform,
                lookup,
                cached,
            } => {
                self.state.pending = false;
                self.state.cached_entries = cached;
                let status = match lookup.origin {
                    Origin::Cache => format!("Using cached information for {subject}"),
                    Origin::Service => format!("Fetched information for {subject}"),
                    Origin::Fallback => format!("No information available for {subject}"),
                };
                info!(%subject, origin = ?lookup.origin, "lookup shown");
                self.state.push_history(HistoryEntry {
                    subject,
                    platform,
                    lookup,
                    at: Local::now(),
                });
                self.state.set_status(status);
            }
            WorkerEvent::CacheCleared => {
                self.state.cached_entries = 0;
                self.state.set_status("Lookup cache cleared".to_string());
            }
        }
    }

    fn handle_input(&mut self, event: Event) -> Result<()> {
        let Event::Key(key) = event else {
            return Ok(());
        };
        if key.modifiers == KeyModifiers::CONTROL {
            match key.code {
                KeyCode::Char('c') => {
                    self.state.should_quit = true;
                    return Ok(());
                }
                KeyCode::Char('t') => {
                    self.state.show_compare = !self.state.show_compare;
                    return Ok(());
                }
                KeyCode::Char('x') => {
                    self.state.confirm_clear = true;
                    return Ok(());
                }
                _ => {}
            }
        }
        if self.state.confirm_clear {
            return self.handle_confirm_key(key);
        }
        match key.code {
            KeyCode::Esc => self.state.should_quit = true,
            KeyCode::Tab => self.state.focus = self.state.focus.next(),
            KeyCode::BackTab => self.state.focus = self.state.focus.previous(),
            _ => match self.state.focus {
                Focus::Subject | Focus::Platform => self.handle_field_key(key)?,
                Focus::History => self.handle_history_key(key),
            },
        }
        Ok(())
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> Result<()> {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.state.confirm_clear = false;
                self.send(WorkerRequest::ClearCache)?;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.state.confirm_clear = false;
                self.state.set_status("Cache left untouched".to_string());
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_field_key(&mut self, key: KeyEvent) -> Result<()> {
        if key.code == KeyCode::Enter {
            return self.submit_lookup();
        }
        let field = match self.state.focus {
            Focus::Platform => &mut self.state.platform,
            _ => &mut self.state.subject,
        };
        match key.code {
            KeyCode::Left => field.move_cursor(-1),
            KeyCode::Right => field.move_cursor(1),
            KeyCode::Home => field.move_home(),
            KeyCode::End => field.move_end(),
            KeyCode::Backspace => field.backspace(),
            KeyCode::Delete => field.delete(),
            KeyCode::Char(ch) => {
                if key.modifiers.is_empty() || key.modifiers == KeyModifiers::SHIFT {
                    field.insert(ch);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_history_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('q') if key.modifiers.is_empty() => self.state.should_quit = true,
            KeyCode::Char('j') | KeyCode::Down => self.state.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.state.move_cursor(-1),
            KeyCode::Home => self.state.history_cursor = 0,
            KeyCode::End => self.state.move_cursor(isize::MAX),
            _ => {}
        }
    }

    fn submit_lookup(&mut self) -> Result<()> {
        if self.state.pending {
            self.state.set_status("A lookup is already running".to_string());
            return Ok(());
        }
        let Some(subject) = self.state.subject.value() else {
            self.state.set_status("Enter a game name first".to_string());
            return Ok(());
        };
        let platform = self.state.platform.value();
        self.send(WorkerRequest::Lookup {
            subject: subject.clone(),
            platform,
        })?;
        self.state.pending = true;
        self.state.set_status(format!("Looking up {subject}..."));
        Ok(())
    }

    fn send(&self, request: WorkerRequest) -> Result<()> {
        self.worker.send(request).map_err(|err| {
            error!("lookup worker is gone: {err}");
            anyhow::anyhow!("lookup worker stopped")
        })
    }

    fn draw(&mut self, frame: &mut Frame) {
        let size = frame.size();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(8),
                Constraint::Length(4),
            ])
            .split(size);

        self.render_inputs(frame, chunks[0]);
        if self.state.show_compare {
            self.render_comparison(frame, chunks[1]);
        } else {
            let body = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
                .split(chunks[1]);
            self.render_history(frame, body[0]);
            self.render_details(frame, body[1]);
        }
        self.render_status(frame, chunks[2]);

        if self.state.confirm_clear {
            self.render_confirm(frame);
        }
    }

    fn render_inputs(&self, frame: &mut Frame, area: Rect) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
            .split(area);

        let fields = [
            (Focus::Subject, "Game", &self.state.subject, columns[0]),
            (Focus::Platform, "Platform (optional)", &self.state.platform, columns[1]),
        ];
        for (focus, title, field, rect) in fields {
            let focused = self.state.focus == focus;
            let border = if focused {
                Style::default().fg(self.theme.accent)
            } else {
                Style::default().fg(self.theme.muted)
            };
            let paragraph = Paragraph::new(field.input.clone()).block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(border)
                    .title(title),
            );
            frame.render_widget(paragraph, rect);
            if focused && !self.state.confirm_clear {
                let cursor_x = (rect.x + 1 + field.cursor as u16)
                    .min(rect.x + rect.width.saturating_sub(2));
                frame.set_cursor(cursor_x, rect.y + 1);
            }
        }
    }

    fn render_history(&self, frame: &mut Frame, area: Rect) {
        let border = if self.state.focus == Focus::History {
            Style::default().fg(self.theme.accent)
        } else {
            Style::default()
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title("Lookups");
        if self.state.history.is_empty() {
            let paragraph = Paragraph::new("No lookups yet")
                .style(Style::default().fg(self.theme.muted))
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let items: Vec<ListItem> = self
            .state
            .history
            .iter()
            .map(|entry| {
                let marker = match entry.lookup.origin {
                    Origin::Cache => Span::styled("● ", Style::default().fg(self.theme.accent)),
                    Origin::Service => Span::styled("● ", Style::default().fg(self.theme.success)),
                    Origin::Fallback => {
                        Span::styled("● ", Style::default().fg(self.theme.warning))
                    }
                };
                ListItem::new(Line::from(vec![
                    marker,
                    Span::raw(entry.label()),
                    Span::styled(
                        format!("  {}", entry.at.format("%H:%M")),
                        Style::default().fg(self.theme.muted),
                    ),
                ]))
            })
            .collect();

        let mut list_state = ListState::default();
        list_state.select(Some(self.state.history_cursor));
        let list = List::new(items).block(block).highlight_style(
            Style::default()
                .bg(self.theme.selection_bg)
                .fg(self.theme.selection_fg)
                .add_modifier(Modifier::BOLD),
        );
        frame.render_stateful_widget(list, area, &mut list_state);
    }

    fn render_details(&self, frame: &mut Frame, area: Rect) {
        let Some(entry) = self.state.current_entry() else {
            let paragraph = Paragraph::new(vec![
                Line::from("Type a game name and press Enter."),
                Line::from(""),
                Line::from("Tab switch field  Ctrl+T compare  Ctrl+X clear cache  Esc quit"),
            ])
            .style(Style::default().fg(self.theme.muted))
            .block(Block::default().borders(Borders::ALL).title("Details"))
            .wrap(Wrap { trim: true });
            frame.render_widget(paragraph, area);
            return;
        };

        let record = &entry.lookup.record;
        let title = format!("Information about {}", record.display_title().to_uppercase());
        let paragraph = Paragraph::new(self.detail_lines(entry, record))
            .block(Block::default().borders(Borders::ALL).title(title))
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn detail_lines(&self, entry: &HistoryEntry, record: &MetadataRecord) -> Vec<Line<'static>> {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let mut lines = Vec::new();

        for (label, value) in report::details(record) {
            lines.push(Line::from(vec![
                Span::styled(format!("{label}: "), bold),
                Span::raw(value),
            ]));
        }
        if let Some(description) = known(record.short_description.as_deref()) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Description", bold)));
            lines.push(Line::from(description.to_string()));
        }
        if let Some(trivia) = known(record.trivia_note.as_deref()) {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled("Trivia", bold)));
            lines.push(Line::from(trivia.to_string()));
        }
        if !record.is_fallback() {
            lines.push(Line::from(""));
            lines.push(Line::from(Span::styled(
                report::recommendation(record),
                Style::default().fg(self.theme.accent),
            )));
        }

        lines.push(Line::from(""));
        let source = record.source_label.clone().unwrap_or_default();
        let origin = match entry.lookup.origin {
            Origin::Cache => "cached",
            Origin::Service | Origin::Fallback => "fresh",
        };
        lines.push(Line::from(Span::styled(
            format!("Source: {source} ({origin}, query \"{}\")", entry.subject),
            Style::default().fg(self.theme.muted),
        )));
        lines
    }

    fn render_comparison(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .title("Comparison");
        let records: Vec<MetadataRecord> = self
            .state
            .history
            .iter()
            .map(|entry| entry.lookup.record.clone())
            .collect();
        if records.is_empty() {
            let paragraph = Paragraph::new("No games to compare")
                .style(Style::default().fg(self.theme.muted))
                .block(block);
            frame.render_widget(paragraph, area);
            return;
        }

        let header = Row::new(COMPARISON_HEADERS.to_vec()).style(
            Style::default()
                .fg(self.theme.accent)
                .add_modifier(Modifier::BOLD),
        );
        let rows = report::comparison_rows(&records).into_iter().map(|row| {
            Row::new(vec![row.title, row.genre, row.year, row.score, row.hours])
                .style(Style::default().fg(self.theme.primary_fg))
        });
        let widths = [
            Constraint::Length(25),
            Constraint::Length(20),
            Constraint::Length(8),
            Constraint::Length(12),
            Constraint::Length(10),
        ];
        let table = Table::new(rows, widths).header(header).block(block);
        frame.render_widget(table, area);
    }

    fn render_status(&self, frame: &mut Frame, area: Rect) {
        let block = Block::default().borders(Borders::ALL).title("Status");
        let primary = if self.state.pending {
            const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
            format!(
                "{} {}",
                FRAMES[self.state.spinner % FRAMES.len()],
                self.state.status
            )
        } else {
            self.state.status.clone()
        };
        let provider = match (&self.state.provider, self.state.online) {
            (Some(name), true) => format!("{name} online"),
            (Some(name), false) => format!("{name} limited"),
            (None, _) => "offline".to_string(),
        };
        let secondary = format!(
            "Cached lookups: {}  •  Service: {provider}",
            self.state.cached_entries
        );
        let paragraph = Paragraph::new(vec![Line::from(primary), Line::from(secondary)])
            .block(block)
            .wrap(Wrap { trim: true });
        frame.render_widget(paragraph, area);
    }

    fn render_confirm(&self, frame: &mut Frame) {
        let area = centered_rect(52, 6, frame.size());
        frame.render_widget(Clear, area);
        let paragraph = Paragraph::new(vec![
            Line::from("Clear every cached lookup?"),
            Line::from(""),
            Line::from(vec![
                Span::styled("y", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" clear  "),
                Span::styled("n", Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(" cancel"),
            ]),
        ])
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(self.theme.warning))
                .title("Clear cache"),
        );
        frame.render_widget(paragraph, area);
    }
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)
        .context("failed to leave alternate screen")?;
    terminal.show_cursor()?;
    Ok(())
}

fn spawn_input_thread(sender: mpsc::Sender<AppEvent>) {
    thread::spawn(move || loop {
        match event::poll(TICK_RATE) {
            Ok(true) => match event::read() {
                Ok(evt) => {
                    if sender.blocking_send(AppEvent::Input(evt)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if sender.blocking_send(AppEvent::Tick).is_err() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

struct UiState {
    subject: InputField,
    platform: InputField,
    focus: Focus,
    history: Vec<HistoryEntry>,
    history_cursor: usize,
    status: String,
    pending: bool,
    spinner: usize,
    show_compare: bool,
    confirm_clear: bool,
    cached_entries: usize,
    provider: Option<String>,
    online: bool,
    should_quit: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            subject: InputField::default(),
            platform: InputField::default(),
            focus: Focus::Subject,
            history: Vec::new(),
            history_cursor: 0,
            status: "Starting lookup service...".to_string(),
            pending: false,
            spinner: 0,
            show_compare: false,
            confirm_clear: false,
            cached_entries: 0,
            provider: None,
            online: false,
            should_quit: false,
        }
    }
}

impl UiState {
    fn set_status(&mut self, message: String) {
        self.status = message;
    }

    /// Newest lookup first; repeating a query moves it back to the top.
    fn push_history(&mut self, entry: HistoryEntry) {
        let key = entry.cache_key();
        self.history.retain(|existing| existing.cache_key() != key);
        self.history.insert(0, entry);
        self.history_cursor = 0;
    }

    fn move_cursor(&mut self, delta: isize) {
        if self.history.is_empty() {
            self.history_cursor = 0;
            return;
        }
        let max = self.history.len() as isize - 1;
        self.history_cursor = (self.history_cursor as isize)
            .saturating_add(delta)
            .clamp(0, max) as usize;
    }

    fn current_entry(&self) -> Option<&HistoryEntry> {
        self.history.get(self.history_cursor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamelog_core::extract;

    fn entry(subject: &str, platform: Option<&str>, origin: Origin) -> HistoryEntry {
        HistoryEntry {
            subject: subject.to_string(),
            platform: platform.map(str::to_string),
            lookup: Lookup {
                record: extract::fallback(subject),
                origin,
            },
            at: Local::now(),
        }
    }

    #[test]
    fn input_field_edits_unicode() {
        let mut field = InputField::default();
        for ch in "Okami".chars() {
            field.insert(ch);
        }
        field.move_home();
        field.delete();
        field.insert('Ō');
        assert_eq!(field.input, "Ōkami");
        field.move_end();
        field.backspace();
        assert_eq!(field.input, "Ōkam");
        field.move_cursor(-10);
        assert_eq!(field.cursor, 0);
        field.move_cursor(10);
        assert_eq!(field.cursor, 4);
        assert_eq!(field.value().as_deref(), Some("Ōkam"));
        assert_eq!(InputField::default().value(), None);
    }

    #[test]
    fn history_moves_repeated_queries_to_top() {
        let mut state = UiState::default();
        state.push_history(entry("Hades", None, Origin::Service));
        state.push_history(entry("Celeste", Some("PC"), Origin::Service));
        state.push_history(entry("hades", None, Origin::Cache));

        let subjects: Vec<_> = state.history.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["hades", "Celeste"]);
        assert_eq!(state.current_entry().map(|e| e.lookup.origin), Some(Origin::Cache));

        state.push_history(entry("ŌKAMI", Some("PS2"), Origin::Service));
        state.push_history(entry("ōkami", Some("ps2"), Origin::Cache));
        assert_eq!(state.history.len(), 3);
        assert_eq!(state.history[0].subject, "ōkami");

        state.move_cursor(isize::MAX);
        assert_eq!(state.history_cursor, 2);
        state.move_cursor(-5);
        assert_eq!(state.history_cursor, 0);
    }

    #[test]
    fn focus_cycles_both_ways() {
        assert_eq!(Focus::Subject.next().next().next(), Focus::Subject);
        assert_eq!(Focus::Subject.previous(), Focus::History);
    }
}
