use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
    Frame, Terminal,
};
use rusqlite::Connection;
use std::io;

use crate::format;
use crate::resolver;
use crate::search::{self, EntityKind, SearchHit, SearchOutcome};
use crate::store;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Query,
    Results,
}

pub struct App {
    conn: Connection,
    pub query: String,
    pub results: Vec<SearchHit>,
    pub list_state: ListState,
    pub detail_title: String,
    pub detail: Vec<String>,
    pub status: String,
    pub focus: Focus,
}

impl App {
    pub fn new(conn: Connection) -> Self {
        Self {
            conn,
            query: String::new(),
            results: Vec::new(),
            list_state: ListState::default(),
            detail_title: String::new(),
            detail: Vec::new(),
            status: "Type a plate, make, model or owner name and press Enter".to_string(),
            focus: Focus::Query,
        }
    }

    pub fn run_search(&mut self) {
        self.detail.clear();
        self.detail_title.clear();

        match search::search(&self.conn, &self.query) {
            Ok(SearchOutcome::Single(hit)) => {
                // A full plate goes straight to the detail view
                self.results = vec![hit];
                self.list_state.select(Some(0));
                self.focus = Focus::Results;
                self.status = "Exact plate match".to_string();
                self.open_selected();
            }
            Ok(SearchOutcome::Matches(hits)) => {
                self.status = if hits.is_empty() {
                    "No results".to_string()
                } else {
                    format!("{} result(s)", hits.len())
                };
                self.results = hits;
                if self.results.is_empty() {
                    self.list_state.select(None);
                } else {
                    self.list_state.select(Some(0));
                    self.focus = Focus::Results;
                }
            }
            Err(err) => {
                self.results.clear();
                self.list_state.select(None);
                self.status = format!("Search failed: {err}");
            }
        }
    }

    pub fn selected_hit(&self) -> Option<&SearchHit> {
        self.list_state.selected().and_then(|i| self.results.get(i))
    }

    pub fn open_selected(&mut self) {
        let Some(hit) = self.selected_hit().cloned() else {
            return;
        };

        let loaded = match hit.kind {
            EntityKind::Vehicle => self.load_vehicle_detail(hit.id),
            EntityKind::Owner => self.load_owner_detail(hit.id),
        };

        if let Err(err) = loaded {
            self.detail.clear();
            self.status = format!("Could not load details: {err}");
        }
    }

    fn load_vehicle_detail(&mut self, vehicle_id: i64) -> Result<()> {
        let Some(vehicle) = store::get_vehicle(&self.conn, vehicle_id)? else {
            self.status = "Vehicle no longer exists".to_string();
            return Ok(());
        };

        let current =
            resolver::current_ownership_as_of(&self.conn, vehicle_id, Utc::now().date_naive())?;
        let history = resolver::history_of(&self.conn, vehicle_id)?;

        self.detail_title = format!("Vehicle {}", vehicle.plate);
        self.detail = format::vehicle_details(&vehicle, current.as_ref())
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect();

        if !history.is_empty() {
            self.detail.push(String::new());
            self.detail.push("Ownership history:".to_string());
            for record in &history {
                self.detail.push(format!("  {}", format::history_line(record)));
            }
        }

        Ok(())
    }

    fn load_owner_detail(&mut self, owner_id: i64) -> Result<()> {
        let Some(owner) = store::get_owner(&self.conn, owner_id)? else {
            self.status = "Owner no longer exists".to_string();
            return Ok(());
        };

        self.detail_title = format!("Owner {}", owner.display_label());
        self.detail = format::owner_details(&owner)
            .into_iter()
            .map(|(label, value)| format!("{label}: {value}"))
            .collect();

        let tenures = resolver::vehicles_of(&self.conn, owner_id)?;
        if !tenures.is_empty() {
            self.detail.push(String::new());
            self.detail.push("Vehicles:".to_string());
            for tenure in &tenures {
                self.detail.push(format!("  {}", format::tenure_line(tenure)));
            }
        }

        Ok(())
    }

    pub fn next(&mut self) {
        let len = self.results.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i >= len - 1 {
                    0
                } else {
                    i + 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
    }

    pub fn previous(&mut self) {
        let len = self.results.len();
        if len == 0 {
            return;
        }
        let i = match self.list_state.selected() {
            Some(i) => {
                if i == 0 {
                    len - 1
                } else {
                    i - 1
                }
            }
            None => 0,
        };
        self.list_state.select(Some(i));
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

    if let Err(err) = res {
        println!("Error: {:?}", err);
    }

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
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(());
            }
            match app.focus {
                Focus::Query => match key.code {
                    KeyCode::Esc => return Ok(()),
                    KeyCode::Enter => app.run_search(),
                    KeyCode::Tab | KeyCode::Down => {
                        if !app.results.is_empty() {
                            app.focus = Focus::Results;
                        }
                    }
                    KeyCode::Backspace => {
                        app.query.pop();
                    }
                    KeyCode::Char(c) => app.query.push(c),
                    _ => {}
                },
                Focus::Results => match key.code {
                    KeyCode::Esc => return Ok(()),
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Tab | KeyCode::Char('/') => {
                        app.focus = Focus::Query;
                    }
                    KeyCode::Enter => app.open_selected(),
                    KeyCode::Down | KeyCode::Char('j') => app.next(),
                    KeyCode::Up | KeyCode::Char('k') => app.previous(),
                    KeyCode::Home => {
                        if !app.results.is_empty() {
                            app.list_state.select(Some(0));
                        }
                    }
                    KeyCode::End => {
                        if !app.results.is_empty() {
                            app.list_state.select(Some(app.results.len() - 1));
                        }
                    }
                    _ => {}
                },
            }
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Search input
            Constraint::Min(0),    // Results + detail
            Constraint::Length(3), // Status bar
        ])
        .split(f.size());

    render_search_box(f, chunks[0], app);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    render_results(f, content[0], app);
    render_detail(f, content[1], app);
    render_status_bar(f, chunks[2], app);
}

fn render_search_box(f: &mut Frame, area: Rect, app: &App) {
    let border_color = if app.focus == Focus::Query {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let input = Paragraph::new(app.query.as_str()).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(border_color))
            .title("Search (plate, make, model, owner name)"),
    );
    f.render_widget(input, area);

    if app.focus == Focus::Query {
        f.set_cursor(area.x + app.query.len() as u16 + 1, area.y + 1);
    }
}

fn render_results(f: &mut Frame, area: Rect, app: &mut App) {
    let border_color = if app.focus == Focus::Results {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let items: Vec<ListItem> = app
        .results
        .iter()
        .map(|hit| {
            let kind_style = match hit.kind {
                EntityKind::Vehicle => Style::default().fg(Color::Cyan),
                EntityKind::Owner => Style::default().fg(Color::Green),
            };
            ListItem::new(Line::from(vec![
                Span::styled(format!("[{}] ", hit.kind.as_str()), kind_style),
                Span::raw(hit.label.clone()),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(format!("Results ({})", app.results.len())),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    f.render_stateful_widget(list, area, &mut app.list_state);
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let lines: Vec<Line> = app
        .detail
        .iter()
        .map(|line| Line::from(line.as_str()))
        .collect();

    let title = if app.detail_title.is_empty() {
        "Details".to_string()
    } else {
        app.detail_title.clone()
    };

    let detail = Paragraph::new(lines)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(title),
        );
    f.render_widget(detail, area);
}

fn render_status_bar(f: &mut Frame, area: Rect, app: &App) {
    let help = match app.focus {
        Focus::Query => "Enter search | Tab results | Esc quit",
        Focus::Results => "Enter details | Tab search box | j/k move | q quit",
    };

    let status = Paragraph::new(Line::from(vec![
        Span::styled(app.status.clone(), Style::default().fg(Color::White)),
        Span::raw("  |  "),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{seed_sample_data, setup_database};

    fn sample_app() -> App {
        let conn = Connection::open_in_memory().unwrap();
        setup_database(&conn).unwrap();
        seed_sample_data(&conn).unwrap();
        App::new(conn)
    }

    #[test]
    fn test_exact_plate_opens_detail_directly() {
        let mut app = sample_app();
        app.query = "ab-123-cd".to_string();
        app.run_search();

        assert_eq!(app.results.len(), 1);
        assert_eq!(app.detail_title, "Vehicle AB-123-CD");
        assert!(app
            .detail
            .iter()
            .any(|line| line == "Current owner: ABC Corp"));
        assert!(app
            .detail
            .iter()
            .any(|line| line.contains("from 16/01/2023 to present")));
    }

    #[test]
    fn test_owner_detail_lists_vehicles() {
        let mut app = sample_app();
        app.query = "dupont".to_string();
        app.run_search();

        assert_eq!(app.results.len(), 1);
        app.open_selected();

        assert_eq!(app.detail_title, "Owner Dupont Jean");
        assert!(app.detail.iter().any(|line| line == "Vehicles:"));
        assert!(app
            .detail
            .iter()
            .any(|line| line.contains("EF-456-GH - Peugeot 308")));
    }

    #[test]
    fn test_selection_wraps() {
        let mut app = sample_app();
        app.query = "e".to_string(); // broad: matches several vehicles/owners
        app.run_search();
        assert!(app.results.len() >= 2);

        app.list_state.select(Some(app.results.len() - 1));
        app.next();
        assert_eq!(app.list_state.selected(), Some(0));
        app.previous();
        assert_eq!(app.list_state.selected(), Some(app.results.len() - 1));
    }

    #[test]
    fn test_failed_search_sets_status() {
        // A connection without tables makes every storage call fail
        let conn = Connection::open_in_memory().unwrap();
        let mut app = App::new(conn);
        app.query = "anything".to_string();
        app.run_search();

        assert!(app.results.is_empty());
        assert!(app.status.starts_with("Search failed"));
    }
}
