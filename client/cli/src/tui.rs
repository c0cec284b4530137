use crate::config::Config;
use crate::guard;
use crate::session::Session;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use nyaya_vault::{Activation, Node, NodeId};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame, Terminal,
};
use std::io;

#[derive(Clone, PartialEq)]
enum Screen {
    Browse,
    Search,
    NewFolder,
    Rename(NodeId),
    ConfirmDelete(NodeId),
    DeletePassword(NodeId),
    Preview(Node),
    Finished,
}

struct App {
    screen: Screen,
    session: Session,
    config: Config,
    selected: usize,
    query: String,
    input: String,
    message: Option<String>,
}

impl App {
    fn new(session: Session, config: Config) -> Self {
        Self {
            screen: Screen::Browse,
            session,
            config,
            selected: 0,
            query: String::new(),
            input: String::new(),
            message: None,
        }
    }

    /// Rows shown in the listing: the active folder, or global matches while searching.
    fn entries(&self) -> Vec<&Node> {
        match self.screen {
            Screen::Search => self.session.tree.list_current(Some(&self.query)),
            _ => self.session.tree.list_current(None),
        }
    }

    fn selected_entry(&self) -> Option<Node> {
        self.entries().get(self.selected).map(|n| (*n).clone())
    }

    fn clamp_selection(&mut self) {
        let len = self.entries().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        match self.screen.clone() {
            Screen::Browse => self.handle_browse(code),
            Screen::Search => self.handle_search(code),
            Screen::NewFolder => {
                if let Some(name) = self.handle_input(code) {
                    match self.session.tree.create_folder(&name) {
                        Ok(folder) => self.message = Some(format!("* created {}", folder.name)),
                        Err(e) => self.message = Some(format!("! {}", e)),
                    }
                }
            }
            Screen::Rename(id) => {
                if let Some(name) = self.handle_input(code) {
                    if let Err(e) = self.session.tree.rename_node(&id, &name) {
                        self.message = Some(format!("! {}", e));
                    }
                }
            }
            Screen::ConfirmDelete(id) => {
                if code == KeyCode::Char('y') {
                    self.delete(&id);
                }
                self.screen = Screen::Browse;
            }
            Screen::DeletePassword(id) => {
                if let Some(password) = self.handle_input(code) {
                    let verified = self
                        .config
                        .master_password_hash
                        .as_deref()
                        .map(|hash| guard::verify_password(&password, hash));
                    match verified {
                        Some(Ok(true)) => self.delete(&id),
                        Some(Err(e)) => self.message = Some(format!("! {}", e)),
                        _ => self.message = Some("! incorrect master password".to_string()),
                    }
                }
            }
            Screen::Preview(_) => {
                if matches!(code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q')) {
                    self.screen = Screen::Browse;
                }
            }
            Screen::Finished => {}
        }
        self.clamp_selection();
    }

    fn handle_browse(&mut self, code: KeyCode) {
        self.message = None;
        match code {
            KeyCode::Char('q') | KeyCode::Esc => self.screen = Screen::Finished,
            KeyCode::Up | KeyCode::Char('k') => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down | KeyCode::Char('j') => self.selected += 1,
            KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
                if let Some(entry) = self.selected_entry() {
                    match self.session.tree.activate(&entry.id) {
                        Ok(Activation::Navigated(_)) => self.selected = 0,
                        Ok(Activation::Selected(file)) => self.screen = Screen::Preview(file),
                        Err(e) => self.message = Some(format!("! {}", e)),
                    }
                }
            }
            KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => {
                self.session.tree.navigate_up();
                self.selected = 0;
            }
            KeyCode::Char('g') => {
                self.session.tree.navigate_to_root();
                self.selected = 0;
            }
            KeyCode::Char(c @ '1'..='9') => {
                let index = c as usize - '1' as usize;
                self.session.tree.navigate_to_breadcrumb(index);
                self.selected = 0;
            }
            KeyCode::Char('/') => {
                self.query.clear();
                self.selected = 0;
                self.screen = Screen::Search;
            }
            KeyCode::Char('n') => {
                self.input.clear();
                self.screen = Screen::NewFolder;
            }
            KeyCode::Char('r') => {
                if let Some(entry) = self.selected_entry() {
                    self.input = entry.name;
                    self.screen = Screen::Rename(entry.id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(entry) = self.selected_entry() {
                    self.input.clear();
                    self.screen = if self.config.has_master_password() {
                        Screen::DeletePassword(entry.id)
                    } else {
                        Screen::ConfirmDelete(entry.id)
                    };
                }
            }
            _ => {}
        }
    }

    fn handle_search(&mut self, code: KeyCode) {
        match code {
            KeyCode::Esc => {
                self.query.clear();
                self.selected = 0;
                self.screen = Screen::Browse;
            }
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected += 1,
            KeyCode::Backspace => {
                self.query.pop();
                self.selected = 0;
            }
            KeyCode::Char(c) => {
                self.query.push(c);
                self.selected = 0;
            }
            KeyCode::Enter => {
                let Some(entry) = self.selected_entry() else {
                    return;
                };
                if entry.is_folder() {
                    // Matches can sit anywhere; rebuild the breadcrumb from the root
                    if let Err(e) = self.session.tree.open_by_id_deep_link(&entry.id) {
                        self.message = Some(format!("! {}", e));
                        return;
                    }
                    self.query.clear();
                    self.selected = 0;
                    self.screen = Screen::Browse;
                } else {
                    self.screen = Screen::Preview(entry);
                }
            }
            _ => {}
        }
    }

    /// Line editing shared by the prompt screens. Returns the text on Enter.
    fn handle_input(&mut self, code: KeyCode) -> Option<String> {
        match code {
            KeyCode::Esc => {
                self.input.clear();
                self.screen = Screen::Browse;
                None
            }
            KeyCode::Backspace => {
                self.input.pop();
                None
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                None
            }
            KeyCode::Enter => {
                self.screen = Screen::Browse;
                Some(std::mem::take(&mut self.input))
            }
            _ => None,
        }
    }

    fn delete(&mut self, id: &NodeId) {
        let removed = self.session.tree.delete_node(id);
        self.message = Some(format!("* deleted {} entries", removed.len()));
    }
}

/// Text progress bar for a 0..=100 percentage.
pub fn usage_bar(percent: f64, width: usize) -> String {
    let filled = ((percent.clamp(0.0, 100.0) / 100.0) * width as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), "-".repeat(width - filled.min(width)))
}

pub fn run(config: &Config) -> anyhow::Result<()> {
    let session = Session::open(config)?;

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(session, config.clone());
    let result = run_app(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result?;
    app.session.close()
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
) -> anyhow::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if app.screen == Screen::Finished {
            return Ok(());
        }

        if event::poll(std::time::Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                app.handle_key(key.code);
            }
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let area = f.area();

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0)])
        .split(area);

    let crumbs: Vec<String> = app
        .session
        .tree
        .breadcrumbs()
        .into_iter()
        .enumerate()
        .map(|(i, n)| format!("[{}] {}", i + 1, n.name))
        .collect();

    let mut lines: Vec<Line> = vec![
        Line::from(Span::styled("nyaya vault", Style::default().add_modifier(Modifier::BOLD))),
        Line::from(format!("/ {}", crumbs.join(" / "))),
        Line::from(""),
    ];

    match &app.screen {
        Screen::Preview(node) => {
            lines.push(Line::from(format!("* {}", node.name)));
            lines.push(Line::from(""));
            if let Some(media_type) = node.media_type() {
                lines.push(Line::from(format!("  type: {}", media_type.name())));
            }
            lines.push(Line::from(format!("  size: {}", node.size_label().unwrap_or(""))));
            lines.push(Line::from(format!("  added: {}", node.created_label)));
            lines.push(Line::from(format!(
                "  content: {}",
                node.content_ref().unwrap_or("not available")
            )));
            lines.push(Line::from(""));
            lines.push(Line::from("[esc] back"));
        }
        _ => {
            if app.screen == Screen::Search {
                lines.push(Line::from(format!("> search: {}_", app.query)));
                lines.push(Line::from(""));
            }

            let entries = app.entries();
            // header, footer and margins
            let visible = (layout[0].height as usize).saturating_sub(lines.len() + 6).max(1);
            let start = app.selected.saturating_sub(visible - 1);

            if entries.is_empty() {
                lines.push(Line::from(if app.screen == Screen::Search {
                    "  no matches"
                } else {
                    "  empty folder"
                }));
            }
            for (i, node) in entries.iter().enumerate().skip(start).take(visible) {
                let text = match node.media_type() {
                    Some(media_type) => format!(
                        "{:<40} {:<6} {:>10}",
                        node.name,
                        media_type.name(),
                        node.size_label().unwrap_or("")
                    ),
                    None => format!("{}/", node.name),
                };
                if i == app.selected {
                    lines.push(Line::from(Span::styled(
                        format!("> {}", text),
                        Style::default().add_modifier(Modifier::REVERSED),
                    )));
                } else {
                    lines.push(Line::from(format!("  {}", text)));
                }
            }

            lines.push(Line::from(""));
            match &app.screen {
                Screen::NewFolder => lines.push(Line::from(format!("> new folder: {}_", app.input))),
                Screen::Rename(_) => lines.push(Line::from(format!("> rename to: {}_", app.input))),
                Screen::ConfirmDelete(id) => {
                    let name = app.session.tree.get(id).map(|n| n.name.as_str()).unwrap_or("");
                    lines.push(Line::from(format!("delete '{}' and everything in it? [y/n]", name)));
                }
                Screen::DeletePassword(_) => lines.push(Line::from(format!(
                    "> master password: {}_",
                    "*".repeat(app.input.len())
                ))),
                Screen::Search => lines.push(Line::from("[enter] open  [esc] back")),
                _ => lines.push(Line::from(
                    "[enter] open  [bksp] up  [g] root  [/] search  [n] new  [r] rename  [d] delete  [q] quit",
                )),
            }
        }
    }

    let usage = app.session.tree.compute_usage(app.config.storage_limit_bytes);
    lines.push(Line::from(format!(
        "{} {} of {}",
        usage_bar(usage.percent_of_limit, 20),
        usage.used_label,
        usage.limit_label
    )));
    if let Some(message) = &app.message {
        lines.push(Line::from(message.as_str()));
    }

    let paragraph = Paragraph::new(lines);
    f.render_widget(paragraph, layout[0]);
}
