use std::collections::VecDeque;
use std::fs;
use std::io;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::{Utf8Path, Utf8PathBuf};
use crossterm::ExecutableCommand;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use miette::IntoDiagnostic;
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, ListState, Paragraph, Wrap};

use crate::app::{ProgressEvent, ProgressSink};
use crate::error::EnrichError;

const MAX_LOG_LINES: usize = 200;

type Term = Terminal<CrosstermBackend<io::Stdout>>;

fn enter() -> miette::Result<Term> {
    enable_raw_mode().into_diagnostic()?;
    let mut stdout = io::stdout();
    stdout.execute(EnterAlternateScreen).into_diagnostic()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout)).into_diagnostic()?;
    terminal.clear().into_diagnostic()?;
    Ok(terminal)
}

fn leave() -> miette::Result<()> {
    disable_raw_mode().into_diagnostic()?;
    io::stdout().execute(LeaveAlternateScreen).into_diagnostic()?;
    Ok(())
}

/// CSV files directly inside `dir`, sorted by name.
pub fn csv_candidates(dir: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut files = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| Utf8PathBuf::from_path_buf(entry.path()).ok())
        .filter(|path| path.is_file())
        .filter(|path| {
            path.extension()
                .map(|ext| ext.eq_ignore_ascii_case("csv"))
                .unwrap_or(false)
        })
        .collect::<Vec<_>>();
    files.sort();
    files
}

/// Interactive input file chooser: pick a listed CSV or type a path.
pub struct FilePicker {
    candidates: Vec<Utf8PathBuf>,
    state: ListState,
    typed: String,
}

impl FilePicker {
    pub fn new(dir: &Utf8Path) -> Self {
        let candidates = csv_candidates(dir);
        let mut state = ListState::default();
        if !candidates.is_empty() {
            state.select(Some(0));
        }
        Self {
            candidates,
            state,
            typed: String::new(),
        }
    }

    /// `Ok(None)` when the user cancels.
    pub fn pick(mut self) -> miette::Result<Option<Utf8PathBuf>> {
        let mut terminal = enter()?;
        let choice = loop {
            terminal
                .draw(|frame| self.draw(frame))
                .into_diagnostic()?;
            if event::poll(Duration::from_millis(120)).into_diagnostic()? {
                if let Event::Key(key) = event::read().into_diagnostic()? {
                    if let Some(done) = self.handle_key(key) {
                        break done;
                    }
                }
            }
        };
        leave()?;
        Ok(choice)
    }

    // Some(Some(path)) picks, Some(None) cancels, None keeps going.
    fn handle_key(&mut self, key: KeyEvent) -> Option<Option<Utf8PathBuf>> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        match key.code {
            KeyCode::Esc => Some(None),
            KeyCode::Enter => {
                let typed = self.typed.trim();
                if !typed.is_empty() {
                    return Some(Some(Utf8PathBuf::from(typed)));
                }
                self.state
                    .selected()
                    .and_then(|idx| self.candidates.get(idx))
                    .map(|path| Some(path.clone()))
            }
            KeyCode::Up => {
                let idx = self.state.selected().unwrap_or(0);
                self.state.select(Some(idx.saturating_sub(1)));
                None
            }
            KeyCode::Down => {
                if let Some(idx) = self.state.selected() {
                    if idx + 1 < self.candidates.len() {
                        self.state.select(Some(idx + 1));
                    }
                }
                None
            }
            KeyCode::Backspace => {
                self.typed.pop();
                None
            }
            KeyCode::Char(ch) => {
                self.typed.push(ch);
                None
            }
            _ => None,
        }
    }

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(3),
            ])
            .split(frame.area());

        let header = Paragraph::new(Line::from(vec![
            Span::styled(
                "Select a CSV file with DOIs",
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  ↑/↓ choose · Enter open · type a path · Esc cancel",
                Style::default().fg(Color::DarkGray),
            ),
        ]))
        .block(Block::default().borders(Borders::ALL).title("doi-enrich"));
        frame.render_widget(header, chunks[0]);

        let items = if self.candidates.is_empty() {
            vec![ListItem::new("(no .csv files in the current directory)")]
        } else {
            self.candidates
                .iter()
                .map(|path| ListItem::new(path.file_name().unwrap_or(path.as_str()).to_string()))
                .collect()
        };
        let list = List::new(items)
            .block(Block::default().borders(Borders::ALL).title("Files"))
            .highlight_style(
                Style::default()
                    .fg(Color::Black)
                    .bg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, chunks[1], &mut self.state);

        let input = Paragraph::new(Line::from(vec![
            Span::styled("path: ", Style::default().fg(Color::Cyan)),
            Span::raw(self.typed.clone()),
        ]))
        .block(Block::default().borders(Borders::ALL));
        frame.render_widget(input, chunks[2]);
    }
}

#[derive(Debug, Default)]
struct RunState {
    done: usize,
    total: usize,
    status: String,
    logs: VecDeque<String>,
}

struct TuiProgress {
    state: Arc<Mutex<RunState>>,
}

impl ProgressSink for TuiProgress {
    fn event(&self, event: ProgressEvent) {
        let Ok(mut state) = self.state.lock() else {
            return;
        };
        let message = event.message.trim().to_string();
        if let Some((done, total)) = parse_progress(&message) {
            state.done = done;
            state.total = total;
        }
        state.status = message
            .split_once("; ")
            .map(|(_, rest)| rest.to_string())
            .unwrap_or_else(|| message.clone());
        let stamp = chrono::Local::now().format("%H:%M:%S");
        state.logs.push_back(format!("[{stamp}] {message}"));
        while state.logs.len() > MAX_LOG_LINES {
            state.logs.pop_front();
        }
    }
}

/// Live progress screen for a batch run.
pub struct Tui {
    state: Arc<Mutex<RunState>>,
}

impl Default for Tui {
    fn default() -> Self {
        Self::new()
    }
}

impl Tui {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(RunState {
                status: "starting".to_string(),
                ..RunState::default()
            })),
        }
    }

    /// Runs `f` on a worker thread while drawing its progress events.
    pub fn run<F, R>(&mut self, f: F) -> miette::Result<R>
    where
        F: FnOnce(&dyn ProgressSink) -> Result<R, EnrichError> + Send + 'static,
        R: Send + 'static,
    {
        let mut terminal = enter()?;
        let started = Instant::now();

        let (tx, rx) = std::sync::mpsc::channel();
        let sink = TuiProgress {
            state: self.state.clone(),
        };
        let handle = thread::spawn(move || tx.send(f(&sink)));

        let result = loop {
            if let Ok(state) = self.state.lock() {
                let elapsed = started.elapsed();
                terminal
                    .draw(|frame| draw_progress(frame, &state, elapsed))
                    .into_diagnostic()?;
            }
            match rx.recv_timeout(Duration::from_millis(120)) {
                Ok(result) => break result,
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {}
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    leave()?;
                    return Err(miette::Report::msg("worker thread stopped unexpectedly"));
                }
            }
            // Drain input so keystrokes do not pile up; the run is not cancellable.
            while event::poll(Duration::ZERO).into_diagnostic()? {
                let _ = event::read().into_diagnostic()?;
            }
        };

        leave()?;
        handle.join().ok();
        result.map_err(miette::Report::new)
    }
}

fn draw_progress(frame: &mut ratatui::Frame, state: &RunState, elapsed: Duration) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(3),
        ])
        .split(frame.area());

    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "doi-enrich",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(format!("  {}  ", state.status)),
        Span::styled(
            format!("{}s", elapsed.as_secs()),
            Style::default().fg(Color::DarkGray),
        ),
    ]))
    .block(Block::default().borders(Borders::ALL));
    frame.render_widget(header, chunks[0]);

    let ratio = if state.total == 0 {
        0.0
    } else {
        (state.done as f64 / state.total as f64).clamp(0.0, 1.0)
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio)
        .label(format!("{}/{}", state.done, state.total));
    frame.render_widget(gauge, chunks[1]);

    let visible = chunks[2].height.saturating_sub(2) as usize;
    let lines = state
        .logs
        .iter()
        .skip(state.logs.len().saturating_sub(visible))
        .map(|line| Line::from(line.clone()))
        .collect::<Vec<_>>();
    let logs = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Log"))
        .wrap(Wrap { trim: false });
    frame.render_widget(logs, chunks[2]);
}

/// Reads `progress=N/M` from an event message.
fn parse_progress(message: &str) -> Option<(usize, usize)> {
    let rest = message.strip_prefix("progress=")?;
    let counts = rest.split(';').next()?;
    let (done, total) = counts.split_once('/')?;
    Some((done.trim().parse().ok()?, total.trim().parse().ok()?))
}
