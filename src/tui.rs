#![cfg(feature = "tui")]

use crate::app::{self, Settings};
use crate::extract::Artifact;
use crate::progress::{NarratorState, ProgressNarrator, STEPS};
use crate::prompts::SiteKind;
use crate::session::{Session, SessionError, SessionStatus};
use anyhow::Context;
use clap::ValueEnum;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph, Wrap};
use ratatui::Terminal;
use std::io;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// How long the finished gauge stays on screen before going idle.
const COMPLETION_HOLD: std::time::Duration = std::time::Duration::from_millis(1500);

const HELP: &str =
    "Describe a website and press Enter. Commands: /modify <change>, /kind <kind> <description>, /clear, /quit. Esc cancels a running request.";

#[derive(Debug, Clone)]
struct LogLine {
    role: &'static str,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Empty,
    Quit,
    Clear,
    Generate(String),
    Modify(String),
    Specialized(SiteKind, String),
    Invalid(String),
}

fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    match line {
        "/quit" => return Input::Quit,
        "/clear" => return Input::Clear,
        _ => {}
    }
    if let Some(rest) = line.strip_prefix("/modify") {
        return Input::Modify(rest.trim().to_string());
    }
    if let Some(rest) = line.strip_prefix("/kind") {
        let rest = rest.trim();
        let (kind, description) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
        return match SiteKind::from_str(kind, true) {
            Ok(kind) => Input::Specialized(kind, description.trim().to_string()),
            Err(_) => Input::Invalid(format!("unknown site kind: {kind}")),
        };
    }
    if line.starts_with('/') {
        return Input::Invalid(format!("unknown command: {line}"));
    }
    Input::Generate(line.to_string())
}

struct Ui {
    session: Session,
    narrator: ProgressNarrator,
    started: Instant,
    completed_at: Option<Instant>,
    input: String,
    lines: Vec<LogLine>,
    artifact: Artifact,
    done_tx: mpsc::UnboundedSender<Result<Artifact, SessionError>>,
}

impl Ui {
    fn push(&mut self, role: &'static str, text: impl Into<String>) {
        self.lines.push(LogLine { role, text: text.into() });
    }

    /// Returns true when the user asked to leave.
    fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            self.session.cancel();
            return true;
        }

        match key.code {
            KeyCode::Esc => {
                if self.session.status() == SessionStatus::Streaming {
                    self.session.cancel();
                    return false;
                }
                return true;
            }
            KeyCode::Char(c) => self.input.push(c),
            KeyCode::Backspace => {
                self.input.pop();
            }
            KeyCode::Enter => {
                let line = std::mem::take(&mut self.input);
                return self.submit(parse_input(&line));
            }
            _ => {}
        }
        false
    }

    fn submit(&mut self, input: Input) -> bool {
        match input {
            Input::Empty => {}
            Input::Quit => return true,
            Input::Clear => self.lines.clear(),
            Input::Invalid(msg) => self.push("error", msg),
            _ if self.session.status() == SessionStatus::Streaming => {
                self.push("system", "(generation in progress; wait for it or press Esc)");
            }
            Input::Generate(description) => {
                self.push("user", description.clone());
                self.spawn(move |s| async move { s.generate(&description).await });
            }
            Input::Modify(description) => {
                self.push("user", format!("/modify {description}"));
                self.spawn(move |s| async move { s.modify(&description).await });
            }
            Input::Specialized(kind, description) => {
                self.push("user", format!("[{}] {description}", kind.as_str()));
                self.spawn(move |s| async move { s.generate_specialized(&description, kind, None).await });
            }
        }
        false
    }

    fn spawn<F, Fut>(&mut self, job: F)
    where
        F: FnOnce(Session) -> Fut,
        Fut: std::future::Future<Output = Result<Artifact, SessionError>> + Send + 'static,
    {
        let fut = job(self.session.clone());
        let tx = self.done_tx.clone();
        self.narrator.start();
        self.started = Instant::now();
        self.completed_at = None;
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    /// Completing → Idle once the full gauge has been on screen long enough.
    fn settle(&mut self, now: Instant) {
        if self.narrator.state() != NarratorState::Completing {
            return;
        }
        if self.completed_at.is_some_and(|t| now.duration_since(t) >= COMPLETION_HOLD) {
            self.narrator.finish();
            self.completed_at = None;
        }
    }

    fn finished(&mut self, res: Result<Artifact, SessionError>) {
        match res {
            Ok(artifact) => {
                self.narrator.complete();
                self.completed_at = Some(Instant::now());
                self.push(
                    "system",
                    format!("done: {} bytes of HTML, {} bytes of CSS", artifact.html.len(), artifact.css.len()),
                );
            }
            // Another job got there first; its progress stays on screen.
            Err(e @ SessionError::Busy) => self.push("error", e.to_string()),
            Err(SessionError::Cancelled) => {
                self.narrator.finish();
                self.push("system", "cancelled; the partial draft is kept");
            }
            Err(e) => {
                self.narrator.finish();
                self.push("error", e.to_string());
            }
        }
    }
}

pub async fn run_tui(session: Session, settings: Settings) -> anyhow::Result<()> {
    let preview = app::spawn_preview(&session, &settings);
    let mut updates = session.subscribe();

    enable_raw_mode().context("enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("enter alt screen")?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("create terminal")?;

    let (ev_tx, mut ev_rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || {
        while let Ok(ev) = crossterm::event::read() {
            if ev_tx.send(ev).is_err() {
                break;
            }
        }
    });

    let (done_tx, mut done_rx) = mpsc::unbounded_channel();
    let mut ui = Ui {
        session,
        narrator: settings.narrator(),
        started: Instant::now(),
        completed_at: None,
        input: String::new(),
        lines: vec![LogLine { role: "system", text: HELP.to_string() }],
        artifact: Artifact::default(),
        done_tx,
    };
    if let Some(path) = &settings.preview {
        ui.push("system", format!("live preview: {}", path.display()));
    }

    let mut ticker = tokio::time::interval(std::time::Duration::from_millis(33));

    let res = loop {
        tokio::select! {
            _ = ticker.tick() => {
                ui.narrator.advance(ui.started.elapsed());
                if let Err(e) = draw(&mut terminal, &settings.model, &ui) {
                    break Err(e);
                }
                ui.settle(Instant::now());
            }
            Some(ev) = ev_rx.recv() => {
                if let Event::Key(key) = ev {
                    if ui.handle_key(key) {
                        break Ok(());
                    }
                }
            }
            Ok(()) = updates.changed() => {
                ui.artifact = updates.borrow_and_update().artifact.clone();
            }
            Some(res) = done_rx.recv() => ui.finished(res),
        }
    };

    disable_raw_mode().ok();
    execute!(terminal.backend_mut(), LeaveAlternateScreen).ok();
    terminal.show_cursor().ok();

    drop(ui);
    if let Some(handle) = preview {
        // In-flight jobs still hold the session; do not wait on them.
        handle.abort();
    }

    res
}

fn draw(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, model: &str, ui: &Ui) -> anyhow::Result<()> {
    terminal.draw(|f| {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(7), Constraint::Min(1), Constraint::Length(3)])
            .split(f.area());

        let percent = ui.narrator.percent().clamp(0.0, 100.0);
        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL).title("progress"))
            .ratio(percent / 100.0)
            .label(format!("{percent:.0}%"));

        let snapshot = ui.narrator.snapshot();
        let mut steps = Text::default();
        for (i, step) in STEPS.iter().enumerate() {
            let (mark, style) = if snapshot.completed_steps.contains(&i) {
                ("[x]", Style::default())
            } else if i == snapshot.current_step && ui.narrator.is_active() {
                ("[>]", Style::default().add_modifier(Modifier::BOLD))
            } else {
                ("[ ]", Style::default().add_modifier(Modifier::DIM))
            };
            steps.lines.push(Line::styled(format!("{mark} {}: {}", step.title, step.description), style));
        }
        if ui.narrator.is_active() {
            steps.lines.push(Line::styled(ui.narrator.insight().to_string(), Style::default().add_modifier(Modifier::ITALIC)));
        }
        let steps = Paragraph::new(steps).block(Block::default().borders(Borders::ALL).title("thinking"));

        let mut text = Text::default();
        for l in &ui.lines {
            let style = match l.role {
                "user" | "error" => Style::default().add_modifier(Modifier::BOLD),
                _ => Style::default(),
            };
            text.lines.push(Line::styled(format!("{}: ", l.role), style));
            text.lines.extend(Text::from(l.text.clone()).lines);
            text.lines.push(Line::from(""));
        }
        let status = match ui.session.status() {
            SessionStatus::Streaming => "streaming",
            SessionStatus::Idle if ui.session.can_modify() => "idle, /modify ready",
            SessionStatus::Idle => "idle",
        };
        let log = Paragraph::new(text)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "sitecraft | model: {model} | {status} | html {}B css {}B",
                ui.artifact.html.len(),
                ui.artifact.css.len()
            )))
            .wrap(Wrap { trim: false });

        let input_w = Paragraph::new(ui.input.clone()).block(Block::default().borders(Borders::ALL).title("input"));

        f.render_widget(gauge, chunks[0]);
        f.render_widget(steps, chunks[1]);
        f.render_widget(log, chunks[2]);
        f.render_widget(input_w, chunks[3]);

        let x = chunks[3].x + 1 + ui.input.chars().count() as u16;
        let y = chunks[3].y + 1;
        f.set_cursor_position((x.min(chunks[3].x + chunks[3].width.saturating_sub(2)), y));
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_commands() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("/quit"), Input::Quit);
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input("a bakery site"), Input::Generate("a bakery site".into()));
        assert_eq!(parse_input("/modify make it blue"), Input::Modify("make it blue".into()));
        assert_eq!(
            parse_input("/kind Portfolio a photographer"),
            Input::Specialized(SiteKind::Portfolio, "a photographer".into())
        );
        assert!(matches!(parse_input("/kind spaceship x"), Input::Invalid(_)));
        assert!(matches!(parse_input("/model x"), Input::Invalid(_)));
    }

    fn test_ui() -> Ui {
        let stub = crate::provider::stub::StubProvider::scripted(Vec::<String>::new());
        let (done_tx, _) = mpsc::unbounded_channel();
        Ui {
            session: Session::new(std::sync::Arc::new(stub), "m", 10),
            narrator: ProgressNarrator::new(std::time::Duration::from_millis(10), std::time::Duration::from_millis(10)),
            started: Instant::now(),
            completed_at: None,
            input: String::new(),
            lines: Vec::new(),
            artifact: Artifact::default(),
            done_tx,
        }
    }

    #[test]
    fn completed_gauge_goes_idle_after_hold() {
        let mut ui = test_ui();
        ui.narrator.start();
        ui.finished(Ok(Artifact::new("<h1>Bread</h1>", "")));
        assert_eq!(ui.narrator.state(), NarratorState::Completing);
        assert_eq!(ui.narrator.percent(), 100.0);

        let done = ui.completed_at.unwrap();
        ui.settle(done + COMPLETION_HOLD / 2);
        assert_eq!(ui.narrator.state(), NarratorState::Completing);

        ui.settle(done + COMPLETION_HOLD);
        assert_eq!(ui.narrator.state(), NarratorState::Idle);
        assert_eq!(ui.narrator.percent(), 0.0);
        assert!(ui.completed_at.is_none());
    }

    #[test]
    fn failed_run_goes_idle_at_once() {
        let mut ui = test_ui();
        ui.narrator.start();
        ui.finished(Err(SessionError::Cancelled));
        assert_eq!(ui.narrator.state(), NarratorState::Idle);
        assert!(ui.completed_at.is_none());
    }

    #[test]
    fn blank_modify_reaches_session_validation() {
        assert_eq!(parse_input("/modify"), Input::Modify(String::new()));
    }
}
