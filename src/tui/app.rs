use std::io;
use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use futures::StreamExt;
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc;

use super::events::{Action, AppEvent, Notification, NotificationLevel};
use super::services::Services;
use super::theme;
use super::views::form::{FormInput, FormViewState};
use crate::core::export::{self, ExportOptions, ExportOutcome};
use crate::core::form::Session;
use crate::core::llm::LlmError;
use crate::core::orchestrator::{
    self, BioJob, GenerationError, ImageJob, ImageReference, Operation, Orchestrator,
};

/// Central application state (Elm architecture).
pub struct AppState {
    /// Whether the app is still running.
    pub running: bool,
    /// The character being worked on: form plus per-field history.
    pub session: Session,
    orchestrator: Orchestrator,
    /// Character form view state.
    pub form: FormViewState,
    /// Active notifications (max 3 visible).
    pub notifications: Vec<Notification>,
    /// Monotonic counter for notification IDs.
    notification_counter: u64,
    /// Whether the help modal is open.
    pub show_help: bool,
    /// Printable sheet from a failed export, shown after the TUI exits.
    printable: Option<String>,
    /// Receiver for backend events.
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    /// Backend services handle.
    services: Services,
}

impl AppState {
    pub fn new(event_rx: mpsc::UnboundedReceiver<AppEvent>, services: Services) -> Self {
        Self {
            running: true,
            session: Session::default(),
            orchestrator: Orchestrator::from_config(&services.config.ai),
            form: FormViewState::new(),
            notifications: Vec::new(),
            notification_counter: 0,
            show_help: false,
            printable: None,
            event_rx,
            services,
        }
    }

    /// Printable sheet left by a failed export, if any.
    pub fn take_printable(&mut self) -> Option<String> {
        self.printable.take()
    }

    // ── Elm event loop ──────────────────────────────────────────────────

    /// Main event loop: render → select → update → loop.
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        tick_rate: Duration,
    ) -> io::Result<()> {
        let mut tick_interval = tokio::time::interval(tick_rate);
        let mut event_stream = EventStream::new();

        while self.running {
            terminal.draw(|frame| self.render(frame))?;

            tokio::select! {
                _ = tick_interval.tick() => {
                    self.handle_event(AppEvent::Tick);
                }
                Some(event) = self.event_rx.recv() => {
                    self.handle_event(event);
                }
                Some(Ok(crossterm_event)) = event_stream.next() => {
                    self.handle_event(AppEvent::Input(crossterm_event));
                }
            }
        }

        Ok(())
    }

    // ── Event handling ──────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Tick => self.on_tick(),
            AppEvent::Input(crossterm_event) => {
                // Priority 1: open editor consumes all input
                if self.form.is_editing() {
                    match self.form.handle_input(&crossterm_event, &mut self.session) {
                        FormInput::Consumed => {}
                        FormInput::Action(action) => self.handle_action(action),
                        FormInput::Notify(message, level) => self.push_notification(message, level),
                    }
                    return;
                }

                // Priority 2: help modal
                if self.show_help {
                    if let Some(action) = map_help_input(&crossterm_event) {
                        self.handle_action(action);
                    }
                    return;
                }

                if let Some(action) = map_input_to_action(&crossterm_event) {
                    self.handle_action(action);
                }
            }
            AppEvent::BioFinished { job, result } => self.on_bio_finished(job, result),
            AppEvent::ImageFinished { job, result } => self.on_image_finished(job, result),
        }
    }

    fn handle_action(&mut self, action: Action) {
        match action {
            Action::SelectNext => self.form.selected = self.form.selected.next(),
            Action::SelectPrev => self.form.selected = self.form.selected.prev(),
            Action::StartEdit => self.form.start_edit(&self.session),
            Action::GenerateBio => self.start_bio(),
            Action::GenerateImage(reference) => self.start_image(reference),
            Action::PromptReferenceImage => self.form.start_reference_prompt(),
            Action::HistoryPrevious | Action::HistoryNext => self.navigate(action),
            Action::Export => self.export(),
            Action::NewCharacter => self.new_character(),
            Action::ShowHelp => self.show_help = true,
            Action::CloseHelp => self.show_help = false,
            Action::Quit => self.running = false,
        }
    }

    // ── Generation ──────────────────────────────────────────────────────

    fn start_bio(&mut self) {
        let job = match self.orchestrator.begin_bio(&self.session) {
            Ok(job) => job,
            Err(e) => return self.report_generation_error(e),
        };

        let client = self.services.text.clone();
        let policy = self.orchestrator.policy();
        let tx = self.services.event_tx.clone();
        tokio::spawn(async move {
            let result = orchestrator::request_bio(client.as_ref(), &job.request, policy).await;
            let _ = tx.send(AppEvent::BioFinished { job, result });
        });

        self.push_notification("Generating bio...".to_string(), NotificationLevel::Info);
    }

    fn on_bio_finished(&mut self, job: BioJob, result: Result<String, LlmError>) {
        match self.orchestrator.finish_bio(&mut self.session, job, result) {
            Ok(updated) => self.push_notification(
                format!("Bio updated ({} fields)", updated.len()),
                NotificationLevel::Success,
            ),
            Err(e) => self.report_generation_error(e),
        }
    }

    fn start_image(&mut self, reference: ImageReference) {
        let job = match self.orchestrator.begin_image(&self.session, reference) {
            Ok(job) => job,
            Err(e) => return self.report_generation_error(e),
        };

        let client = self.services.images.clone();
        let tx = self.services.event_tx.clone();
        tokio::spawn(async move {
            let result = orchestrator::request_image(client.as_ref(), &job.request).await;
            let _ = tx.send(AppEvent::ImageFinished { job, result });
        });

        self.push_notification("Painting portrait...".to_string(), NotificationLevel::Info);
    }

    fn on_image_finished(&mut self, job: ImageJob, result: Result<Vec<u8>, LlmError>) {
        match self.orchestrator.finish_image(&mut self.session, job, result) {
            Ok(()) => self.push_notification("Portrait ready".to_string(), NotificationLevel::Success),
            Err(e) => self.report_generation_error(e),
        }
    }

    fn report_generation_error(&mut self, error: GenerationError) {
        let level = match error {
            GenerationError::Busy(_) => NotificationLevel::Warning,
            _ => NotificationLevel::Error,
        };
        log::warn!("Generation error: {}", error);
        self.push_notification(error.user_message(), level);
    }

    // ── Form actions ────────────────────────────────────────────────────

    fn navigate(&mut self, action: Action) {
        let Some(field) = self.form.selected_field() else {
            return;
        };
        let moved = match action {
            Action::HistoryPrevious => self.session.go_previous(field),
            _ => self.session.go_next(field),
        };
        if let Err(e) = moved {
            log::error!("History navigation failed: {}", e);
            self.push_notification(e.to_string(), NotificationLevel::Error);
        }
    }

    fn export(&mut self) {
        let options = ExportOptions::from(&self.services.config.export);
        let dir = self.services.config.export_dir();

        match export::export(&self.session.form.sheet, &self.session.form, &options, &dir) {
            Ok(ExportOutcome::Written(paths)) => {
                let shown = paths
                    .first()
                    .map(|p| p.display().to_string())
                    .unwrap_or_default();
                self.push_notification(format!("Exported to {shown}"), NotificationLevel::Success);
            }
            Ok(ExportOutcome::Printable(text)) => {
                self.printable = Some(text);
                self.push_notification(
                    "Could not write files; the sheet will be printed on exit".to_string(),
                    NotificationLevel::Warning,
                );
            }
            Err(e) => self.push_notification(format!("Export failed: {e}"), NotificationLevel::Error),
        }
    }

    fn new_character(&mut self) {
        if self.orchestrator.is_busy(Operation::Bio) || self.orchestrator.is_busy(Operation::Image) {
            self.push_notification(
                "Wait for the running generation to finish".to_string(),
                NotificationLevel::Warning,
            );
            return;
        }
        self.session.reset();
        self.form = FormViewState::new();
        self.push_notification("Started a new character".to_string(), NotificationLevel::Info);
    }

    // ── Notifications ───────────────────────────────────────────────────

    /// Push a notification (dedup by message, max 3).
    pub fn push_notification(&mut self, message: String, level: NotificationLevel) {
        if self.notifications.iter().any(|n| n.message == message) {
            return;
        }

        self.notification_counter += 1;
        self.notifications.push(Notification {
            id: self.notification_counter,
            message,
            level,
            ttl_ticks: 50,
        });

        while self.notifications.len() > 3 {
            self.notifications.remove(0);
        }
    }

    /// Tick: decrement notification TTLs, dismiss expired.
    fn on_tick(&mut self) {
        for n in &mut self.notifications {
            n.ttl_ticks = n.ttl_ticks.saturating_sub(1);
        }
        self.notifications.retain(|n| n.ttl_ticks > 0);
    }

    // ── Rendering ───────────────────────────────────────────────────────

    fn render(&self, frame: &mut Frame) {
        let area = frame.area();
        let [main, status] =
            Layout::vertical([Constraint::Min(10), Constraint::Length(1)]).areas(area);

        self.form.render(frame, main, &self.session);
        self.render_status_bar(frame, status);
        self.render_notifications(frame, area);

        if self.show_help {
            render_help_modal(frame, area);
        }
    }

    fn render_status_bar(&self, frame: &mut Frame, area: Rect) {
        let busy = |op: Operation, label: &'static str| {
            if self.orchestrator.is_busy(op) {
                Span::styled(label, Style::default().fg(theme::PRIMARY_LIGHT))
            } else {
                Span::raw("")
            }
        };

        let mode_indicator = if self.form.is_editing() {
            Span::styled(" EDIT ", theme::insert_badge())
        } else {
            Span::raw("")
        };

        let status = Line::from(vec![
            Span::styled(" bioforge ", theme::brand_badge()),
            Span::raw(" "),
            mode_indicator,
            Span::raw(" "),
            Span::styled(
                self.form.selected.label(),
                Style::default()
                    .fg(theme::PRIMARY_LIGHT)
                    .add_modifier(Modifier::BOLD),
            ),
            busy(Operation::Bio, " │ writing bio"),
            busy(Operation::Image, " │ painting"),
            Span::raw(" │ "),
            Span::styled("g", theme::key_hint()),
            Span::raw(":bio "),
            Span::styled("p", theme::key_hint()),
            Span::raw(":portrait "),
            Span::styled("[ ]", theme::key_hint()),
            Span::raw(":history "),
            Span::styled("x", theme::key_hint()),
            Span::raw(":export "),
            Span::styled("?", theme::key_hint()),
            Span::raw(":help "),
            Span::styled("q", theme::key_hint()),
            Span::raw(":quit"),
        ]);

        frame.render_widget(Paragraph::new(status), area);
    }

    fn render_notifications(&self, frame: &mut Frame, area: Rect) {
        if self.notifications.is_empty() {
            return;
        }

        let max_width = 60.min(area.width.saturating_sub(2));
        let height = (self.notifications.len() as u16).min(area.height);
        let x = area.width.saturating_sub(max_width + 1);
        let notification_area = Rect::new(x, 1.min(area.height.saturating_sub(height)), max_width, height);

        let lines: Vec<Line> = self
            .notifications
            .iter()
            .map(|n| {
                let (prefix, color) = match n.level {
                    NotificationLevel::Info => ("ℹ", theme::INFO),
                    NotificationLevel::Success => ("✓", theme::SUCCESS),
                    NotificationLevel::Warning => ("⚠", theme::WARNING),
                    NotificationLevel::Error => ("✗", theme::ERROR),
                };
                Line::from(vec![
                    Span::styled(format!(" {prefix} "), Style::default().fg(color).add_modifier(Modifier::BOLD)),
                    Span::raw(n.message.as_str()),
                ])
            })
            .collect();

        frame.render_widget(Clear, notification_area);
        frame.render_widget(Paragraph::new(lines), notification_area);
    }
}

// ── Input mapping ───────────────────────────────────────────────────────

fn map_help_input(event: &Event) -> Option<Action> {
    match event {
        Event::Key(KeyEvent {
            code: KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q'),
            kind: KeyEventKind::Press,
            ..
        }) => Some(Action::CloseHelp),
        _ => None,
    }
}

fn map_input_to_action(event: &Event) -> Option<Action> {
    let Event::Key(key) = event else {
        return None;
    };
    if key.kind != KeyEventKind::Press {
        return None;
    }
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Action::Quit);
    }

    match key.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('?') => Some(Action::ShowHelp),
        KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => Some(Action::SelectNext),
        KeyCode::Up | KeyCode::Char('k') | KeyCode::BackTab => Some(Action::SelectPrev),
        KeyCode::Enter | KeyCode::Char('e') => Some(Action::StartEdit),
        KeyCode::Left | KeyCode::Char('[') => Some(Action::HistoryPrevious),
        KeyCode::Right | KeyCode::Char(']') => Some(Action::HistoryNext),
        KeyCode::Char('g') => Some(Action::GenerateBio),
        KeyCode::Char('p') => Some(Action::GenerateImage(ImageReference::None)),
        KeyCode::Char('r') => Some(Action::GenerateImage(ImageReference::Current)),
        KeyCode::Char('u') => Some(Action::PromptReferenceImage),
        KeyCode::Char('x') => Some(Action::Export),
        KeyCode::Char('n') => Some(Action::NewCharacter),
        _ => None,
    }
}

fn render_help_modal(frame: &mut Frame, area: Rect) {
    let modal = centered_rect(60, 70, area);

    let keybindings = [
        ("j / k, Tab", "Select next / previous row"),
        ("Enter / e", "Edit the selected row (Enter saves, Esc cancels)"),
        ("g", "Generate the bio fields"),
        ("[ / ]", "Previous / next version of the selected field"),
        ("p", "Generate a portrait"),
        ("r", "Refine the current portrait"),
        ("u", "Generate a portrait from a reference image file"),
        ("x", "Export the sheet"),
        ("n", "Start a new character"),
        ("?", "Toggle this help"),
        ("q", "Quit"),
    ];

    let mut lines = vec![Line::raw("")];
    lines.extend(keybindings.iter().map(|(key, desc)| {
        Line::from(vec![
            Span::styled(format!("  {key:<14}"), theme::title()),
            Span::raw(*desc),
        ])
    }));
    lines.push(Line::raw(""));
    lines.push(Line::styled(
        "  Gold italic text was written by the AI and not edited since.",
        Style::default().fg(theme::AI_GENERATED),
    ));

    let block = Block::default()
        .title(" Help ")
        .borders(Borders::ALL)
        .border_style(theme::border_focused());

    frame.render_widget(Clear, modal);
    frame.render_widget(Paragraph::new(lines).block(block), modal);
}

/// Calculate a centered rect using percentage of parent area.
pub(super) fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::vertical([
        Constraint::Percentage((100 - percent_y) / 2),
        Constraint::Percentage(percent_y),
        Constraint::Percentage((100 - percent_y) / 2),
    ])
    .split(area);

    Layout::horizontal([
        Constraint::Percentage((100 - percent_x) / 2),
        Constraint::Percentage(percent_x),
        Constraint::Percentage((100 - percent_x) / 2),
    ])
    .split(popup_layout[1])[1]
}
