//! Character form view: input attributes, bio fields with their history
//! navigation row, and the inline editors.

use std::path::Path;

use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

use super::super::events::{Action, Focus, NotificationLevel};
use super::super::theme;
use super::super::widgets::input_buffer::InputBuffer;
use crate::core::fields::{Attribute, Field};
use crate::core::form::{Session, VisualState};
use crate::core::history::NavigationState;
use crate::core::orchestrator::ImageReference;

// ============================================================================
// State
// ============================================================================

#[derive(Debug, Default)]
enum Mode {
    #[default]
    Normal,
    /// Inline edit of the selected row.
    Editing(InputBuffer),
    /// Path prompt for a reference image.
    ReferencePath(InputBuffer),
}

/// Outcome of feeding input to the view while an editor is open.
#[derive(Debug, PartialEq, Eq)]
pub enum FormInput {
    Consumed,
    Action(Action),
    Notify(String, NotificationLevel),
}

pub struct FormViewState {
    pub selected: Focus,
    mode: Mode,
}

impl Default for FormViewState {
    fn default() -> Self {
        Self::new()
    }
}

impl FormViewState {
    pub fn new() -> Self {
        Self {
            selected: Focus::Attribute(Attribute::Name),
            mode: Mode::Normal,
        }
    }

    pub fn is_editing(&self) -> bool {
        !matches!(self.mode, Mode::Normal)
    }

    /// The selected bio field, if the selection is on one.
    pub fn selected_field(&self) -> Option<Field> {
        match self.selected {
            Focus::Field(field) => Some(field),
            Focus::Attribute(_) => None,
        }
    }

    pub fn start_edit(&mut self, session: &Session) {
        let current = match self.selected {
            Focus::Attribute(attr) => session.form.sheet.get(attr),
            Focus::Field(field) => session.form.value(field),
        };
        self.mode = Mode::Editing(InputBuffer::with_text(current));
    }

    pub fn start_reference_prompt(&mut self) {
        self.mode = Mode::ReferencePath(InputBuffer::new());
    }

    /// Route input to the open editor. Call only while [`Self::is_editing`].
    pub fn handle_input(&mut self, event: &Event, session: &mut Session) -> FormInput {
        let Event::Key(key) = event else {
            return FormInput::Consumed;
        };
        if key.kind != KeyEventKind::Press {
            return FormInput::Consumed;
        }

        match key.code {
            KeyCode::Esc => {
                self.mode = Mode::Normal;
                FormInput::Consumed
            }
            KeyCode::Enter => self.submit(session),
            _ => {
                if let Mode::Editing(buf) | Mode::ReferencePath(buf) = &mut self.mode {
                    edit_buffer(buf, key);
                }
                FormInput::Consumed
            }
        }
    }

    fn submit(&mut self, session: &mut Session) -> FormInput {
        match std::mem::take(&mut self.mode) {
            Mode::Normal => FormInput::Consumed,
            Mode::Editing(mut buf) => {
                let value = buf.take();
                match self.selected {
                    Focus::Attribute(attr) => session.form.sheet.set(attr, value),
                    Focus::Field(field) => {
                        session.form.on_direct_edit(field, value);
                    }
                }
                FormInput::Consumed
            }
            Mode::ReferencePath(mut buf) => {
                let path = buf.take();
                let path = path.trim();
                if path.is_empty() {
                    return FormInput::Consumed;
                }
                match ImageReference::from_file(Path::new(path)) {
                    Ok(reference) => FormInput::Action(Action::GenerateImage(reference)),
                    Err(e) => {
                        log::warn!("Could not read reference image {}: {}", path, e);
                        FormInput::Notify(
                            format!("Could not read {path}: {e}"),
                            NotificationLevel::Error,
                        )
                    }
                }
            }
        }
    }

    // ========================================================================
    // Rendering
    // ========================================================================

    pub fn render(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let [left, right] =
            Layout::horizontal([Constraint::Percentage(35), Constraint::Percentage(65)])
                .areas(area);

        let [attrs_area, portrait_area] =
            Layout::vertical([Constraint::Min(9), Constraint::Length(4)]).areas(left);

        self.render_attributes(frame, attrs_area, session);
        self.render_portrait(frame, portrait_area, session);

        let rows = Layout::vertical(Field::ALL.iter().map(|_| Constraint::Fill(1))).split(right);
        for (field, row) in Field::ALL.iter().zip(rows.iter()) {
            self.render_field(frame, *row, session, *field);
        }
    }

    fn render_attributes(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let focused = matches!(self.selected, Focus::Attribute(_));
        let block = if focused {
            theme::block_focused("Character")
        } else {
            theme::block_default("Character")
        };

        let lines: Vec<Line> = Attribute::ALL
            .iter()
            .map(|&attr| {
                let selected = self.selected == Focus::Attribute(attr);
                let label_style = if selected {
                    theme::title()
                } else {
                    theme::heading()
                };
                let value = match (&self.mode, selected) {
                    (Mode::Editing(buf), true) => buf.to_line().spans,
                    _ => vec![value_span(session.form.sheet.get(attr), VisualState::Neutral)],
                };
                let mut spans = vec![Span::styled(format!("{:<11}", attr.label()), label_style)];
                spans.extend(value);
                Line::from(spans)
            })
            .collect();

        frame.render_widget(
            Paragraph::new(lines).wrap(Wrap { trim: false }).block(block),
            area,
        );
    }

    fn render_portrait(&self, frame: &mut Frame, area: Rect, session: &Session) {
        let block = theme::block_default("Portrait");
        let line = match (&self.mode, &session.form.portrait) {
            (Mode::ReferencePath(buf), _) => {
                let mut spans = vec![Span::styled("Reference image: ", theme::muted())];
                spans.extend(buf.to_line().spans);
                Line::from(spans)
            }
            (_, Some(portrait)) => Line::styled(
                format!("Ready ({} KB) - exported with the sheet", portrait.bytes.len().div_ceil(1024)),
                Style::default().fg(theme::SUCCESS),
            ),
            (_, None) => Line::styled("None yet (p to generate)", theme::muted()),
        };
        frame.render_widget(Paragraph::new(line).block(block), area);
    }

    fn render_field(&self, frame: &mut Frame, area: Rect, session: &Session, field: Field) {
        let selected = self.selected == Focus::Field(field);
        let display = session.form.display(field);

        let mut block = if selected {
            theme::block_focused(field.label())
        } else {
            theme::block_default(field.label())
        };
        if display.state == VisualState::Highlighted {
            block = block.title(
                Line::styled(" AI ", Style::default().fg(theme::AI_GENERATED)).right_aligned(),
            );
        }
        if let Some(nav) = navigation_line(session.navigation(field)) {
            block = block.title_bottom(nav.right_aligned());
        }

        let body = match (&self.mode, selected) {
            (Mode::Editing(buf), true) => buf.to_line(),
            _ => Line::from(value_span(&display.value, display.state)),
        };

        frame.render_widget(
            Paragraph::new(body).wrap(Wrap { trim: true }).block(block),
            area,
        );
    }
}

fn value_span(value: &str, state: VisualState) -> Span<'static> {
    if value.trim().is_empty() {
        Span::styled("-", theme::muted())
    } else {
        Span::styled(value.to_string(), theme::field_value(state))
    }
}

/// `◀ 2/3 ▶` with unavailable arrows dimmed; `None` hides the row.
fn navigation_line(nav: NavigationState) -> Option<Line<'static>> {
    let (position, total) = nav.position.filter(|_| nav.visible)?;
    let arrow = |enabled: bool, glyph: &'static str| {
        if enabled {
            Span::styled(glyph, Style::default().fg(theme::PRIMARY_LIGHT).add_modifier(Modifier::BOLD))
        } else {
            Span::styled(glyph, theme::key_hint())
        }
    };
    Some(Line::from(vec![
        arrow(nav.can_go_previous, " ◀ "),
        Span::styled(format!("{position}/{total}"), theme::muted()),
        arrow(nav.can_go_next, " ▶ "),
    ]))
}

fn edit_buffer(buf: &mut InputBuffer, key: &KeyEvent) {
    match key.code {
        KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => buf.insert_char(c),
        KeyCode::Backspace => buf.backspace(),
        KeyCode::Delete => buf.delete(),
        KeyCode::Left => buf.move_left(),
        KeyCode::Right => buf.move_right(),
        KeyCode::Home => buf.move_home(),
        KeyCode::End => buf.move_end(),
        _ => {}
    }
}
