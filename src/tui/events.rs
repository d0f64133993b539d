use crate::core::fields::{Attribute, Field};
use crate::core::llm::LlmError;
use crate::core::orchestrator::{BioJob, ImageJob, ImageReference};

/// Events flowing through the Elm-architecture event loop.
#[derive(Debug, Clone)]
pub enum AppEvent {
    /// Periodic tick for notification TTLs.
    Tick,
    /// Raw terminal input (keyboard/mouse).
    Input(crossterm::event::Event),
    /// A bio request finished (successfully or not).
    BioFinished {
        job: BioJob,
        result: Result<String, LlmError>,
    },
    /// A portrait request finished.
    ImageFinished {
        job: ImageJob,
        result: Result<Vec<u8>, LlmError>,
    },
}

/// High-level actions dispatched by the input mapper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SelectNext,
    SelectPrev,
    StartEdit,
    GenerateBio,
    GenerateImage(ImageReference),
    PromptReferenceImage,
    HistoryPrevious,
    HistoryNext,
    Export,
    NewCharacter,
    ShowHelp,
    CloseHelp,
    Quit,
}

/// Which form row has the selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Focus {
    Attribute(Attribute),
    Field(Field),
}

impl Focus {
    /// Attributes first, then the bio fields, in declaration order.
    pub fn all() -> Vec<Focus> {
        Attribute::ALL
            .iter()
            .map(|&a| Focus::Attribute(a))
            .chain(Field::ALL.iter().map(|&f| Focus::Field(f)))
            .collect()
    }

    pub fn label(self) -> &'static str {
        match self {
            Focus::Attribute(a) => a.label(),
            Focus::Field(f) => f.label(),
        }
    }

    pub fn next(self) -> Focus {
        let all = Focus::all();
        let idx = all.iter().position(|&f| f == self).unwrap_or(0);
        all[(idx + 1) % all.len()]
    }

    pub fn prev(self) -> Focus {
        let all = Focus::all();
        let idx = all.iter().position(|&f| f == self).unwrap_or(0);
        all[(idx + all.len() - 1) % all.len()]
    }
}

/// Notification level for the overlay system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A timed notification shown in the overlay.
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: u64,
    pub message: String,
    pub level: NotificationLevel,
    /// Ticks remaining before auto-dismiss.
    pub ttl_ticks: u32,
}
