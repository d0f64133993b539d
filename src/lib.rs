/// bioforge - AI-assisted TTRPG character bios (TUI Edition)
///
/// Core library providing the character form, per-field version history,
/// tolerant parsing of AI responses, portrait generation and document export.

pub mod config;
pub mod core;
pub mod tui;

#[cfg(test)]
mod tests;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
