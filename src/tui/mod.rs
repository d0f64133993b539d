//! Terminal UI: an Elm-style event loop over the character form.

pub mod app;
pub mod events;
pub mod services;
pub mod theme;
pub mod views;
pub mod widgets;
