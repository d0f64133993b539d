//! Crate-level test suite.
//!
//! - `common`: shared fixtures (sheets, AI responses, fast retry policies)
//! - `unit`: orchestrator, parser, HTTP client and end-to-end form scenarios
//! - `property`: proptest invariants for history, parser and export

mod common;
mod unit;
