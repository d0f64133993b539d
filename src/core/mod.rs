pub mod fields;
pub mod form;
pub mod history;
pub mod parser;
pub mod prompt;

pub mod llm;
pub mod credentials;
pub mod orchestrator;

pub mod export;
pub mod logging;
