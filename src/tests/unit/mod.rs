//! Unit tests for the generation pipeline.

mod orchestrator_tests;
mod scenario_tests;
