//! Command-line driver for the mixr composition engine.
//!
//! Loads a JSON manifest, builds the contexts it describes and reports the
//! resulting models as text or JSON.

pub mod args;
pub mod driver;
pub mod manifest;
pub mod reporter;
pub mod tracing_config;

#[cfg(test)]
#[path = "tests/args_tests.rs"]
mod args_tests;
