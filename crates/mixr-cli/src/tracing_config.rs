//! Diagnostic logging for the `mixr` binary.
//!
//! Logging is off unless a filter is given. `MIXR_LOG` holds an `EnvFilter`
//! directive and is read before `RUST_LOG`. `MIXR_LOG_FORMAT` picks the
//! layout:
//!
//! - `text`: one line per event (the default)
//! - `tree`: events nested under the composition stage spans
//! - `json`: newline-delimited objects carrying the current span
//!
//! ```bash
//! MIXR_LOG=mixr_resolver=debug MIXR_LOG_FORMAT=tree mixr mixr.json
//! MIXR_LOG=mixr_resolver::sorter=trace mixr mixr.json -c Shop.Order
//! ```
//!
//! Reports own stdout, so every layer writes to stderr (the tree layer's
//! default writer).

use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, Registry, fmt};

const FILTER_VAR: &str = "MIXR_LOG";
const FALLBACK_FILTER_VAR: &str = "RUST_LOG";
const FORMAT_VAR: &str = "MIXR_LOG_FORMAT";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Tree,
    Json,
}

impl LogFormat {
    /// Unknown names fall back to `Text`.
    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("tree") {
            Self::Tree
        } else if value.eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// What the environment asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub directive: String,
    pub format: LogFormat,
}

impl LogSettings {
    /// `None` when no filter variable is set.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let directive = lookup(FILTER_VAR).or_else(|| lookup(FALLBACK_FILTER_VAR))?;
        let format = lookup(FORMAT_VAR)
            .map(|value| LogFormat::parse(&value))
            .unwrap_or(LogFormat::Text);
        Some(Self { directive, format })
    }

    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::builder().parse_lossy(&self.directive)
    }
}

/// Installs the global subscriber described by the environment, if any.
pub fn init_tracing() {
    let Some(settings) = LogSettings::from_env() else {
        return;
    };
    let filter = settings.filter();
    match settings.format {
        LogFormat::Text => {
            let layer = fmt::layer().with_writer(std::io::stderr).with_target(true);
            Registry::default().with(filter).with(layer).init();
        }
        LogFormat::Tree => {
            let layer = tracing_tree::HierarchicalLayer::new(2)
                .with_indent_lines(true)
                .with_deferred_spans(true)
                .with_targets(true);
            Registry::default().with(filter).with(layer).init();
        }
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .with_writer(std::io::stderr);
            Registry::default().with(filter).with(layer).init();
        }
    }
}

#[cfg(test)]
#[path = "tests/tracing_config_tests.rs"]
mod tests;
