//! Logging configuration for patient-tracker.
//!
//! Installs the tracing subscriber used by the repository and store layers.
//! Embedding applications that already own a subscriber can skip this.

use serde::{Deserialize, Serialize};
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::Config;

/// How much the repository and store report.
///
/// Set from the `logging.verbosity` config key, e.g. `verbosity = "verbose"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Loads, seeding and skipped store lines.
    #[default]
    Normal,
    /// Also every mutation and store write.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Most detailed level this verbosity lets through.
    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive scoped to this crate, e.g. `patient_tracker=debug`.
    #[must_use]
    pub fn directive(&self) -> String {
        format!(
            "patient_tracker={}",
            self.to_level_filter().as_str().to_ascii_lowercase()
        )
    }
}

/// Install a global subscriber for this crate's events.
///
/// `RUST_LOG` wins over `verbosity` when set. Returns `false` when the host
/// application already installed a subscriber, which is left in place.
///
/// # Examples
///
/// ```no_run
/// use patient_tracker::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.directive()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true))
        .try_init()
        .is_ok()
}

/// Install a subscriber using the verbosity from `config`.
pub fn init_from_config(config: &Config) -> bool {
    init_logging(config.logging.verbosity)
}

/// Initialize logging for tests.
///
/// Only warnings and errors are shown so test output stays readable.
#[cfg(test)]
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("warn")
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbosity_to_level() {
        assert_eq!(Verbosity::Quiet.to_level_filter(), Level::ERROR);
        assert_eq!(Verbosity::Normal.to_level_filter(), Level::INFO);
        assert_eq!(Verbosity::Verbose.to_level_filter(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.to_level_filter(), Level::TRACE);
    }

    #[test]
    fn test_directive_is_crate_scoped() {
        assert_eq!(Verbosity::Normal.directive(), "patient_tracker=info");
        assert_eq!(Verbosity::Verbose.directive(), "patient_tracker=debug");
        assert!(EnvFilter::try_new(Verbosity::Quiet.directive()).is_ok());
    }

    #[test]
    fn test_verbosity_from_config_text() {
        let verbosity: Verbosity = serde_json::from_str("\"verbose\"").unwrap();
        assert_eq!(verbosity, Verbosity::Verbose);
        assert_eq!(Verbosity::default(), Verbosity::Normal);
        assert!(serde_json::from_str::<Verbosity>("\"loud\"").is_err());
    }

    #[test]
    fn test_second_install_is_refused() {
        init_test_logging();
        // A subscriber is already in place, so this one is not installed.
        assert!(!init_from_config(&Config::default()));
        assert!(!init_logging(Verbosity::Trace));
    }
}
