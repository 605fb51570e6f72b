//! Executor configuration: command-line flags plus embedding options.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Flags a front end passes through from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Flags {
    /// Double every SP penalty.
    pub strict: bool,
    /// SP never drops below 10.
    pub lenient: bool,
    /// Start at SP 0, in insanity mode.
    pub chaos: bool,
    /// Disable mood-driven value modifiers.
    pub no_mood: bool,
    /// Halve every SP penalty.
    pub pray: bool,
    /// Record every SP change for the audit report.
    pub audit: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid flags document: {0}")]
    InvalidFlags(#[from] serde_json::Error),
}

impl Flags {
    /// Parse flags from a JSON object such as `{"strict": true}`.
    /// Missing keys default to `false`.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Starting SP for these flags.
    pub fn initial_sp(&self) -> i64 {
        if self.chaos {
            0
        } else {
            100
        }
    }
}

/// Everything needed to construct an [`Executor`](crate::Executor).
#[derive(Debug, Clone, Default)]
pub struct ExecutorConfig {
    pub flags: Flags,
    /// Path of the running program. Sidecar files (`.dream`, `.blame`,
    /// `.therapy`) and the `mercy.san` sentinel live beside it; without a
    /// path nothing is persisted.
    pub source_path: Option<PathBuf>,
    /// Seed for the random source; `None` seeds from entropy.
    pub seed: Option<u64>,
    /// Mirror program output to stdout as well as capturing it.
    pub echo: bool,
}

impl ExecutorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.flags = flags;
        self
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_flags_default_to_false() {
        let flags = Flags::from_json(r#"{"strict": true}"#).unwrap();
        assert!(flags.strict);
        assert!(!flags.lenient);
        assert!(!flags.audit);
    }

    #[test]
    fn chaos_starts_at_zero() {
        let flags = Flags {
            chaos: true,
            ..Flags::default()
        };
        assert_eq!(flags.initial_sp(), 0);
        assert_eq!(Flags::default().initial_sp(), 100);
    }

    #[test]
    fn malformed_flags_are_rejected() {
        assert!(Flags::from_json("{strict}").is_err());
    }
}
