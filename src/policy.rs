// Failure policy for missing and denied secrets.

use crate::error::LookupError;
use std::fmt;
use std::str::FromStr;

/// What to do when a fetch is classified as not-found or access-denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Policy {
    /// Abort the lookup with a fatal error.
    #[default]
    Error,
    /// Emit a warning and drop the term from the result.
    Warn,
    /// Silently drop the term from the result.
    Skip,
}

impl Policy {
    /// Parse a policy for the named option, e.g. `on_missing`.
    ///
    /// Matching is case-insensitive. Anything outside `error`, `warn` and
    /// `skip` is a configuration error that names the option.
    pub fn parse_option(option: &str, value: &str) -> Result<Self, LookupError> {
        value.parse().map_err(|_| {
            LookupError::Configuration(format!(
                "\"{}\" must be a string and one of \"error\", \"warn\" or \"skip\", not {}",
                option,
                value.to_lowercase()
            ))
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Policy::Error => "error",
            Policy::Warn => "warn",
            Policy::Skip => "skip",
        }
    }
}

impl FromStr for Policy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "error" => Ok(Policy::Error),
            "warn" => Ok(Policy::Warn),
            "skip" => Ok(Policy::Skip),
            other => Err(format!("unknown policy '{}'", other)),
        }
    }
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
