//! Logging helpers for walletfs
//!
//! The engine logs through `tracing`. Values that come from clients or that
//! identify a person go through [`LogConfig`] first.
//!
//! # Log Levels
//!
//! - **WARN**: Recovered anomalies: placeholder rewrites, ambiguous
//!   identifiers, failed emptiness probes, failed content release
//! - **INFO**: Committed mutations (write, mkdir, trash, purge, move, rename)
//! - **DEBUG**: Resolution steps and fallbacks
//!
//! # Redaction
//!
//! - Wallet identities are shortened to `0x1234…abcd`
//! - Paths have the identity segment shortened the same way
//! - Control characters are escaped against log injection
//! - Long values are truncated

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Configuration for logging behavior
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Whether to shorten identities in logs (default: true)
    pub redact_identities: bool,

    /// Characters kept on each side of a shortened identity (default: 6 and 4)
    pub keep_prefix: usize,
    pub keep_suffix: usize,

    /// Maximum length of logged values before truncation (default: 200)
    pub max_value_length: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            redact_identities: true,
            keep_prefix: 6,
            keep_suffix: 4,
            max_value_length: 200,
        }
    }
}

impl LogConfig {
    /// Create a new log configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Log identities in full (UNSAFE - use only for debugging)
    pub fn unsafe_disable_redaction(mut self) -> Self {
        self.redact_identities = false;
        self
    }

    /// Set maximum length for logged values
    pub fn max_value_length(mut self, len: usize) -> Self {
        self.max_value_length = len;
        self
    }

    /// Identity as it should appear in logs.
    pub fn identity<'a>(&self, identity: &'a Identity) -> Cow<'a, str> {
        self.shorten(identity.as_str())
    }

    /// Path as it should appear in logs: identity segment shortened,
    /// control characters escaped, long values truncated.
    pub fn path(&self, path: &CanonicalPath, identity: &Identity) -> String {
        let shown = match path.as_str().strip_prefix(identity.root().as_str()) {
            Some(rest) if self.redact_identities && (rest.is_empty() || rest.starts_with('/')) => {
                format!("/{}{}", self.shorten(identity.as_str()), rest)
            }
            _ => path.as_str().to_string(),
        };
        self.value(&shown)
    }

    /// Client-supplied text (raw paths, names, identifiers) for logging.
    pub fn value(&self, raw: &str) -> String {
        self.truncate(&sanitize_for_log(raw)).into_owned()
    }

    fn shorten<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if !self.redact_identities {
            return Cow::Borrowed(value);
        }
        let chars: Vec<char> = value.chars().collect();
        if chars.len() <= self.keep_prefix + self.keep_suffix + 1 {
            return Cow::Borrowed(value);
        }
        let head: String = chars[..self.keep_prefix].iter().collect();
        let tail: String = chars[chars.len() - self.keep_suffix..].iter().collect();
        Cow::Owned(format!("{head}…{tail}"))
    }

    /// Truncate value if it exceeds max length
    ///
    /// Handles UTF-8 char boundaries properly to avoid panics on multi-byte chars.
    fn truncate<'a>(&self, value: &'a str) -> Cow<'a, str> {
        if value.len() <= self.max_value_length {
            Cow::Borrowed(value)
        } else {
            let mut end = self.max_value_length;
            while end > 0 && !value.is_char_boundary(end) {
                end -= 1;
            }
            Cow::Owned(format!(
                "{}...[truncated {} bytes]",
                &value[..end],
                value.len() - end
            ))
        }
    }
}

/// Escape characters that could forge log lines.
pub fn sanitize_for_log(input: &str) -> String {
    input
        .replace('\n', "\\n")
        .replace('\r', "\\r")
        .replace('\t', "\\t")
        .chars()
        .filter(|c| !c.is_control() || *c == ' ')
        .collect()
}
