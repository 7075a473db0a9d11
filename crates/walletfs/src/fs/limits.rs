//! Path limits and name validation.
//!
//! Every path the engine is about to create is checked here before any store
//! is touched:
//!
//! - **Depth**: directory nesting → `max_path_depth`
//! - **Length**: single names and whole paths → `max_filename_length`,
//!   `max_path_length`
//! - **Characters**: control characters and bidi overrides are rejected in
//!   every component, `/` and NUL in names given for rename/move

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::path::CanonicalPath;

/// Default maximum path depth (directory nesting): 100
pub const DEFAULT_MAX_PATH_DEPTH: usize = 100;

/// Default maximum filename (single component) length: 255 bytes
pub const DEFAULT_MAX_FILENAME_LENGTH: usize = 255;

/// Default maximum total path length: 4096 bytes
pub const DEFAULT_MAX_PATH_LENGTH: usize = 4096;

/// Limits applied to created paths.
///
/// # Example
///
/// ```rust
/// use walletfs::{FsEngine, PathLimits};
///
/// let limits = PathLimits::new()
///     .max_path_depth(16)
///     .max_filename_length(128);
///
/// let engine = FsEngine::builder().limits(limits).build();
/// ```
///
/// # Default Limits
///
/// | Limit | Default | Purpose |
/// |-------|---------|---------|
/// | `max_path_depth` | 100 | Directory nesting depth |
/// | `max_filename_length` | 255 | Single path component |
/// | `max_path_length` | 4096 | Total path length |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathLimits {
    /// Maximum directory nesting depth, identity segment included.
    pub max_path_depth: usize,
    /// Maximum length of a single name in bytes.
    pub max_filename_length: usize,
    /// Maximum total path length in bytes.
    pub max_path_length: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self {
            max_path_depth: DEFAULT_MAX_PATH_DEPTH,
            max_filename_length: DEFAULT_MAX_FILENAME_LENGTH,
            max_path_length: DEFAULT_MAX_PATH_LENGTH,
        }
    }
}

impl PathLimits {
    pub fn new() -> Self {
        Self::default()
    }

    /// No length or depth restrictions. Unsafe characters are still refused.
    pub fn unlimited() -> Self {
        Self {
            max_path_depth: usize::MAX,
            max_filename_length: usize::MAX,
            max_path_length: usize::MAX,
        }
    }

    pub fn max_path_depth(mut self, depth: usize) -> Self {
        self.max_path_depth = depth;
        self
    }

    pub fn max_filename_length(mut self, len: usize) -> Self {
        self.max_filename_length = len;
        self
    }

    pub fn max_path_length(mut self, len: usize) -> Self {
        self.max_path_length = len;
        self
    }

    /// Validate a canonical path against depth, length and character limits.
    pub fn validate_path(&self, path: &CanonicalPath) -> Result<(), PathLimitExceeded> {
        let len = path.as_str().len();
        if len > self.max_path_length {
            return Err(PathLimitExceeded::PathTooLong {
                length: len,
                limit: self.max_path_length,
            });
        }

        let mut depth = 0usize;
        for segment in path.segments() {
            self.check_component(segment)?;
            depth += 1;
        }
        if depth > self.max_path_depth {
            return Err(PathLimitExceeded::PathTooDeep {
                depth,
                limit: self.max_path_depth,
            });
        }
        Ok(())
    }

    /// Validate a client-supplied name (rename target, move `newName`).
    ///
    /// Returns the name with surrounding whitespace removed.
    pub fn validate_name<'a>(&self, name: &'a str) -> Result<&'a str, PathLimitExceeded> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(PathLimitExceeded::EmptyName);
        }
        if trimmed == "." || trimmed == ".." {
            return Err(PathLimitExceeded::ReservedName(trimmed.to_string()));
        }
        if let Some(c) = trimmed.chars().find(|c| *c == '/' || *c == '\0') {
            return Err(PathLimitExceeded::ReservedChar {
                character: if c == '/' { "/".into() } else { "NUL".into() },
            });
        }
        self.check_component(trimmed)?;
        Ok(trimmed)
    }

    fn check_component(&self, name: &str) -> Result<(), PathLimitExceeded> {
        if name.len() > self.max_filename_length {
            return Err(PathLimitExceeded::FilenameTooLong {
                length: name.len(),
                limit: self.max_filename_length,
            });
        }
        if let Some(bad_char) = find_unsafe_path_char(name) {
            return Err(PathLimitExceeded::UnsafePathChar {
                character: bad_char,
                component: name.to_string(),
            });
        }
        Ok(())
    }
}

/// Check if a path component contains unsafe characters.
///
/// Returns `Some(description)` for the first unsafe character found.
/// Rejects: ASCII control chars (0x00-0x1F, 0x7F), C1 controls (0x80-0x9F),
/// and Unicode bidi override characters (U+202A-U+202E, U+2066-U+2069).
fn find_unsafe_path_char(name: &str) -> Option<String> {
    for ch in name.chars() {
        if ch.is_ascii_control() || ('\u{0080}'..='\u{009F}').contains(&ch) {
            return Some(format!("U+{:04X}", ch as u32));
        }
        if ('\u{202A}'..='\u{202E}').contains(&ch) || ('\u{2066}'..='\u{2069}').contains(&ch) {
            return Some(format!("U+{:04X} (bidi override)", ch as u32));
        }
    }
    None
}

/// A path or name the engine refuses to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathLimitExceeded {
    /// Path depth (nesting) exceeds limit.
    PathTooDeep { depth: usize, limit: usize },
    /// Single name exceeds length limit.
    FilenameTooLong { length: usize, limit: usize },
    /// Total path exceeds length limit.
    PathTooLong { length: usize, limit: usize },
    /// Name contains a control or bidi character.
    UnsafePathChar {
        character: String,
        component: String,
    },
    /// Name contains a separator or NUL.
    ReservedChar { character: String },
    /// Name is `.` or `..`.
    ReservedName(String),
    /// Name is empty or whitespace.
    EmptyName,
}

impl fmt::Display for PathLimitExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PathTooDeep { depth, limit } => {
                write!(f, "path too deep: {} levels (max {})", depth, limit)
            }
            Self::FilenameTooLong { length, limit } => {
                write!(f, "filename too long: {} bytes (max {})", length, limit)
            }
            Self::PathTooLong { length, limit } => {
                write!(f, "path too long: {} bytes (max {})", length, limit)
            }
            Self::UnsafePathChar {
                character,
                component,
            } => {
                write!(
                    f,
                    "unsafe character {} in name '{}'",
                    character,
                    component.escape_debug()
                )
            }
            Self::ReservedChar { character } => {
                write!(f, "name must not contain {}", character)
            }
            Self::ReservedName(name) => write!(f, "reserved name '{}'", name),
            Self::EmptyName => write!(f, "name must not be empty"),
        }
    }
}

impl std::error::Error for PathLimitExceeded {}

/// Storage usage of one identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsUsage {
    /// Sum of file sizes in bytes.
    pub total_bytes: u64,
    /// Number of files.
    pub file_count: u64,
    /// Number of stored directories.
    pub dir_count: u64,
}
