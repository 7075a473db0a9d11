//! Canonical paths.
//!
//! A [`CanonicalPath`] is `/`-prefixed, has no repeated, trailing, `.` or `..`
//! segments, and is the only path form stores and the engine exchange.
//! Normalization is lexical: `..` pops the previous segment and never climbs
//! above `/`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Path separator.
pub const SEPARATOR: char = '/';

/// An absolute, normalized path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalPath(String);

impl CanonicalPath {
    /// The filesystem root `/`.
    pub fn root() -> Self {
        Self(SEPARATOR.to_string())
    }

    /// Normalize any string into a canonical path.
    ///
    /// Relative input is treated as rooted at `/`.
    ///
    /// ```
    /// use walletfs::CanonicalPath;
    ///
    /// let p = CanonicalPath::normalize("//0xABC/./Desktop//a/../notes.txt/");
    /// assert_eq!(p.as_str(), "/0xABC/Desktop/notes.txt");
    /// assert_eq!(CanonicalPath::normalize("/../..").as_str(), "/");
    /// ```
    pub fn normalize(raw: &str) -> Self {
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split(SEPARATOR) {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                other => segments.push(other),
            }
        }
        Self::from_segments(segments)
    }

    /// Build a path from already-validated segments.
    pub fn from_segments<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut path = String::new();
        for segment in segments {
            path.push(SEPARATOR);
            path.push_str(segment.as_ref());
        }
        if path.is_empty() {
            path.push(SEPARATOR);
        }
        Self(path)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.len() == 1
    }

    /// Non-empty segments, root first.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Number of segments; `/` has depth 0.
    pub fn depth(&self) -> usize {
        self.segments().count()
    }

    pub fn first_segment(&self) -> Option<&str> {
        self.segments().next()
    }

    /// Last segment, `None` for `/`.
    pub fn file_name(&self) -> Option<&str> {
        if self.is_root() {
            return None;
        }
        self.0.rsplit(SEPARATOR).next()
    }

    /// Parent directory, `None` for `/`.
    pub fn parent(&self) -> Option<CanonicalPath> {
        if self.is_root() {
            return None;
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Some(Self::root()),
            Some(idx) => Some(Self(self.0[..idx].to_string())),
        }
    }

    /// Append a single segment. The caller validates `name`.
    pub fn join(&self, name: &str) -> CanonicalPath {
        if self.is_root() {
            Self(format!("{SEPARATOR}{name}"))
        } else {
            Self(format!("{}{SEPARATOR}{name}", self.0))
        }
    }

    /// True when `self` is `ancestor` or lies below it.
    ///
    /// Segment-aware: `/a/Desktop2` is not within `/a/Desktop`.
    pub fn is_within(&self, ancestor: &CanonicalPath) -> bool {
        self == ancestor || self.is_strictly_within(ancestor)
    }

    /// True when `self` lies below `ancestor` (and is not `ancestor`).
    pub fn is_strictly_within(&self, ancestor: &CanonicalPath) -> bool {
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0.len() > ancestor.0.len()
            && self.0.starts_with(&ancestor.0)
            && self.0.as_bytes()[ancestor.0.len()] == b'/'
    }

    /// True when `self` is a direct child of `dir`.
    pub fn is_child_of(&self, dir: &CanonicalPath) -> bool {
        self.parent().as_ref() == Some(dir)
    }

    /// Replace the `from` prefix with `to`.
    ///
    /// Returns `None` when `self` is not within `from`.
    pub fn rebase(&self, from: &CanonicalPath, to: &CanonicalPath) -> Option<CanonicalPath> {
        if self == from {
            return Some(to.clone());
        }
        if !self.is_strictly_within(from) {
            return None;
        }
        let tail = if from.is_root() {
            &self.0[1..]
        } else {
            &self.0[from.0.len() + 1..]
        };
        Some(to.join(tail))
    }
}

impl fmt::Display for CanonicalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalPath {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for CanonicalPath {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CanonicalPath {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_and_strips() {
        assert_eq!(CanonicalPath::normalize(""), "/");
        assert_eq!(CanonicalPath::normalize("///"), "/");
        assert_eq!(CanonicalPath::normalize("a//b/"), "/a/b");
        assert_eq!(CanonicalPath::normalize("/a/./b/../c"), "/a/c");
        assert_eq!(CanonicalPath::normalize("/a/../../../b"), "/b");
    }

    #[test]
    fn parent_and_file_name() {
        let p = CanonicalPath::normalize("/0xABC/Desktop/notes.txt");
        assert_eq!(p.file_name(), Some("notes.txt"));
        assert_eq!(p.parent().unwrap(), "/0xABC/Desktop");
        assert_eq!(CanonicalPath::normalize("/0xABC").parent().unwrap(), "/");
        assert_eq!(CanonicalPath::root().parent(), None);
        assert_eq!(CanonicalPath::root().file_name(), None);
    }

    #[test]
    fn within_is_segment_aware() {
        let desktop = CanonicalPath::normalize("/a/Desktop");
        assert!(CanonicalPath::normalize("/a/Desktop/x").is_within(&desktop));
        assert!(desktop.is_within(&desktop));
        assert!(!desktop.is_strictly_within(&desktop));
        assert!(!CanonicalPath::normalize("/a/Desktop2").is_within(&desktop));
        assert!(desktop.is_strictly_within(&CanonicalPath::root()));
    }

    #[test]
    fn child_of() {
        let dir = CanonicalPath::normalize("/a/Desktop");
        assert!(CanonicalPath::normalize("/a/Desktop/x").is_child_of(&dir));
        assert!(!CanonicalPath::normalize("/a/Desktop/x/y").is_child_of(&dir));
        assert!(!dir.is_child_of(&dir));
    }

    #[test]
    fn rebase_moves_subtree() {
        let from = CanonicalPath::normalize("/a/src");
        let to = CanonicalPath::normalize("/a/Trash/src");
        let p = CanonicalPath::normalize("/a/src/deep/file.txt");
        assert_eq!(p.rebase(&from, &to).unwrap(), "/a/Trash/src/deep/file.txt");
        assert_eq!(from.rebase(&from, &to).unwrap(), to);
        assert!(CanonicalPath::normalize("/a/srcx").rebase(&from, &to).is_none());
    }

    #[test]
    fn join_from_root() {
        assert_eq!(CanonicalPath::root().join("0xABC"), "/0xABC");
        assert_eq!(CanonicalPath::normalize("/0xABC").join("Trash"), "/0xABC/Trash");
    }
}
