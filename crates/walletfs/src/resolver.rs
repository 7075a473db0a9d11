//! User path resolution.
//!
//! Turns whatever a client sent (`~/notes.txt`, `Desktop`, `/null/x`,
//! `/0xabc/Documents/../Public`) into a canonical absolute path inside the
//! requesting identity's namespace. Pure: no I/O, never fails. Whether the
//! result is acceptable (inside the namespace, within limits) is decided by
//! the engine.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;
use crate::path::CanonicalPath;

/// Rules applied by [`PathResolver`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveRules {
    /// Leading token replaced by the identity root.
    pub home_token: String,
    /// Leading segments that stand for a missing identity.
    pub placeholders: Vec<String>,
    /// Top-level folders re-rooted under the identity.
    pub well_known: Vec<String>,
}

impl Default for ResolveRules {
    fn default() -> Self {
        Self {
            home_token: "~".to_string(),
            placeholders: vec!["null".to_string(), "undefined".to_string()],
            well_known: ["Desktop", "Documents", "Public", "Pictures", "Videos", "Trash"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ResolveRules {
    fn is_placeholder(&self, segment: &str) -> bool {
        self.placeholders
            .iter()
            .any(|p| p.eq_ignore_ascii_case(segment))
    }

    fn is_well_known(&self, segment: &str) -> bool {
        self.well_known.iter().any(|w| w == segment)
    }
}

/// Resolves raw client paths for one identity.
#[derive(Debug, Clone, Copy)]
pub struct PathResolver<'a> {
    identity: &'a Identity,
    rules: &'a ResolveRules,
}

impl<'a> PathResolver<'a> {
    pub fn new(identity: &'a Identity, rules: &'a ResolveRules) -> Self {
        Self { identity, rules }
    }

    /// Resolve `raw` into a canonical path.
    ///
    /// ```
    /// use walletfs::{Identity, PathResolver, ResolveRules};
    ///
    /// let id = Identity::new("0xABC").unwrap();
    /// let rules = ResolveRules::default();
    /// let resolver = PathResolver::new(&id, &rules);
    ///
    /// assert_eq!(resolver.resolve("~/a.txt").as_str(), "/0xABC/a.txt");
    /// assert_eq!(resolver.resolve("Desktop/a.txt").as_str(), "/0xABC/Desktop/a.txt");
    /// assert_eq!(resolver.resolve("/Documents").as_str(), "/0xABC/Documents");
    /// assert_eq!(resolver.resolve("/null/a.txt").as_str(), "/0xABC/a.txt");
    /// assert_eq!(resolver.resolve("/0xabc/Public").as_str(), "/0xABC/Public");
    /// ```
    pub fn resolve(&self, raw: &str) -> CanonicalPath {
        let raw = raw.trim();
        let root = self.identity.root();

        // Home shorthand: `~` or `~/...`
        if let Some(rest) = raw.strip_prefix(self.rules.home_token.as_str())
            && !self.rules.home_token.is_empty()
            && (rest.is_empty() || rest.starts_with('/'))
        {
            return CanonicalPath::normalize(&format!("{root}/{rest}"));
        }

        // Placeholder standing in for the identity: `/null/...`, `undefined/...`
        let unrooted = raw.trim_start_matches('/');
        let first = unrooted.split('/').next().unwrap_or_default();
        if !first.is_empty() && self.rules.is_placeholder(first) {
            tracing::warn!(segment = first, "placeholder identity segment rewritten");
            let rest = &unrooted[first.len()..];
            return CanonicalPath::normalize(&format!("{root}/{rest}"));
        }

        if !raw.starts_with('/') {
            return CanonicalPath::normalize(&format!("{root}/{raw}"));
        }

        let normalized = CanonicalPath::normalize(raw);
        match normalized.first_segment() {
            Some(segment) if segment == self.identity.as_str() => normalized,
            Some(segment) if self.identity.matches_segment(segment) => {
                let tail = normalized.segments().skip(1);
                CanonicalPath::from_segments(std::iter::once(self.identity.as_str()).chain(tail))
            }
            Some(segment) if self.rules.is_well_known(segment) => {
                CanonicalPath::normalize(&format!("{root}{normalized}"))
            }
            _ => normalized,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn resolve(raw: &str) -> String {
        let id = Identity::new("0xABC").unwrap();
        let rules = ResolveRules::default();
        PathResolver::new(&id, &rules).resolve(raw).into_string()
    }

    #[test]
    fn home_token() {
        assert_eq!(resolve("~"), "/0xABC");
        assert_eq!(resolve("~/"), "/0xABC");
        assert_eq!(resolve("~/Desktop/a.txt"), "/0xABC/Desktop/a.txt");
        // not a home reference, just a name starting with ~
        assert_eq!(resolve("~draft"), "/0xABC/~draft");
    }

    #[test]
    fn placeholders() {
        assert_eq!(resolve("/null"), "/0xABC");
        assert_eq!(resolve("/null/Desktop"), "/0xABC/Desktop");
        assert_eq!(resolve("undefined/Documents/x"), "/0xABC/Documents/x");
        assert_eq!(resolve("/nullish"), "/nullish");
    }

    #[test]
    fn relative_paths() {
        assert_eq!(resolve(""), "/0xABC");
        assert_eq!(resolve("notes.txt"), "/0xABC/notes.txt");
        assert_eq!(resolve("./a/../b"), "/0xABC/b");
    }

    #[test]
    fn well_known_folders_rerooted() {
        for folder in ["Desktop", "Documents", "Public", "Pictures", "Videos", "Trash"] {
            assert_eq!(resolve(&format!("/{folder}/x")), format!("/0xABC/{folder}/x"));
        }
        // case-sensitive alias match
        assert_eq!(resolve("/desktop/x"), "/desktop/x");
    }

    #[test]
    fn identity_casing_canonicalized() {
        assert_eq!(resolve("/0xabc/Desktop"), "/0xABC/Desktop");
        assert_eq!(resolve("/0XABC"), "/0xABC");
    }

    #[test]
    fn root_and_foreign_paths_pass_through() {
        assert_eq!(resolve("/"), "/");
        assert_eq!(resolve("//"), "/");
        assert_eq!(resolve("/0xDEF/Desktop"), "/0xDEF/Desktop");
        assert_eq!(resolve("~/../0xDEF"), "/0xDEF");
    }

    #[test]
    fn trailing_separators_stripped() {
        assert_eq!(resolve("/0xABC/Desktop///"), "/0xABC/Desktop");
    }
}
