//! Path <-> external identifier codec.
//!
//! An identifier is the canonical path with every `/` replaced by `-` and the
//! tag `uuid-` in front, so `/0xABC/Desktop/notes.txt` becomes
//! `uuid--0xABC-Desktop-notes.txt`. The encoding is lossy for names that
//! contain `-`; [`decode`] therefore only produces a lookup hypothesis and
//! [`crate::lookup`] recovers the real entry.

use crate::path::{CanonicalPath, SEPARATOR};

/// Prefix carried by every external identifier.
pub const ID_TAG: &str = "uuid-";

/// Character standing in for the path separator inside identifiers.
pub const SUBSTITUTE: char = '-';

/// Encode a canonical path as an external identifier.
///
/// ```
/// use walletfs::{codec, CanonicalPath};
///
/// let path = CanonicalPath::normalize("/0xABC/Desktop/notes.txt");
/// assert_eq!(codec::encode(&path), "uuid--0xABC-Desktop-notes.txt");
/// ```
pub fn encode(path: &CanonicalPath) -> String {
    let path = path.as_str();
    let mut id = String::with_capacity(ID_TAG.len() + path.len());
    id.push_str(ID_TAG);
    id.extend(
        path.chars()
            .map(|c| if c == SEPARATOR { SUBSTITUTE } else { c }),
    );
    id
}

/// Best-effort inverse of [`encode`]. Never fails.
///
/// Repeated tags (`uuid-uuid-...`) and extra leading substitutes are
/// tolerated. Every `-` is read as a separator, so names that contained `-`
/// come back split.
///
/// ```
/// use walletfs::codec;
///
/// assert_eq!(codec::decode("uuid--0xABC-Desktop").as_str(), "/0xABC/Desktop");
/// assert_eq!(codec::decode("uuid-uuid--0xABC").as_str(), "/0xABC");
/// ```
pub fn decode(id: &str) -> CanonicalPath {
    let body = strip_tags(id);
    let candidate: String = body
        .chars()
        .map(|c| if c == SUBSTITUTE { SEPARATOR } else { c })
        .collect();
    CanonicalPath::normalize(&candidate)
}

/// True when `s` looks like an external identifier rather than a path.
pub fn is_identifier(s: &str) -> bool {
    s.trim().starts_with(ID_TAG)
}

/// Identifier text after all tags, starting at the first real character.
///
/// `uuid--0xABC-a-b` yields `0xABC-a-b`.
pub(crate) fn strip_tags(id: &str) -> &str {
    let mut rest = id.trim();
    while let Some(stripped) = rest.strip_prefix(ID_TAG) {
        rest = stripped;
    }
    rest.trim_start_matches(SUBSTITUTE)
}

/// Case-insensitive identifier comparison.
pub(crate) fn same_identifier(a: &str, b: &str) -> bool {
    strip_tags(a).to_lowercase() == strip_tags(b).to_lowercase()
}
