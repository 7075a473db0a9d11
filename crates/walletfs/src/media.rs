//! Media type guessing from file extensions.

/// Media type used for files without a known extension.
pub const DEFAULT_MEDIA_TYPE: &str = "application/octet-stream";

const MEDIA_TYPES: &[(&str, &str)] = &[
    ("txt", "text/plain"),
    ("md", "text/markdown"),
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("json", "application/json"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("pdf", "application/pdf"),
    ("zip", "application/zip"),
    ("mp4", "video/mp4"),
    ("webm", "video/webm"),
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
];

/// Guess a media type from the extension of `name`, ignoring case.
///
/// ```
/// use walletfs::media::guess_media_type;
///
/// assert_eq!(guess_media_type("notes.TXT"), Some("text/plain"));
/// assert_eq!(guess_media_type("archive.tar.zip"), Some("application/zip"));
/// assert_eq!(guess_media_type(".bashrc"), None);
/// assert_eq!(guess_media_type("README"), None);
/// ```
pub fn guess_media_type(name: &str) -> Option<&'static str> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() {
        return None;
    }
    let ext = ext.to_ascii_lowercase();
    MEDIA_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, media)| *media)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_lookups() {
        assert_eq!(guess_media_type("a.png"), Some("image/png"));
        assert_eq!(guess_media_type("a.JPeG"), Some("image/jpeg"));
        assert_eq!(guess_media_type("song.mp3"), Some("audio/mpeg"));
        assert_eq!(guess_media_type("a.unknown"), None);
        assert_eq!(guess_media_type("trailing."), None);
    }
}
