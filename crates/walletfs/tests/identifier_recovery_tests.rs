//! Addressing entries by external identifier.
//!
//! Identifiers replace `/` with `-`, so names that contain `-` cannot be
//! decoded directly. These tests cover the recovery paths and the cases
//! that must stay errors.

use walletfs::{Error, FsEngine, Identity, codec};

fn me() -> Identity {
    Identity::new("0xABC").unwrap()
}

#[tokio::test]
async fn hyphenated_names_resolve() {
    let engine = FsEngine::new();
    let me = me();
    let written = engine
        .write("~/Desktop/my-notes-v2.txt", b"v2", &me, None)
        .await
        .unwrap();
    assert_eq!(written.entry.uid, "uuid--0xABC-Desktop-my-notes-v2.txt");

    let read = engine.read(&written.entry.uid, &me, None).await.unwrap();
    assert_eq!(read.bytes, b"v2");
    assert_eq!(read.path, "/0xABC/Desktop/my-notes-v2.txt");
}

#[tokio::test]
async fn hyphenated_directories_resolve() {
    let engine = FsEngine::new();
    let me = me();
    engine
        .write("~/side-project/src/main.rs", b"fn main() {}", &me, None)
        .await
        .unwrap();

    let stat = engine
        .stat("uuid--0xABC-side-project-src", &me)
        .await
        .unwrap();
    assert_eq!(stat.path, "/0xABC/side-project/src");
    assert!(stat.is_dir);

    let listing = engine
        .list("uuid--0xABC-side-project", &me)
        .await
        .unwrap();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].name, "src");
}

#[tokio::test]
async fn identifiers_ignore_case_and_doubled_tags() {
    let engine = FsEngine::new();
    let me = me();
    engine
        .write("~/Pictures/Cat-Photo.PNG", b"png", &me, None)
        .await
        .unwrap();

    for id in [
        "uuid--0xABC-Pictures-Cat-Photo.PNG",
        "uuid--0xabc-pictures-cat-photo.png",
        "uuid-uuid--0xABC-Pictures-Cat-Photo.PNG",
        "  uuid--0xABC-Pictures-Cat-Photo.PNG  ",
    ] {
        let stat = engine.stat(id, &me).await.unwrap();
        assert_eq!(stat.path, "/0xABC/Pictures/Cat-Photo.PNG", "via {id:?}");
    }
}

#[tokio::test]
async fn ambiguous_identifiers_must_use_a_path() {
    let engine = FsEngine::new();
    let me = me();
    engine.write("~/a/b-c", b"1", &me, None).await.unwrap();
    engine.write("~/a-b/c", b"2", &me, None).await.unwrap();

    let err = engine.read("uuid--0xABC-a-b-c", &me, None).await.unwrap_err();
    assert!(matches!(err, Error::InvalidPath(_)), "got {err:?}");

    // Both stay reachable by path.
    assert_eq!(engine.read("~/a/b-c", &me, None).await.unwrap().bytes, b"1");
    assert_eq!(engine.read("~/a-b/c", &me, None).await.unwrap().bytes, b"2");
}

#[tokio::test]
async fn exact_decoding_wins_over_structural_matches() {
    let engine = FsEngine::new();
    let me = me();
    engine.write("~/a/b/c", b"plain", &me, None).await.unwrap();
    engine.write("~/a/b-c", b"hyphen", &me, None).await.unwrap();

    let read = engine.read("uuid--0xABC-a-b-c", &me, None).await.unwrap();
    assert_eq!(read.bytes, b"plain");
}

#[tokio::test]
async fn unknown_identifiers_are_not_found() {
    let engine = FsEngine::new();
    let me = me();
    engine.write("~/a.txt", b"a", &me, None).await.unwrap();
    let err = engine
        .stat("uuid--0xABC-missing.txt", &me)
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}

#[tokio::test]
async fn root_identifiers_are_always_navigable() {
    let engine = FsEngine::new();
    let me = me();
    let home = engine.stat("uuid--0xABC", &me).await.unwrap();
    assert_eq!(home.path, "/0xABC");
    assert!(home.synthesized);

    let root = engine.stat("uuid--", &me).await.unwrap();
    assert!(root.path.is_root());
}

#[tokio::test]
async fn identifier_targets_for_creation() {
    let engine = FsEngine::new();
    let me = me();

    // A decodable identifier for a new entry is a path in disguise.
    let dir = engine.mkdir("uuid--0xABC-Projects", &me).await.unwrap();
    assert_eq!(dir.entry.path, "/0xABC/Projects");

    // An identifier for an existing file overwrites that file even when
    // its name contains `-`.
    engine
        .write("~/Projects/to-do.md", b"old", &me, None)
        .await
        .unwrap();
    let again = engine
        .write("uuid--0xABC-Projects-to-do.md", b"new", &me, None)
        .await
        .unwrap();
    assert!(!again.created);
    assert_eq!(again.entry.path, "/0xABC/Projects/to-do.md");
}

#[tokio::test]
async fn move_accepts_identifiers_on_both_sides() {
    let engine = FsEngine::new();
    let me = me();
    engine.write("~/draft-1.txt", b"d", &me, None).await.unwrap();
    engine.mkdir("~/Documents", &me).await.unwrap();

    let moved = engine
        .move_entry("uuid--0xABC-draft-1.txt", "uuid--0xABC-Documents", &me, None)
        .await
        .unwrap();
    assert_eq!(moved.entry.path, "/0xABC/Documents/draft-1.txt");
    assert_eq!(
        moved.entry.uid,
        codec::encode(&walletfs::CanonicalPath::normalize(
            "/0xABC/Documents/draft-1.txt"
        ))
    );
}

#[tokio::test]
async fn identifiers_from_other_namespaces_do_not_resolve() {
    let engine = FsEngine::new();
    let alice = me();
    let bob = Identity::new("0xDEF").unwrap();
    engine.write("~/a-b.txt", b"a", &alice, None).await.unwrap();

    let err = engine
        .read("uuid--0xABC-a-b.txt", &bob, None)
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "got {err:?}");
}
