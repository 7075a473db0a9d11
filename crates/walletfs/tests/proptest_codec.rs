//! Property-based tests for the identifier codec and path resolution
//!
//! Run with: cargo test --test proptest_codec

use proptest::prelude::*;
use walletfs::{CanonicalPath, Identity, PathResolver, ResolveRules, codec};

// Segments without the identifier substitute, so encoding is reversible.
fn plain_segment() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[A-Za-z0-9_.]{1,12}")
        .unwrap()
        .prop_filter("dot segments are not names", |s| s != "." && s != "..")
}

fn plain_path() -> impl Strategy<Value = CanonicalPath> {
    proptest::collection::vec(plain_segment(), 0..6).prop_map(CanonicalPath::from_segments)
}

// Arbitrary client input, separators and dot segments included.
fn raw_input() -> impl Strategy<Value = String> {
    proptest::string::string_regex("[~/a-zA-Z0-9._ -]{0,40}").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn decode_inverts_encode_for_plain_paths(path in plain_path()) {
        prop_assert_eq!(codec::decode(&codec::encode(&path)), path);
    }

    #[test]
    fn encode_is_deterministic(path in plain_path()) {
        prop_assert_eq!(codec::encode(&path), codec::encode(&path));
        prop_assert!(codec::is_identifier(&codec::encode(&path)));
    }

    #[test]
    fn decode_never_panics(id in "\\PC{0,40}") {
        let path = codec::decode(&id);
        prop_assert!(path.as_str().starts_with('/'));
    }

    #[test]
    fn normalize_is_idempotent(raw in raw_input()) {
        let once = CanonicalPath::normalize(&raw);
        let twice = CanonicalPath::normalize(once.as_str());
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn resolved_paths_are_canonical(raw in raw_input()) {
        let id = Identity::new("0xABC").unwrap();
        let rules = ResolveRules::default();
        let resolved = PathResolver::new(&id, &rules).resolve(&raw);
        let s = resolved.as_str();
        prop_assert!(s.starts_with('/'));
        prop_assert!(s == "/" || !s.ends_with('/'));
        prop_assert!(!s.contains("//"));
        prop_assert!(resolved.segments().all(|seg| seg != "." && seg != ".."));
    }

    #[test]
    fn relative_input_stays_home(raw in "[a-zA-Z0-9_]{1,10}(/[a-zA-Z0-9_]{1,10}){0,3}") {
        let id = Identity::new("0xABC").unwrap();
        let rules = ResolveRules::default();
        let resolved = PathResolver::new(&id, &rules).resolve(&raw);
        prop_assert!(id.owns(&resolved));
    }
}
