//! Property-based tests for clean paths and directive parsing.
//!
//! These tests use proptest to generate random patchset file names and
//! verify that invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::directive::parse_decoration;
    use crate::path::{clean_path, extension};
    use proptest::prelude::*;
    use std::path::PathBuf;

    fn directory() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec("[a-z0-9_][a-z0-9_.-]{0,7}", 0..4)
    }

    fn base_name() -> impl Strategy<Value = String> {
        "[A-Za-z0-9_][A-Za-z0-9_.+-]{0,12}"
    }

    fn directive() -> impl Strategy<Value = String> {
        (
            "[a-z][a-z0-9_]{0,6}",
            prop::collection::vec("[a-z0-9]{1,5}", 0..3),
        )
            .prop_map(|(name, args)| {
                std::iter::once(name)
                    .chain(args)
                    .collect::<Vec<_>>()
                    .join(",")
            })
    }

    fn decoration() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(directive(), 1..4)
    }

    fn join(dirs: &[String], file_name: &str) -> PathBuf {
        let mut path: PathBuf = dirs.iter().collect();
        path.push(file_name);
        path
    }

    // ============================================================================
    // clean_path property tests
    // ============================================================================

    proptest! {
        /// Property: stripping the decoration yields exactly the undecorated path
        #[test]
        fn clean_path_strips_decoration(dirs in directory(), base in base_name(), deco in decoration()) {
            let plain = clean_path(&join(&dirs, &base)).unwrap();
            let decorated = clean_path(&join(&dirs, &format!("{}#{}", base, deco.join("#")))).unwrap();
            prop_assert_eq!(&plain.path, &decorated.path);
            prop_assert_eq!(plain.decoration, None);
            prop_assert_eq!(decorated.decoration, Some(deco.join("#")));
        }

        /// Property: any two decorations of the same base agree on the clean path
        #[test]
        fn clean_path_is_independent_of_decoration(
            dirs in directory(),
            base in base_name(),
            first in decoration(),
            second in decoration(),
        ) {
            let a = clean_path(&join(&dirs, &format!("{}#{}", base, first.join("#")))).unwrap();
            let b = clean_path(&join(&dirs, &format!("{}#{}", base, second.join("#")))).unwrap();
            prop_assert_eq!(a.path, b.path);
        }

        /// Property: directory components are kept verbatim, even with `#` in them
        #[test]
        fn clean_path_keeps_directories(dirs in directory(), base in base_name(), deco in decoration()) {
            let mut decorated_dirs = dirs.clone();
            decorated_dirs.push("dir#x".to_string());
            let clean = clean_path(&join(&decorated_dirs, &format!("{}#{}", base, deco.join("#")))).unwrap();
            let mut expected = decorated_dirs;
            expected.push(base);
            prop_assert_eq!(clean.path, expected.join("/"));
        }
    }

    // ============================================================================
    // parse_decoration property tests
    // ============================================================================

    proptest! {
        /// Property: one directive per `#` segment, in textual order
        #[test]
        fn parse_yields_one_directive_per_segment(deco in decoration()) {
            let directives = parse_decoration("f", &deco.join("#")).unwrap();
            prop_assert_eq!(directives.len(), deco.len());
            for (directive, segment) in directives.iter().zip(&deco) {
                prop_assert_eq!(&directive.to_string(), segment);
            }
        }

        /// Property: an empty segment anywhere is rejected
        #[test]
        fn parse_rejects_empty_segment(deco in decoration(), at in 0usize..4) {
            let mut segments = deco;
            let at = at.min(segments.len());
            segments.insert(at, String::new());
            prop_assert!(parse_decoration("f", &segments.join("#")).is_err());
        }
    }

    // ============================================================================
    // extension property tests
    // ============================================================================

    proptest! {
        /// Property: the extension is a suffix of the file name, starts with
        /// a dot, and never covers the whole name
        #[test]
        fn extension_is_proper_suffix(dirs in directory(), base in base_name()) {
            let path = join(&dirs, &base).to_string_lossy().replace('\\', "/");
            if let Some(ext) = extension(&path) {
                prop_assert!(ext.starts_with('.'));
                prop_assert!(base.ends_with(ext));
                prop_assert!(ext.len() < base.len());
            }
        }
    }
}
