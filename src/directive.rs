//! # Directive Parser
//!
//! Parses the decoration of a patchset file name into an ordered processor
//! chain.
//!
//! ```text
//! filename  := base ('#' directive)*
//! directive := identifier (',' arg)*
//! arg       := identifier | identifier '=' value
//! ```
//!
//! Directives are stored in textual (left-to-right) order. They are
//! *applied* right-to-left: the last directive receives the raw patchset
//! content and the first directive produces the content that gets diffed,
//! so `foo.c#jinja#cocci` runs `cocci` first and feeds its output to
//! `jinja`. Use [`PatchsetEntry::application_order`] to iterate in
//! execution order.
//!
//! Parsing happens for every entry before any processor runs, so an unknown
//! processor identifier is reported before any external tool is spawned.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{Error, Result};
use crate::path::DIRECTIVE_DELIMITER;
use crate::processors::ProcessorRegistry;
use crate::resolve::ResolvedInput;
use crate::suggestions;

const ARG_DELIMITER: char = ',';
const VALUE_DELIMITER: char = '=';

fn identifier_regex() -> &'static Regex {
    static IDENTIFIER: OnceLock<Regex> = OnceLock::new();
    IDENTIFIER.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.+-]+$").expect("static regex"))
}

/// Whether `name` is a valid processor identifier or argument key.
pub fn is_identifier(name: &str) -> bool {
    identifier_regex().is_match(name)
}

/// One `#`-delimited processor invocation
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessorDirective {
    /// Processor identifier
    pub name: String,
    /// Bare arguments, in order
    pub positional: Vec<String>,
    /// `key=value` arguments
    pub keyed: BTreeMap<String, String>,
}

impl ProcessorDirective {
    /// Create a directive without arguments
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Look up a keyed argument
    pub fn get(&self, key: &str) -> Option<&str> {
        self.keyed.get(key).map(String::as_str)
    }

    /// First positional argument, if any
    pub fn first_positional(&self) -> Option<&str> {
        self.positional.first().map(String::as_str)
    }
}

impl fmt::Display for ProcessorDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for arg in &self.positional {
            write!(f, ",{}", arg)?;
        }
        for (key, value) in &self.keyed {
            write!(f, ",{}={}", key, value)?;
        }
        Ok(())
    }
}

/// A resolved patchset file together with its parsed processor chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchsetEntry {
    /// Location of the patchset file on disk
    pub source: PathBuf,
    /// Raw patchset path relative to the patchset root
    pub raw: String,
    /// Clean target-relative path
    pub clean_path: String,
    /// Directives in textual order
    pub directives: Vec<ProcessorDirective>,
}

impl PatchsetEntry {
    /// Directives in the order they are applied (right-to-left).
    pub fn application_order(&self) -> impl Iterator<Item = &ProcessorDirective> {
        self.directives.iter().rev()
    }
}

/// Parse the decoration of `path` (the text after the first `#`).
///
/// `path` is only used for error reporting.
pub fn parse_decoration(path: &str, decoration: &str) -> Result<Vec<ProcessorDirective>> {
    decoration
        .split(DIRECTIVE_DELIMITER)
        .map(|segment| parse_directive(path, segment))
        .collect()
}

fn parse_directive(path: &str, segment: &str) -> Result<ProcessorDirective> {
    let error = |message: String| Error::DirectiveParse {
        path: path.to_string(),
        message,
    };

    let mut parts = segment.trim().split(ARG_DELIMITER);
    let name = parts.next().unwrap_or_default().trim();
    if name.is_empty() {
        return Err(error("empty processor identifier".to_string()));
    }
    if !is_identifier(name) {
        return Err(error(format!("invalid processor identifier `{}`", name)));
    }

    let mut directive = ProcessorDirective::new(name);
    for arg in parts {
        let arg = arg.trim();
        if arg.is_empty() {
            return Err(error(format!("empty argument to `{}`", name)));
        }
        match arg.split_once(VALUE_DELIMITER) {
            Some((key, value)) => {
                let key = key.trim();
                if !is_identifier(key) {
                    return Err(error(format!("invalid argument key `{}` for `{}`", key, name)));
                }
                if directive.keyed.contains_key(key) {
                    return Err(error(format!("repeated argument `{}` for `{}`", key, name)));
                }
                directive
                    .keyed
                    .insert(key.to_string(), value.trim().to_string());
            }
            None => directive.positional.push(arg.to_string()),
        }
    }

    Ok(directive)
}

/// Parse a resolved input into a patchset entry, checking every directive
/// against the processor registry.
pub fn parse_entry(input: &ResolvedInput, registry: &ProcessorRegistry) -> Result<PatchsetEntry> {
    let clean_path = input.clean.path.clone();
    let directives = match &input.clean.decoration {
        Some(decoration) => parse_decoration(&clean_path, decoration)?,
        None => Vec::new(),
    };

    for directive in &directives {
        if !registry.contains(&directive.name) {
            return Err(Error::DirectiveParse {
                path: clean_path,
                message: suggestions::unknown_processor(&directive.name, &registry.names()),
            });
        }
    }

    Ok(PatchsetEntry {
        source: input.source.clone(),
        raw: input.display.clone(),
        clean_path,
        directives,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::clean_path;
    use std::path::Path;

    fn input(raw: &str) -> ResolvedInput {
        ResolvedInput {
            source: PathBuf::from(raw),
            display: raw.to_string(),
            clean: clean_path(Path::new(raw)).unwrap(),
        }
    }

    #[test]
    fn test_parse_single_directive_with_arguments() {
        let directives = parse_decoration("a.c", "merge,ignore,mode=strict").unwrap();
        assert_eq!(directives.len(), 1);
        assert_eq!(directives[0].name, "merge");
        assert_eq!(directives[0].positional, vec!["ignore"]);
        assert_eq!(directives[0].get("mode"), Some("strict"));
    }

    #[test]
    fn test_parse_preserves_textual_order() {
        let directives = parse_decoration("a.c", "a#b#c").unwrap();
        let names: Vec<_> = directives.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_application_order_is_right_to_left() {
        let registry = ProcessorRegistry::default();
        let entry = parse_entry(&input("foo.c#jinja#merge#id"), &registry).unwrap();
        let order: Vec<_> = entry.application_order().map(|d| d.name.as_str()).collect();
        assert_eq!(order, vec!["id", "merge", "jinja"]);
        assert_eq!(entry.clean_path, "foo.c");
    }

    #[test]
    fn test_value_may_contain_equals() {
        let directives = parse_decoration("a.c", "jinja,expr=a=b").unwrap();
        assert_eq!(directives[0].get("expr"), Some("a=b"));
    }

    #[test]
    fn test_repeated_key_is_error() {
        let err = parse_decoration("a.c", "jinja,x=1,x=2").unwrap_err();
        match err {
            Error::DirectiveParse { path, message } => {
                assert_eq!(path, "a.c");
                assert!(message.contains("repeated argument `x`"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_empty_identifier_is_error() {
        assert!(parse_decoration("a.c", "").is_err());
        assert!(parse_decoration("a.c", "id##id").is_err());
        assert!(parse_decoration("a.c", ",arg").is_err());
    }

    #[test]
    fn test_empty_argument_is_error() {
        assert!(parse_decoration("a.c", "merge,").is_err());
        assert!(parse_decoration("a.c", "merge,=x").is_err());
    }

    #[test]
    fn test_unknown_processor_is_error() {
        let registry = ProcessorRegistry::default();
        let err = parse_entry(&input("src/foo.c#frobnicate"), &registry).unwrap_err();
        match err {
            Error::DirectiveParse { path, message } => {
                assert_eq!(path, "src/foo.c");
                assert!(message.contains("unknown processor `frobnicate`"));
                assert!(message.contains("cocci"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_undecorated_entry_has_no_directives() {
        let registry = ProcessorRegistry::default();
        let entry = parse_entry(&input("docs/README"), &registry).unwrap();
        assert!(entry.directives.is_empty());
        assert_eq!(entry.raw, "docs/README");
    }

    #[test]
    fn test_display_round_trips_simple_directive() {
        let directives = parse_decoration("a.c", "exec,one,two").unwrap();
        assert_eq!(directives[0].to_string(), "exec,one,two");
    }
}
