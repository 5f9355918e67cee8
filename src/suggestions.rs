//! # Error Suggestions
//!
//! Helpers that turn errors into messages telling the user what went wrong
//! AND how to fix it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use patchtree::suggestions;
//!
//! eprintln!("{}", error);
//! for hint in suggestions::hints_for(&error) {
//!     eprintln!("{}", hint);
//! }
//! ```

use crate::error::Error;

/// Warning text for an INPUT list that matched no files.
pub fn no_inputs_matched(patterns: &[String]) -> String {
    let mut message = format!("no files to patch (patterns: {})", patterns.join(" "));
    if patterns.iter().any(|p| !p.contains('*') && !p.contains('?')) {
        message.push_str("\nhint: Patterns match files, not directories; use DIR/**/* to include a tree");
    }
    message
}

/// Message for a directive naming an unregistered processor.
pub fn unknown_processor(name: &str, known: &[&str]) -> String {
    let did_you_mean = find_similar(name, known)
        .map(|s| format!(", did you mean `{s}`?"))
        .unwrap_or_default();
    format!(
        "unknown processor `{name}`{did_you_mean} (known: {})",
        known.join(", ")
    )
}

/// Hint lines for an error, if there is something useful to add.
pub fn hints_for(error: &Error) -> Vec<String> {
    match error {
        Error::ResolutionConflict { .. } => vec![
            "hint: Each target file may be produced by one patchset file only".to_string(),
            "hint: Combine the processors into one decoration, e.g. `file.c#jinja#cocci`"
                .to_string(),
        ],
        Error::InvalidInput { .. } => vec![
            "hint: Run patchtree from the patchset directory, or pass --root".to_string(),
        ],
        Error::Processor { processor, message, .. } if message.contains("timed out") => vec![
            format!("hint: Raise the limit with --timeout if `{processor}` is just slow"),
        ],
        Error::Processor { processor, message, .. } if processor == "cocci" && message.contains("not found") => vec![
            "hint: Install Coccinelle or set `cocci_binary` in the configuration".to_string(),
        ],
        Error::Diff { .. } => vec![
            "hint: Map the extension to the `binary` strategy under `diff_strategies`".to_string(),
        ],
        _ => Vec::new(),
    }
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Levenshtein distance, two rows at a time.
fn edit_distance(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b_chars.len()).collect();
    let mut current = vec![0; b_chars.len() + 1];

    for (i, a_char) in a.chars().enumerate() {
        current[0] = i + 1;
        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = usize::from(a_char != *b_char);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUILTINS: [&str; 5] = ["cocci", "exec", "id", "jinja", "merge"];

    #[test]
    fn test_unknown_processor_suggests_similar() {
        let message = unknown_processor("jinj", &BUILTINS);
        assert!(message.starts_with("unknown processor `jinj`, did you mean `jinja`?"));
        assert!(message.contains("known: cocci, exec, id, jinja, merge"));
    }

    #[test]
    fn test_unknown_processor_no_suggestion_for_very_different() {
        let message = unknown_processor("frobnicate", &BUILTINS);
        assert!(!message.contains("did you mean"));
    }

    #[test]
    fn test_no_inputs_hint_for_directory_pattern() {
        assert!(no_inputs_matched(&["patches".to_string()]).contains("DIR/**/*"));
        assert!(!no_inputs_matched(&["patches/**/*".to_string()]).contains("hint"));
    }

    #[test]
    fn test_hints_for_conflict() {
        let error = Error::ResolutionConflict {
            path: "x.c".to_string(),
            first: "x.c#id".to_string(),
            second: "x.c#id,foo".to_string(),
        };
        let hints = hints_for(&error);
        assert_eq!(hints.len(), 2);
        assert!(hints[0].starts_with("hint: Each target file"));
    }

    #[test]
    fn test_no_hints_for_io_errors() {
        let error = Error::Io(std::io::Error::other("disk on fire"));
        assert!(hints_for(&error).is_empty());
    }

    #[test]
    fn test_edit_distance() {
        assert_eq!(edit_distance("merge", "merge"), 0);
        assert_eq!(edit_distance("merg", "merge"), 1);
        assert_eq!(edit_distance("jnija", "jinja"), 2);
        assert_eq!(edit_distance("", "id"), 2);
        assert_eq!(edit_distance("foobar", "exec"), 6);
    }
}
