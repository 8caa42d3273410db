//! Filename pattern expansion for command arguments.

use glob::MatchOptions;
use log::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

/// Expands one argument against the filesystem.
///
/// Text without `*` or `?` is returned unchanged. A pattern that matches
/// nothing, or that is not a valid pattern, is also returned unchanged, as a
/// single element. The result is never empty.
pub fn expand_pattern(pattern: &str) -> Vec<String> {
    if !has_wildcard(pattern) {
        return vec![pattern.to_string()];
    }

    let expanded = expand_tilde(pattern);
    let matches: Vec<String> = match glob::glob_with(&expanded, MATCH_OPTIONS) {
        Ok(paths) => paths
            .filter_map(Result::ok)
            .map(|path| path.to_string_lossy().into_owned())
            .collect(),
        Err(e) => {
            debug!("invalid pattern {:?}: {}", pattern, e);
            Vec::new()
        }
    };

    if matches.is_empty() {
        vec![pattern.to_string()]
    } else {
        matches
    }
}

fn has_wildcard(text: &str) -> bool {
    text.contains('*') || text.contains('?')
}

/// Replaces a leading `~` or `~/` with the home directory.
fn expand_tilde(pattern: &str) -> String {
    let rest = match pattern.strip_prefix('~') {
        Some(rest) if rest.is_empty() || rest.starts_with('/') => rest,
        _ => return pattern.to_string(),
    };
    match dirs_next::home_dir() {
        Some(home) => format!("{}{}", glob::Pattern::escape(&home.to_string_lossy()), rest),
        None => pattern.to_string(),
    }
}
