use std::path::PathBuf;

use dirs_next::home_dir;

/// Expands a leading `~` (followed by `/`, `\`, or nothing) to the user's home directory.
///
/// Paths without a leading tilde, and paths where no home directory can be
/// determined, are returned unchanged apart from surrounding whitespace.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let Some(rest) = trimmed.strip_prefix('~') else {
        return PathBuf::from(trimmed);
    };
    let Some(home) = home_dir() else {
        return PathBuf::from(trimmed);
    };

    match rest.strip_prefix(['/', '\\']) {
        Some(relative) => home.join(relative),
        None if rest.is_empty() => home,
        // `~user` forms are not expanded
        None => PathBuf::from(trimmed),
    }
}
