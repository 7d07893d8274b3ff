//! Backup-bucket path helpers.
//!
//! Backup and restore must build and parse backup locations the same way, so
//! both sides go through these functions rather than formatting keys inline.

pub const DELIMITER: &str = "/";

/// Join a prefix and a suffix with [`DELIMITER`].
///
/// An empty side is dropped, so `join("", "key")` is `"key"` and a trailing
/// delimiter on the prefix is not doubled.
pub fn join(prefix: &str, suffix: &str) -> String {
    let prefix = trim_trailing_delimiter(prefix);
    let suffix = suffix.strip_prefix(DELIMITER).unwrap_or(suffix);

    match (prefix.is_empty(), suffix.is_empty()) {
        (true, _) => suffix.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}{}{}", prefix, DELIMITER, suffix),
    }
}

/// Strip `prefix` and the delimiter that follows it from `path`.
pub fn trim_prefix<'a>(path: &'a str, prefix: &str) -> &'a str {
    let with_delimiter = format!("{}{}", prefix, DELIMITER);
    path.strip_prefix(with_delimiter.as_str()).unwrap_or(path)
}

pub fn trim_trailing_delimiter(path: &str) -> &str {
    path.strip_suffix(DELIMITER).unwrap_or(path)
}
