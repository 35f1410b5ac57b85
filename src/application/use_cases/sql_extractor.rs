//! Pulls a `SELECT ... FROM ...` statement out of raw model output.
//!
//! This is a shape filter, not a parser. Whatever it returns may still be
//! invalid SQL; the database is the real validator.

use once_cell::sync::Lazy;
use regex::Regex;

// Keywords are matched on word boundaries, so `count(*)FROM t` and
// `FROM(subquery)` still count. Both the projection and the source must hold
// at least one non-space character.
static SELECT_FROM_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)\bselect\b\s*[^;\s][^;]*?\bfrom\b\s*[^;\s][^;]*").unwrap()
});

/// Returns the first `SELECT <..> FROM <..>` span in `raw`, with original
/// casing and internal whitespace. A single trailing `;` is not part of the
/// statement.
pub fn extract_sql(raw: &str) -> Option<String> {
    let trimmed = raw.trim_end();
    let text = trimmed.strip_suffix(';').unwrap_or(trimmed);

    SELECT_FROM_PATTERN
        .find(text)
        .map(|m| m.as_str().trim_end().to_string())
        .filter(|sql| !sql.is_empty())
}
