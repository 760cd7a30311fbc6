// Text helpers shared by the query, aggregation and rendering code.
//
// Record fields are free text that may contain multi-byte characters, so every
// "first N characters" rule here counts chars, never bytes.
use chrono::NaiveDateTime;
use num_format::{Locale, ToFormattedString};

/// First `n` characters of `s`, or `None` when `s` is shorter than `n`.
pub fn char_prefix(s: &str, n: usize) -> Option<&str> {
    char_range(s, 0, n)
}

/// Characters `start..end` of `s`, or `None` when `s` has fewer than `end`
/// characters.
pub fn char_range(s: &str, start: usize, end: usize) -> Option<&str> {
    let mut bounds = s.char_indices().map(|(i, _)| i).chain(std::iter::once(s.len()));
    let from = bounds.nth(start)?;
    let to = if end > start { bounds.nth(end - start - 1)? } else { from };
    Some(&s[from..to])
}

/// Render a `YYYYMMDDHHMM` date as `YYYY-MM-DD HH:MM`; anything else is
/// returned unchanged.
pub fn format_fire_date(raw: &str) -> String {
    // Only display code goes through here; filters and stats treat the date as opaque text.
    match NaiveDateTime::parse_from_str(raw, "%Y%m%d%H%M") {
        Ok(dt) => dt.format("%Y-%m-%d %H:%M").to_string(),
        Err(_) => raw.to_string(),
    }
}

/// Text for a possibly-empty field, with a placeholder for the empty case.
pub fn or_placeholder<'a>(value: &'a str, placeholder: &'a str) -> &'a str {
    if value.is_empty() {
        placeholder
    } else {
        value
    }
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}
