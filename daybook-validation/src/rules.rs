// Built-in validation rules
//
// Every rule is a pure predicate returning `true` when the value is
// acceptable. Recording failures is the job of `Validation::check_field`.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use std::collections::HashMap;

/// Email address shape: a local part, `@`, and dot-separated host labels.
pub static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$").unwrap()
});

/// True if the value contains anything other than whitespace.
pub fn not_blank(value: &str) -> bool {
    !value.trim().is_empty()
}

/// True if the value has at least `n` characters (not bytes).
pub fn min_chars(value: &str, n: usize) -> bool {
    value.chars().count() >= n
}

/// True if the value has at most `n` characters (not bytes).
pub fn max_chars(value: &str, n: usize) -> bool {
    value.chars().count() <= n
}

/// True if `min <= value <= max`.
pub fn min_max_integer(value: i64, min: i64, max: i64) -> bool {
    min <= value && value <= max
}

/// True if the whole value matches `pattern`.
///
/// A match that covers only part of the input is not enough, so every
/// pattern is applied as `^(?:...)$`. The anchored form is compiled once per
/// pattern source.
pub fn matches(value: &str, pattern: &Regex) -> bool {
    anchored(pattern)
        .map(|anchored| anchored.is_match(value))
        .unwrap_or(false)
}

static ANCHORED: Lazy<RwLock<HashMap<String, Regex>>> = Lazy::new(Default::default);

fn anchored(pattern: &Regex) -> Option<Regex> {
    let source = pattern.as_str();
    if let Some(cached) = ANCHORED.read().get(source) {
        return Some(cached.clone());
    }

    let compiled = Regex::new(&format!("^(?:{})$", source)).ok()?;
    ANCHORED
        .write()
        .insert(source.to_string(), compiled.clone());
    Some(compiled)
}

/// True if the value is one of `permitted`.
pub fn permitted_value<T: PartialEq>(value: &T, permitted: &[T]) -> bool {
    permitted.contains(value)
}

/// True if `value` is a real calendar date written in `layout`.
///
/// Layouts use `YYYY`, `MM`, `DD`, `HH`, `mm` and `ss`; every other character
/// must appear literally. A layout containing `%` is taken as a chrono format
/// string. Out-of-range dates such as February 30th are rejected rather than
/// rolled over, and so is input that is not written exactly as the layout
/// would print it (`2024-2-3` for `YYYY-MM-DD`).
pub fn check_date(value: &str, layout: &str) -> bool {
    let format = layout_to_format(layout);
    let has_time = format.contains("%H") || format.contains("%M") || format.contains("%S");

    if has_time {
        NaiveDateTime::parse_from_str(value, &format)
            .map(|parsed| parsed.format(&format).to_string() == value)
            .unwrap_or(false)
    } else {
        NaiveDate::parse_from_str(value, &format)
            .map(|parsed| parsed.format(&format).to_string() == value)
            .unwrap_or(false)
    }
}

fn layout_to_format(layout: &str) -> String {
    if layout.contains('%') {
        return layout.to_string();
    }

    const TOKENS: [(&str, &str); 6] = [
        ("YYYY", "%Y"),
        ("MM", "%m"),
        ("DD", "%d"),
        ("HH", "%H"),
        ("mm", "%M"),
        ("ss", "%S"),
    ];

    let mut format = String::with_capacity(layout.len() + 4);
    let mut rest = layout;

    'outer: while !rest.is_empty() {
        for (token, spec) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                format.push_str(spec);
                rest = tail;
                continue 'outer;
            }
        }

        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            format.push(c);
        }
        rest = chars.as_str();
    }

    format
}
