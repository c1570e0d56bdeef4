//! Text and value coercion shared by every extractor.

use chrono::{Datelike, NaiveDate};
use regex::{Captures, Regex};
use std::sync::LazyLock;

static TAG: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").ok());

const ENTITIES: [(&str, &str); 7] = [
    ("&nbsp;", " "),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&apos;", "'"),
    // last so `&amp;lt;` decodes to `&lt;` rather than `<`
    ("&amp;", "&"),
];

/// Decode the entities the catalog emits and trim surrounding whitespace.
pub fn clean_text(raw: &str) -> String {
    let mut text = raw.to_string();
    for (entity, replacement) in ENTITIES {
        if text.contains(entity) {
            text = text.replace(entity, replacement);
        }
    }
    text.trim().to_string()
}

/// Remove markup tags, keeping their text content.
pub fn strip_tags(raw: &str) -> String {
    match TAG.as_ref() {
        Some(tag) => tag.replace_all(raw, "").into_owned(),
        None => raw.to_string(),
    }
}

/// Strip tags, decode entities and trim, in that order.
pub fn plain_text(raw: &str) -> String {
    clean_text(&strip_tags(raw))
}

/// Lowercase everything, then capitalize each word: `RENEWED MAX TIMES` -> `Renewed Max Times`
pub fn title_case(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parse a currency amount such as `$1,012.50`, rounded to cents. Unparseable input is 0.
pub fn parse_amount(raw: &str) -> f64 {
    let digits: String = clean_text(raw)
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    digits
        .parse::<f64>()
        .map(|amount| (amount * 100.0).round() / 100.0)
        .unwrap_or(0.0)
}

/// Leading integer of a string, e.g. `3 copies` -> 3.
pub fn leading_number(raw: &str) -> Option<u32> {
    let digits: String = raw
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Trimmed text of a named capture, empty when the group did not participate.
pub fn group(caps: &Captures<'_>, name: &str) -> String {
    caps.name(name)
        .map(|m| m.as_str().trim().to_string())
        .unwrap_or_default()
}

/// Like [`group`], but `None` for an absent or blank group.
pub fn optional_group(caps: &Captures<'_>, name: &str) -> Option<String> {
    let value = group(caps, name);
    (!value.is_empty()).then_some(value)
}

fn mdy_fields(raw: &str) -> Option<(u32, u32, &str)> {
    let mut parts = raw.trim().splitn(3, '-');
    let month = parts.next()?.trim().parse().ok()?;
    let day = parts.next()?.trim().parse().ok()?;
    let year = parts.next()?.trim();
    if year.is_empty() || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some((month, day, year))
}

fn resolve_year(year: &str, two_digit: impl Fn(i32) -> i32) -> Option<i32> {
    let value: i32 = year.parse().ok()?;
    match year.len() {
        1 | 2 => Some(two_digit(value)),
        4 => Some(value),
        _ => None,
    }
}

/// Parse `MM-DD-YY` against a baseline century.
///
/// A two-digit year becomes `baseline + YY`, unless that lands after the
/// current year, in which case it falls back to `1900 + YY`. Four-digit years
/// are taken as is.
pub fn parse_mdy(raw: &str, baseline: i32) -> Option<NaiveDate> {
    parse_mdy_as_of(raw, baseline, chrono::Local::now().year())
}

/// [`parse_mdy`] with an explicit "current year".
pub fn parse_mdy_as_of(raw: &str, baseline: i32, current_year: i32) -> Option<NaiveDate> {
    let (month, day, year) = mdy_fields(raw)?;
    let year = resolve_year(year, |yy| {
        if baseline + yy > current_year {
            1900 + yy
        } else {
            baseline + yy
        }
    })?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse `MM-DD-YY` with a fixed pivot: 00-69 are 20YY, 70-99 are 19YY.
///
/// Used for due dates and record dates, which can lie in the future.
pub fn parse_mdy_windowed(raw: &str) -> Option<NaiveDate> {
    let (month, day, year) = mdy_fields(raw)?;
    let year = resolve_year(year, |yy| if yy < 70 { 2000 + yy } else { 1900 + yy })?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse `MM-DD-YY` with every two-digit year placed in `century`.
pub fn parse_mdy_in_century(raw: &str, century: i32) -> Option<NaiveDate> {
    let (month, day, year) = mdy_fields(raw)?;
    let year = resolve_year(year, |yy| century + yy)?;
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_ymd(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
