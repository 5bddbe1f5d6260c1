//! Heuristic table extraction.
//!
//! The portals serve report tables with no stable ids or classes, so
//! each extractor is a pipeline of named passes over the parsed HTML
//! tree, tried in a fixed priority order until one yields rows:
//!
//! 1. header-text matching: tables identified by domain keywords in
//!    their full text
//! 2. column-position heuristics: codes and names assumed in early
//!    columns, numeric values searched from the right
//!
//! Rows whose subject code fails the institution pattern are dropped
//! silently; an extraction that ends with zero valid rows is an
//! error, never an empty success.

use crate::error::ScrapeError;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;

pub mod attendance;
pub mod marks;
pub mod timetable;

pub use attendance::extract_attendance;
pub use marks::{enrich_marks_with_attendance, extract_marks};
pub use timetable::{extract_enrolled_slots, extract_master_grid, join_timetable};

pub(crate) static TABLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("table").unwrap());
pub(crate) static ROW_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("tr").unwrap());
pub(crate) static CELL_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("td, th").unwrap());

/// Institution course-code pattern: 2 digits, 2-4 letters, 3 digits,
/// optional trailing letter (e.g. "21CSC101T").
static COURSE_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{2}[A-Z]{2,4}\d{3}[A-Z]?$").unwrap());

/// Unanchored variant for finding a code embedded in larger text.
pub(crate) static COURSE_CODE_SEARCH_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{2}[A-Z]{2,4}\d{3}[A-Z]?").unwrap());

/// Validates a candidate subject code against the institution
/// pattern. Malformed codes disqualify the whole row.
pub fn is_course_code(candidate: &str) -> bool {
    COURSE_CODE_RE.is_match(candidate.trim())
}

/// Collects the trimmed text of every cell in a row.
pub(crate) fn cell_texts(row: &ElementRef) -> Vec<String> {
    row.select(&CELL_SELECTOR)
        .map(|cell| {
            cell.text()
                .collect::<String>()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

/// Lowercased full text of a table, used for keyword matching.
pub(crate) fn table_text(table: &ElementRef) -> String {
    table
        .text()
        .collect::<String>()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Parses a number the way the portals print them: "ABS" and blank
/// mean zero, commas and a trailing "%" are tolerated.
pub(crate) fn parse_lenient_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("abs") {
        return Some(0.0);
    }
    let cleaned = trimmed.trim_end_matches('%').replace(',', "");
    cleaned.trim().parse::<f64>().ok()
}

/// Parses an "attended/total" fraction cell like "62/80" or "62 / 80".
pub(crate) fn parse_fraction(raw: &str) -> Option<(f64, f64)> {
    let (left, right) = raw.split_once('/')?;
    let a = parse_lenient_number(left)?;
    let b = parse_lenient_number(right)?;
    if b <= 0.0 {
        return None;
    }
    Some((a, b))
}

/// Interprets a cell as a percentage in [0, 100]. Accepts "75%",
/// "75", "75.5" and fraction notation ("60/80" -> 75).
pub(crate) fn parse_percentage(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some((a, b)) = parse_fraction(trimmed) {
        let pct = a / b * 100.0;
        return (0.0..=100.0).contains(&pct).then_some(pct);
    }
    let value = parse_lenient_number(trimmed)?;
    (0.0..=100.0).contains(&value).then_some(value)
}

/// Fails an extraction that produced no rows, per the zero-rows
/// invariant.
pub(crate) fn require_rows<T>(rows: Vec<T>, what: &str) -> Result<Vec<T>, ScrapeError> {
    if rows.is_empty() {
        Err(ScrapeError::structural(format!(
            "{what} table found but no valid rows extracted"
        )))
    } else {
        Ok(rows)
    }
}

/// Parses an HTML document once for the extractors in this module.
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}
