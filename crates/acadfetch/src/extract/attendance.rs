//! Attendance report extraction.

use super::{
    cell_texts, is_course_code, parse_document, parse_fraction, parse_lenient_number,
    parse_percentage, require_rows, table_text, COURSE_CODE_SEARCH_RE, ROW_SELECTOR,
    TABLE_SELECTOR,
};
use crate::error::ScrapeError;
use crate::metrics::{self, DEFAULT_TARGET};
use crate::records::AttendanceRecord;
use scraper::ElementRef;
use tracing::debug;

/// Extracts attendance records from a report page.
///
/// Tries each heuristic pass in priority order; the first pass that
/// yields at least one valid row wins. No matching table at all is a
/// structural error distinct from "table found but zero valid rows".
pub fn extract_attendance(html: &str) -> Result<Vec<AttendanceRecord>, ScrapeError> {
    let document = parse_document(html);

    // Pass 1: header-text matching.
    let mut candidate_found = false;
    for table in document.select(&TABLE_SELECTOR) {
        let text = table_text(&table);
        if text.contains("code")
            && (text.contains("attn") || text.contains("max") || text.contains("average"))
        {
            candidate_found = true;
            let rows = parse_table_rows(&table);
            if !rows.is_empty() {
                debug!(pass = "header-text", rows = rows.len(), "attendance table matched");
                return Ok(rows);
            }
        }
    }

    // Pass 2: column-position. Any table where early columns carry
    // valid course codes is treated as the report table.
    for table in document.select(&TABLE_SELECTOR) {
        let rows = parse_table_rows(&table);
        if !rows.is_empty() {
            debug!(pass = "column-position", rows = rows.len(), "attendance table matched");
            return Ok(rows);
        }
        if table
            .select(&ROW_SELECTOR)
            .any(|row| find_code(&cell_texts(&row)).is_some())
        {
            candidate_found = true;
        }
    }

    if candidate_found {
        require_rows(Vec::new(), "attendance")
    } else {
        Err(ScrapeError::structural("attendance table not found"))
    }
}

fn parse_table_rows(table: &ElementRef) -> Vec<AttendanceRecord> {
    table
        .select(&ROW_SELECTOR)
        .filter_map(|row| parse_row(&cell_texts(&row)))
        .collect()
}

/// Locates the subject code in the first few columns. Rows without a
/// pattern-valid code are discarded, not surfaced as records.
fn find_code(cells: &[String]) -> Option<(usize, String)> {
    for (idx, cell) in cells.iter().take(3).enumerate() {
        if is_course_code(cell) {
            return Some((idx, cell.trim().to_string()));
        }
        // Cells sometimes glue the code to a label; accept only when
        // the embedded match itself is a full valid code.
        if let Some(m) = COURSE_CODE_SEARCH_RE.find(cell) {
            if is_course_code(m.as_str()) {
                return Some((idx, m.as_str().to_string()));
            }
        }
    }
    None
}

fn parse_row(cells: &[String]) -> Option<AttendanceRecord> {
    let (code_idx, subject_code) = find_code(cells)?;

    // Name: first later cell that is neither numeric nor a category
    // marker. Category ("Theory"/"Practical") is captured separately.
    let mut subject_name = String::new();
    let mut category = None;
    for cell in cells.iter().skip(code_idx + 1) {
        let lower = cell.to_lowercase();
        if lower == "theory" || lower == "practical" {
            category = Some(cell.clone());
            continue;
        }
        if subject_name.is_empty()
            && !cell.is_empty()
            && parse_lenient_number(cell).filter(|v| *v != 0.0).is_none()
            && parse_fraction(cell).is_none()
        {
            subject_name = cell.clone();
        }
    }

    // Hours: prefer an explicit "attended/total" fraction cell.
    let mut fraction_idx = None;
    let mut hours: Option<(u32, u32)> = None;
    for (idx, cell) in cells.iter().enumerate().skip(code_idx + 1) {
        if let Some((attended, total)) = parse_fraction(cell) {
            fraction_idx = Some(idx);
            hours = Some((attended.round() as u32, total.round() as u32));
            break;
        }
    }

    // Percentage: search from the right-most column backward for the
    // first value parseable as a 0-100 number.
    let mut percentage = None;
    for (idx, cell) in cells.iter().enumerate().skip(code_idx + 1).rev() {
        if Some(idx) == fraction_idx {
            continue;
        }
        if let Some(pct) = parse_percentage(cell) {
            percentage = Some((idx, pct));
            break;
        }
    }

    // Without a fraction, fall back to the two integer columns
    // nearest the percentage: portals print "Max. hours | Attended".
    if hours.is_none() {
        let pct_idx = percentage.map(|(idx, _)| idx);
        let ints: Vec<u32> = cells
            .iter()
            .enumerate()
            .skip(code_idx + 1)
            .filter(|(idx, _)| Some(*idx) != pct_idx)
            .filter_map(|(_, cell)| parse_lenient_number(cell))
            .filter(|v| v.fract() == 0.0 && *v >= 0.0)
            .map(|v| v as u32)
            .collect();
        if ints.len() >= 2 {
            let pair = &ints[ints.len() - 2..];
            // The portal orders these inconsistently; hours held can
            // never exceed hours conducted.
            let total = pair[0].max(pair[1]);
            let attended = pair[0].min(pair[1]);
            hours = Some((attended, total));
        }
    }

    let (attended_hours, total_hours) = hours.unwrap_or((0, 0));
    let percentage = match (percentage, hours) {
        (Some((_, pct)), _) => pct,
        (None, Some((attended, total))) if total > 0 => {
            attended as f64 / total as f64 * 100.0
        }
        _ => return None,
    };

    Some(AttendanceRecord {
        subject_code,
        subject_name,
        category,
        total_hours,
        attended_hours,
        percentage,
        classes_to_miss: metrics::classes_can_miss(total_hours, attended_hours, DEFAULT_TARGET),
        classes_to_attend: metrics::classes_needed_to_attend(
            total_hours,
            attended_hours,
            DEFAULT_TARGET,
        ),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap_rows(rows: &str) -> String {
        format!(
            "<html><body><table><tr><th>Course Code</th><th>Title</th>\
             <th>Max. hours</th><th>Attn. hours</th><th>Average %</th></tr>{rows}</table></body></html>"
        )
    }

    #[test]
    fn test_malformed_code_dropped_silently() {
        let html = wrap_rows(
            "<tr><td>21CSC101T</td><td>Data Structures</td><td>60</td><td>45</td><td>75</td></tr>\
             <tr><td>21MAB102</td><td>Calculus</td><td>40</td><td>40</td><td>100</td></tr>\
             <tr><td>21PYB101J</td><td>Physics</td><td>50</td><td>41</td><td>82</td></tr>\
             <tr><td>BADCODE1</td><td>Ghost Subject</td><td>10</td><td>10</td><td>100</td></tr>",
        );
        let records = extract_attendance(&html).unwrap();
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| is_course_code(&r.subject_code)));
    }

    #[test]
    fn test_percent_suffix_equivalent() {
        let with = wrap_rows("<tr><td>21CSC101T</td><td>DS</td><td>60</td><td>45</td><td>75%</td></tr>");
        let without = wrap_rows("<tr><td>21CSC101T</td><td>DS</td><td>60</td><td>45</td><td>75</td></tr>");
        let a = extract_attendance(&with).unwrap();
        let b = extract_attendance(&without).unwrap();
        assert_eq!(a[0].percentage, 75.0);
        assert_eq!(a[0].percentage, b[0].percentage);
    }

    #[test]
    fn test_fraction_hours_and_derived_percentage() {
        let html = wrap_rows("<tr><td>21CSC101T</td><td>DS</td><td>45/60</td><td></td><td></td></tr>");
        let records = extract_attendance(&html).unwrap();
        assert_eq!(records[0].attended_hours, 45);
        assert_eq!(records[0].total_hours, 60);
        assert_eq!(records[0].percentage, 75.0);
    }

    #[test]
    fn test_abs_marker_is_zero() {
        let html = wrap_rows("<tr><td>21CSC101T</td><td>DS</td><td>60</td><td>ABS</td><td>0</td></tr>");
        let records = extract_attendance(&html).unwrap();
        assert_eq!(records[0].attended_hours, 0);
        assert_eq!(records[0].total_hours, 60);
    }

    #[test]
    fn test_derived_margins_populated() {
        let html = wrap_rows("<tr><td>21CSC101T</td><td>DS</td><td>50</td><td>45</td><td>90</td></tr>");
        let records = extract_attendance(&html).unwrap();
        assert_eq!(records[0].classes_to_miss, 10);
        assert_eq!(records[0].classes_to_attend, 0);
    }

    #[test]
    fn test_missing_table_is_structural() {
        let err = extract_attendance("<html><body><p>maintenance</p></body></html>").unwrap_err();
        assert_eq!(err.kind(), "structural");
    }

    #[test]
    fn test_category_captured() {
        let html = wrap_rows(
            "<tr><td>21PYB101J</td><td>Physics</td><td>Practical</td><td>30</td><td>30</td><td>100</td></tr>",
        );
        let records = extract_attendance(&html).unwrap();
        assert_eq!(records[0].category.as_deref(), Some("Practical"));
        assert_eq!(records[0].subject_name, "Physics");
    }
}
