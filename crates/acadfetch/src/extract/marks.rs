//! Internal-marks extraction.
//!
//! The marks report nests a secondary table inside each subject row:
//! the nested header row encodes "component-name/maxMarks" pairs and
//! the row below it the scored values. Header and value cells are
//! paired positionally and summed into the subject totals.

use super::{
    cell_texts, is_course_code, parse_document, parse_lenient_number, require_rows, table_text,
    COURSE_CODE_SEARCH_RE, CELL_SELECTOR, ROW_SELECTOR, TABLE_SELECTOR,
};
use crate::error::ScrapeError;
use crate::records::{AttendanceRecord, MarkComponent, SubjectMarks};
use scraper::ElementRef;
use tracing::debug;

/// Extracts per-subject internal marks from the test-performance page.
pub fn extract_marks(html: &str) -> Result<Vec<SubjectMarks>, ScrapeError> {
    let document = parse_document(html);

    // Pass 1: the marks table announces itself with both keywords.
    for table in document.select(&TABLE_SELECTOR) {
        let text = table_text(&table);
        if text.contains("test performance") && text.contains("course code") {
            let rows = parse_marks_table(&table);
            debug!(pass = "header-text", rows = rows.len(), "marks table matched");
            return require_rows(rows, "marks");
        }
    }

    // Pass 2: fall back to any table whose rows carry course codes
    // alongside nested tables.
    for table in document.select(&TABLE_SELECTOR) {
        let rows = parse_marks_table(&table);
        if !rows.is_empty() {
            debug!(pass = "column-position", rows = rows.len(), "marks table matched");
            return Ok(rows);
        }
    }

    Err(ScrapeError::structural("marks table not found"))
}

fn parse_marks_table(table: &ElementRef) -> Vec<SubjectMarks> {
    static NESTED_TABLE: std::sync::LazyLock<scraper::Selector> =
        std::sync::LazyLock::new(|| scraper::Selector::parse("table").unwrap());

    let mut subjects = Vec::new();
    for row in table.select(&ROW_SELECTOR) {
        // Rows of the nested component tables also match the row
        // selector; they carry no course code and are skipped here.
        let Some(subject_code) = find_code_in_row(&row) else {
            continue;
        };

        let cells = cell_texts(&row);
        let category = cells.iter().find_map(|cell| {
            let lower = cell.to_lowercase();
            (lower == "theory" || lower == "practical").then(|| cell.clone())
        });

        let components = row
            .select(&NESTED_TABLE)
            .next()
            .map(|nested| parse_components(&nested))
            .unwrap_or_default();

        let total_marks = components.iter().map(|c| c.marks).sum();
        let max_total_marks = components.iter().map(|c| c.max_marks).sum();

        subjects.push(SubjectMarks {
            subject_name: subject_code.clone(),
            subject_code,
            category,
            total_marks,
            max_total_marks,
            components,
        });
    }
    subjects
}

fn find_code_in_row(row: &ElementRef) -> Option<String> {
    for cell in row.select(&CELL_SELECTOR).take(3) {
        let text = cell
            .text()
            .collect::<String>()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if let Some(m) = COURSE_CODE_SEARCH_RE.find(&text) {
            if is_course_code(m.as_str()) {
                return Some(m.as_str().to_string());
            }
        }
    }
    None
}

/// Pairs the nested table's "name/max" header cells with the value
/// cells below them, positionally. Cells that fail to parse on
/// either side are dropped as a pair.
fn parse_components(nested: &ElementRef) -> Vec<MarkComponent> {
    let mut rows = nested.select(&ROW_SELECTOR);
    let Some(header_row) = rows.next() else {
        return Vec::new();
    };
    let Some(value_row) = rows.next() else {
        return Vec::new();
    };

    let headers = cell_texts(&header_row);
    let values = cell_texts(&value_row);

    headers
        .iter()
        .zip(values.iter())
        .filter_map(|(header, value)| {
            let (name, max_raw) = header.rsplit_once('/')?;
            let max_marks = parse_lenient_number(max_raw)?;
            let marks = parse_lenient_number(value)?;
            Some(MarkComponent {
                name: name.trim().to_string(),
                marks,
                max_marks,
            })
        })
        .collect()
}

/// Enriches marks subjects with names from the attendance view for
/// the same code: the marks report prints codes only. Matching is by
/// (code, category) first, code alone second; an unmatched subject
/// keeps its code as the name fallback.
pub fn enrich_marks_with_attendance(
    marks: &mut [SubjectMarks],
    attendance: &[AttendanceRecord],
) {
    for subject in marks.iter_mut() {
        let exact = attendance.iter().find(|a| {
            a.subject_code == subject.subject_code && a.category == subject.category
        });
        let by_code = exact.or_else(|| {
            attendance
                .iter()
                .find(|a| a.subject_code == subject.subject_code)
        });
        if let Some(record) = by_code {
            if !record.subject_name.is_empty() {
                subject.subject_name = record.subject_name.clone();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::DEFAULT_TARGET;
    use crate::metrics::{classes_can_miss, classes_needed_to_attend};

    fn marks_page(rows: &str) -> String {
        format!(
            "<html><body><table><tr><th>Test Performance</th></tr>\
             <tr><th>Course Code</th><th>Marks</th></tr>{rows}</table></body></html>"
        )
    }

    fn attendance_record(code: &str, name: &str, category: Option<&str>) -> AttendanceRecord {
        AttendanceRecord {
            subject_code: code.to_string(),
            subject_name: name.to_string(),
            category: category.map(str::to_string),
            total_hours: 60,
            attended_hours: 48,
            percentage: 80.0,
            classes_to_miss: classes_can_miss(60, 48, DEFAULT_TARGET),
            classes_to_attend: classes_needed_to_attend(60, 48, DEFAULT_TARGET),
        }
    }

    #[test]
    fn test_nested_components_paired_and_summed() {
        let html = marks_page(
            "<tr><td>21CSC101T</td><td><table>\
             <tr><td>CLA-1/10</td><td>CLA-2/15</td><td>CLA-3/25</td></tr>\
             <tr><td>8</td><td>12.5</td><td>ABS</td></tr>\
             </table></td></tr>",
        );
        let subjects = extract_marks(&html).unwrap();
        assert_eq!(subjects.len(), 1);
        let s = &subjects[0];
        assert_eq!(s.components.len(), 3);
        assert_eq!(s.components[0].name, "CLA-1");
        assert_eq!(s.components[0].max_marks, 10.0);
        assert_eq!(s.components[2].marks, 0.0); // ABS
        assert_eq!(s.total_marks, 20.5);
        assert_eq!(s.max_total_marks, 50.0);
    }

    #[test]
    fn test_subject_without_detail_has_empty_components() {
        let html = marks_page("<tr><td>21MAB102</td><td>pending</td></tr>");
        let subjects = extract_marks(&html).unwrap();
        assert_eq!(subjects[0].components.len(), 0);
        assert_eq!(subjects[0].total_marks, 0.0);
    }

    #[test]
    fn test_missing_table_is_structural() {
        let err = extract_marks("<html><body></body></html>").unwrap_err();
        assert_eq!(err.kind(), "structural");
    }

    #[test]
    fn test_enrichment_prefers_code_category_pair() {
        let html = marks_page(
            "<tr><td>21PYB101J</td><td>Practical</td><td><table>\
             <tr><td>Lab/50</td></tr><tr><td>42</td></tr></table></td></tr>",
        );
        let mut subjects = extract_marks(&html).unwrap();
        let attendance = vec![
            attendance_record("21PYB101J", "Physics (Theory)", Some("Theory")),
            attendance_record("21PYB101J", "Physics Lab", Some("Practical")),
        ];
        enrich_marks_with_attendance(&mut subjects, &attendance);
        assert_eq!(subjects[0].subject_name, "Physics Lab");
    }

    #[test]
    fn test_enrichment_falls_back_to_code() {
        let html = marks_page(
            "<tr><td>21CSC101T</td><td><table>\
             <tr><td>CLA-1/10</td></tr><tr><td>9</td></tr></table></td></tr>",
        );
        let mut subjects = extract_marks(&html).unwrap();
        let attendance = vec![attendance_record("21CSC101T", "Data Structures", Some("Theory"))];
        enrich_marks_with_attendance(&mut subjects, &attendance);
        assert_eq!(subjects[0].subject_name, "Data Structures");
    }

    #[test]
    fn test_unmatched_subject_keeps_code_as_name() {
        let html = marks_page(
            "<tr><td>21GNH101J</td><td><table>\
             <tr><td>CLA-1/10</td></tr><tr><td>7</td></tr></table></td></tr>",
        );
        let mut subjects = extract_marks(&html).unwrap();
        enrich_marks_with_attendance(&mut subjects, &[]);
        assert_eq!(subjects[0].subject_name, "21GNH101J");
    }
}
