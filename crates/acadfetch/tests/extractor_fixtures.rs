//! End-to-end extractor tests over realistic fixture pages: layout
//! junk around the real tables, the portal's inconsistent value
//! formats, and the failure envelope callers actually see.

use std::time::{Duration, Instant};

use acadfetch::browser::wait_for_condition;
use acadfetch::error::ScrapeError;
use acadfetch::extract::{
    extract_attendance, extract_enrolled_slots, extract_marks, extract_master_grid,
    join_timetable,
};
use acadfetch::records::ScrapeResult;

/// Attendance report embedded in a page with a navigation table and
/// a footer table, the way the portal actually serves it.
const ATTENDANCE_PAGE: &str = r#"<html><body>
<table><tr><td>Home</td><td>Reports</td><td>Logout</td></tr></table>
<table>
  <tr><th>Course Code</th><th>Course Title</th><th>Max. hours</th><th>Attn. hours</th><th>Average %</th></tr>
  <tr><td>21CSC101T</td><td>Data Structures</td><td>60</td><td>45</td><td>75</td></tr>
  <tr><td>21MAB102</td><td>Advanced Calculus</td><td>40</td><td>40</td><td>100%</td></tr>
  <tr><td>21PYB101J</td><td>Physics Lab</td><td>50</td><td>41</td><td>82</td></tr>
  <tr><td>HELLO123X</td><td>Not A Course</td><td>10</td><td>10</td><td>100</td></tr>
</table>
<table><tr><td>© Controller of Examinations</td></tr></table>
</body></html>"#;

const TIMETABLE_PAGE: &str = r#"<html><body>
<table>
  <tr><th>Day Order</th><th>Hour 1</th><th>Hour 2</th><th>Hour 3</th><th>Hour 4</th></tr>
  <tr><td>Day 1</td><td>B</td><td>C</td><td>A</td><td>G</td></tr>
  <tr><td>Day 2</td><td>A</td><td>-</td><td>B</td><td></td></tr>
</table>
<table>
  <tr><th>Course Code</th><th>Course Title</th><th>Slot</th><th>Faculty</th><th>Room</th></tr>
  <tr><td>21XYZ101</td><td>Systems Programming</td><td>A</td><td>Dr. R. Mani</td><td>AB-301</td></tr>
  <tr><td>21CSC202T</td><td>Operating Systems</td><td>B/C</td><td>Dr. K. Priya</td><td>AB-112</td></tr>
</table>
</body></html>"#;

const MARKS_PAGE: &str = r#"<html><body>
<table>
  <tr><th>Course Code</th><th>Test Performance</th></tr>
  <tr><td>21CSC101T</td><td>
    <table>
      <tr><td>CT-I/25</td><td>CT-II/25</td><td>Assignment/10</td></tr>
      <tr><td>20</td><td>18.5</td><td>ABS</td></tr>
    </table>
  </td></tr>
  <tr><td>21MAB102</td><td>
    <table>
      <tr><td>CT-I/25</td><td>CT-II/25</td></tr>
      <tr><td>24</td><td>22</td></tr>
    </table>
  </td></tr>
</table>
</body></html>"#;

#[test]
fn test_attendance_page_with_layout_tables() {
    let records = extract_attendance(ATTENDANCE_PAGE).unwrap();
    assert_eq!(records.len(), 3);

    let ds = &records[0];
    assert_eq!(ds.subject_code, "21CSC101T");
    assert_eq!(ds.subject_name, "Data Structures");
    assert_eq!(ds.total_hours, 60);
    assert_eq!(ds.attended_hours, 45);
    assert_eq!(ds.percentage, 75.0);

    // "100%" and bare numbers land in the same field.
    assert_eq!(records[1].percentage, 100.0);
    // The malformed-code row is dropped, never surfaced.
    assert!(records.iter().all(|r| r.subject_code != "HELLO123X"));
}

#[test]
fn test_timetable_join_resolves_and_leaves_unmapped_empty() {
    let grid = extract_master_grid(TIMETABLE_PAGE).unwrap();
    let slots = extract_enrolled_slots(TIMETABLE_PAGE).unwrap();
    let cells = join_timetable(&grid, &slots);

    // "-" and blank grid cells are omitted entirely.
    assert_eq!(grid.len(), 6);
    assert_eq!(cells.len(), 6);

    let slot_a = cells
        .iter()
        .find(|c| c.day_order == 1 && c.period == 3)
        .unwrap();
    assert_eq!(slot_a.slot_type, "A");
    assert_eq!(slot_a.subject_code, "21XYZ101");
    assert_eq!(slot_a.subject_name, "Systems Programming");
    assert_eq!(slot_a.faculty.as_deref(), Some("Dr. R. Mani"));
    assert_eq!(slot_a.room.as_deref(), Some("AB-301"));

    // Multi-slot course fills both of its slot types.
    let slot_b = cells
        .iter()
        .find(|c| c.day_order == 1 && c.period == 1)
        .unwrap();
    let slot_c = cells
        .iter()
        .find(|c| c.day_order == 1 && c.period == 2)
        .unwrap();
    assert_eq!(slot_b.subject_code, "21CSC202T");
    assert_eq!(slot_c.subject_code, "21CSC202T");

    // "G" has no enrolled course: the cell exists with empty fields.
    let unmapped = cells
        .iter()
        .find(|c| c.day_order == 1 && c.period == 4)
        .unwrap();
    assert_eq!(unmapped.slot_type, "G");
    assert_eq!(unmapped.subject_code, "");
    assert_eq!(unmapped.subject_name, "");
    assert!(unmapped.faculty.is_none());
}

#[test]
fn test_marks_components_paired_and_summed() {
    let marks = extract_marks(MARKS_PAGE).unwrap();
    assert_eq!(marks.len(), 2);

    let ds = &marks[0];
    assert_eq!(ds.subject_code, "21CSC101T");
    assert_eq!(ds.components.len(), 3);
    assert_eq!(ds.components[0].name, "CT-I");
    assert_eq!(ds.components[0].max_marks, 25.0);
    // Absent entries count as zero in the totals.
    assert_eq!(ds.components[2].marks, 0.0);
    assert_eq!(ds.total_marks, 38.5);
    assert_eq!(ds.max_total_marks, 60.0);

    assert_eq!(marks[1].total_marks, 46.0);
}

#[test]
fn test_empty_report_is_explicit_failure_not_empty_success() {
    // Zero extracted rows must never serialize as success.
    let result: Result<Vec<()>, _> =
        Err(extract_attendance("<html><table><tr><td>Course Code Max Attn</td></tr></table></html>").unwrap_err());
    let envelope = ScrapeResult::from(result);
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind, Some("structural"));
}

#[test]
fn test_auth_failure_envelope_is_auth_not_structural() {
    let envelope = ScrapeResult::<Vec<()>>::err(&ScrapeError::auth("invalid captcha"));
    assert!(!envelope.success);
    assert_eq!(envelope.error_kind, Some("auth"));

    let wire = serde_json::to_value(&envelope).unwrap();
    assert_eq!(wire["success"], false);
    assert_eq!(wire["errorKind"], "auth");
    assert!(wire.get("data").is_none());
}

#[tokio::test]
async fn test_missing_login_form_times_out_near_budget() {
    let budget = Duration::from_millis(150);
    let start = Instant::now();
    let err = wait_for_condition::<(), _, _>(
        "login form",
        budget,
        Duration::from_millis(20),
        || async { Ok(None) },
    )
    .await
    .unwrap_err();
    let elapsed = start.elapsed();

    assert_eq!(err.kind(), "structural");
    assert!(err.to_string().contains("login form"));
    // The failure must consume the polling budget, not bail instantly,
    // and must not stall far past it either.
    assert!(elapsed >= Duration::from_millis(100), "bailed too early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(2), "overran budget: {elapsed:?}");
}
