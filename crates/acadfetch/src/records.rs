//! Canonical record types produced by the extractors, and the
//! `ScrapeResult` envelope that every public operation returns.

use crate::error::ScrapeError;
use serde::{Deserialize, Serialize};

/// Session state handed to the caller after loading Portal A's login
/// page. Created once per login attempt and discarded afterwards;
/// nothing here survives the call.
#[derive(Debug, Clone, Serialize)]
pub struct SessionArtifacts {
    /// Anti-forgery token scraped from the login form's hidden field.
    pub csrf_token: String,
    /// `;`-joined `key=value` cookie pairs issued so far.
    pub cookie_header: String,
    /// Captcha image re-encoded as a `data:` URL for display.
    pub captcha_image: String,
}

/// Per-subject attendance, one record per enrolled subject.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AttendanceRecord {
    #[serde(rename = "subjectCode")]
    pub subject_code: String,
    #[serde(rename = "subjectName")]
    pub subject_name: String,
    /// "Theory"/"Practical" when the report distinguishes one; used
    /// to disambiguate subjects sharing a course code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "totalHours")]
    pub total_hours: u32,
    #[serde(rename = "attendedHours")]
    pub attended_hours: u32,
    /// 0..=100, as reported by the portal (or derived from hours).
    pub percentage: f64,
    /// How many upcoming classes can be skipped while staying at or
    /// above the attendance target.
    #[serde(rename = "classesToMiss")]
    pub classes_to_miss: u32,
    /// How many consecutive classes must be attended to reach the
    /// target from below.
    #[serde(rename = "classesToAttend")]
    pub classes_to_attend: u32,
}

/// One scored component of a subject's internal assessment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkComponent {
    pub name: String,
    pub marks: f64,
    #[serde(rename = "maxMarks")]
    pub max_marks: f64,
}

/// Internal-assessment breakdown for one subject. The component list
/// may be empty when the portal's detail view is unavailable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubjectMarks {
    #[serde(rename = "subjectCode")]
    pub subject_code: String,
    #[serde(rename = "subjectName")]
    pub subject_name: String,
    /// Subject category when the portal distinguishes one (e.g.
    /// "Theory" vs "Practical"); used for marks/attendance matching.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(rename = "totalMarks")]
    pub total_marks: f64,
    #[serde(rename = "maxTotalMarks")]
    pub max_total_marks: f64,
    pub components: Vec<MarkComponent>,
}

/// One cell of the institution-wide fixed grid. Independent of any
/// student; `slot_type` is a short code such as "A" or "P11".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MasterTimetableSlot {
    #[serde(rename = "dayOrder")]
    pub day_order: u8,
    pub period: u8,
    #[serde(rename = "slotType")]
    pub slot_type: String,
}

/// A student's course mapped to the slot type(s) it occupies.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnrolledSlot {
    #[serde(rename = "subjectCode")]
    pub subject_code: String,
    #[serde(rename = "subjectName")]
    pub subject_name: String,
    #[serde(rename = "slotType")]
    pub slot_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// Join of master grid and enrolled slots for one (day, period).
/// `subject_code`/`subject_name` are empty strings for unmapped
/// slot types; the grid cell exists but no enrolled course fills it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TimetableCell {
    #[serde(rename = "dayOrder")]
    pub day_order: u8,
    pub period: u8,
    #[serde(rename = "slotType")]
    pub slot_type: String,
    #[serde(rename = "subjectCode")]
    pub subject_code: String,
    #[serde(rename = "subjectName")]
    pub subject_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

/// The sole externally observable output of every extraction
/// operation. Internal partial state is never exposed: an operation
/// either carries data or a human-actionable error.
#[derive(Debug, Clone, Serialize)]
pub struct ScrapeResult<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Error class (`input`/`auth`/`structural`/`infra`).
    #[serde(rename = "errorKind", skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<&'static str>,
}

impl<T> ScrapeResult<T> {
    pub fn ok(data: T) -> Self {
        ScrapeResult {
            success: true,
            data: Some(data),
            error: None,
            error_kind: None,
        }
    }

    pub fn err(e: &ScrapeError) -> Self {
        ScrapeResult {
            success: false,
            data: None,
            error: Some(e.to_string()),
            error_kind: Some(e.kind()),
        }
    }
}

impl<T> From<Result<T, ScrapeError>> for ScrapeResult<T> {
    fn from(result: Result<T, ScrapeError>) -> Self {
        match result {
            Ok(data) => ScrapeResult::ok(data),
            Err(e) => ScrapeResult::err(&e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scrape_result_ok_shape() {
        let r = ScrapeResult::ok(vec![1, 2, 3]);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["data"][0], 1);
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_scrape_result_err_shape() {
        let e = ScrapeError::structural("attendance table not found");
        let r: ScrapeResult<()> = ScrapeResult::err(&e);
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "attendance table not found");
        assert_eq!(json["errorKind"], "structural");
    }
}
