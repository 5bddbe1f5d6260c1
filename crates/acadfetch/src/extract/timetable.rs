//! Timetable extraction: the institution-wide master grid, the
//! student's enrolled-slot list, and the slot-type join between them.

use super::{
    cell_texts, is_course_code, parse_document, table_text, COURSE_CODE_SEARCH_RE, ROW_SELECTOR,
    TABLE_SELECTOR,
};
use crate::error::ScrapeError;
use crate::records::{EnrolledSlot, MasterTimetableSlot, TimetableCell};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;
use tracing::debug;

/// Row label of the master grid, e.g. "Day 1" or "DAY ORDER 3".
static DAY_LABEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^day(?:\s*order)?\s*(\d+)$").unwrap());

/// Slot-type codes: a letter block optionally followed by digits
/// ("A", "F2", "P11").
static SLOT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,2}\d{0,2}$").unwrap());

/// Extracts the fixed weekly grid: (day order, period) -> slot type.
/// Empty grid cells ("-", blank) are omitted.
pub fn extract_master_grid(html: &str) -> Result<Vec<MasterTimetableSlot>, ScrapeError> {
    let document = parse_document(html);

    for table in document.select(&TABLE_SELECTOR) {
        let text = table_text(&table);
        if !(text.contains("day") && text.contains("hour")) {
            continue;
        }

        let mut slots = Vec::new();
        for row in table.select(&ROW_SELECTOR) {
            let cells = cell_texts(&row);
            let Some(first) = cells.first() else { continue };
            let Some(caps) = DAY_LABEL_RE.captures(first.trim()) else {
                continue;
            };
            let day_order: u8 = match caps[1].parse() {
                Ok(d) => d,
                Err(_) => continue,
            };

            for (offset, cell) in cells.iter().skip(1).enumerate() {
                let code = cell.trim();
                if code.is_empty() || code == "-" {
                    continue;
                }
                if SLOT_CODE_RE.is_match(code) {
                    slots.push(MasterTimetableSlot {
                        day_order,
                        period: (offset + 1) as u8,
                        slot_type: code.to_string(),
                    });
                }
            }
        }

        if !slots.is_empty() {
            debug!(slots = slots.len(), "master grid extracted");
            return Ok(slots);
        }
    }

    Err(ScrapeError::structural("master timetable grid not found"))
}

/// Extracts the student's course-to-slot mapping. A course occupying
/// several slot types ("A/B", "P11-P12") yields one entry per type.
pub fn extract_enrolled_slots(html: &str) -> Result<Vec<EnrolledSlot>, ScrapeError> {
    let document = parse_document(html);

    let mut enrolled = Vec::new();
    for table in document.select(&TABLE_SELECTOR) {
        for row in table.select(&ROW_SELECTOR) {
            let cells = cell_texts(&row);
            if let Some(mut slots) = parse_enrolled_row(&cells) {
                enrolled.append(&mut slots);
            }
        }
        if !enrolled.is_empty() {
            break;
        }
    }

    if enrolled.is_empty() {
        return Err(ScrapeError::structural("enrolled course list not found"));
    }
    debug!(slots = enrolled.len(), "enrolled slots extracted");
    Ok(enrolled)
}

fn parse_enrolled_row(cells: &[String]) -> Option<Vec<EnrolledSlot>> {
    let code_idx = cells.iter().take(3).position(|cell| {
        COURSE_CODE_SEARCH_RE
            .find(cell)
            .is_some_and(|m| is_course_code(m.as_str()))
    })?;
    let subject_code = COURSE_CODE_SEARCH_RE
        .find(&cells[code_idx])?
        .as_str()
        .to_string();

    // Slot cell: first later cell whose parts all look like slot
    // codes. Multi-slot courses separate codes with '/' or '-'.
    let mut slot_idx = None;
    let mut slot_types = Vec::new();
    for (idx, cell) in cells.iter().enumerate().skip(code_idx + 1) {
        let parts: Vec<&str> = cell
            .split(['/', '-', ','])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect();
        if !parts.is_empty() && parts.iter().all(|p| SLOT_CODE_RE.is_match(p)) {
            slot_idx = Some(idx);
            slot_types = parts.iter().map(|p| p.to_string()).collect();
            break;
        }
    }
    let slot_idx = slot_idx?;

    let subject_name = cells
        .iter()
        .take(slot_idx)
        .skip(code_idx + 1)
        .find(|cell| !cell.is_empty())
        .cloned()
        .unwrap_or_else(|| subject_code.clone());

    let mut after = cells.iter().skip(slot_idx + 1).filter(|c| !c.is_empty());
    let faculty = after.next().cloned();
    let room = after.next().cloned();

    Some(
        slot_types
            .into_iter()
            .map(|slot_type| EnrolledSlot {
                subject_code: subject_code.clone(),
                subject_name: subject_name.clone(),
                slot_type,
                faculty: faculty.clone(),
                room: room.clone(),
            })
            .collect(),
    )
}

/// Joins the master grid with the enrolled slots on slot type. Every
/// grid cell survives the join; unmapped slot types produce cells
/// with empty subject fields.
pub fn join_timetable(
    master: &[MasterTimetableSlot],
    enrolled: &[EnrolledSlot],
) -> Vec<TimetableCell> {
    let by_slot: HashMap<&str, &EnrolledSlot> = enrolled
        .iter()
        .map(|slot| (slot.slot_type.as_str(), slot))
        .collect();

    master
        .iter()
        .map(|grid| match by_slot.get(grid.slot_type.as_str()) {
            Some(course) => TimetableCell {
                day_order: grid.day_order,
                period: grid.period,
                slot_type: grid.slot_type.clone(),
                subject_code: course.subject_code.clone(),
                subject_name: course.subject_name.clone(),
                faculty: course.faculty.clone(),
                room: course.room.clone(),
            },
            None => TimetableCell {
                day_order: grid.day_order,
                period: grid.period,
                slot_type: grid.slot_type.clone(),
                subject_code: String::new(),
                subject_name: String::new(),
                faculty: None,
                room: None,
            },
        })
        .collect()
}
