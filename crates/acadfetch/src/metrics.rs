//! Derived metrics over already-extracted records.
//!
//! Everything here is pure and deterministic, with no I/O and no state.
//! These functions back the attendance-margin fields on
//! [`AttendanceRecord`](crate::records::AttendanceRecord) and the
//! grade-projection endpoints of the presentation layer.

/// Default attendance requirement enforced by the institution.
pub const DEFAULT_TARGET: f64 = 0.75;

/// Letter grades on the institution's fixed breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grade {
    O,
    APlus,
    A,
    BPlus,
    B,
    C,
    F,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::O => "O",
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::C => "C",
            Grade::F => "F",
        }
    }
}

/// Breakpoint variant for the lower grades. Most programmes use
/// `Standard` (B at 56, C at 50); a few older schemes relax the
/// bottom two cutoffs (B at 51, C at 45).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GradeScheme {
    #[default]
    Standard,
    Relaxed,
}

/// How many upcoming classes can be skipped while the attendance
/// ratio stays at or above `target`. Zero when the student is
/// already below target.
pub fn classes_can_miss(total: u32, attended: u32, target: f64) -> u32 {
    if total == 0 || target <= 0.0 {
        return 0;
    }
    let ratio = attended as f64 / total as f64;
    if ratio < target {
        return 0;
    }
    // Largest x with attended / (total + x) >= target.
    let margin = (attended as f64 / target - total as f64).floor();
    if margin < 0.0 {
        0
    } else {
        margin as u32
    }
}

/// Minimal number of consecutive classes to attend so that the ratio
/// reaches `target`. Zero when already at or above it.
pub fn classes_needed_to_attend(total: u32, attended: u32, target: f64) -> u32 {
    if target <= 0.0 || target >= 1.0 {
        return 0;
    }
    let ratio = if total == 0 {
        1.0
    } else {
        attended as f64 / total as f64
    };
    if ratio >= target {
        return 0;
    }
    // Smallest x with (attended + x) / (total + x) >= target.
    let needed = ((target * total as f64 - attended as f64) / (1.0 - target)).ceil();
    if needed < 0.0 {
        0
    } else {
        needed as u32
    }
}

/// Final course mark out of 100: internal marks normalized to a
/// 50-point scale plus the external exam (out of 100) scaled to 50.
pub fn final_mark(internal: f64, external: f64, max_internal: f64) -> u32 {
    if max_internal <= 0.0 {
        return 0;
    }
    let internal_scaled = internal / max_internal * 50.0;
    let external_scaled = external / 100.0 * 50.0;
    (internal_scaled + external_scaled).round().max(0.0) as u32
}

/// Maps a final mark to its letter grade.
pub fn grade_from_mark(mark: u32, scheme: GradeScheme) -> Grade {
    let (b_cut, c_cut) = match scheme {
        GradeScheme::Standard => (56, 50),
        GradeScheme::Relaxed => (51, 45),
    };
    match mark {
        m if m >= 91 => Grade::O,
        m if m >= 81 => Grade::APlus,
        m if m >= 71 => Grade::A,
        m if m >= 61 => Grade::BPlus,
        m if m >= b_cut => Grade::B,
        m if m >= c_cut => Grade::C,
        _ => Grade::F,
    }
}

/// Grade points for SGPA computation.
pub fn grade_point(grade: Grade) -> u8 {
    match grade {
        Grade::O => 10,
        Grade::APlus => 9,
        Grade::A => 8,
        Grade::BPlus => 7,
        Grade::B => 6,
        Grade::C => 5,
        Grade::F => 0,
    }
}

/// Minimum external exam mark (out of 100) needed to reach
/// `target_total` out of 100 given the internal score. Returns None
/// when the target is unreachable even with a perfect external.
pub fn required_external(internal: f64, target_total: f64, max_internal: f64) -> Option<u32> {
    if max_internal <= 0.0 {
        return None;
    }
    let internal_scaled = internal / max_internal * 50.0;
    let external_scaled = target_total - internal_scaled;
    if external_scaled <= 0.0 {
        return Some(0);
    }
    // External counts out of 100, halved into the final mark.
    let raw = (external_scaled * 2.0).ceil();
    if raw > 100.0 {
        None
    } else {
        Some(raw as u32)
    }
}

/// Credit-weighted semester grade-point average. Subjects with zero
/// credits are ignored; an empty input yields 0.
pub fn sgpa(subjects: &[(f64, u8)]) -> f64 {
    let total_credits: f64 = subjects.iter().map(|(c, _)| c).sum();
    if total_credits <= 0.0 {
        return 0.0;
    }
    let weighted: f64 = subjects
        .iter()
        .map(|(credits, points)| credits * *points as f64)
        .sum();
    weighted / total_credits
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_miss_above_target() {
        // 45/50 = 90%; can miss 10 and still hold 45/60 = 75%.
        assert_eq!(classes_can_miss(50, 45, DEFAULT_TARGET), 10);
    }

    #[test]
    fn test_can_miss_below_target_is_zero() {
        assert_eq!(classes_can_miss(50, 30, DEFAULT_TARGET), 0);
    }

    #[test]
    fn test_can_miss_preserves_target() {
        for (total, attended) in [(40u32, 31u32), (60, 45), (10, 8), (100, 99)] {
            if (attended as f64 / total as f64) < DEFAULT_TARGET {
                continue;
            }
            let x = classes_can_miss(total, attended, DEFAULT_TARGET);
            let ratio_after = attended as f64 / (total + x) as f64;
            assert!(
                ratio_after >= DEFAULT_TARGET - 1e-9,
                "{attended}/{total}: missing {x} drops ratio to {ratio_after}"
            );
            // And one more miss would drop below target.
            let ratio_one_more = attended as f64 / (total + x + 1) as f64;
            assert!(ratio_one_more < DEFAULT_TARGET);
        }
    }

    #[test]
    fn test_needed_is_minimal() {
        for (total, attended) in [(50u32, 30u32), (40, 20), (10, 5), (80, 59)] {
            let x = classes_needed_to_attend(total, attended, DEFAULT_TARGET);
            let ratio_after = (attended + x) as f64 / (total + x) as f64;
            assert!(ratio_after >= DEFAULT_TARGET, "{attended}/{total} + {x}");
            if x > 0 {
                let ratio_short = (attended + x - 1) as f64 / (total + x - 1) as f64;
                assert!(ratio_short < DEFAULT_TARGET, "{x} is not minimal");
            }
        }
    }

    #[test]
    fn test_needed_zero_when_at_target() {
        assert_eq!(classes_needed_to_attend(40, 30, DEFAULT_TARGET), 0);
        assert_eq!(classes_needed_to_attend(0, 0, DEFAULT_TARGET), 0);
    }

    #[test]
    fn test_final_mark_normalizes_both_components() {
        // 40/50 internal -> 40, 70/100 external -> 35.
        assert_eq!(final_mark(40.0, 70.0, 50.0), 75);
        // 60-point internal scheme.
        assert_eq!(final_mark(45.0, 80.0, 60.0), 78); // 37.5 + 40 = 77.5 -> 78
    }

    #[test]
    fn test_grade_boundaries() {
        assert_eq!(grade_from_mark(91, GradeScheme::Standard), Grade::O);
        assert_eq!(grade_from_mark(90, GradeScheme::Standard), Grade::APlus);
        assert_eq!(grade_from_mark(81, GradeScheme::Standard), Grade::APlus);
        assert_eq!(grade_from_mark(71, GradeScheme::Standard), Grade::A);
        assert_eq!(grade_from_mark(61, GradeScheme::Standard), Grade::BPlus);
        assert_eq!(grade_from_mark(56, GradeScheme::Standard), Grade::B);
        assert_eq!(grade_from_mark(50, GradeScheme::Standard), Grade::C);
        assert_eq!(grade_from_mark(49, GradeScheme::Standard), Grade::F);
        assert_eq!(grade_from_mark(45, GradeScheme::Relaxed), Grade::C);
    }

    #[test]
    fn test_grade_monotonic() {
        let mut last = grade_point(grade_from_mark(0, GradeScheme::Standard));
        for mark in 1..=100 {
            let gp = grade_point(grade_from_mark(mark, GradeScheme::Standard));
            assert!(gp >= last, "grade point dropped at mark {mark}");
            last = gp;
        }
    }

    #[test]
    fn test_grade_points_match_table() {
        assert_eq!(grade_point(grade_from_mark(91, GradeScheme::Standard)), 10);
        assert_eq!(grade_point(grade_from_mark(90, GradeScheme::Standard)), 9);
        assert_eq!(grade_point(Grade::F), 0);
    }

    #[test]
    fn test_required_external_inverts_final_mark() {
        // Internal 40/50 -> 40 points banked; to total 75 we need 35
        // more, i.e. 70/100 external.
        assert_eq!(required_external(40.0, 75.0, 50.0), Some(70));
        // Already at target.
        assert_eq!(required_external(50.0, 50.0, 50.0), Some(0));
        // Unreachable.
        assert_eq!(required_external(5.0, 99.0, 50.0), None);
    }

    #[test]
    fn test_sgpa_weighted() {
        let subjects = [(4.0, 10u8), (3.0, 8), (3.0, 9)];
        let got = sgpa(&subjects);
        assert!((got - 9.1).abs() < 1e-9);
        assert_eq!(sgpa(&[]), 0.0);
    }
}
