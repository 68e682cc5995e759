//! Converts accumulated presence checks into a verdict.

use crate::models::attendance::Verdict;

/// Checks an attendee can be expected to pass during one lecture.
pub const CHECK_BUDGET: i32 = 7;
/// Checks needed to be marked present.
pub const MIN_REQUIRED: i32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    check_budget: i32,
    min_required: i32,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self::new(CHECK_BUDGET, MIN_REQUIRED)
    }
}

impl ScoringPolicy {
    pub fn new(check_budget: i32, min_required: i32) -> Self {
        Self {
            check_budget,
            min_required,
        }
    }

    pub fn check_budget(&self) -> i32 {
        self.check_budget
    }

    pub fn min_required(&self) -> i32 {
        self.min_required
    }

    /// Verdict an attendee earns by submitting with `score` checks.
    ///
    /// Never `Absent`: only the end-of-lecture sweep assigns that.
    pub fn verdict_for(&self, score: i32) -> Verdict {
        if score >= self.min_required {
            Verdict::Present
        } else {
            Verdict::Incomplete
        }
    }

    /// Score written by a presenter override.
    pub fn manual_score(&self) -> i32 {
        self.check_budget
    }

    pub fn summary(&self, score: i32) -> String {
        if score >= self.min_required {
            format!("passed {}/{} checks", score, self.check_budget)
        } else {
            format!(
                "passed {}/{} checks, need {}",
                score, self.check_budget, self.min_required
            )
        }
    }
}
