//! Turns an in-progress attempt into a submitted one: scores it, records
//! the proctoring violations, and hands the result straight to
//! certificate issuance so qualifying students never wait for a batch
//! job.

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::db::models::ExamAttempt;
use crate::db::types::ViolationType;
use crate::repositories::{exam_attempts, violations};
use crate::services::certificate_issue::{self, IssueOutcome};

#[derive(Debug)]
pub(crate) struct ViolationReport {
    pub violation_type: ViolationType,
    pub count: i32,
    pub description: Option<String>,
}

#[derive(Debug)]
pub(crate) struct FinalizeInput {
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_taken_seconds: Option<i32>,
    pub violations: Vec<ViolationReport>,
}

pub(crate) fn score_percentage(correct: i32, total: i32) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = correct as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}

pub(crate) async fn finalize_attempt(
    state: &AppState,
    attempt_id: &str,
    input: FinalizeInput,
) -> Result<ExamAttempt> {
    let now = primitive_now_utc();
    let score = score_percentage(input.correct_answers, input.total_questions);
    let is_passed = score >= state.settings().certificate().exam_pass_mark;

    let mut violation_total = 0;
    for report in &input.violations {
        violation_total += report.count.max(0);
        violations::create(
            state.db(),
            violations::CreateViolation {
                id: &Uuid::new_v4().to_string(),
                attempt_id,
                violation_type: report.violation_type,
                violation_count: report.count.max(0),
                description: report.description.as_deref(),
                recorded_at: now,
            },
        )
        .await
        .context("Failed to record exam violation")?;
    }

    let attempt = exam_attempts::submit(
        state.db(),
        attempt_id,
        exam_attempts::SubmitAttempt {
            is_passed,
            score_percentage: score,
            correct_answers: input.correct_answers,
            total_questions: input.total_questions,
            time_taken_seconds: input.time_taken_seconds,
            submitted_at: now,
            has_violations: violation_total > 0,
            violation_count: violation_total,
            updated_at: now,
        },
    )
    .await
    .context("Failed to submit exam attempt")?;

    // Issuance failures must not fail the submit; the reconciliation job
    // picks up anything missed here.
    let threshold = state.settings().certificate().pass_threshold;
    match certificate_issue::issue_for_attempt(state.db(), threshold, attempt_id).await {
        Ok(IssueOutcome::Created(_)) | Ok(IssueOutcome::AlreadyExists(_)) => {}
        Ok(IssueOutcome::Ineligible(reason)) => {
            tracing::debug!(attempt_id, %reason, "attempt not eligible for a certificate");
        }
        Err(err) => {
            tracing::warn!(attempt_id, error = %err, "certificate issuance failed after submit");
        }
    }

    Ok(attempt)
}

#[cfg(test)]
mod tests {
    use super::score_percentage;

    #[test]
    fn score_is_rounded_to_two_decimals() {
        assert_eq!(score_percentage(37, 40), 92.5);
        assert_eq!(score_percentage(1, 3), 33.33);
        assert_eq!(score_percentage(2, 3), 66.67);
    }

    #[test]
    fn empty_exam_scores_zero() {
        assert_eq!(score_percentage(0, 0), 0.0);
        assert_eq!(score_percentage(5, 0), 0.0);
    }
}
