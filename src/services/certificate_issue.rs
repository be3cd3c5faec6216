//! Certificate derivation. A certificate is a point-in-time snapshot of a
//! passing exam attempt together with the student and course it belongs
//! to; this module decides eligibility, builds the snapshot and writes it
//! through the uniqueness guard on `exam_attempt_id`.

use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::models::{ExamCertificate, ExamViolation};
use crate::repositories::certificates::{self, CertificateData};
use crate::repositories::exam_attempts::AttemptContextRow;
use crate::repositories::violations;

/// Days assumed for a course with no configured duration.
pub(crate) const DEFAULT_COURSE_DURATION_DAYS: i32 = 30;

#[derive(Debug, Error)]
pub(crate) enum IssueError {
    #[error("attempt has not been submitted")]
    NotSubmitted,
    #[error("attempt was not passed")]
    NotPassed,
    #[error("score {score:.2}% is below the certificate threshold {threshold:.2}%")]
    BelowThreshold { score: f64, threshold: f64 },
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("failed to serialize violation details: {0}")]
    ViolationDetails(#[from] serde_json::Error),
}

impl IssueError {
    /// True for the "attempt simply does not qualify" cases, as opposed
    /// to infrastructure failures.
    pub(crate) fn is_ineligible(&self) -> bool {
        matches!(
            self,
            IssueError::NotSubmitted | IssueError::NotPassed | IssueError::BelowThreshold { .. }
        )
    }
}

/// Eligibility predicate: submitted, passed, and at or above the
/// certificate threshold.
pub(crate) fn check_eligibility(
    context: &AttemptContextRow,
    threshold: f64,
) -> Result<(), IssueError> {
    if !context.is_submitted {
        return Err(IssueError::NotSubmitted);
    }
    if !context.is_passed {
        return Err(IssueError::NotPassed);
    }
    if context.score_percentage < threshold {
        return Err(IssueError::BelowThreshold {
            score: context.score_percentage,
            threshold,
        });
    }
    Ok(())
}

/// Display-name fallback chain: full name, then username, then email.
pub(crate) fn student_display_name(context: &AttemptContextRow) -> String {
    let full_name = context.user_full_name.trim();
    if !full_name.is_empty() {
        return full_name.to_string();
    }
    let username = context.user_username.trim();
    if !username.is_empty() {
        return username.to_string();
    }
    context.user_email.clone()
}

pub(crate) fn months_from_days(days: i32) -> f64 {
    (days as f64 / 30.0 * 100.0).round() / 100.0
}

#[derive(Debug, Serialize)]
struct ViolationDetail<'a> {
    violation_type: &'static str,
    count: i32,
    description: Option<&'a str>,
    recorded_at: String,
}

/// JSON rendering of the attempt's violations; `None` when there are none
/// so the column stays NULL instead of holding an empty list.
pub(crate) fn violation_details_json(
    records: &[ExamViolation],
) -> Result<Option<String>, serde_json::Error> {
    if records.is_empty() {
        return Ok(None);
    }
    let details: Vec<ViolationDetail<'_>> = records
        .iter()
        .map(|record| ViolationDetail {
            violation_type: record.violation_type.label(),
            count: record.violation_count,
            description: record.description.as_deref(),
            recorded_at: format_primitive(record.recorded_at),
        })
        .collect();
    serde_json::to_string(&details).map(Some)
}

/// Builds the snapshot for an eligible attempt. Pure apart from the input
/// rows, so the derivation rules are unit-testable.
pub(crate) fn build_snapshot(
    context: &AttemptContextRow,
    attempt_violations: &[ExamViolation],
    threshold: f64,
) -> Result<CertificateData, IssueError> {
    check_eligibility(context, threshold)?;
    let submitted_at = context.submitted_at.ok_or(IssueError::NotSubmitted)?;

    let duration_days =
        context.course_duration_days.unwrap_or(DEFAULT_COURSE_DURATION_DAYS);
    // Purchase date falls back to the access grant when there is no
    // payment record (manually granted access).
    let purchased_date = context.payment_created_at.unwrap_or(context.access_created_at);
    let minutes = context.time_taken_seconds.map(|seconds| seconds / 60).unwrap_or(0);

    Ok(CertificateData {
        student_name: student_display_name(context),
        student_email: context.user_email.clone(),
        student_phone: context.user_phone.clone(),
        course_name: context.course_name.clone(),
        course_duration_days: duration_days,
        course_duration_months: months_from_days(duration_days),
        purchased_date,
        joined_date: context.access_created_at,
        exam_score_percentage: context.score_percentage,
        correct_answers: context.correct_answers,
        total_questions: context.total_questions,
        exam_duration_taken_minutes: minutes,
        exam_submitted_date: submitted_at,
        has_violations: context.has_violations,
        violation_count: context.violation_count,
        violation_details: violation_details_json(attempt_violations)?,
    })
}

#[derive(Debug)]
pub(crate) enum IssueOutcome {
    Created(ExamCertificate),
    AlreadyExists(String),
    Ineligible(IssueError),
}

/// Issues a certificate for one attempt if it qualifies. Called from the
/// submit path right after an attempt is finalized, and from
/// reconciliation. Never overwrites an existing record.
pub(crate) async fn issue_for_attempt(
    pool: &PgPool,
    threshold: f64,
    attempt_id: &str,
) -> Result<IssueOutcome, IssueError> {
    let context = exam_attempt_context(pool, attempt_id).await?;
    issue_from_context(pool, threshold, &context).await
}

pub(crate) async fn issue_from_context(
    pool: &PgPool,
    threshold: f64,
    context: &AttemptContextRow,
) -> Result<IssueOutcome, IssueError> {
    let attempt_violations = violations::list_by_attempt(pool, &context.attempt_id).await?;
    let data = match build_snapshot(context, &attempt_violations, threshold) {
        Ok(data) => data,
        Err(err) if err.is_ineligible() => return Ok(IssueOutcome::Ineligible(err)),
        Err(err) => return Err(err),
    };

    let id = Uuid::new_v4().to_string();
    let now = primitive_now_utc();
    match certificates::create_if_absent(pool, &id, &context.attempt_id, &data, now).await? {
        Some(record) => {
            tracing::info!(
                certificate_id = %record.id,
                attempt_id = %context.attempt_id,
                student = %record.student_email,
                "certificate issued"
            );
            Ok(IssueOutcome::Created(record))
        }
        None => {
            let existing = certificates::exists_for_attempt(pool, &context.attempt_id)
                .await?
                .unwrap_or_default();
            Ok(IssueOutcome::AlreadyExists(existing))
        }
    }
}

async fn exam_attempt_context(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<AttemptContextRow, IssueError> {
    crate::repositories::exam_attempts::find_context_by_id(pool, attempt_id)
        .await?
        .ok_or(IssueError::Database(sqlx::Error::RowNotFound))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::types::ViolationType;
    use time::macros::datetime;

    fn passing_context() -> AttemptContextRow {
        AttemptContextRow {
            attempt_id: "attempt-1".to_string(),
            is_submitted: true,
            is_passed: true,
            score_percentage: 92.5,
            correct_answers: 37,
            total_questions: 40,
            time_taken_seconds: Some(1845),
            submitted_at: Some(datetime!(2025-03-10 14:30:00)),
            has_violations: false,
            violation_count: 0,
            user_id: "user-1".to_string(),
            user_full_name: "Aruzhan Bekova".to_string(),
            user_username: "aruzhan".to_string(),
            user_email: "aruzhan@example.com".to_string(),
            user_phone: Some("+77010000000".to_string()),
            course_name: "Digital Marketing".to_string(),
            course_duration_days: Some(45),
            access_created_at: datetime!(2025-01-05 09:00:00),
            payment_created_at: Some(datetime!(2025-01-04 18:20:00)),
        }
    }

    #[test]
    fn eligibility_requires_all_three_conditions() {
        let mut context = passing_context();
        assert!(check_eligibility(&context, 80.0).is_ok());

        context.is_submitted = false;
        assert!(matches!(check_eligibility(&context, 80.0), Err(IssueError::NotSubmitted)));

        context.is_submitted = true;
        context.is_passed = false;
        assert!(matches!(check_eligibility(&context, 80.0), Err(IssueError::NotPassed)));

        context.is_passed = true;
        context.score_percentage = 79.99;
        assert!(matches!(
            check_eligibility(&context, 80.0),
            Err(IssueError::BelowThreshold { .. })
        ));
    }

    #[test]
    fn threshold_boundary_is_inclusive() {
        let mut context = passing_context();
        context.score_percentage = 80.0;
        assert!(check_eligibility(&context, 80.0).is_ok());
    }

    #[test]
    fn name_falls_back_to_username_then_email() {
        let mut context = passing_context();
        assert_eq!(student_display_name(&context), "Aruzhan Bekova");

        context.user_full_name = "   ".to_string();
        assert_eq!(student_display_name(&context), "aruzhan");

        context.user_username = String::new();
        assert_eq!(student_display_name(&context), "aruzhan@example.com");
    }

    #[test]
    fn months_round_to_two_decimals() {
        assert_eq!(months_from_days(30), 1.0);
        assert_eq!(months_from_days(45), 1.5);
        assert_eq!(months_from_days(100), 3.33);
    }

    #[test]
    fn snapshot_uses_payment_date_when_present() {
        let context = passing_context();
        let data = build_snapshot(&context, &[], 80.0).unwrap();
        assert_eq!(data.purchased_date, datetime!(2025-01-04 18:20:00));
        assert_eq!(data.joined_date, datetime!(2025-01-05 09:00:00));
    }

    #[test]
    fn snapshot_falls_back_to_access_date_without_payment() {
        let mut context = passing_context();
        context.payment_created_at = None;
        let data = build_snapshot(&context, &[], 80.0).unwrap();
        assert_eq!(data.purchased_date, datetime!(2025-01-05 09:00:00));
    }

    #[test]
    fn snapshot_defaults_duration_and_truncates_minutes() {
        let mut context = passing_context();
        context.course_duration_days = None;
        context.time_taken_seconds = Some(1845);
        let data = build_snapshot(&context, &[], 80.0).unwrap();
        assert_eq!(data.course_duration_days, 30);
        assert_eq!(data.course_duration_months, 1.0);
        assert_eq!(data.exam_duration_taken_minutes, 30);

        context.time_taken_seconds = None;
        let data = build_snapshot(&context, &[], 80.0).unwrap();
        assert_eq!(data.exam_duration_taken_minutes, 0);
    }

    #[test]
    fn violation_details_are_null_for_clean_attempts() {
        assert_eq!(violation_details_json(&[]).unwrap(), None);
    }

    #[test]
    fn violation_details_serialize_labels() {
        let records = vec![ExamViolation {
            id: "v1".to_string(),
            attempt_id: "attempt-1".to_string(),
            violation_type: ViolationType::TabSwitch,
            violation_count: 3,
            description: Some("left the exam tab".to_string()),
            recorded_at: datetime!(2025-03-10 14:12:00),
        }];
        let json = violation_details_json(&records).unwrap().unwrap();
        assert!(json.contains("Tab Switch"));
        assert!(json.contains("left the exam tab"));
        assert!(json.contains("2025-03-10T14:12:00Z"));
    }
}
