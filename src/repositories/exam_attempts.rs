use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::ExamAttempt;

pub(crate) const COLUMNS: &str = "\
    id, course_access_id, is_submitted, is_passed, score_percentage, \
    correct_answers, total_questions, time_taken_seconds, submitted_at, \
    has_violations, violation_count, created_at, updated_at";

/// An attempt joined with everything certificate derivation needs: the
/// student, the course, the access grant and the optional payment.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct AttemptContextRow {
    pub(crate) attempt_id: String,
    pub(crate) is_submitted: bool,
    pub(crate) is_passed: bool,
    pub(crate) score_percentage: f64,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) time_taken_seconds: Option<i32>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) has_violations: bool,
    pub(crate) violation_count: i32,
    pub(crate) user_id: String,
    pub(crate) user_full_name: String,
    pub(crate) user_username: String,
    pub(crate) user_email: String,
    pub(crate) user_phone: Option<String>,
    pub(crate) course_name: String,
    pub(crate) course_duration_days: Option<i32>,
    pub(crate) access_created_at: PrimitiveDateTime,
    pub(crate) payment_created_at: Option<PrimitiveDateTime>,
}

const CONTEXT_SELECT: &str = "\
    SELECT a.id AS attempt_id,
           a.is_submitted,
           a.is_passed,
           a.score_percentage,
           a.correct_answers,
           a.total_questions,
           a.time_taken_seconds,
           a.submitted_at,
           a.has_violations,
           a.violation_count,
           u.id AS user_id,
           u.full_name AS user_full_name,
           u.username AS user_username,
           u.email AS user_email,
           u.phone AS user_phone,
           c.name AS course_name,
           c.duration_days AS course_duration_days,
           ca.created_at AS access_created_at,
           p.created_at AS payment_created_at
    FROM exam_attempts a
    JOIN course_access ca ON ca.id = a.course_access_id
    JOIN users u ON u.id = ca.user_id
    JOIN courses c ON c.id = ca.course_id
    LEFT JOIN course_payments p ON p.id = ca.payment_id";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamAttempt>, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!("SELECT {COLUMNS} FROM exam_attempts WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_context_by_id(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Option<AttemptContextRow>, sqlx::Error> {
    sqlx::query_as::<_, AttemptContextRow>(&format!("{CONTEXT_SELECT} WHERE a.id = $1"))
        .bind(attempt_id)
        .fetch_optional(pool)
        .await
}

/// Attempts satisfying the eligibility predicate, optionally narrowed to a
/// course or a user, oldest first so reconciliation output is stable.
pub(crate) async fn list_eligible_contexts(
    pool: &PgPool,
    threshold: f64,
    course_id: Option<&str>,
    user_id: Option<&str>,
) -> Result<Vec<AttemptContextRow>, sqlx::Error> {
    let mut builder = QueryBuilder::<Postgres>::new(CONTEXT_SELECT);
    builder.push(" WHERE a.is_submitted = TRUE AND a.is_passed = TRUE AND a.score_percentage >= ");
    builder.push_bind(threshold);

    if let Some(course_id) = course_id {
        builder.push(" AND ca.course_id = ");
        builder.push_bind(course_id);
    }

    if let Some(user_id) = user_id {
        builder.push(" AND ca.user_id = ");
        builder.push_bind(user_id);
    }

    builder.push(" ORDER BY a.submitted_at ASC");

    builder.build_query_as::<AttemptContextRow>().fetch_all(pool).await
}

pub(crate) struct CreateAttempt<'a> {
    pub id: &'a str,
    pub course_access_id: &'a str,
    pub created_at: PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateAttempt<'_>,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "INSERT INTO exam_attempts (
            id, course_access_id, is_submitted, is_passed, score_percentage,
            correct_answers, total_questions, time_taken_seconds, submitted_at,
            has_violations, violation_count, created_at, updated_at
        ) VALUES ($1,$2,FALSE,FALSE,0,0,0,NULL,NULL,FALSE,0,$3,$3)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.course_access_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}

pub(crate) struct SubmitAttempt {
    pub is_passed: bool,
    pub score_percentage: f64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub time_taken_seconds: Option<i32>,
    pub submitted_at: PrimitiveDateTime,
    pub has_violations: bool,
    pub violation_count: i32,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn submit(
    pool: &PgPool,
    id: &str,
    params: SubmitAttempt,
) -> Result<ExamAttempt, sqlx::Error> {
    sqlx::query_as::<_, ExamAttempt>(&format!(
        "UPDATE exam_attempts SET
            is_submitted = TRUE,
            is_passed = $1,
            score_percentage = $2,
            correct_answers = $3,
            total_questions = $4,
            time_taken_seconds = $5,
            submitted_at = $6,
            has_violations = $7,
            violation_count = $8,
            updated_at = $9
         WHERE id = $10
         RETURNING {COLUMNS}",
    ))
    .bind(params.is_passed)
    .bind(params.score_percentage)
    .bind(params.correct_answers)
    .bind(params.total_questions)
    .bind(params.time_taken_seconds)
    .bind(params.submitted_at)
    .bind(params.has_violations)
    .bind(params.violation_count)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}
