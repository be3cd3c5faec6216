use sqlx::PgPool;

use crate::db::models::ExamViolation;
use crate::db::types::ViolationType;

const COLUMNS: &str =
    "id, attempt_id, violation_type, violation_count, description, recorded_at";

pub(crate) async fn list_by_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Vec<ExamViolation>, sqlx::Error> {
    sqlx::query_as::<_, ExamViolation>(&format!(
        "SELECT {COLUMNS} FROM exam_violations WHERE attempt_id = $1 ORDER BY recorded_at"
    ))
    .bind(attempt_id)
    .fetch_all(pool)
    .await
}

pub(crate) struct CreateViolation<'a> {
    pub id: &'a str,
    pub attempt_id: &'a str,
    pub violation_type: ViolationType,
    pub violation_count: i32,
    pub description: Option<&'a str>,
    pub recorded_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreateViolation<'_>,
) -> Result<ExamViolation, sqlx::Error> {
    sqlx::query_as::<_, ExamViolation>(&format!(
        "INSERT INTO exam_violations (
            id, attempt_id, violation_type, violation_count, description, recorded_at
        ) VALUES ($1,$2,$3,$4,$5,$6)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.attempt_id)
    .bind(params.violation_type)
    .bind(params.violation_count)
    .bind(params.description)
    .bind(params.recorded_at)
    .fetch_one(pool)
    .await
}
