use sqlx::PgPool;
use sqlx::{Postgres, QueryBuilder};
use time::PrimitiveDateTime;

use crate::db::models::ExamCertificate;

pub(crate) const COLUMNS: &str = "\
    id, exam_attempt_id, student_name, student_email, student_phone, \
    course_name, course_duration_days, course_duration_months, \
    purchased_date, joined_date, exam_score_percentage, correct_answers, \
    total_questions, exam_duration_taken_minutes, exam_submitted_date, \
    has_violations, violation_count, violation_details, certificate_file, \
    certificate_uploaded_date, admin_notes, is_active, created_at, updated_at";

/// Snapshot columns written at derivation time. Artifact, notes, active
/// flag and the upload timestamp are never part of this set.
pub(crate) struct CertificateData {
    pub student_name: String,
    pub student_email: String,
    pub student_phone: Option<String>,
    pub course_name: String,
    pub course_duration_days: i32,
    pub course_duration_months: f64,
    pub purchased_date: PrimitiveDateTime,
    pub joined_date: PrimitiveDateTime,
    pub exam_score_percentage: f64,
    pub correct_answers: i32,
    pub total_questions: i32,
    pub exam_duration_taken_minutes: i32,
    pub exam_submitted_date: PrimitiveDateTime,
    pub has_violations: bool,
    pub violation_count: i32,
    pub violation_details: Option<String>,
}

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<ExamCertificate>, sqlx::Error> {
    sqlx::query_as::<_, ExamCertificate>(&format!(
        "SELECT {COLUMNS} FROM exam_certificates WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub(crate) async fn exists_for_attempt(
    pool: &PgPool,
    attempt_id: &str,
) -> Result<Option<String>, sqlx::Error> {
    sqlx::query_scalar::<_, String>(
        "SELECT id FROM exam_certificates WHERE exam_attempt_id = $1",
    )
    .bind(attempt_id)
    .fetch_optional(pool)
    .await
}

/// Strict create: the unique constraint on `exam_attempt_id` decides.
/// Returns `None` when a record already exists (including when a
/// concurrent writer won the insert race).
pub(crate) async fn create_if_absent(
    pool: &PgPool,
    id: &str,
    attempt_id: &str,
    data: &CertificateData,
    now: PrimitiveDateTime,
) -> Result<Option<ExamCertificate>, sqlx::Error> {
    sqlx::query_as::<_, ExamCertificate>(&format!(
        "INSERT INTO exam_certificates (
            id, exam_attempt_id, student_name, student_email, student_phone,
            course_name, course_duration_days, course_duration_months,
            purchased_date, joined_date, exam_score_percentage, correct_answers,
            total_questions, exam_duration_taken_minutes, exam_submitted_date,
            has_violations, violation_count, violation_details,
            certificate_file, certificate_uploaded_date, admin_notes, is_active,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,
                  NULL,NULL,NULL,TRUE,$19,$19)
        ON CONFLICT (exam_attempt_id) DO NOTHING
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(attempt_id)
    .bind(&data.student_name)
    .bind(&data.student_email)
    .bind(&data.student_phone)
    .bind(&data.course_name)
    .bind(data.course_duration_days)
    .bind(data.course_duration_months)
    .bind(data.purchased_date)
    .bind(data.joined_date)
    .bind(data.exam_score_percentage)
    .bind(data.correct_answers)
    .bind(data.total_questions)
    .bind(data.exam_duration_taken_minutes)
    .bind(data.exam_submitted_date)
    .bind(data.has_violations)
    .bind(data.violation_count)
    .bind(&data.violation_details)
    .bind(now)
    .fetch_optional(pool)
    .await
}

/// Insert-or-rederive: on conflict only the snapshot columns are
/// overwritten; artifact, notes, active flag and upload timestamp stay.
/// Inserted rows carry the `created_at` bound here, updated rows keep
/// their own, which is how the `created` flag is derived.
pub(crate) async fn upsert(
    pool: &PgPool,
    id: &str,
    attempt_id: &str,
    data: &CertificateData,
    now: PrimitiveDateTime,
) -> Result<(ExamCertificate, bool), sqlx::Error> {
    let record = sqlx::query_as::<_, ExamCertificate>(&format!(
        "INSERT INTO exam_certificates (
            id, exam_attempt_id, student_name, student_email, student_phone,
            course_name, course_duration_days, course_duration_months,
            purchased_date, joined_date, exam_score_percentage, correct_answers,
            total_questions, exam_duration_taken_minutes, exam_submitted_date,
            has_violations, violation_count, violation_details,
            certificate_file, certificate_uploaded_date, admin_notes, is_active,
            created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15,$16,$17,$18,
                  NULL,NULL,NULL,TRUE,$19,$19)
        ON CONFLICT (exam_attempt_id) DO UPDATE SET
            student_name = EXCLUDED.student_name,
            student_email = EXCLUDED.student_email,
            student_phone = EXCLUDED.student_phone,
            course_name = EXCLUDED.course_name,
            course_duration_days = EXCLUDED.course_duration_days,
            course_duration_months = EXCLUDED.course_duration_months,
            purchased_date = EXCLUDED.purchased_date,
            joined_date = EXCLUDED.joined_date,
            exam_score_percentage = EXCLUDED.exam_score_percentage,
            correct_answers = EXCLUDED.correct_answers,
            total_questions = EXCLUDED.total_questions,
            exam_duration_taken_minutes = EXCLUDED.exam_duration_taken_minutes,
            exam_submitted_date = EXCLUDED.exam_submitted_date,
            has_violations = EXCLUDED.has_violations,
            violation_count = EXCLUDED.violation_count,
            violation_details = EXCLUDED.violation_details,
            updated_at = EXCLUDED.updated_at
        RETURNING {COLUMNS}",
    ))
    .bind(id)
    .bind(attempt_id)
    .bind(&data.student_name)
    .bind(&data.student_email)
    .bind(&data.student_phone)
    .bind(&data.course_name)
    .bind(data.course_duration_days)
    .bind(data.course_duration_months)
    .bind(data.purchased_date)
    .bind(data.joined_date)
    .bind(data.exam_score_percentage)
    .bind(data.correct_answers)
    .bind(data.total_questions)
    .bind(data.exam_duration_taken_minutes)
    .bind(data.exam_submitted_date)
    .bind(data.has_violations)
    .bind(data.violation_count)
    .bind(&data.violation_details)
    .bind(now)
    .fetch_one(pool)
    .await?;

    let created = record.created_at == now;
    Ok((record, created))
}

/// Active certificates owned by the user through the access grant,
/// newest submission first.
pub(crate) async fn list_for_user(
    pool: &PgPool,
    user_id: &str,
) -> Result<Vec<ExamCertificate>, sqlx::Error> {
    sqlx::query_as::<_, ExamCertificate>(&format!(
        "SELECT {columns}
         FROM exam_certificates ec
         JOIN exam_attempts a ON a.id = ec.exam_attempt_id
         JOIN course_access ca ON ca.id = a.course_access_id
         WHERE ca.user_id = $1 AND ec.is_active = TRUE
         ORDER BY ec.exam_submitted_date DESC",
        columns = prefixed_columns("ec"),
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
}

/// True when the certificate's owning access grant belongs to the user.
pub(crate) async fn is_owned_by_user(
    pool: &PgPool,
    certificate_id: &str,
    user_id: &str,
) -> Result<bool, sqlx::Error> {
    let found: Option<i32> = sqlx::query_scalar(
        "SELECT 1
         FROM exam_certificates ec
         JOIN exam_attempts a ON a.id = ec.exam_attempt_id
         JOIN course_access ca ON ca.id = a.course_access_id
         WHERE ec.id = $1 AND ca.user_id = $2",
    )
    .bind(certificate_id)
    .bind(user_id)
    .fetch_optional(pool)
    .await?;
    Ok(found.is_some())
}

#[derive(Debug, Default)]
pub(crate) struct CertificateListFilter<'a> {
    pub query: Option<&'a str>,
    pub is_active: Option<bool>,
    pub has_violations: Option<bool>,
    pub has_file: Option<bool>,
}

/// Admin listing: case-insensitive substring search over student name,
/// email and course name, OR-combined, plus the list-view filters.
pub(crate) async fn list_filtered(
    pool: &PgPool,
    filter: &CertificateListFilter<'_>,
    skip: i64,
    limit: i64,
) -> Result<Vec<ExamCertificate>, sqlx::Error> {
    let mut builder =
        QueryBuilder::<Postgres>::new(format!("SELECT {COLUMNS} FROM exam_certificates WHERE 1=1"));

    if let Some(query) = filter.query {
        let pattern = format!("%{query}%");
        builder.push(" AND (student_name ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR student_email ILIKE ");
        builder.push_bind(pattern.clone());
        builder.push(" OR course_name ILIKE ");
        builder.push_bind(pattern);
        builder.push(")");
    }

    if let Some(is_active) = filter.is_active {
        builder.push(" AND is_active = ");
        builder.push_bind(is_active);
    }

    if let Some(has_violations) = filter.has_violations {
        builder.push(" AND has_violations = ");
        builder.push_bind(has_violations);
    }

    if let Some(has_file) = filter.has_file {
        if has_file {
            builder.push(" AND certificate_file IS NOT NULL");
        } else {
            builder.push(" AND certificate_file IS NULL");
        }
    }

    builder.push(" ORDER BY exam_submitted_date DESC OFFSET ");
    builder.push_bind(skip.max(0));
    builder.push(" LIMIT ");
    builder.push_bind(limit.clamp(1, 1000));

    builder.build_query_as::<ExamCertificate>().fetch_all(pool).await
}

pub(crate) async fn list_by_ids(
    pool: &PgPool,
    ids: &[String],
) -> Result<Vec<ExamCertificate>, sqlx::Error> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, ExamCertificate>(&format!(
        "SELECT {COLUMNS} FROM exam_certificates WHERE id = ANY($1)
         ORDER BY exam_submitted_date DESC"
    ))
    .bind(ids)
    .fetch_all(pool)
    .await
}

pub(crate) async fn list_all(pool: &PgPool) -> Result<Vec<ExamCertificate>, sqlx::Error> {
    sqlx::query_as::<_, ExamCertificate>(&format!(
        "SELECT {COLUMNS} FROM exam_certificates ORDER BY exam_submitted_date DESC"
    ))
    .fetch_all(pool)
    .await
}

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct CertificateStatsRow {
    pub(crate) total: i64,
    pub(crate) with_file: i64,
    pub(crate) with_violations: i64,
    pub(crate) average_score: Option<f64>,
}

pub(crate) async fn stats(pool: &PgPool) -> Result<CertificateStatsRow, sqlx::Error> {
    sqlx::query_as::<_, CertificateStatsRow>(
        "SELECT COUNT(*) AS total,
                COUNT(certificate_file) AS with_file,
                COUNT(*) FILTER (WHERE has_violations) AS with_violations,
                AVG(exam_score_percentage) AS average_score
         FROM exam_certificates",
    )
    .fetch_one(pool)
    .await
}

/// Attaches the artifact. The upload timestamp is set only the first time
/// a file lands; replacing the file keeps the original date.
pub(crate) async fn set_artifact(
    pool: &PgPool,
    id: &str,
    file_key: &str,
    now: PrimitiveDateTime,
) -> Result<ExamCertificate, sqlx::Error> {
    sqlx::query_as::<_, ExamCertificate>(&format!(
        "UPDATE exam_certificates SET
            certificate_file = $1,
            certificate_uploaded_date = COALESCE(certificate_uploaded_date, $2),
            updated_at = $2
         WHERE id = $3
         RETURNING {COLUMNS}",
    ))
    .bind(file_key)
    .bind(now)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) struct UpdateAdminFields {
    pub admin_notes: Option<String>,
    pub is_active: Option<bool>,
    pub updated_at: PrimitiveDateTime,
}

pub(crate) async fn update_admin_fields(
    pool: &PgPool,
    id: &str,
    params: UpdateAdminFields,
) -> Result<ExamCertificate, sqlx::Error> {
    sqlx::query_as::<_, ExamCertificate>(&format!(
        "UPDATE exam_certificates SET
            admin_notes = COALESCE($1, admin_notes),
            is_active = COALESCE($2, is_active),
            updated_at = $3
         WHERE id = $4
         RETURNING {COLUMNS}",
    ))
    .bind(params.admin_notes)
    .bind(params.is_active)
    .bind(params.updated_at)
    .bind(id)
    .fetch_one(pool)
    .await
}

pub(crate) async fn delete_all(pool: &PgPool) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM exam_certificates").execute(pool).await?;
    Ok(result.rows_affected())
}

fn prefixed_columns(alias: &str) -> String {
    COLUMNS
        .split(", ")
        .map(|column| format!("{alias}.{}", column.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::test_support;

    fn sample_data(now: PrimitiveDateTime) -> CertificateData {
        CertificateData {
            student_name: "Test Student".to_string(),
            student_email: "upsert-flag@example.com".to_string(),
            student_phone: None,
            course_name: "Test Course".to_string(),
            course_duration_days: 45,
            course_duration_months: 1.5,
            purchased_date: now,
            joined_date: now,
            exam_score_percentage: 95.0,
            correct_answers: 19,
            total_questions: 20,
            exam_duration_taken_minutes: 25,
            exam_submitted_date: now,
            has_violations: false,
            violation_count: 0,
            violation_details: None,
        }
    }

    #[tokio::test]
    async fn upsert_reports_created_only_for_new_rows() {
        let Some(pool) = test_support::try_pool().await else {
            return;
        };

        let tag = "upsert-flag";
        test_support::remove_attempt_chain(&pool, tag).await.expect("pre-clean");
        let attempt_id = test_support::seed_attempt_chain(&pool, tag).await.expect("seed");

        let now = primitive_now_utc();
        let data = sample_data(now);

        let (first, created) =
            upsert(&pool, "cert-upsert-a", &attempt_id, &data, now).await.expect("first upsert");
        assert!(created, "fresh insert must be reported as created");

        // Distinct timestamp for the second write.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let again = primitive_now_utc();
        let (second, created) =
            upsert(&pool, "cert-upsert-b", &attempt_id, &data, again).await.expect("second upsert");
        assert!(!created, "existing row must be reported as updated");
        assert_eq!(second.id, first.id, "update keeps the original row");

        let absent = create_if_absent(&pool, "cert-upsert-c", &attempt_id, &data, again)
            .await
            .expect("create_if_absent");
        assert!(absent.is_none(), "strict create must not duplicate");

        test_support::remove_attempt_chain(&pool, tag).await.expect("clean");
    }
}
