use sqlx::PgPool;

use crate::db::models::CourseAccess;

const COLUMNS: &str = "id, user_id, course_id, payment_id, created_at";

pub(crate) async fn find_by_id(
    pool: &PgPool,
    id: &str,
) -> Result<Option<CourseAccess>, sqlx::Error> {
    sqlx::query_as::<_, CourseAccess>(&format!("SELECT {COLUMNS} FROM course_access WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await
}

pub(crate) async fn find_for_user_course(
    pool: &PgPool,
    user_id: &str,
    course_id: &str,
) -> Result<Option<CourseAccess>, sqlx::Error> {
    sqlx::query_as::<_, CourseAccess>(&format!(
        "SELECT {COLUMNS} FROM course_access WHERE user_id = $1 AND course_id = $2"
    ))
    .bind(user_id)
    .bind(course_id)
    .fetch_optional(pool)
    .await
}

pub(crate) struct CreateAccess<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub course_id: &'a str,
    pub payment_id: Option<&'a str>,
    pub created_at: time::PrimitiveDateTime,
}

/// Grants access, keeping the original grant (and its enrollment date) if
/// one already exists for this user and course.
pub(crate) async fn create_if_absent(
    pool: &PgPool,
    params: CreateAccess<'_>,
) -> Result<CourseAccess, sqlx::Error> {
    sqlx::query_as::<_, CourseAccess>(&format!(
        "INSERT INTO course_access (id, user_id, course_id, payment_id, created_at)
         VALUES ($1,$2,$3,$4,$5)
         ON CONFLICT (user_id, course_id) DO UPDATE SET user_id = EXCLUDED.user_id
         RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(params.payment_id)
    .bind(params.created_at)
    .fetch_one(pool)
    .await
}
