use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Settings are loaded from process-wide environment variables, so tests
/// that touch them must serialize.
pub(crate) fn env_lock() -> MutexGuard<'static, ()> {
    static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    LOCK.get_or_init(|| Mutex::new(()))
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
}

#[allow(dead_code)]
pub(crate) fn set_test_env() {
    dotenvy::dotenv().ok();

    std::env::set_var("COURSIVA_ENV", "test");
    std::env::set_var("COURSIVA_STRICT_CONFIG", "0");
    std::env::set_var("SECRET_KEY", "test-secret");
    std::env::set_var("PROMETHEUS_ENABLED", "0");
    std::env::remove_var("S3_ENDPOINT");
    std::env::remove_var("S3_ACCESS_KEY");
    std::env::remove_var("S3_SECRET_KEY");
    std::env::remove_var("S3_BUCKET");
    std::env::remove_var("S3_REGION");
    std::env::set_var("AWS_EC2_METADATA_DISABLED", "true");
}

/// Pool against the disposable test database, or `None` so DB-backed
/// tests skip on machines without one.
pub(crate) async fn try_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let url = std::env::var("COURSIVA_TEST_DATABASE_URL").ok()?;
    let pool = match PgPoolOptions::new().max_connections(2).connect(&url).await {
        Ok(pool) => pool,
        Err(err) => {
            eprintln!("skipping: cannot connect to test database: {err}");
            return None;
        }
    };
    if let Err(err) = crate::db::run_migrations(&pool).await {
        eprintln!("skipping: cannot run migrations: {err}");
        return None;
    }
    Some(pool)
}

/// Inserts a user, course, access grant and submitted passing attempt,
/// returning the attempt id. Rows are keyed by `tag` so tests clean up
/// with [`remove_attempt_chain`].
pub(crate) async fn seed_attempt_chain(pool: &PgPool, tag: &str) -> sqlx::Result<String> {
    let now = crate::core::time::primitive_now_utc();

    sqlx::query(
        "INSERT INTO users (id, email, username, full_name, phone, hashed_password,
                            is_admin, is_active, created_at, updated_at)
         VALUES ($1, $2, $1, 'Test Student', NULL, 'x', FALSE, TRUE, $3, $3)",
    )
    .bind(format!("user-{tag}"))
    .bind(format!("{tag}@example.com"))
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO courses (id, slug, name, description, price_cents, duration_days,
                              is_active, created_at, updated_at)
         VALUES ($1, $1, 'Test Course', NULL, 10000, 45, TRUE, $2, $2)",
    )
    .bind(format!("course-{tag}"))
    .bind(now)
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO course_access (id, user_id, course_id, payment_id, created_at)
         VALUES ($1, $2, $3, NULL, $4)",
    )
    .bind(format!("access-{tag}"))
    .bind(format!("user-{tag}"))
    .bind(format!("course-{tag}"))
    .bind(now)
    .execute(pool)
    .await?;

    let attempt_id = format!("attempt-{tag}");
    sqlx::query(
        "INSERT INTO exam_attempts (id, course_access_id, is_submitted, is_passed,
                                    score_percentage, correct_answers, total_questions,
                                    time_taken_seconds, submitted_at, has_violations,
                                    violation_count, created_at, updated_at)
         VALUES ($1, $2, TRUE, TRUE, 95.0, 19, 20, 1500, $3, FALSE, 0, $3, $3)",
    )
    .bind(&attempt_id)
    .bind(format!("access-{tag}"))
    .bind(now)
    .execute(pool)
    .await?;

    Ok(attempt_id)
}

/// Deletes the seeded chain; certificates, attempts and grants cascade
/// from the user row.
pub(crate) async fn remove_attempt_chain(pool: &PgPool, tag: &str) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(format!("user-{tag}"))
        .execute(pool)
        .await?;
    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(format!("course-{tag}"))
        .execute(pool)
        .await?;
    Ok(())
}
