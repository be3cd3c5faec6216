//! Schema smoke test. Runs only when COURSIVA_TEST_DATABASE_URL points at
//! a disposable Postgres database; skips silently otherwise so the suite
//! passes on machines without one.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

const TAG: &str = "smoke";

async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    let url = std::env::var("COURSIVA_TEST_DATABASE_URL").ok()?;
    match PgPoolOptions::new().max_connections(2).connect(&url).await {
        Ok(pool) => Some(pool),
        Err(err) => {
            eprintln!("skipping: cannot connect to test database: {err}");
            None
        }
    }
}

async fn cleanup(pool: &PgPool) {
    sqlx::query("DELETE FROM users WHERE id = $1")
        .bind(format!("user-{TAG}"))
        .execute(pool)
        .await
        .expect("cleanup users");
    sqlx::query("DELETE FROM courses WHERE id = $1")
        .bind(format!("course-{TAG}"))
        .execute(pool)
        .await
        .expect("cleanup courses");
}

/// Certificates hang off an attempt, which hangs off an access grant.
async fn seed_attempt(pool: &PgPool) -> String {
    sqlx::query(
        "INSERT INTO users (id, email, username, full_name, phone, hashed_password,
                            is_admin, is_active, created_at, updated_at)
         VALUES ($1, $2, $1, 'Smoke Test', NULL, 'x', FALSE, TRUE, now(), now())",
    )
    .bind(format!("user-{TAG}"))
    .bind(format!("{TAG}@example.com"))
    .execute(pool)
    .await
    .expect("seed user");

    sqlx::query(
        "INSERT INTO courses (id, slug, name, description, price_cents, duration_days,
                              is_active, created_at, updated_at)
         VALUES ($1, $1, 'Smoke Course', NULL, 10000, 30, TRUE, now(), now())",
    )
    .bind(format!("course-{TAG}"))
    .execute(pool)
    .await
    .expect("seed course");

    sqlx::query(
        "INSERT INTO course_access (id, user_id, course_id, payment_id, created_at)
         VALUES ($1, $2, $3, NULL, now())",
    )
    .bind(format!("access-{TAG}"))
    .bind(format!("user-{TAG}"))
    .bind(format!("course-{TAG}"))
    .execute(pool)
    .await
    .expect("seed access");

    let attempt_id = format!("attempt-{TAG}");
    sqlx::query(
        "INSERT INTO exam_attempts (id, course_access_id, is_submitted, is_passed,
                                    score_percentage, correct_answers, total_questions,
                                    time_taken_seconds, submitted_at, has_violations,
                                    violation_count, created_at, updated_at)
         VALUES ($1, $2, TRUE, TRUE, 95.0, 19, 20, 1500, now(), FALSE, 0, now(), now())",
    )
    .bind(&attempt_id)
    .bind(format!("access-{TAG}"))
    .execute(pool)
    .await
    .expect("seed attempt");

    attempt_id
}

#[tokio::test]
async fn migrations_apply_and_certificate_uniqueness_holds() {
    let Some(pool) = test_pool().await else {
        return;
    };

    sqlx::migrate!("./migrations").run(&pool).await.expect("migrations");

    cleanup(&pool).await;
    let attempt_id = seed_attempt(&pool).await;

    let insert = "INSERT INTO exam_certificates (
            id, exam_attempt_id, student_name, student_email,
            course_name, course_duration_days, course_duration_months,
            purchased_date, joined_date, exam_score_percentage,
            correct_answers, total_questions, exam_duration_taken_minutes,
            exam_submitted_date, has_violations, violation_count,
            is_active, created_at, updated_at
        ) VALUES ($1, $2, 'Smoke Test', 'smoke@example.com',
            'Smoke Course', 30, 1.0,
            now(), now(), 95.0,
            19, 20, 25,
            now(), FALSE, 0,
            TRUE, now(), now())
        ON CONFLICT (exam_attempt_id) DO NOTHING";

    for id in ["smoke-cert-a", "smoke-cert-b"] {
        sqlx::query(insert).bind(id).bind(&attempt_id).execute(&pool).await.expect("insert");
    }

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM exam_certificates WHERE exam_attempt_id = $1",
    )
    .bind(&attempt_id)
    .fetch_one(&pool)
    .await
    .expect("count");
    assert_eq!(count, 1, "one certificate per attempt");

    cleanup(&pool).await;
}
