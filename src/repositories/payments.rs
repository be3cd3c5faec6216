use sqlx::PgPool;

use crate::db::models::CoursePayment;
use crate::db::types::PaymentStatus;

const COLUMNS: &str = "\
    id, user_id, course_id, gateway_order_id, gateway_payment_id, \
    amount_cents, status, created_at, updated_at";

pub(crate) struct CreatePayment<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub course_id: &'a str,
    pub gateway_order_id: &'a str,
    pub gateway_payment_id: Option<&'a str>,
    pub amount_cents: i64,
    pub status: PaymentStatus,
    pub created_at: time::PrimitiveDateTime,
    pub updated_at: time::PrimitiveDateTime,
}

pub(crate) async fn create(
    pool: &PgPool,
    params: CreatePayment<'_>,
) -> Result<CoursePayment, sqlx::Error> {
    sqlx::query_as::<_, CoursePayment>(&format!(
        "INSERT INTO course_payments (
            id, user_id, course_id, gateway_order_id, gateway_payment_id,
            amount_cents, status, created_at, updated_at
        ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)
        RETURNING {COLUMNS}",
    ))
    .bind(params.id)
    .bind(params.user_id)
    .bind(params.course_id)
    .bind(params.gateway_order_id)
    .bind(params.gateway_payment_id)
    .bind(params.amount_cents)
    .bind(params.status)
    .bind(params.created_at)
    .bind(params.updated_at)
    .fetch_one(pool)
    .await
}
