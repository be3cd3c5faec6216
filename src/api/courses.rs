use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::{CurrentAdmin, CurrentUser};
use crate::core::state::AppState;
use crate::core::time::{format_primitive, primitive_now_utc};
use crate::db::types::PaymentStatus;
use crate::repositories;
use crate::schemas::course::{CheckoutResponse, CourseCreate, CourseResponse};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_courses).post(create_course))
        .route("/:slug", get(get_course))
        .route("/:slug/checkout", post(checkout))
}

async fn create_course(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Json(payload): Json<CourseCreate>,
) -> Result<(StatusCode, Json<CourseResponse>), ApiError> {
    if payload.slug.trim().is_empty() || payload.name.trim().is_empty() {
        return Err(ApiError::BadRequest("Slug and name must not be empty".to_string()));
    }
    if payload.price_cents < 0 {
        return Err(ApiError::BadRequest("Price must not be negative".to_string()));
    }

    let existing = repositories::courses::find_by_slug(state.db(), &payload.slug)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check existing course"))?;
    if existing.is_some() {
        return Err(ApiError::Conflict("Course with this slug already exists".to_string()));
    }

    let now = primitive_now_utc();
    let course = repositories::courses::create(
        state.db(),
        repositories::courses::CreateCourse {
            id: &Uuid::new_v4().to_string(),
            slug: &payload.slug,
            name: &payload.name,
            description: payload.description.as_deref(),
            price_cents: payload.price_cents,
            duration_days: payload.duration_days,
            is_active: payload.is_active,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create course"))?;

    Ok((StatusCode::CREATED, Json(CourseResponse::from_db(course))))
}

async fn list_courses(State(state): State<AppState>) -> Result<Json<Vec<CourseResponse>>, ApiError> {
    let courses = repositories::courses::list_active(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list courses"))?;

    Ok(Json(courses.into_iter().map(CourseResponse::from_db).collect()))
}

async fn get_course(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<CourseResponse>, ApiError> {
    let course = repositories::courses::find_by_slug(state.db(), &slug)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    Ok(Json(CourseResponse::from_db(course)))
}

/// Records the purchase and grants access in one step. Re-purchasing a
/// course keeps the original enrollment date.
async fn checkout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(slug): Path<String>,
) -> Result<(StatusCode, Json<CheckoutResponse>), ApiError> {
    let course = repositories::courses::find_by_slug(state.db(), &slug)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load course"))?
        .ok_or_else(|| ApiError::NotFound("Course not found".to_string()))?;

    if !course.is_active {
        return Err(ApiError::BadRequest("Course is not available for purchase".to_string()));
    }

    let now = primitive_now_utc();
    let payment = repositories::payments::create(
        state.db(),
        repositories::payments::CreatePayment {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            course_id: &course.id,
            gateway_order_id: &Uuid::new_v4().to_string(),
            gateway_payment_id: None,
            amount_cents: course.price_cents,
            status: PaymentStatus::Paid,
            created_at: now,
            updated_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to record payment"))?;

    let access = repositories::course_access::create_if_absent(
        state.db(),
        repositories::course_access::CreateAccess {
            id: &Uuid::new_v4().to_string(),
            user_id: &user.id,
            course_id: &course.id,
            payment_id: Some(&payment.id),
            created_at: now,
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to grant course access"))?;

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            payment_id: payment.id,
            access_id: access.id,
            course_id: course.id,
            joined_at: format_primitive(access.created_at),
        }),
    ))
}
