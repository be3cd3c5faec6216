use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories;
use crate::schemas::exam::{AttemptResponse, AttemptSubmit};
use crate::services::attempt_finalize::{self, FinalizeInput, ViolationReport};

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/:course_id/attempts", post(start_attempt))
        .route("/attempts/:attempt_id/submit", post(submit_attempt))
}

async fn start_attempt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(course_id): Path<String>,
) -> Result<(StatusCode, Json<AttemptResponse>), ApiError> {
    let access =
        repositories::course_access::find_for_user_course(state.db(), &user.id, &course_id)
            .await
            .map_err(|e| ApiError::internal(e, "Failed to check course access"))?
            .ok_or(ApiError::Forbidden("Course access required to take the exam"))?;

    let attempt = repositories::exam_attempts::create(
        state.db(),
        repositories::exam_attempts::CreateAttempt {
            id: &Uuid::new_v4().to_string(),
            course_access_id: &access.id,
            created_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to create exam attempt"))?;

    Ok((StatusCode::CREATED, Json(AttemptResponse::from_db(attempt))))
}

async fn submit_attempt(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(attempt_id): Path<String>,
    Json(payload): Json<AttemptSubmit>,
) -> Result<Json<AttemptResponse>, ApiError> {
    if payload.total_questions <= 0 {
        return Err(ApiError::BadRequest("total_questions must be positive".to_string()));
    }
    if payload.correct_answers < 0 || payload.correct_answers > payload.total_questions {
        return Err(ApiError::BadRequest(
            "correct_answers must be between 0 and total_questions".to_string(),
        ));
    }

    let attempt = repositories::exam_attempts::find_by_id(state.db(), &attempt_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load exam attempt"))?
        .ok_or_else(|| ApiError::NotFound("Exam attempt not found".to_string()))?;

    let access = repositories::course_access::find_by_id(state.db(), &attempt.course_access_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to check course access"))?
        .ok_or_else(|| ApiError::NotFound("Course access not found".to_string()))?;

    if access.user_id != user.id {
        return Err(ApiError::Forbidden("Attempt belongs to another student"));
    }

    if attempt.is_submitted {
        return Err(ApiError::Conflict("Attempt has already been submitted".to_string()));
    }

    let input = FinalizeInput {
        correct_answers: payload.correct_answers,
        total_questions: payload.total_questions,
        time_taken_seconds: payload.time_taken_seconds,
        violations: payload
            .violations
            .into_iter()
            .map(|violation| ViolationReport {
                violation_type: violation.violation_type,
                count: violation.count,
                description: violation.description,
            })
            .collect(),
    };

    let attempt = attempt_finalize::finalize_attempt(&state, &attempt_id, input)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to submit exam attempt"))?;

    Ok(Json(AttemptResponse::from_db(attempt)))
}
