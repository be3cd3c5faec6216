use axum::{
    extract::{Multipart, Path, Query, State},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::api::certificates::serve_certificate_file;
use crate::api::errors::ApiError;
use crate::api::guards::CurrentAdmin;
use crate::core::state::AppState;
use crate::core::time::primitive_now_utc;
use crate::repositories::certificates::{self, CertificateListFilter};
use crate::schemas::certificate::{
    CertificateAdminUpdate, CertificateFileResponse, CertificateListQuery, CertificateResponse,
    CertificateStatsResponse, ExportQuery, ReconcileFailureResponse, ReconcileRequest,
    ReconcileResponse,
};
use crate::services::certificate_export;
use crate::services::certificate_reconcile::{self, ReconcileOptions};

const DEFAULT_PAGE_SIZE: i64 = 50;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_certificates))
        .route("/stats", get(certificate_stats))
        .route("/export", get(export_certificates))
        .route("/reconcile", post(reconcile_certificates))
        .route("/:certificate_id", get(get_certificate).patch(update_certificate))
        .route("/:certificate_id/file", post(upload_certificate_file))
        .route("/:certificate_id/download", get(download_certificate))
}

async fn list_certificates(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<CertificateListQuery>,
) -> Result<Json<Vec<CertificateResponse>>, ApiError> {
    let filter = CertificateListFilter {
        query: query.q.as_deref().map(str::trim).filter(|q| !q.is_empty()),
        is_active: query.is_active,
        has_violations: query.has_violations,
        has_file: query.has_file,
    };

    let records = certificates::list_filtered(
        state.db(),
        &filter,
        query.skip.unwrap_or(0),
        query.limit.unwrap_or(DEFAULT_PAGE_SIZE),
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to list certificates"))?;

    Ok(Json(records.into_iter().map(CertificateResponse::from_db).collect()))
}

async fn certificate_stats(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
) -> Result<Json<CertificateStatsResponse>, ApiError> {
    let stats = certificates::stats(state.db())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to compute certificate stats"))?;

    let average = stats.average_score.unwrap_or(0.0);
    Ok(Json(CertificateStatsResponse {
        total_certificates: stats.total,
        with_file: stats.with_file,
        without_file: stats.total - stats.with_file,
        with_violations: stats.with_violations,
        average_score: (average * 100.0).round() / 100.0,
    }))
}

async fn get_certificate(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(certificate_id): Path<String>,
) -> Result<Json<CertificateResponse>, ApiError> {
    let record = fetch_certificate(&state, &certificate_id).await?;
    Ok(Json(CertificateResponse::from_db(record)))
}

async fn update_certificate(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(certificate_id): Path<String>,
    Json(payload): Json<CertificateAdminUpdate>,
) -> Result<Json<CertificateResponse>, ApiError> {
    fetch_certificate(&state, &certificate_id).await?;

    let record = certificates::update_admin_fields(
        state.db(),
        &certificate_id,
        certificates::UpdateAdminFields {
            admin_notes: payload.admin_notes,
            is_active: payload.is_active,
            updated_at: primitive_now_utc(),
        },
    )
    .await
    .map_err(|e| ApiError::internal(e, "Failed to update certificate"))?;

    Ok(Json(CertificateResponse::from_db(record)))
}

async fn upload_certificate_file(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(certificate_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<CertificateFileResponse>, ApiError> {
    fetch_certificate(&state, &certificate_id).await?;

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("File storage is not configured".to_string()))?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Invalid multipart payload: {e}")))?
    {
        if field.name() == Some("file") {
            let filename = field
                .file_name()
                .map(str::to_string)
                .ok_or_else(|| ApiError::BadRequest("File name is required".to_string()))?;
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
        }
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::BadRequest("Multipart field 'file' is required".to_string()));
    };

    let extension = filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .ok_or_else(|| ApiError::BadRequest("File must have an extension".to_string()))?;

    let allowed = &state.settings().storage().allowed_certificate_extensions;
    if !allowed.iter().any(|candidate| candidate == &extension) {
        return Err(ApiError::BadRequest(format!(
            "File type .{extension} is not allowed (expected one of: {})",
            allowed.join(", ")
        )));
    }

    let max_bytes = state.settings().storage().max_upload_size_mb * 1024 * 1024;
    if bytes.len() as u64 > max_bytes {
        return Err(ApiError::BadRequest(format!(
            "File exceeds the {} MB upload limit",
            state.settings().storage().max_upload_size_mb
        )));
    }

    let key = format!("certificates/{certificate_id}.{extension}");
    let content_type = match extension.as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    };

    let (size, sha256) = storage
        .upload_bytes(&key, content_type, bytes)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to store certificate file"))?;

    let record = certificates::set_artifact(state.db(), &certificate_id, &key, primitive_now_utc())
        .await
        .map_err(|e| ApiError::internal(e, "Failed to attach certificate file"))?;

    let status = certificate_export::certificate_status(&record).to_string();
    Ok(Json(CertificateFileResponse {
        id: record.id,
        certificate_status: status,
        certificate_uploaded_date: record
            .certificate_uploaded_date
            .map(crate::core::time::format_primitive),
        size_bytes: size,
        sha256,
    }))
}

async fn download_certificate(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Path(certificate_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = fetch_certificate(&state, &certificate_id).await?;
    serve_certificate_file(&state, &record).await
}

async fn export_certificates(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Query(query): Query<ExportQuery>,
) -> Result<Response, ApiError> {
    let records = match query.ids.as_deref().map(str::trim).filter(|ids| !ids.is_empty()) {
        Some(ids) => {
            let ids: Vec<String> =
                ids.split(',').map(str::trim).map(str::to_string).collect();
            certificates::list_by_ids(state.db(), &ids)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to load certificates for export"))?
        }
        None => certificates::list_all(state.db())
            .await
            .map_err(|e| ApiError::internal(e, "Failed to load certificates for export"))?,
    };

    let workbook = certificate_export::build_workbook(&records, query.include_violations)
        .map_err(|e| ApiError::internal(e, "Failed to build certificate export"))?;

    Ok((
        [
            (
                header::CONTENT_TYPE,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet".to_string(),
            ),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"certificates_export.xlsx\"".to_string(),
            ),
        ],
        workbook,
    )
        .into_response())
}

/// HTTP reconciliation never deletes; the destructive recreate path is
/// reserved for the CLI, behind an explicit confirmation.
async fn reconcile_certificates(
    State(state): State<AppState>,
    CurrentAdmin(_admin): CurrentAdmin,
    Json(payload): Json<ReconcileRequest>,
) -> Result<Json<ReconcileResponse>, ApiError> {
    let options = ReconcileOptions {
        course_id: payload.course_id,
        user_id: payload.user_id,
        force_update: payload.force_update,
        recreate: false,
    };

    let threshold = state.settings().certificate().pass_threshold;
    let stats = certificate_reconcile::reconcile(state.db(), threshold, &options)
        .await
        .map_err(|e| ApiError::internal(e, "Certificate reconciliation failed"))?;

    Ok(Json(ReconcileResponse {
        eligible: stats.eligible,
        created: stats.created,
        updated: stats.updated,
        skipped: stats.skipped,
        failures: stats
            .failures
            .into_iter()
            .map(|failure| ReconcileFailureResponse {
                attempt_id: failure.attempt_id,
                message: failure.message,
            })
            .collect(),
    }))
}

async fn fetch_certificate(
    state: &AppState,
    certificate_id: &str,
) -> Result<crate::db::models::ExamCertificate, ApiError> {
    certificates::find_by_id(state.db(), certificate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load certificate"))?
        .ok_or_else(|| ApiError::NotFound("Certificate not found".to_string()))
}
