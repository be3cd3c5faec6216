use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use crate::api::errors::ApiError;
use crate::api::guards::CurrentUser;
use crate::core::state::AppState;
use crate::db::models::ExamCertificate;
use crate::repositories;
use crate::schemas::certificate::CertificateResponse;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/mine", get(my_certificates))
        .route("/:certificate_id/download", get(download_certificate))
}

async fn my_certificates(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<Vec<CertificateResponse>>, ApiError> {
    let records = repositories::certificates::list_for_user(state.db(), &user.id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to list certificates"))?;

    Ok(Json(records.into_iter().map(CertificateResponse::from_db).collect()))
}

async fn download_certificate(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(certificate_id): Path<String>,
) -> Result<Response, ApiError> {
    let record = repositories::certificates::find_by_id(state.db(), &certificate_id)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to load certificate"))?
        .ok_or_else(|| ApiError::NotFound("Certificate not found".to_string()))?;

    if !user.is_admin {
        let owned =
            repositories::certificates::is_owned_by_user(state.db(), &record.id, &user.id)
                .await
                .map_err(|e| ApiError::internal(e, "Failed to check certificate ownership"))?;
        check_download_access(owned, record.is_active)?;
    }

    serve_certificate_file(&state, &record).await
}

/// A stranger gets a 403; the owner of a deactivated certificate gets the
/// same 404 as a nonexistent one, so deactivation does not leak.
fn check_download_access(owned: bool, is_active: bool) -> Result<(), ApiError> {
    if !owned {
        return Err(ApiError::Forbidden("Not allowed to download this certificate"));
    }
    if !is_active {
        return Err(ApiError::NotFound("Certificate not found".to_string()));
    }
    Ok(())
}

pub(crate) async fn serve_certificate_file(
    state: &AppState,
    record: &ExamCertificate,
) -> Result<Response, ApiError> {
    // Distinct from the missing-record 404: the record exists but no
    // artifact has been uploaded for it.
    let Some(file_key) = record.certificate_file.as_deref() else {
        return Err(ApiError::NotFound("Certificate file is not available yet".to_string()));
    };

    let storage = state
        .storage()
        .ok_or_else(|| ApiError::ServiceUnavailable("File storage is not configured".to_string()))?;

    let bytes = storage
        .download_bytes(file_key)
        .await
        .map_err(|e| ApiError::internal(e, "Failed to fetch certificate file"))?;

    let extension = file_extension(file_key);
    let filename = download_filename(&record.student_name, &record.id, extension);
    let disposition = format!("attachment; filename=\"{filename}\"");

    Ok((
        [
            (header::CONTENT_TYPE, content_type_for(extension).to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

fn file_extension(key: &str) -> &str {
    key.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("pdf")
}

fn content_type_for(extension: &str) -> &'static str {
    match extension.to_ascii_lowercase().as_str() {
        "pdf" => "application/pdf",
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        _ => "application/octet-stream",
    }
}

/// `<student_name>_certificate_<id>.<ext>` with the name reduced to a
/// filesystem-safe form.
fn download_filename(student_name: &str, certificate_id: &str, extension: &str) -> String {
    let safe_name: String = student_name
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();
    let safe_name = safe_name.trim_matches('_');
    let safe_name = if safe_name.is_empty() { "student" } else { safe_name };
    format!("{safe_name}_certificate_{certificate_id}.{extension}")
}

#[cfg(test)]
mod tests {
    use super::{check_download_access, content_type_for, download_filename, file_extension};
    use crate::api::errors::ApiError;

    #[test]
    fn owner_of_active_certificate_may_download() {
        assert!(check_download_access(true, true).is_ok());
    }

    #[test]
    fn non_owner_is_forbidden() {
        assert!(matches!(check_download_access(false, true), Err(ApiError::Forbidden(_))));
        assert!(matches!(check_download_access(false, false), Err(ApiError::Forbidden(_))));
    }

    #[test]
    fn deactivated_certificate_reads_as_missing_to_its_owner() {
        assert!(matches!(check_download_access(true, false), Err(ApiError::NotFound(_))));
    }

    #[test]
    fn filename_replaces_unsafe_characters() {
        assert_eq!(
            download_filename("Aruzhan Bekova", "cert-1", "pdf"),
            "Aruzhan_Bekova_certificate_cert-1.pdf"
        );
        assert_eq!(download_filename("  ", "cert-2", "png"), "student_certificate_cert-2.png");
    }

    #[test]
    fn extension_defaults_to_pdf() {
        assert_eq!(file_extension("certificates/abc.PNG"), "PNG");
        assert_eq!(file_extension("certificates/no-extension"), "pdf");
    }

    #[test]
    fn content_types_cover_allowed_extensions() {
        assert_eq!(content_type_for("pdf"), "application/pdf");
        assert_eq!(content_type_for("JPG"), "image/jpeg");
        assert_eq!(content_type_for("png"), "image/png");
        assert_eq!(content_type_for("exe"), "application/octet-stream");
    }
}
