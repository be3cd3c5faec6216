use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::ExamCertificate;
use crate::services::certificate_export::certificate_status;

#[derive(Debug, Serialize)]
pub(crate) struct CertificateResponse {
    pub(crate) id: String,
    pub(crate) exam_attempt_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) student_phone: Option<String>,
    pub(crate) course_name: String,
    pub(crate) course_duration_days: i32,
    pub(crate) course_duration_months: f64,
    pub(crate) purchased_date: String,
    pub(crate) joined_date: String,
    pub(crate) exam_score_percentage: f64,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) exam_duration_taken_minutes: i32,
    pub(crate) exam_submitted_date: String,
    pub(crate) has_violations: bool,
    pub(crate) violation_count: i32,
    pub(crate) violation_details: Option<String>,
    /// "Uploaded" once an artifact is attached, "Pending" before.
    pub(crate) certificate_status: String,
    pub(crate) file_available: bool,
    pub(crate) certificate_uploaded_date: Option<String>,
    pub(crate) admin_notes: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
    pub(crate) updated_at: String,
}

impl CertificateResponse {
    pub(crate) fn from_db(record: ExamCertificate) -> Self {
        let status = certificate_status(&record).to_string();
        Self {
            id: record.id,
            exam_attempt_id: record.exam_attempt_id,
            student_name: record.student_name,
            student_email: record.student_email,
            student_phone: record.student_phone,
            course_name: record.course_name,
            course_duration_days: record.course_duration_days,
            course_duration_months: record.course_duration_months,
            purchased_date: format_primitive(record.purchased_date),
            joined_date: format_primitive(record.joined_date),
            exam_score_percentage: record.exam_score_percentage,
            correct_answers: record.correct_answers,
            total_questions: record.total_questions,
            exam_duration_taken_minutes: record.exam_duration_taken_minutes,
            exam_submitted_date: format_primitive(record.exam_submitted_date),
            has_violations: record.has_violations,
            violation_count: record.violation_count,
            violation_details: record.violation_details,
            certificate_status: status,
            file_available: record.certificate_file.is_some(),
            certificate_uploaded_date: record.certificate_uploaded_date.map(format_primitive),
            admin_notes: record.admin_notes,
            is_active: record.is_active,
            created_at: format_primitive(record.created_at),
            updated_at: format_primitive(record.updated_at),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CertificateListQuery {
    #[serde(default)]
    pub(crate) q: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
    #[serde(default)]
    #[serde(alias = "hasViolations")]
    pub(crate) has_violations: Option<bool>,
    #[serde(default)]
    #[serde(alias = "hasFile")]
    pub(crate) has_file: Option<bool>,
    #[serde(default)]
    pub(crate) skip: Option<i64>,
    #[serde(default)]
    pub(crate) limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CertificateAdminUpdate {
    #[serde(default)]
    #[serde(alias = "adminNotes")]
    pub(crate) admin_notes: Option<String>,
    #[serde(default)]
    #[serde(alias = "isActive")]
    pub(crate) is_active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CertificateStatsResponse {
    pub(crate) total_certificates: i64,
    pub(crate) with_file: i64,
    pub(crate) without_file: i64,
    pub(crate) with_violations: i64,
    pub(crate) average_score: f64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExportQuery {
    /// Restrict the export to these certificate ids; everything when
    /// omitted.
    #[serde(default)]
    pub(crate) ids: Option<String>,
    /// Include the violation columns. Defaults to true.
    #[serde(default = "default_include_violations", alias = "includeViolations")]
    pub(crate) include_violations: bool,
}

fn default_include_violations() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReconcileRequest {
    #[serde(default)]
    #[serde(alias = "courseId")]
    pub(crate) course_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "userId")]
    pub(crate) user_id: Option<String>,
    #[serde(default)]
    #[serde(alias = "forceUpdate")]
    pub(crate) force_update: bool,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReconcileFailureResponse {
    pub(crate) attempt_id: String,
    pub(crate) message: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ReconcileResponse {
    pub(crate) eligible: u64,
    pub(crate) created: u64,
    pub(crate) updated: u64,
    pub(crate) skipped: u64,
    pub(crate) failures: Vec<ReconcileFailureResponse>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CertificateFileResponse {
    pub(crate) id: String,
    pub(crate) certificate_status: String,
    pub(crate) certificate_uploaded_date: Option<String>,
    pub(crate) size_bytes: i64,
    pub(crate) sha256: String,
}
