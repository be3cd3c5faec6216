use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{PaymentStatus, ViolationType};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct User {
    pub(crate) id: String,
    pub(crate) email: String,
    pub(crate) username: String,
    pub(crate) full_name: String,
    pub(crate) phone: Option<String>,
    pub(crate) hashed_password: String,
    pub(crate) is_admin: bool,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct Course {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) price_cents: i64,
    pub(crate) duration_days: Option<i32>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CoursePayment {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) gateway_order_id: String,
    pub(crate) gateway_payment_id: Option<String>,
    pub(crate) amount_cents: i64,
    pub(crate) status: PaymentStatus,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

/// A grant of course access, created when a checkout completes. The
/// enrollment ("joined") date is `created_at`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct CourseAccess {
    pub(crate) id: String,
    pub(crate) user_id: String,
    pub(crate) course_id: String,
    pub(crate) payment_id: Option<String>,
    pub(crate) created_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamAttempt {
    pub(crate) id: String,
    pub(crate) course_access_id: String,
    pub(crate) is_submitted: bool,
    pub(crate) is_passed: bool,
    pub(crate) score_percentage: f64,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) time_taken_seconds: Option<i32>,
    pub(crate) submitted_at: Option<PrimitiveDateTime>,
    pub(crate) has_violations: bool,
    pub(crate) violation_count: i32,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamViolation {
    pub(crate) id: String,
    pub(crate) attempt_id: String,
    pub(crate) violation_type: ViolationType,
    pub(crate) violation_count: i32,
    pub(crate) description: Option<String>,
    pub(crate) recorded_at: PrimitiveDateTime,
}

/// Certificate record: a point-in-time snapshot of a passing exam attempt.
/// Snapshot columns are only rewritten by a forced re-derivation; ordinary
/// admin writes touch `certificate_file`, `admin_notes` and `is_active`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub(crate) struct ExamCertificate {
    pub(crate) id: String,
    pub(crate) exam_attempt_id: String,
    pub(crate) student_name: String,
    pub(crate) student_email: String,
    pub(crate) student_phone: Option<String>,
    pub(crate) course_name: String,
    pub(crate) course_duration_days: i32,
    pub(crate) course_duration_months: f64,
    pub(crate) purchased_date: PrimitiveDateTime,
    pub(crate) joined_date: PrimitiveDateTime,
    pub(crate) exam_score_percentage: f64,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) exam_duration_taken_minutes: i32,
    pub(crate) exam_submitted_date: PrimitiveDateTime,
    pub(crate) has_violations: bool,
    pub(crate) violation_count: i32,
    pub(crate) violation_details: Option<String>,
    pub(crate) certificate_file: Option<String>,
    pub(crate) certificate_uploaded_date: Option<PrimitiveDateTime>,
    pub(crate) admin_notes: Option<String>,
    pub(crate) is_active: bool,
    pub(crate) created_at: PrimitiveDateTime,
    pub(crate) updated_at: PrimitiveDateTime,
}
