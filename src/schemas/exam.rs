use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;
use crate::db::models::ExamAttempt;
use crate::db::types::ViolationType;

#[derive(Debug, Deserialize)]
pub(crate) struct ViolationPayload {
    #[serde(alias = "violationType")]
    pub(crate) violation_type: ViolationType,
    #[serde(default = "default_violation_count")]
    pub(crate) count: i32,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

fn default_violation_count() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub(crate) struct AttemptSubmit {
    #[serde(alias = "correctAnswers")]
    pub(crate) correct_answers: i32,
    #[serde(alias = "totalQuestions")]
    pub(crate) total_questions: i32,
    #[serde(default)]
    #[serde(alias = "timeTakenSeconds")]
    pub(crate) time_taken_seconds: Option<i32>,
    #[serde(default)]
    pub(crate) violations: Vec<ViolationPayload>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AttemptResponse {
    pub(crate) id: String,
    pub(crate) course_access_id: String,
    pub(crate) is_submitted: bool,
    pub(crate) is_passed: bool,
    pub(crate) score_percentage: f64,
    pub(crate) correct_answers: i32,
    pub(crate) total_questions: i32,
    pub(crate) time_taken_seconds: Option<i32>,
    pub(crate) submitted_at: Option<String>,
    pub(crate) has_violations: bool,
    pub(crate) violation_count: i32,
    pub(crate) created_at: String,
}

impl AttemptResponse {
    pub(crate) fn from_db(attempt: ExamAttempt) -> Self {
        Self {
            id: attempt.id,
            course_access_id: attempt.course_access_id,
            is_submitted: attempt.is_submitted,
            is_passed: attempt.is_passed,
            score_percentage: attempt.score_percentage,
            correct_answers: attempt.correct_answers,
            total_questions: attempt.total_questions,
            time_taken_seconds: attempt.time_taken_seconds,
            submitted_at: attempt.submitted_at.map(format_primitive),
            has_violations: attempt.has_violations,
            violation_count: attempt.violation_count,
            created_at: format_primitive(attempt.created_at),
        }
    }
}
