use serde::{Deserialize, Serialize};

use crate::core::time::format_primitive;

#[derive(Debug, Deserialize)]
pub(crate) struct CourseCreate {
    pub(crate) slug: String,
    pub(crate) name: String,
    #[serde(default)]
    pub(crate) description: Option<String>,
    #[serde(alias = "priceCents")]
    pub(crate) price_cents: i64,
    #[serde(default)]
    #[serde(alias = "durationDays")]
    pub(crate) duration_days: Option<i32>,
    #[serde(default = "default_true")]
    #[serde(alias = "isActive")]
    pub(crate) is_active: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub(crate) struct CourseResponse {
    pub(crate) id: String,
    pub(crate) slug: String,
    pub(crate) name: String,
    pub(crate) description: Option<String>,
    pub(crate) price_cents: i64,
    pub(crate) duration_days: Option<i32>,
    pub(crate) is_active: bool,
    pub(crate) created_at: String,
}

impl CourseResponse {
    pub(crate) fn from_db(course: crate::db::models::Course) -> Self {
        Self {
            id: course.id,
            slug: course.slug,
            name: course.name,
            description: course.description,
            price_cents: course.price_cents,
            duration_days: course.duration_days,
            is_active: course.is_active,
            created_at: format_primitive(course.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckoutResponse {
    pub(crate) payment_id: String,
    pub(crate) access_id: String,
    pub(crate) course_id: String,
    pub(crate) joined_at: String,
}
