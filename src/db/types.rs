use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "paymentstatus", rename_all = "lowercase")]
pub(crate) enum PaymentStatus {
    Created,
    Paid,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "violationtype", rename_all = "snake_case")]
pub(crate) enum ViolationType {
    TabSwitch,
    WindowBlur,
    CopyPaste,
    FullscreenExit,
    Other,
}

impl ViolationType {
    /// Human-readable label used in certificate snapshots and exports.
    pub(crate) fn label(self) -> &'static str {
        match self {
            ViolationType::TabSwitch => "Tab Switch",
            ViolationType::WindowBlur => "Window Blur",
            ViolationType::CopyPaste => "Copy Paste",
            ViolationType::FullscreenExit => "Fullscreen Exit",
            ViolationType::Other => "Other",
        }
    }
}
