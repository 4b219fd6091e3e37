//! Tool status vocabulary.

use crate::models::payload::ToolStatus;

/// Map a vendor status string onto the shared [`ToolStatus`] set.
///
/// Unknown values are treated as still running so a call is never closed
/// on a status nobody understood.
#[must_use]
pub fn normalize_status(raw: &str) -> ToolStatus {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" | "queued" => ToolStatus::Pending,
        "pending_permission" | "awaiting_permission" => ToolStatus::PendingPermission,
        "completed" | "complete" | "success" | "succeeded" | "done" => ToolStatus::Complete,
        "failed" | "error" | "errored" => ToolStatus::Error,
        "cancelled" | "canceled" | "aborted" | "rejected" | "interrupted" => {
            ToolStatus::Cancelled
        }
        _ => ToolStatus::Running,
    }
}
