//! Permission request/response bridging.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;

/// One choice offered to the user for a permission request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PermissionOption {
    /// Identifier echoed back in [`PermissionResponse::option_id`].
    pub option_id: String,
    /// Label shown to the user.
    pub name: String,
    /// `allow_once`, `allow_always`, `reject_once` or `reject_always`.
    pub kind: String,
}

impl PermissionOption {
    /// Convenience constructor.
    #[must_use]
    pub fn new(option_id: &str, name: &str, kind: &str) -> Self {
        Self {
            option_id: option_id.to_owned(),
            name: name.to_owned(),
            kind: kind.to_owned(),
        }
    }

    /// Whether choosing this option rejects the action.
    #[must_use]
    pub fn is_reject(&self) -> bool {
        self.kind.starts_with("reject")
    }
}

/// A request for the user to approve an agent action.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PermissionRequest {
    pub session_id: String,
    /// Tool call the permission gates, when the protocol correlates one.
    pub tool_call_id: Option<String>,
    /// Protocol-level request id used to send the reply.
    pub pending_id: String,
    pub title: String,
    /// Coarse action category (`execute`, `edit`, `bash`, …).
    pub action_type: String,
    /// Raw details describing the action.
    pub action_details: Value,
    pub options: Vec<PermissionOption>,
}

/// The user's decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PermissionResponse {
    /// Chosen option; ignored when `cancelled` is set.
    pub option_id: String,
    /// The request was dismissed without a choice.
    pub cancelled: bool,
}

impl PermissionResponse {
    /// Select `option_id`.
    #[must_use]
    pub fn selected(option_id: impl Into<String>) -> Self {
        Self {
            option_id: option_id.into(),
            cancelled: false,
        }
    }

    /// Dismiss the request.
    #[must_use]
    pub fn cancelled() -> Self {
        Self {
            option_id: String::new(),
            cancelled: true,
        }
    }
}

/// Boxed future returned by a [`PermissionHandler`].
pub type PermissionFuture = Pin<Box<dyn Future<Output = Result<PermissionResponse>> + Send>>;

/// Callback that decides a permission request on the user's behalf.
pub type PermissionHandler = Arc<dyn Fn(PermissionRequest) -> PermissionFuture + Send + Sync>;

/// Decision used when no handler is registered: first option, or cancel when
/// nothing was offered.
#[must_use]
pub fn default_decision(options: &[PermissionOption]) -> PermissionResponse {
    options
        .first()
        .map_or_else(PermissionResponse::cancelled, |option| {
            PermissionResponse::selected(option.option_id.clone())
        })
}
