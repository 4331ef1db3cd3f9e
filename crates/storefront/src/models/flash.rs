//! One-shot flash notices carried across a redirect in the session.
//!
//! The checkout contract requires exactly one user-visible notification per
//! confirmation attempt; notices are appended by handlers and drained by the
//! next rendered page.

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use super::session_keys;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
}

/// A transient user-visible notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    /// A success notice.
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    /// An error notice.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    /// CSS class for rendering.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.level {
            NoticeLevel::Success => "notice-success",
            NoticeLevel::Error => "notice-error",
            NoticeLevel::Info => "notice-info",
        }
    }
}

/// Append a notice for the next rendered page.
pub async fn push_notice(session: &Session, notice: Notice) {
    let mut pending: Vec<Notice> = session
        .get(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default();
    pending.push(notice);
    if let Err(e) = session.insert(session_keys::FLASH, &pending).await {
        tracing::warn!("failed to store flash notice: {e}");
    }
}

/// Drain all pending notices.
pub async fn take_notices(session: &Session) -> Vec<Notice> {
    session
        .remove::<Vec<Notice>>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}
