//! Inbox store port for persisted notifications.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::error::Error;
use crate::domain::notification::Notification;
use crate::domain::user::UserId;

/// Result of a mark-as-read attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    Updated,
    Missing,
    /// The row exists but belongs to another user.
    NotOwner,
}

/// Failures surfaced by inbox store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NotificationRepositoryError {
    #[error("inbox store connection failed: {0}")]
    Connection(String),
    #[error("inbox store query failed: {0}")]
    Query(String),
}

impl NotificationRepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

impl From<NotificationRepositoryError> for Error {
    fn from(err: NotificationRepositoryError) -> Self {
        match err {
            NotificationRepositoryError::Connection(_) => {
                Self::service_unavailable("inbox store is unavailable")
            }
            NotificationRepositoryError::Query(message) => {
                Self::internal(format!("inbox store query failed: {message}"))
            }
        }
    }
}

/// Persistence port for the notification inbox.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<(), NotificationRepositoryError>;

    /// All notifications for `user`, newest first.
    async fn list_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Notification>, NotificationRepositoryError>;

    /// Mark one notification read at `now`, refusing rows owned by someone
    /// else. Re-reading an already-read row keeps the original timestamp.
    async fn mark_read(
        &self,
        id: Uuid,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<MarkReadOutcome, NotificationRepositoryError>;
}
