//! Inbox queries for the notification rows the sink delivers.

use std::sync::Arc;

use mockable::Clock;
use uuid::Uuid;

use crate::domain::auth::AuthenticatedUser;
use crate::domain::error::{DomainResult, Error};
use crate::domain::notification::Notification;
use crate::domain::ports::{MarkReadOutcome, NotificationRepository};

pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    clock: Arc<dyn Clock>,
}

impl NotificationService {
    #[must_use]
    pub fn new(notifications: Arc<dyn NotificationRepository>, clock: Arc<dyn Clock>) -> Self {
        Self {
            notifications,
            clock,
        }
    }

    /// The caller's inbox, newest first.
    ///
    /// # Errors
    /// Store failures only.
    pub async fn list(&self, caller: &AuthenticatedUser) -> DomainResult<Vec<Notification>> {
        Ok(self.notifications.list_for_user(caller.id).await?)
    }

    /// Mark one of the caller's notifications read.
    ///
    /// # Errors
    /// `not_found` for unknown ids, `forbidden` for rows owned by someone
    /// else.
    pub async fn mark_read(&self, caller: &AuthenticatedUser, id: Uuid) -> DomainResult<()> {
        let now = self.clock.utc();
        match self.notifications.mark_read(id, caller.id, now).await? {
            MarkReadOutcome::Updated => Ok(()),
            MarkReadOutcome::Missing => Err(Error::not_found("notification not found")),
            MarkReadOutcome::NotOwner => {
                Err(Error::forbidden("notification belongs to another user"))
            }
        }
    }
}
