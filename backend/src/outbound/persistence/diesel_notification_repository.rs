//! Diesel PostgreSQL adapter for the notification inbox port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::Error as DieselError;
use diesel_async::RunQueryDsl;
use uuid::Uuid;

use super::diesel_error_mapping::{StoreFailure, classify_diesel, classify_pool};
use super::models::NotificationRow;
use super::pool::DbPool;
use super::schema::notifications;
use crate::domain::notification::Notification;
use crate::domain::ports::{
    MarkReadOutcome, NotificationRepository, NotificationRepositoryError,
};
use crate::domain::user::UserId;

pub struct DieselNotificationRepository {
    pool: DbPool,
}

impl DieselNotificationRepository {
    #[must_use]
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn conn(
        &self,
    ) -> Result<
        diesel_async::pooled_connection::bb8::PooledConnection<
            '_,
            diesel_async::AsyncPgConnection,
        >,
        NotificationRepositoryError,
    > {
        self.pool.get().await.map_err(|err| match classify_pool(err) {
            StoreFailure::Connection(m) => NotificationRepositoryError::Connection(m),
            StoreFailure::Query(m) => NotificationRepositoryError::Query(m),
        })
    }
}

fn store_error(err: DieselError) -> NotificationRepositoryError {
    match classify_diesel(err) {
        StoreFailure::Connection(m) => NotificationRepositoryError::Connection(m),
        StoreFailure::Query(m) => NotificationRepositoryError::Query(m),
    }
}

#[async_trait]
impl NotificationRepository for DieselNotificationRepository {
    async fn insert(
        &self,
        notification: Notification,
    ) -> Result<(), NotificationRepositoryError> {
        let mut conn = self.conn().await?;
        let row = NotificationRow::from(&notification);
        diesel::insert_into(notifications::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn list_for_user(
        &self,
        user: UserId,
    ) -> Result<Vec<Notification>, NotificationRepositoryError> {
        let mut conn = self.conn().await?;
        let rows: Vec<NotificationRow> = notifications::table
            .filter(notifications::user_id.eq(user.as_uuid()))
            .order(notifications::created_at.desc())
            .select(NotificationRow::as_select())
            .load(&mut conn)
            .await
            .map_err(store_error)?;
        rows.into_iter()
            .map(|row| Notification::try_from(row).map_err(NotificationRepositoryError::query))
            .collect()
    }

    async fn mark_read(
        &self,
        id: Uuid,
        user: UserId,
        now: DateTime<Utc>,
    ) -> Result<MarkReadOutcome, NotificationRepositoryError> {
        let mut conn = self.conn().await?;
        // Unread rows only, so a re-read keeps the first timestamp.
        let updated = diesel::update(
            notifications::table
                .filter(notifications::id.eq(id))
                .filter(notifications::user_id.eq(user.as_uuid()))
                .filter(notifications::is_read.eq(false)),
        )
        .set((
            notifications::is_read.eq(true),
            notifications::read_at.eq(now),
        ))
        .execute(&mut conn)
        .await
        .map_err(store_error)?;
        if updated > 0 {
            return Ok(MarkReadOutcome::Updated);
        }

        let owner: Option<Uuid> = notifications::table
            .find(id)
            .select(notifications::user_id)
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        Ok(match owner {
            // Already read; marking again is a no-op.
            Some(owner) if owner == user.as_uuid() => MarkReadOutcome::Updated,
            Some(_) => MarkReadOutcome::NotOwner,
            None => MarkReadOutcome::Missing,
        })
    }
}
