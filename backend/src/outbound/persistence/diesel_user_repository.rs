//! Diesel PostgreSQL adapter for the account store port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::{AsyncConnection, RunQueryDsl};

use super::diesel_error_mapping::{StoreFailure, classify_diesel, classify_pool};
use super::models::UserRow;
use super::pool::DbPool;
use super::schema::users;
use crate::domain::ports::{
    LockoutPolicy, LoginFailureOutcome, UserRepository, UserRepositoryError,
    advance_failure_counters,
};
use crate::domain::user::{Email, UserAccount, UserId};

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
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
        UserRepositoryError,
    > {
        self.pool.get().await.map_err(|err| match classify_pool(err) {
            StoreFailure::Connection(m) => UserRepositoryError::Connection(m),
            StoreFailure::Query(m) => UserRepositoryError::Query(m),
        })
    }
}

fn store_error(err: DieselError) -> UserRepositoryError {
    match classify_diesel(err) {
        StoreFailure::Connection(m) => UserRepositoryError::Connection(m),
        StoreFailure::Query(m) => UserRepositoryError::Query(m),
    }
}

fn row_to_account(row: UserRow) -> Result<UserAccount, UserRepositoryError> {
    UserAccount::try_from(row).map_err(UserRepositoryError::query)
}

#[async_trait]
impl UserRepository for DieselUserRepository {
    async fn insert(&self, account: UserAccount) -> Result<(), UserRepositoryError> {
        let mut conn = self.conn().await?;
        let row = UserRow::from(&account);
        diesel::insert_into(users::table)
            .values(&row)
            .execute(&mut conn)
            .await
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                    UserRepositoryError::DuplicateEmail
                }
                other => store_error(other),
            })?;
        Ok(())
    }

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, UserRepositoryError> {
        let mut conn = self.conn().await?;
        let row: Option<UserRow> = users::table
            .filter(users::email.eq(email.as_str()))
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        row.map(row_to_account).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, UserRepositoryError> {
        let mut conn = self.conn().await?;
        let row: Option<UserRow> = users::table
            .find(id.as_uuid())
            .select(UserRow::as_select())
            .first(&mut conn)
            .await
            .optional()
            .map_err(store_error)?;
        row.map(row_to_account).transpose()
    }

    async fn record_login_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LoginFailureOutcome, UserRepositoryError> {
        let mut conn = self.conn().await?;
        let policy = *policy;
        // Row lock for the read-modify-write: concurrent failures queue on
        // the lock and each increment lands.
        conn.transaction::<LoginFailureOutcome, DieselError, _>(|conn| {
            async move {
                let row: UserRow = users::table
                    .find(id.as_uuid())
                    .select(UserRow::as_select())
                    .for_update()
                    .first(conn)
                    .await?;
                let outcome = advance_failure_counters(
                    u32::try_from(row.failed_attempts).unwrap_or(0),
                    row.locked_until,
                    &policy,
                    now,
                );
                diesel::update(users::table.find(id.as_uuid()))
                    .set((
                        users::failed_attempts
                            .eq(i32::try_from(outcome.failed_attempts).unwrap_or(i32::MAX)),
                        users::locked_until.eq(outcome.locked_until),
                    ))
                    .execute(conn)
                    .await?;
                Ok(outcome)
            }
            .scope_boxed()
        })
        .await
        .map_err(|err| match err {
            DieselError::NotFound => UserRepositoryError::NotFound,
            other => store_error(other),
        })
    }

    async fn record_login_success(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        refresh_fingerprint: &str,
    ) -> Result<(), UserRepositoryError> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(users::table.find(id.as_uuid()))
            .set((
                users::failed_attempts.eq(0),
                users::locked_until.eq(None::<DateTime<Utc>>),
                users::last_login.eq(Some(now)),
                users::refresh_token_fingerprint.eq(Some(refresh_fingerprint)),
            ))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        if updated == 0 {
            return Err(UserRepositoryError::NotFound);
        }
        Ok(())
    }

    async fn store_refresh_fingerprint<'a>(
        &self,
        id: UserId,
        fingerprint: Option<&'a str>,
    ) -> Result<(), UserRepositoryError> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(users::table.find(id.as_uuid()))
            .set(users::refresh_token_fingerprint.eq(fingerprint))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        if updated == 0 {
            return Err(UserRepositoryError::NotFound);
        }
        Ok(())
    }

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserRepositoryError> {
        let mut conn = self.conn().await?;
        let updated = diesel::update(users::table.find(id.as_uuid()))
            .set(users::password_hash.eq(password_hash))
            .execute(&mut conn)
            .await
            .map_err(store_error)?;
        if updated == 0 {
            return Err(UserRepositoryError::NotFound);
        }
        Ok(())
    }
}
