//! Account store port.
//!
//! The login-outcome methods are the only writers of the lockout counters,
//! and each must be a single atomic operation in the adapter so concurrent
//! failed logins are all counted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::domain::error::Error;
use crate::domain::user::{Email, UserAccount, UserId};

/// Progressive-lockout thresholds applied on login failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockoutPolicy {
    pub max_attempts: u32,
    pub lock_duration: Duration,
}

impl Default for LockoutPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lock_duration: Duration::from_secs(15 * 60),
        }
    }
}

/// Counter state after an atomic failure increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoginFailureOutcome {
    pub failed_attempts: u32,
    pub locked_until: Option<DateTime<Utc>>,
}

/// Advance the lockout counters for one failed attempt.
///
/// Shared by every adapter so they agree on the semantics: an expired lock
/// restarts the run, and hitting the threshold sets a fresh lock. Callers
/// must apply the result inside whatever makes their read-modify-write
/// atomic (a mutex, a row lock).
#[must_use]
pub fn advance_failure_counters(
    failed_attempts: u32,
    locked_until: Option<DateTime<Utc>>,
    policy: &LockoutPolicy,
    now: DateTime<Utc>,
) -> LoginFailureOutcome {
    let expired = locked_until.is_some_and(|until| until <= now);
    let failed_attempts = if expired { 1 } else { failed_attempts + 1 };
    let locked_until = if failed_attempts >= policy.max_attempts {
        let lock = chrono::Duration::from_std(policy.lock_duration)
            .unwrap_or_else(|_| chrono::Duration::days(365));
        Some(now + lock)
    } else {
        None
    };
    LoginFailureOutcome {
        failed_attempts,
        locked_until,
    }
}

/// Failures surfaced by account store adapters.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("account store connection failed: {0}")]
    Connection(String),
    #[error("account store query failed: {0}")]
    Query(String),
    #[error("an account with this email already exists")]
    DuplicateEmail,
    #[error("account not found")]
    NotFound,
}

impl UserRepositoryError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }
}

impl From<UserRepositoryError> for Error {
    fn from(err: UserRepositoryError) -> Self {
        match err {
            UserRepositoryError::Connection(_) => {
                Self::service_unavailable("account store is unavailable")
            }
            UserRepositoryError::Query(message) => {
                Self::internal(format!("account store query failed: {message}"))
            }
            UserRepositoryError::DuplicateEmail => {
                Self::conflict("an account with this email already exists")
            }
            UserRepositoryError::NotFound => Self::not_found("account not found"),
        }
    }
}

/// Persistence port for user accounts and their lockout counters.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a new account; [`UserRepositoryError::DuplicateEmail`] when the
    /// normalised email is taken.
    async fn insert(&self, account: UserAccount) -> Result<(), UserRepositoryError>;

    async fn find_by_email(
        &self,
        email: &Email,
    ) -> Result<Option<UserAccount>, UserRepositoryError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserAccount>, UserRepositoryError>;

    /// Atomically count a failed login and lock the account once the counter
    /// reaches the policy threshold. A lock that expired before `now` resets
    /// the counter, so the failed attempt lands as attempt one of a new run.
    async fn record_login_failure(
        &self,
        id: UserId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LoginFailureOutcome, UserRepositoryError>;

    /// Reset the lockout counters, stamp `last_login`, and store the refresh
    /// token fingerprint in one write.
    async fn record_login_success(
        &self,
        id: UserId,
        now: DateTime<Utc>,
        refresh_fingerprint: &str,
    ) -> Result<(), UserRepositoryError>;

    /// Replace or clear the stored refresh token fingerprint.
    async fn store_refresh_fingerprint<'a>(
        &self,
        id: UserId,
        fingerprint: Option<&'a str>,
    ) -> Result<(), UserRepositoryError>;

    async fn update_password(
        &self,
        id: UserId,
        password_hash: &str,
    ) -> Result<(), UserRepositoryError>;
}
