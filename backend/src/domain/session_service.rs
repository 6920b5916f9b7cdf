//! Credential and session authority.
//!
//! Owns registration, login with progressive lockout, dual-token issuance
//! and rotation, and the authorization check every protected handler runs.

use std::sync::Arc;

use mockable::Clock;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::domain::auth::{AuthenticatedUser, LoginCredentials, Role};
use crate::domain::error::{DomainResult, Error};
use crate::domain::password::{hash_password, verify_password};
use crate::domain::ports::{LockoutPolicy, UserRepository, UserRepositoryError};
use crate::domain::token::{IssuedToken, TokenClass, TokenCodec, TokenError};
use crate::domain::user::{Email, UserAccount, UserId};

/// Validated inputs for account registration.
#[derive(Debug)]
pub struct NewAccount {
    pub full_name: String,
    pub email: Email,
    pub phone: String,
    pub password: Zeroizing<String>,
}

/// The token pair handed out by login, registration, and refresh.
#[derive(Debug, Clone)]
pub struct SessionTokens {
    pub access: IssuedToken,
    pub refresh: IssuedToken,
    pub role: Role,
}

const INVALID_CREDENTIALS: &str = "invalid email or password";
const MIN_PASSWORD_LEN: usize = 8;

fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Session authority over the account store and token codec.
pub struct SessionService {
    users: Arc<dyn UserRepository>,
    codec: Arc<TokenCodec>,
    clock: Arc<dyn Clock>,
    policy: LockoutPolicy,
}

impl SessionService {
    #[must_use]
    pub fn new(
        users: Arc<dyn UserRepository>,
        codec: Arc<TokenCodec>,
        clock: Arc<dyn Clock>,
        policy: LockoutPolicy,
    ) -> Self {
        Self {
            users,
            codec,
            clock,
            policy,
        }
    }

    /// Access to the codec for adapters that report token TTLs.
    #[must_use]
    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Register a new citizen account and open its first session.
    ///
    /// # Errors
    /// `invalid_request` for weak passwords or malformed phone numbers,
    /// `conflict` when the email is already registered.
    pub async fn register(&self, account: NewAccount) -> DomainResult<SessionTokens> {
        if account.full_name.trim().is_empty() {
            return Err(Error::invalid_request("full name must not be empty"));
        }
        if account.password.len() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_request(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        if account.phone.len() != 10 || !account.phone.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::invalid_request("phone must be exactly 10 digits"));
        }

        let password_hash = hash_password(&account.password)
            .map_err(|_| Error::internal("password hashing failed"))?;
        let now = self.clock.utc();
        let record = UserAccount {
            id: UserId::random(),
            email: account.email,
            full_name: account.full_name.trim().to_owned(),
            phone: account.phone,
            password_hash,
            role: Role::Citizen,
            failed_attempts: 0,
            locked_until: None,
            is_active: true,
            refresh_token_fingerprint: None,
            last_login: None,
            created_at: now,
        };
        let id = record.id;
        let role = record.role;
        let email = record.email.clone();
        self.users.insert(record).await?;
        tracing::info!(user = %id, "account registered");

        self.open_session(id, role, &email).await
    }

    /// Authenticate and open a session.
    ///
    /// Unknown email, wrong password, and a deactivated account are all
    /// indistinguishable to the caller. Failed attempts are counted
    /// atomically in the store; reaching the policy threshold locks the
    /// account, which is reported on the next attempt rather than on the
    /// one that tripped it.
    ///
    /// # Errors
    /// `unauthorized` for bad credentials or deactivated accounts,
    /// `account_locked` while a lock is in force.
    pub async fn login(&self, credentials: LoginCredentials) -> DomainResult<SessionTokens> {
        let Some(account) = self.users.find_by_email(&credentials.email).await? else {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        };
        if !account.is_active {
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        let now = self.clock.utc();
        if let Some(locked_until) = account.locked_until.filter(|until| *until > now) {
            let retry_after = u64::try_from((locked_until - now).num_seconds())
                .unwrap_or(0)
                .max(1);
            return Err(Error::account_locked(retry_after));
        }

        if !verify_password(&credentials.password, &account.password_hash) {
            let outcome = self
                .users
                .record_login_failure(account.id, &self.policy, now)
                .await?;
            if outcome.locked_until.is_some() {
                tracing::warn!(
                    user = %account.id,
                    attempts = outcome.failed_attempts,
                    "account locked after repeated login failures"
                );
            }
            return Err(Error::unauthorized(INVALID_CREDENTIALS));
        }

        self.open_session(account.id, account.role, &account.email)
            .await
    }

    async fn open_session(
        &self,
        id: UserId,
        role: Role,
        email: &Email,
    ) -> DomainResult<SessionTokens> {
        let now = self.clock.utc();
        let access = self
            .codec
            .issue(id, role, TokenClass::Access, now)
            .map_err(|_| Error::internal("token issuance failed"))?;
        let refresh = self
            .codec
            .issue(id, role, TokenClass::Refresh, now)
            .map_err(|_| Error::internal("token issuance failed"))?;
        self.users
            .record_login_success(id, now, &fingerprint(&refresh.token))
            .await?;
        tracing::info!(user = %id, email = %email, "session opened");
        Ok(SessionTokens {
            access,
            refresh,
            role,
        })
    }

    /// Exchange a refresh token for a fresh pair, rotating the stored
    /// fingerprint so the old refresh token stops working.
    ///
    /// # Errors
    /// `unauthorized` for expired, foreign, wrong-class, revoked, or
    /// superseded tokens; `forbidden` for deactivated accounts.
    pub async fn refresh(&self, refresh_token: &str) -> DomainResult<SessionTokens> {
        let claims = self
            .codec
            .verify(refresh_token, TokenClass::Refresh)
            .map_err(|err| match err {
                TokenError::Expired => Error::unauthorized("refresh token has expired"),
                TokenError::WrongClass => {
                    Error::unauthorized("token presented for the wrong purpose")
                }
                TokenError::Invalid | TokenError::Issuance => {
                    Error::unauthorized("invalid refresh token")
                }
            })?;

        let account = self
            .users
            .find_by_id(claims.subject())
            .await?
            .ok_or_else(|| Error::unauthorized("invalid refresh token"))?;
        if !account.is_active {
            return Err(Error::forbidden("account is deactivated"));
        }
        let presented = fingerprint(refresh_token);
        if account.refresh_token_fingerprint.as_deref() != Some(presented.as_str()) {
            return Err(Error::unauthorized("refresh token has been revoked"));
        }

        let now = self.clock.utc();
        let access = self
            .codec
            .issue(account.id, account.role, TokenClass::Access, now)
            .map_err(|_| Error::internal("token issuance failed"))?;
        let rotated = self
            .codec
            .issue(account.id, account.role, TokenClass::Refresh, now)
            .map_err(|_| Error::internal("token issuance failed"))?;
        self.users
            .store_refresh_fingerprint(account.id, Some(&fingerprint(&rotated.token)))
            .await?;
        Ok(SessionTokens {
            access,
            refresh: rotated,
            role: account.role,
        })
    }

    /// Invalidate the caller's outstanding refresh token.
    ///
    /// # Errors
    /// Store failures only; logging out twice is a no-op.
    pub async fn logout(&self, caller: &AuthenticatedUser) -> DomainResult<()> {
        self.users
            .store_refresh_fingerprint(caller.id, None)
            .await?;
        Ok(())
    }

    /// Fetch the caller's own account record.
    ///
    /// # Errors
    /// `unauthorized` when the account has vanished from the store.
    pub async fn current_user(&self, caller: &AuthenticatedUser) -> DomainResult<UserAccount> {
        self.users
            .find_by_id(caller.id)
            .await?
            .ok_or_else(|| Error::unauthorized("account no longer exists"))
    }

    /// Change the caller's password and revoke any outstanding refresh token.
    ///
    /// # Errors
    /// `unauthorized` when the current password does not verify,
    /// `invalid_request` when the replacement is too short.
    pub async fn change_password(
        &self,
        caller: &AuthenticatedUser,
        current: &str,
        replacement: &str,
    ) -> DomainResult<()> {
        if replacement.len() < MIN_PASSWORD_LEN {
            return Err(Error::invalid_request(format!(
                "password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        let account = self.current_user(caller).await?;
        if !verify_password(current, &account.password_hash) {
            return Err(Error::unauthorized("current password is incorrect"));
        }
        let password_hash =
            hash_password(replacement).map_err(|_| Error::internal("password hashing failed"))?;
        self.users
            .update_password(account.id, &password_hash)
            .await?;
        self.users
            .store_refresh_fingerprint(account.id, None)
            .await?;
        Ok(())
    }

    /// Resolve a bearer access token into the caller identity and check the
    /// role against `allowed` (an empty slice admits every role).
    ///
    /// The effective role is read from the store on every call; the token's
    /// role claim is never trusted for authorization.
    ///
    /// # Errors
    /// `unauthorized` for missing or unverifiable tokens, `forbidden` for
    /// deactivated accounts or insufficient roles.
    pub async fn authorize(
        &self,
        token: Option<&str>,
        allowed: &[Role],
    ) -> DomainResult<AuthenticatedUser> {
        let token = token.ok_or_else(|| Error::unauthorized("missing bearer token"))?;
        let claims = self
            .codec
            .verify(token, TokenClass::Access)
            .map_err(|err| match err {
                TokenError::Expired => Error::unauthorized("access token has expired"),
                TokenError::WrongClass => {
                    Error::unauthorized("token presented for the wrong purpose")
                }
                TokenError::Invalid | TokenError::Issuance => {
                    Error::unauthorized("invalid access token")
                }
            })?;

        let account = self
            .users
            .find_by_id(claims.subject())
            .await
            .map_err(|err| match err {
                UserRepositoryError::Connection(_) => {
                    Error::service_unavailable("account store is unavailable")
                }
                other => other.into(),
            })?
            .ok_or_else(|| Error::unauthorized("account no longer exists"))?;
        if !account.is_active {
            return Err(Error::forbidden("account is deactivated"));
        }
        if !allowed.is_empty() && !allowed.contains(&account.role) {
            return Err(Error::forbidden(
                "this action requires a different role",
            ));
        }
        Ok(AuthenticatedUser {
            id: account.id,
            role: account.role,
            full_name: account.full_name,
        })
    }

    /// Like [`Self::authorize`] with no role gate, but never fails: an
    /// absent, invalid, or revoked token yields an anonymous caller. For
    /// endpoints with mixed public/private behaviour.
    pub async fn optional_authorize(&self, token: Option<&str>) -> Option<AuthenticatedUser> {
        match token {
            Some(_) => self.authorize(token, &[]).await.ok(),
            None => None,
        }
    }
}

#[cfg(test)]
#[path = "session_service_tests.rs"]
mod tests;
