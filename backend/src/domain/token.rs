//! Dual-class JWT codec for access and refresh tokens.
//!
//! Each class signs with its own HS256 secret and TTL, so a refresh token can
//! never be presented where an access token is expected and vice versa. Class
//! is additionally recorded in the claims; the codec checks both.

use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::domain::auth::Role;
use crate::domain::user::UserId;

/// Which of the two token families a token belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenClass {
    Access,
    Refresh,
}

impl TokenClass {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

/// Signed claim set carried by both token classes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the account identifier.
    pub sub: Uuid,
    /// Role snapshot at issuance. Informational only; authorization always
    /// re-reads the store.
    pub role: Role,
    /// Token class, bound into the signature.
    pub kind: TokenClass,
    /// Issued-at, seconds since the Unix epoch.
    pub iat: i64,
    /// Expiry, seconds since the Unix epoch.
    pub exp: i64,
    /// Unique token identifier, used for refresh fingerprinting.
    pub jti: Uuid,
}

impl Claims {
    #[must_use]
    pub fn subject(&self) -> UserId {
        UserId::from_uuid(self.sub)
    }
}

/// A freshly issued token plus its metadata.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub jti: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Verification failures, ordered from most to least specific.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token has expired")]
    Expired,
    /// Signature valid for the other class's key, or the embedded class
    /// claim disagrees with the expectation.
    #[error("token presented for the wrong purpose")]
    WrongClass,
    #[error("token is invalid")]
    Invalid,
    #[error("token issuance failed")]
    Issuance,
}

struct ClassKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl ClassKeys {
    fn new(secret: &[u8], ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl,
        }
    }
}

/// Issues and verifies tokens for both classes.
pub struct TokenCodec {
    access: ClassKeys,
    refresh: ClassKeys,
}

impl TokenCodec {
    /// Build a codec from the two class secrets and their TTLs.
    ///
    /// Secrets arrive zeroizing so the raw bytes are wiped once the derived
    /// keys exist.
    #[must_use]
    pub fn new(
        access_secret: Zeroizing<String>,
        refresh_secret: Zeroizing<String>,
        access_ttl: Duration,
        refresh_ttl: Duration,
    ) -> Self {
        Self {
            access: ClassKeys::new(access_secret.as_bytes(), access_ttl),
            refresh: ClassKeys::new(refresh_secret.as_bytes(), refresh_ttl),
        }
    }

    fn keys(&self, class: TokenClass) -> &ClassKeys {
        match class {
            TokenClass::Access => &self.access,
            TokenClass::Refresh => &self.refresh,
        }
    }

    /// TTL configured for the given class.
    #[must_use]
    pub fn ttl(&self, class: TokenClass) -> Duration {
        self.keys(class).ttl
    }

    /// Sign a token of the given class for `subject`.
    ///
    /// # Errors
    /// [`TokenError::Issuance`] if the TTL overflows the timestamp range or
    /// serialisation fails; neither occurs with sane configuration.
    pub fn issue(
        &self,
        subject: UserId,
        role: Role,
        class: TokenClass,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let keys = self.keys(class);
        let lifetime =
            chrono::Duration::from_std(keys.ttl).map_err(|_| TokenError::Issuance)?;
        let expires_at = now
            .checked_add_signed(lifetime)
            .ok_or(TokenError::Issuance)?;
        let jti = Uuid::new_v4();
        let claims = Claims {
            sub: subject.as_uuid(),
            role,
            kind: class,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            jti,
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &keys.encoding)
            .map_err(|_| TokenError::Issuance)?;
        Ok(IssuedToken {
            token,
            jti,
            expires_at,
        })
    }

    /// Verify `token` as the `expected` class and return its claims.
    ///
    /// # Errors
    /// - [`TokenError::Expired`] when the signature is good but `exp` passed.
    /// - [`TokenError::WrongClass`] when the token belongs to the other class.
    /// - [`TokenError::Invalid`] for everything else: bad signature, garbage
    ///   input, unknown signer.
    pub fn verify(&self, token: &str, expected: TokenClass) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_aud = false;
        validation.leeway = 0;

        match decode::<Claims>(token, &self.keys(expected).decoding, &validation) {
            Ok(data) => {
                if data.claims.kind == expected {
                    Ok(data.claims)
                } else {
                    Err(TokenError::WrongClass)
                }
            }
            Err(err) => match err.kind() {
                ErrorKind::ExpiredSignature => Err(TokenError::Expired),
                ErrorKind::InvalidSignature => {
                    // Distinguish "other class's token" from plain garbage so
                    // callers can report a precise refusal.
                    let other = match expected {
                        TokenClass::Access => TokenClass::Refresh,
                        TokenClass::Refresh => TokenClass::Access,
                    };
                    if decode::<Claims>(token, &self.keys(other).decoding, &validation).is_ok() {
                        Err(TokenError::WrongClass)
                    } else {
                        Err(TokenError::Invalid)
                    }
                }
                _ => Err(TokenError::Invalid),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    #[fixture]
    fn codec() -> TokenCodec {
        TokenCodec::new(
            Zeroizing::new("access-secret-for-tests".to_owned()),
            Zeroizing::new("refresh-secret-for-tests".to_owned()),
            Duration::from_secs(900),
            Duration::from_secs(7 * 24 * 3600),
        )
    }

    fn issued_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, 9, 0, 0).single().expect("ts")
    }

    #[rstest]
    fn issue_and_verify_round_trip(codec: TokenCodec) {
        let subject = UserId::random();
        let now = Utc::now();
        let issued = codec
            .issue(subject, Role::Officer, TokenClass::Access, now)
            .expect("issue");

        let claims = codec
            .verify(&issued.token, TokenClass::Access)
            .expect("verify");
        assert_eq!(claims.subject(), subject);
        assert_eq!(claims.role, Role::Officer);
        assert_eq!(claims.kind, TokenClass::Access);
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.exp - claims.iat, 900);
    }

    #[rstest]
    fn refresh_token_rejected_as_access(codec: TokenCodec) {
        let issued = codec
            .issue(UserId::random(), Role::Citizen, TokenClass::Refresh, Utc::now())
            .expect("issue");
        assert_eq!(
            codec.verify(&issued.token, TokenClass::Access),
            Err(TokenError::WrongClass)
        );
    }

    #[rstest]
    fn access_token_rejected_as_refresh(codec: TokenCodec) {
        let issued = codec
            .issue(UserId::random(), Role::Citizen, TokenClass::Access, Utc::now())
            .expect("issue");
        assert_eq!(
            codec.verify(&issued.token, TokenClass::Refresh),
            Err(TokenError::WrongClass)
        );
    }

    #[rstest]
    fn expired_token_reports_expired(codec: TokenCodec) {
        let issued = codec
            .issue(UserId::random(), Role::Citizen, TokenClass::Access, issued_at())
            .expect("issue");
        assert_eq!(
            codec.verify(&issued.token, TokenClass::Access),
            Err(TokenError::Expired)
        );
    }

    #[rstest]
    #[case("")]
    #[case("not-a-jwt")]
    #[case("aaaa.bbbb.cccc")]
    fn garbage_is_invalid(codec: TokenCodec, #[case] token: &str) {
        assert_eq!(
            codec.verify(token, TokenClass::Access),
            Err(TokenError::Invalid)
        );
    }

    #[rstest]
    fn foreign_signature_is_invalid(codec: TokenCodec) {
        let foreign = TokenCodec::new(
            Zeroizing::new("some-other-access".to_owned()),
            Zeroizing::new("some-other-refresh".to_owned()),
            Duration::from_secs(900),
            Duration::from_secs(900),
        );
        let issued = foreign
            .issue(UserId::random(), Role::Admin, TokenClass::Access, Utc::now())
            .expect("issue");
        assert_eq!(
            codec.verify(&issued.token, TokenClass::Access),
            Err(TokenError::Invalid)
        );
    }
}
