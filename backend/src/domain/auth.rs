//! Authentication primitives: roles, credentials, and the authenticated
//! caller identity threaded through handlers.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use zeroize::Zeroizing;

use crate::domain::user::{Email, UserId};

/// Closed set of account roles.
///
/// Anything outside this set is rejected at the boundary; there is no
/// free-form role string anywhere in the system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Citizen,
    Officer,
    Admin,
}

impl Role {
    /// Canonical lowercase name, matching the wire and storage encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Citizen => "citizen",
            Self::Officer => "officer",
            Self::Admin => "admin",
        }
    }

    /// Parse a stored role string; `None` for anything outside the closed set.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "citizen" => Some(Self::Citizen),
            "officer" => Some(Self::Officer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    /// Officers and admins share most enforcement privileges.
    #[must_use]
    pub fn is_staff(self) -> bool {
        matches!(self, Self::Officer | Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Login credentials. The password is wrapped in [`Zeroizing`] so it is wiped
/// from memory when dropped.
#[derive(Debug)]
pub struct LoginCredentials {
    pub email: Email,
    pub password: Zeroizing<String>,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: Email, password: String) -> Self {
        Self {
            email,
            password: Zeroizing::new(password),
        }
    }
}

/// The caller identity resolved from a verified access token plus a fresh
/// store lookup. Role comes from the store, never from token claims.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: UserId,
    pub role: Role,
    pub full_name: String,
}
