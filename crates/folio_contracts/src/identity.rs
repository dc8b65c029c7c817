#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::common::validate_id;
use crate::{ContractViolation, MonotonicTimeNs, Validate};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let v = Self(id.into());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for UserId {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("user_id", &self.0, 64)
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lower-cased email address with a single `@` and a non-empty domain.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn new(email: impl AsRef<str>) -> Result<Self, ContractViolation> {
        let v = Self(email.as_ref().trim().to_ascii_lowercase());
        v.validate()?;
        Ok(v)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Validate for Email {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_id("email", &self.0, 254)?;
        let mut parts = self.0.split('@');
        let local = parts.next().unwrap_or("");
        let domain = parts.next().unwrap_or("");
        if local.is_empty() || domain.is_empty() || parts.next().is_some() {
            return Err(ContractViolation::InvalidValue {
                field: "email",
                reason: "must be local@domain",
            });
        }
        Ok(())
    }
}

/// An authenticated user as tracked by the identity service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: Email,
    pub created_at: MonotonicTimeNs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub identity: Identity,
    pub access_token: String,
    pub issued_at: MonotonicTimeNs,
}

impl Session {
    pub fn user_id(&self) -> &UserId {
        &self.identity.user_id
    }
}

/// Auth-state change delivered to subscribers after sign-in/sign-out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStateEvent {
    SignedIn(Session),
    SignedOut { user_id: UserId },
}
