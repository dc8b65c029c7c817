#![forbid(unsafe_code)]

use base64::engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD};
use base64::Engine;
use folio_contracts::identity::{Email, Identity, UserId};
use folio_contracts::MonotonicTimeNs;
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const SALT_LEN: usize = 16;
const ACCESS_TOKEN_LEN: usize = 32;

/// Row of `auth_users`. The password is only ever held as a salted digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUserRecord {
    pub user_id: UserId,
    pub email: Email,
    salt_b64: String,
    digest_b64: String,
    pub created_at: MonotonicTimeNs,
    pub updated_at: MonotonicTimeNs,
}

impl AuthUserRecord {
    pub fn v1(user_id: UserId, email: Email, password: &str, now: MonotonicTimeNs) -> Self {
        let (salt_b64, digest_b64) = new_credentials(password);
        Self {
            user_id,
            email,
            salt_b64,
            digest_b64,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn identity(&self) -> Identity {
        Identity {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            created_at: self.created_at,
        }
    }

    pub fn verify_password(&self, password: &str) -> bool {
        let Ok(salt) = BASE64.decode(&self.salt_b64) else {
            return false;
        };
        let candidate = digest_password(&salt, password);
        constant_time_eq(candidate.as_bytes(), self.digest_b64.as_bytes())
    }

    pub fn set_password(&mut self, password: &str, now: MonotonicTimeNs) {
        let (salt_b64, digest_b64) = new_credentials(password);
        self.salt_b64 = salt_b64;
        self.digest_b64 = digest_b64;
        self.updated_at = now;
    }
}

fn new_credentials(password: &str) -> (String, String) {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    let digest = digest_password(&salt, password);
    (BASE64.encode(salt), digest)
}

fn digest_password(salt: &[u8], password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(password.as_bytes());
    BASE64.encode(hasher.finalize())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Opaque bearer token handed to a signed-in client.
pub fn new_access_token() -> String {
    let mut bytes = [0u8; ACCESS_TOKEN_LEN];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
