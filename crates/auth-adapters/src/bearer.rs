//! # BearerSecret
//!
//! Shared-secret implementation of `AccessGuard`. Callers present
//! `Authorization: Bearer <secret>`; the comparison runs in constant time.
//! With no secret configured the guard lets every request through.

use domains::{AccessGuard, DomainError, Result};
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

pub struct BearerSecret {
    /// Label used in logs and error messages (e.g. "cron", "admin")
    scope: &'static str,
    secret: Option<SecretString>,
}

impl BearerSecret {
    pub fn new(scope: &'static str, secret: Option<SecretString>) -> Self {
        // An empty value counts as "not configured".
        let secret = secret.filter(|s| !s.expose_secret().is_empty());
        Self { scope, secret }
    }

    /// A guard that admits everything.
    pub fn open(scope: &'static str) -> Self {
        Self::new(scope, None)
    }

    fn matches(&self, secret: &SecretString, presented: &str) -> bool {
        secret
            .expose_secret()
            .as_bytes()
            .ct_eq(presented.as_bytes())
            .into()
    }
}

impl AccessGuard for BearerSecret {
    fn authorize(&self, authorization: Option<&str>) -> Result<()> {
        let Some(secret) = &self.secret else {
            return Ok(());
        };

        let presented = authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim);

        match presented {
            Some(token) if self.matches(secret, token) => Ok(()),
            Some(_) => {
                tracing::warn!(scope = self.scope, "rejected request with wrong bearer secret");
                Err(DomainError::Unauthorized(format!("invalid {} secret", self.scope)))
            }
            None => {
                tracing::warn!(scope = self.scope, "rejected request without bearer secret");
                Err(DomainError::Unauthorized(format!("missing {} secret", self.scope)))
            }
        }
    }

    fn is_enforced(&self) -> bool {
        self.secret.is_some()
    }
}
