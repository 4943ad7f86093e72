use async_trait::async_trait;

use super::traits::PasswordVerifier;
use crate::error::ServiceResult;

/// Compares against a secret held by this process. An empty secret rejects
/// every password.
///
/// Suitable for a server or a trusted native client only; a browser build
/// must use [`super::RpcPasswordVerifier`] so the secret never ships.
pub struct SharedSecretVerifier {
    secret: String,
}

impl SharedSecretVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }
}

#[async_trait]
impl PasswordVerifier for SharedSecretVerifier {
    async fn verify(&self, password: &str) -> ServiceResult<bool> {
        if self.secret.is_empty() {
            return Ok(false);
        }
        Ok(constant_time_eq(password.as_bytes(), self.secret.as_bytes()))
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
