//! Bearer credentials and the identity-provider seam.
//!
//! Tokens are short-lived, so the orchestrator asks its
//! [`CredentialSupplier`] for a fresh one right before every request and
//! drops it afterwards. Nothing here caches a token across submissions.

use async_trait::async_trait;
use std::fmt;

/// Environment variable read by [`EnvCredential::default`].
pub const TOKEN_ENV: &str = "NOCAP_TOKEN";

/// An opaque bearer token.
///
/// `Debug` never prints the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building the `Authorization` header.
    pub fn secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&"<redacted>").finish()
    }
}

/// Produces the current bearer token, or `None` when no session exists.
///
/// Implementations are called once per submission, immediately before the
/// request is built.
#[async_trait]
pub trait CredentialSupplier: Send + Sync {
    async fn current_token(&self) -> Option<Credential>;
}

/// A fixed token, or a permanently signed-out session.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<Credential>);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(Credential::new(token)))
    }

    pub fn signed_out() -> Self {
        Self(None)
    }
}

#[async_trait]
impl CredentialSupplier for StaticCredential {
    async fn current_token(&self) -> Option<Credential> {
        self.0.clone()
    }
}

/// Reads the token from an environment variable on every call.
///
/// Lets an external `login` helper refresh the variable between runs
/// without restarting a long-lived process.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl Default for EnvCredential {
    fn default() -> Self {
        Self::new(TOKEN_ENV)
    }
}

#[async_trait]
impl CredentialSupplier for EnvCredential {
    async fn current_token(&self) -> Option<Credential> {
        std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .map(Credential)
    }
}
