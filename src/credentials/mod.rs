//! AWS credentials management.
//!
//! This module provides the credential type consumed by the signer and the
//! provider trait consumed by the executor. Providers may cache and refresh
//! internally; the executor only ever calls [`CredentialsProvider::credentials`]
//! once per attempt and never retries provider failures.

mod chain;
mod env;

pub use chain::ChainCredentialsProvider;
pub use env::EnvCredentialsProvider;

use crate::error::{AwsError, CredentialsError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// AWS credentials.
///
/// An all-blank credential is valid input: it disables signing entirely,
/// which is how anonymous access to public endpoints is expressed.
#[derive(Clone)]
pub struct AwsCredentials {
    access_key_id: String,
    secret_access_key: SecretString,
    session_token: Option<SecretString>,
    expiration: Option<DateTime<Utc>>,
}

impl AwsCredentials {
    /// Create new long-term credentials.
    pub fn new(access_key_id: impl Into<String>, secret_access_key: impl Into<String>) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: None,
            expiration: None,
        }
    }

    /// Create new temporary credentials with a session token.
    pub fn with_session_token(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: Some(SecretString::new(session_token.into())),
            expiration: None,
        }
    }

    /// Create temporary credentials with an expiration.
    pub fn temporary(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: impl Into<String>,
        expiration: DateTime<Utc>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: SecretString::new(secret_access_key.into()),
            session_token: Some(SecretString::new(session_token.into())),
            expiration: Some(expiration),
        }
    }

    /// Anonymous credentials: both ids blank, signing disabled.
    pub fn anonymous() -> Self {
        Self::new("", "")
    }

    /// Get the access key ID.
    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    /// Get the secret access key.
    ///
    /// Note: this exposes the secret. Use carefully and avoid logging.
    pub fn secret_access_key(&self) -> &str {
        self.secret_access_key.expose_secret()
    }

    /// Get the session token, if any.
    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|s| s.expose_secret().as_str())
    }

    /// Get the expiration time, if any.
    pub fn expiration(&self) -> Option<&DateTime<Utc>> {
        self.expiration.as_ref()
    }

    /// True iff both the access key id and secret are blank.
    ///
    /// Empty credentials cause the executor to skip signing.
    pub fn is_empty(&self) -> bool {
        self.access_key_id.is_empty() && self.secret_access_key.expose_secret().is_empty()
    }

    /// Check if the credentials have expired.
    pub fn is_expired(&self) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() >= *exp,
            None => false,
        }
    }

    /// Check if the credentials will expire within the given duration.
    pub fn will_expire_within(&self, duration: chrono::Duration) -> bool {
        match &self.expiration {
            Some(exp) => Utc::now() + duration >= *exp,
            None => false,
        }
    }
}

impl fmt::Debug for AwsCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"[REDACTED]")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Trait for credential providers.
///
/// Implementations must be internally thread-safe: the client shares one
/// provider across concurrent calls.
#[async_trait]
pub trait CredentialsProvider: Send + Sync {
    /// Get credentials from this provider.
    async fn credentials(&self) -> Result<AwsCredentials, AwsError>;

    /// Release any resources the provider holds. Called once at client
    /// shutdown; the default does nothing.
    async fn shutdown(&self) {}

    /// Provider name for logging and debugging.
    fn name(&self) -> &'static str;
}

/// Static credentials provider for testing or explicit configuration.
pub struct StaticCredentialsProvider {
    credentials: AwsCredentials,
}

impl StaticCredentialsProvider {
    /// Create a new static credentials provider.
    pub fn new(credentials: AwsCredentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialsProvider for StaticCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, AwsError> {
        if self.credentials.is_expired() {
            return Err(AwsError::Credentials(CredentialsError::Expired {
                expiration: self
                    .credentials
                    .expiration()
                    .map(|e| e.to_rfc3339())
                    .unwrap_or_default(),
            }));
        }
        Ok(self.credentials.clone())
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

impl fmt::Debug for StaticCredentialsProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentialsProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_new() {
        let creds = AwsCredentials::new("AKID", "SECRET");
        assert_eq!(creds.access_key_id(), "AKID");
        assert_eq!(creds.secret_access_key(), "SECRET");
        assert!(creds.session_token().is_none());
        assert!(!creds.is_empty());
    }

    #[test]
    fn test_anonymous_is_empty() {
        assert!(AwsCredentials::anonymous().is_empty());
        assert!(!AwsCredentials::new("AKID", "").is_empty());
    }

    #[test]
    fn test_credentials_expiration() {
        use chrono::Duration;

        let creds = AwsCredentials::new("AKID", "SECRET");
        assert!(!creds.is_expired());

        let expired =
            AwsCredentials::temporary("AKID", "SECRET", "TOKEN", Utc::now() - Duration::hours(1));
        assert!(expired.is_expired());

        let expiring =
            AwsCredentials::temporary("AKID", "SECRET", "TOKEN", Utc::now() + Duration::minutes(5));
        assert!(!expiring.is_expired());
        assert!(expiring.will_expire_within(Duration::minutes(10)));
    }

    #[test]
    fn test_credentials_debug_redacts_secrets() {
        let creds = AwsCredentials::with_session_token("AKID", "SECRET", "TOKEN");
        let debug = format!("{:?}", creds);

        assert!(debug.contains("AKID"));
        assert!(!debug.contains("SECRET"));
        assert!(!debug.contains("TOKEN"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[tokio::test]
    async fn test_static_provider() {
        let provider = StaticCredentialsProvider::new(AwsCredentials::new("AKID", "SECRET"));
        let retrieved = provider.credentials().await.unwrap();
        assert_eq!(retrieved.access_key_id(), "AKID");
    }

    #[tokio::test]
    async fn test_static_provider_expired() {
        use chrono::Duration;

        let expired =
            AwsCredentials::temporary("AKID", "SECRET", "TOKEN", Utc::now() - Duration::hours(1));
        let provider = StaticCredentialsProvider::new(expired);
        assert!(provider.credentials().await.is_err());
    }
}
