//! Chain credentials provider that tries multiple sources.

use super::{AwsCredentials, CredentialsProvider, EnvCredentialsProvider};
use crate::error::{AwsError, CredentialsError};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, trace};

/// Credentials provider that chains multiple providers.
///
/// The chain tries each provider in order until one succeeds. Successful
/// credentials are cached and revalidated as they approach expiration.
/// By default the chain holds only the environment provider; richer
/// discovery (profile files, instance metadata, STS) lives outside this
/// crate and plugs in through [`CredentialsProvider`].
pub struct ChainCredentialsProvider {
    providers: Vec<Arc<dyn CredentialsProvider>>,
    cached: RwLock<Option<CachedCredentials>>,
    /// Refresh credentials this many seconds before expiration.
    refresh_buffer_seconds: i64,
}

struct CachedCredentials {
    credentials: AwsCredentials,
    provider_name: &'static str,
}

impl ChainCredentialsProvider {
    /// Create a new chain with the default providers.
    pub fn new() -> Self {
        Self {
            providers: vec![Arc::new(EnvCredentialsProvider::new())],
            cached: RwLock::new(None),
            refresh_buffer_seconds: 300,
        }
    }

    /// Create a chain with custom providers.
    pub fn with_providers(providers: Vec<Arc<dyn CredentialsProvider>>) -> Self {
        Self {
            providers,
            cached: RwLock::new(None),
            refresh_buffer_seconds: 300,
        }
    }

    /// Set the refresh buffer (seconds before expiration to refresh).
    pub fn with_refresh_buffer(mut self, seconds: i64) -> Self {
        self.refresh_buffer_seconds = seconds;
        self
    }

    /// Add a provider to the end of the chain.
    pub fn add_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    /// Add a provider to the beginning of the chain.
    pub fn prepend_provider(mut self, provider: Arc<dyn CredentialsProvider>) -> Self {
        self.providers.insert(0, provider);
        self
    }

    /// Drop the cache and load fresh credentials.
    pub async fn refresh(&self) -> Result<AwsCredentials, AwsError> {
        *self.cached.write() = None;
        self.credentials().await
    }

    fn should_refresh(&self, creds: &AwsCredentials) -> bool {
        creds.is_expired()
            || creds.will_expire_within(chrono::Duration::seconds(self.refresh_buffer_seconds))
    }

    async fn try_providers(&self) -> Result<(AwsCredentials, &'static str), AwsError> {
        let mut last_error: Option<AwsError> = None;

        for provider in &self.providers {
            let name = provider.name();
            trace!(provider = name, "Trying credentials provider");

            match provider.credentials().await {
                Ok(creds) => {
                    debug!(provider = name, "Credentials loaded");
                    return Ok((creds, name));
                }
                Err(e) => {
                    trace!(provider = name, error = ?e, "Provider failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or(AwsError::Credentials(CredentialsError::NotFound)))
    }
}

impl Default for ChainCredentialsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialsProvider for ChainCredentialsProvider {
    async fn credentials(&self) -> Result<AwsCredentials, AwsError> {
        {
            let cache = self.cached.read();
            if let Some(cached) = cache.as_ref() {
                if !self.should_refresh(&cached.credentials) {
                    trace!(provider = cached.provider_name, "Using cached credentials");
                    return Ok(cached.credentials.clone());
                }
            }
        }

        let (creds, name) = self.try_providers().await?;

        *self.cached.write() = Some(CachedCredentials {
            credentials: creds.clone(),
            provider_name: name,
        });

        Ok(creds)
    }

    async fn shutdown(&self) {
        for provider in &self.providers {
            provider.shutdown().await;
        }
        *self.cached.write() = None;
    }

    fn name(&self) -> &'static str {
        "chain"
    }
}

impl std::fmt::Debug for ChainCredentialsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainCredentialsProvider")
            .field(
                "providers",
                &self.providers.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .field("refresh_buffer_seconds", &self.refresh_buffer_seconds)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::StaticCredentialsProvider;

    struct FailingProvider;

    #[async_trait]
    impl CredentialsProvider for FailingProvider {
        async fn credentials(&self) -> Result<AwsCredentials, AwsError> {
            Err(AwsError::Credentials(CredentialsError::NotFound))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[tokio::test]
    async fn test_chain_uses_first_successful_provider() {
        let provider = ChainCredentialsProvider::with_providers(vec![
            Arc::new(FailingProvider),
            Arc::new(StaticCredentialsProvider::new(AwsCredentials::new(
                "AKID", "SECRET",
            ))),
        ]);

        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "AKID");
    }

    #[tokio::test]
    async fn test_chain_caches_credentials() {
        let provider = ChainCredentialsProvider::with_providers(vec![Arc::new(
            StaticCredentialsProvider::new(AwsCredentials::new("AKID", "SECRET")),
        )]);

        let first = provider.credentials().await.unwrap();
        let second = provider.credentials().await.unwrap();
        assert_eq!(first.access_key_id(), second.access_key_id());
    }

    #[tokio::test]
    async fn test_chain_fails_when_all_providers_fail() {
        let provider = ChainCredentialsProvider::with_providers(vec![
            Arc::new(FailingProvider),
            Arc::new(FailingProvider),
        ]);

        assert!(provider.credentials().await.is_err());
    }

    #[tokio::test]
    async fn test_chain_refreshes_expiring_credentials() {
        use chrono::{Duration, Utc};

        let expiring = AwsCredentials::temporary(
            "AKID",
            "SECRET",
            "TOKEN",
            Utc::now() + Duration::seconds(60),
        );

        let provider = ChainCredentialsProvider::with_providers(vec![Arc::new(
            StaticCredentialsProvider::new(expiring),
        )])
        .with_refresh_buffer(120);

        // Expires inside the buffer, so every call goes back to the chain.
        assert!(provider.credentials().await.is_ok());
        assert!(provider.credentials().await.is_ok());
    }

    #[tokio::test]
    async fn test_prepend_provider() {
        let provider = ChainCredentialsProvider::with_providers(vec![Arc::new(FailingProvider)])
            .prepend_provider(Arc::new(StaticCredentialsProvider::new(
                AwsCredentials::new("FIRST", "SECRET"),
            )));

        let creds = provider.credentials().await.unwrap();
        assert_eq!(creds.access_key_id(), "FIRST");
    }
}
