//! Single-package mirror client
//!
//! Issues one sync request per call against the mirror's
//! `/{package}/sync_upstream=true` endpoint. Retries are layered on top by
//! [`crate::sync::retry`].

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::config::SyncConfig;
use crate::error::{AppError, SyncError, SyncErrorKind};
use crate::sync::http_client::{HttpTransport, ReqwestTransport};
use crate::target::assert_sync_target;

/// Anything that can trigger a sync for one package
#[async_trait]
pub trait PackageSyncer: Send + Sync {
    /// Perform a single sync attempt
    async fn sync_package(&self, package: &str) -> Result<(), SyncError>;
}

/// Client for the mirror's sync endpoint
#[derive(Debug, Clone)]
pub struct MirrorClient<T: HttpTransport = ReqwestTransport> {
    transport: T,
    base_url: String,
    timeout: Duration,
}

impl MirrorClient<ReqwestTransport> {
    /// Build a client for the configured target and registry
    pub fn from_config(config: &SyncConfig) -> Result<Self, AppError> {
        let target = assert_sync_target(config.target.as_deref())?;
        let registry = config
            .registry
            .as_deref()
            .unwrap_or_else(|| target.default_registry());

        Ok(Self::new(
            ReqwestTransport::new()?,
            registry,
            Duration::from_millis(config.timeout_ms),
        ))
    }
}

impl<T: HttpTransport> MirrorClient<T> {
    /// Create a client over `transport`
    ///
    /// `registry` is a host (`registry.example.com`) or a full base URL with
    /// an `http://` or `https://` scheme.
    pub fn new(transport: T, registry: &str, timeout: Duration) -> Self {
        Self {
            transport,
            base_url: registry_base_url(registry),
            timeout,
        }
    }

    /// Base URL requests are sent to
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Request timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL of the sync endpoint for `package`
    pub fn sync_url(&self, package: &str) -> String {
        format!("{}/{}/sync_upstream=true", self.base_url, package)
    }
}

#[async_trait]
impl<T: HttpTransport> PackageSyncer for MirrorClient<T> {
    async fn sync_package(&self, package: &str) -> Result<(), SyncError> {
        let url = self.sync_url(package);

        // Dropping the transport future on timeout aborts the request
        let response = match tokio::time::timeout(self.timeout, self.transport.put_empty(&url)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Err(SyncError::new(
                    package,
                    SyncErrorKind::Transport(e.to_string()),
                ))
            }
            Err(_) => {
                return Err(SyncError::new(
                    package,
                    SyncErrorKind::Timeout(self.timeout.as_millis() as u64),
                ))
            }
        };

        if response.is_success() {
            debug!(package = %package, status = response.status, "Sync request accepted");
            return Ok(());
        }

        let body = Some(response.body).filter(|b| !b.is_empty());
        Err(SyncError::new(
            package,
            SyncErrorKind::Status {
                status: response.status,
                body,
            },
        ))
    }
}

/// Normalize a registry setting into a base URL without trailing slash
pub fn registry_base_url(registry: &str) -> String {
    let registry = registry.trim().trim_end_matches('/');
    if registry.starts_with("http://") || registry.starts_with("https://") {
        registry.to_string()
    } else {
        format!("https://{}", registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::sync::http_client::{HttpError, HttpResponse};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Arc, Mutex};

    enum Behavior {
        Respond(u16, &'static str),
        Fail(&'static str),
        Hang,
    }

    struct FakeTransport {
        behavior: Behavior,
        calls: Arc<AtomicU32>,
        urls: Arc<Mutex<Vec<String>>>,
    }

    impl FakeTransport {
        fn new(behavior: Behavior) -> Self {
            Self {
                behavior,
                calls: Arc::new(AtomicU32::new(0)),
                urls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for FakeTransport {
        async fn put_empty(&self, url: &str) -> Result<HttpResponse, HttpError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.urls.lock().unwrap().push(url.to_string());
            match self.behavior {
                Behavior::Respond(status, body) => Ok(HttpResponse {
                    status,
                    body: body.to_string(),
                }),
                Behavior::Fail(message) => Err(HttpError::Transport(message.to_string())),
                Behavior::Hang => std::future::pending().await,
            }
        }
    }

    fn client(behavior: Behavior) -> MirrorClient<FakeTransport> {
        MirrorClient::new(
            FakeTransport::new(behavior),
            "registry-direct.npmmirror.com",
            Duration::from_millis(10_000),
        )
    }

    #[test]
    fn test_registry_base_url() {
        assert_eq!(
            registry_base_url("registry-direct.npmmirror.com"),
            "https://registry-direct.npmmirror.com"
        );
        assert_eq!(
            registry_base_url("https://mirror.example.com/"),
            "https://mirror.example.com"
        );
        assert_eq!(
            registry_base_url("http://127.0.0.1:4873"),
            "http://127.0.0.1:4873"
        );
    }

    #[test]
    fn test_sync_url() {
        let client = client(Behavior::Respond(200, ""));
        assert_eq!(
            client.sync_url("@scope/pkg"),
            "https://registry-direct.npmmirror.com/@scope/pkg/sync_upstream=true"
        );
    }

    #[tokio::test]
    async fn test_success_status() {
        let client = client(Behavior::Respond(201, "{}"));

        assert!(client.sync_package("lodash").await.is_ok());
        assert_eq!(client.transport.calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            client.transport.urls.lock().unwrap()[0],
            "https://registry-direct.npmmirror.com/lodash/sync_upstream=true"
        );
    }

    #[tokio::test]
    async fn test_error_status_includes_body() {
        let client = client(Behavior::Respond(500, "upstream exploded"));

        let err = client.sync_package("lodash").await.unwrap_err();
        assert_eq!(
            err.kind,
            SyncErrorKind::Status {
                status: 500,
                body: Some("upstream exploded".to_string()),
            }
        );
        assert_eq!(
            err.to_string(),
            "Failed to sync lodash: HTTP 500: upstream exploded"
        );
    }

    #[tokio::test]
    async fn test_error_status_without_body() {
        let client = client(Behavior::Respond(404, ""));

        let err = client.sync_package("missing").await.unwrap_err();
        assert_eq!(err.to_string(), "Failed to sync missing: HTTP 404");
    }

    #[tokio::test]
    async fn test_transport_error() {
        let client = client(Behavior::Fail("dns error"));

        let err = client.sync_package("lodash").await.unwrap_err();
        assert_eq!(err.kind, SyncErrorKind::Transport("dns error".to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_aborts_request() {
        let client = MirrorClient::new(
            FakeTransport::new(Behavior::Hang),
            "registry.example.com",
            Duration::from_millis(250),
        );

        let err = client.sync_package("slow").await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(
            err.to_string(),
            "Failed to sync slow: Request timeout after 250ms"
        );
    }

    #[test]
    fn test_from_config_requires_target() {
        let result = MirrorClient::from_config(&SyncConfig::default());
        assert!(matches!(
            result,
            Err(AppError::Config(ConfigError::InvalidTarget))
        ));
    }

    #[test]
    fn test_from_config_registry_override() {
        let config = SyncConfig {
            registry: Some("mirror.internal".to_string()),
            timeout_ms: 1234,
            ..SyncConfig::for_target("npmmirror")
        };

        let client = MirrorClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), "https://mirror.internal");
        assert_eq!(client.timeout(), Duration::from_millis(1234));

        let client = MirrorClient::from_config(&SyncConfig::for_target("npmmirror")).unwrap();
        assert_eq!(client.base_url(), "https://registry-direct.npmmirror.com");
    }
}
