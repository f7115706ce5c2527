//! Test server harness for E2E testing
//!
//! Provides `TestKeyServer`, a mocked name server key endpoint, and
//! `TestExtServer` for spawning real extension service instances against it.

use crate::crypto_fixtures::test_keypair;
use crate::token_builders::{TEST_CLIENT_ID, TEST_ISSUER};
use ext_service::auth::PublicKeyStore;
use ext_service::config::Config;
use ext_service::routes::{self, AppState};
use ext_service::services::{FixedNormal, NormalGenerator};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use tokio::task::JoinHandle;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path of the public key endpoint on the mocked name server.
pub const PUBLIC_KEY_PATH: &str = "/msa/name/api/public-key";

/// Mocked name server key distribution endpoint.
pub struct TestKeyServer {
    server: MockServer,
}

impl TestKeyServer {
    /// Start a key server that serves the trusted test key.
    pub async fn start() -> Self {
        let key_server = Self::start_empty().await;
        key_server.serve_test_key().await;
        key_server
    }

    /// Start a key server that answers every request with `status`.
    pub async fn start_failing(status: u16) -> Self {
        let key_server = Self::start_empty().await;
        key_server.fail_with(status).await;
        key_server
    }

    /// Start a key server with no mocks mounted (unmatched requests get 404).
    pub async fn start_empty() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Replace all mocks with one that serves the trusted test key.
    pub async fn serve_test_key(&self) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(PUBLIC_KEY_PATH))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(test_keypair().public_key_spki_base64()),
            )
            .mount(&self.server)
            .await;
    }

    /// Replace all mocks with one that answers `status`.
    pub async fn fail_with(&self, status: u16) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(PUBLIC_KEY_PATH))
            .respond_with(ResponseTemplate::new(status))
            .mount(&self.server)
            .await;
    }

    /// Number of requests the key endpoint has received.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.len())
            .unwrap_or(0)
    }

    /// Full URL of the key endpoint.
    pub fn key_url(&self) -> String {
        format!("{}{}", self.server.uri(), PUBLIC_KEY_PATH)
    }

    /// Underlying mock server, for custom mocks.
    pub fn mock_server(&self) -> &MockServer {
        &self.server
    }
}

/// Environment for a test service pointed at `key_url`.
pub fn test_config_vars(key_url: &str) -> HashMap<String, String> {
    HashMap::from([
        ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
        ("INTER_SERVER_PUBLIC_KEY_URL".to_string(), key_url.to_string()),
        ("INTER_SERVER_JWT_ISSUER".to_string(), TEST_ISSUER.to_string()),
        ("INTER_SERVER_CLIENT_ID".to_string(), TEST_CLIENT_ID.to_string()),
        ("KEY_FETCH_CONNECT_TIMEOUT_MS".to_string(), "1000".to_string()),
        ("KEY_FETCH_TIMEOUT_MS".to_string(), "1000".to_string()),
    ])
}

/// Prometheus handle shared by every test server in the process.
///
/// The global recorder can only be installed once per process; later
/// servers reuse its handle.
pub fn test_metrics_handle() -> PrometheusHandle {
    static HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();
    HANDLE
        .get_or_init(|| {
            routes::init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the extension service in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> anyhow::Result<()> {
///     let key_server = TestKeyServer::start().await;
///     let server = TestExtServer::spawn(&key_server).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestExtServer {
    addr: SocketAddr,
    config: Config,
    key_store: Arc<PublicKeyStore>,
    _handle: JoinHandle<()>,
}

impl TestExtServer {
    /// Spawn a server with the default test configuration.
    ///
    /// The server will:
    /// - Run the startup key fetch against `key_server` (failure is non-fatal)
    /// - Bind to a random available port (127.0.0.1:0)
    /// - Start the HTTP server in the background
    pub async fn spawn(key_server: &TestKeyServer) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(test_config_vars(&key_server.key_url()), Arc::new(FixedNormal(0.0)))
            .await
    }

    /// Spawn a server from explicit environment variables and normal source.
    pub async fn spawn_with_vars(
        vars: HashMap<String, String>,
        normal: Arc<dyn NormalGenerator>,
    ) -> Result<Self, anyhow::Error> {
        // Install the recorder before the startup fetch records anything
        let metrics_handle = test_metrics_handle();

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let key_store = Arc::new(
            PublicKeyStore::new(
                config.public_key_url.clone(),
                config.key_fetch_connect_timeout,
                config.key_fetch_timeout,
            )
            .map_err(|e| anyhow::anyhow!("Failed to create key store: {}", e))?,
        );
        key_store.initialize().await;

        let state = Arc::new(AppState::new(config.clone(), key_store.clone(), normal));

        // Build routes using ext-service's real route builder
        let app = routes::build_routes(state, metrics_handle);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        // Spawn server in background
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            key_store,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Base URL of the protected routes.
    pub fn protected_url(&self) -> String {
        format!("{}{}", self.url(), self.config.protected_path_prefix)
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Key store used by the running server.
    pub fn key_store(&self) -> &Arc<PublicKeyStore> {
        &self.key_store
    }
}

impl Drop for TestExtServer {
    fn drop(&mut self) {
        // Abort the HTTP server task when the test completes
        self._handle.abort();
    }
}
