//! Test harness driving the real router against a scripted messaging client.
//!
//! Every harness gets its own temporary session directory, so tests can run
//! in parallel without sharing storage.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use pairing_core::domains::pairing::PairingSettings;
use pairing_core::domains::session::SessionStore;
use pairing_core::kernel::{MockClientFactory, MockScript, ServerDeps};
use pairing_core::server::build_app;
use serde_json::Value;
use tempfile::TempDir;
use test_context::AsyncTestContext;
use tower::ServiceExt;

/// Test harness that owns the app and its mock dependencies.
///
/// # Example using test-context
///
/// ```ignore
/// use test_context::test_context;
///
/// #[test_context(TestHarness)]
/// #[tokio::test]
/// async fn my_test(ctx: &TestHarness) {
///     let (status, body) = ctx.pair("15550001234").await;
///     // ... assertions
/// }
/// ```
pub struct TestHarness {
    pub app: Router,
    pub factory: Arc<MockClientFactory>,
    pub session_dir: PathBuf,
    _tmp: TempDir,
}

impl AsyncTestContext for TestHarness {
    async fn setup() -> Self {
        Self::with_script(MockScript::default())
    }

    async fn teardown(self) {
        // Temp session directory is removed on drop
    }
}

impl TestHarness {
    /// Short timeouts so failure paths finish quickly.
    pub fn test_settings() -> PairingSettings {
        PairingSettings {
            timeout: Duration::from_millis(500),
            linger: Duration::from_millis(50),
            require_session_dir: false,
        }
    }

    pub fn with_script(script: MockScript) -> Self {
        Self::with_settings(script, Self::test_settings())
    }

    pub fn with_settings(script: MockScript, settings: PairingSettings) -> Self {
        // Respect RUST_LOG; try_init because many tests share the process
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();

        let tmp = tempfile::tempdir().expect("Failed to create temp dir");
        let session_dir = tmp.path().join(".wwebjs_auth");
        let factory = Arc::new(MockClientFactory::new(script));
        let deps = ServerDeps::new(
            factory.clone(),
            SessionStore::new(session_dir.clone()),
            settings,
        );

        Self {
            app: build_app(deps),
            factory,
            session_dir,
            _tmp: tmp,
        }
    }

    /// Write a file into the session directory as the library would.
    pub fn write_session_file(&self, name: &str, content: &str) {
        let path = self.session_dir.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create session subdir");
        }
        std::fs::write(path, content).expect("Failed to write session file");
    }

    /// POST /pair with `phone=<phone>` (phone must already be form-encoded)
    pub async fn pair(&self, phone: &str) -> (StatusCode, Value) {
        self.post_form("/pair", &format!("phone={}", phone)).await
    }

    pub async fn post_form(&self, path: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::post(path)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .expect("valid request");
        self.send_json(request).await
    }

    pub async fn get_json(&self, path: &str) -> (StatusCode, Value) {
        let request = Request::get(path).body(Body::empty()).expect("valid request");
        self.send_json(request).await
    }

    /// Send a request and return status, content type and raw body.
    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");

        (status, content_type, bytes.to_vec())
    }

    pub async fn send_json(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, bytes) = self.send(request).await;
        let body = serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            panic!(
                "Response was not JSON ({}): {}",
                e,
                String::from_utf8_lossy(&bytes)
            )
        });
        (status, body)
    }

    /// Wait for background work (client linger) to settle.
    pub async fn settle(&self) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }
}
