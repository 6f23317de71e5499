//! Connection testing for host configurations.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use dropbox_publisher_client::{ClientError, ClientFactory};
use dropbox_publisher_common::{BuildInfo, HostConfiguration, ValidationResult, messages};

/// Checks that a host configuration can connect.
///
/// A test connects once, changes to the remote root, and disconnects. Every
/// failure is reported as a [`ValidationResult`], never as an error.
#[derive(Clone)]
pub struct ConnectionTester {
    factory: Arc<dyn ClientFactory>,
    root: PathBuf,
}

impl ConnectionTester {
    /// Creates a tester using `factory` for clients and `root` as the working
    /// directory of the diagnostic context.
    pub fn new(factory: Arc<dyn ClientFactory>, root: impl Into<PathBuf>) -> Self {
        Self {
            factory,
            root: root.into(),
        }
    }

    /// Binds a configuration from raw request parameters and tests it.
    pub async fn test_connection_params(&self, params: &Value) -> ValidationResult {
        match HostConfiguration::from_params(params) {
            Ok(host) => self.test_connection(&host).await,
            Err(e) => {
                warn!(error = %e, "Could not bind connection test parameters");
                failure("BindingError", &e.to_string())
            }
        }
    }

    /// Tests `host`: connect, then disconnect straight away.
    #[instrument(skip(self, host), fields(host = %host.name))]
    pub async fn test_connection(&self, host: &HostConfiguration) -> ValidationResult {
        let build_info = BuildInfo::dummy(self.root.clone());

        match self.connect_and_disconnect(host, &build_info).await {
            Ok(()) => {
                info!("Connection test succeeded");
                ValidationResult::ok(messages::TEST_CONNECTION_OK)
            }
            Err(e) => {
                warn!(kind = e.kind(), error = %e, "Connection test failed");
                failure(e.kind(), &e.to_string())
            }
        }
    }

    async fn connect_and_disconnect(
        &self,
        host: &HostConfiguration,
        build_info: &BuildInfo,
    ) -> Result<(), ClientError> {
        let mut client = self.factory.create_client(host, build_info).await?;
        debug!(remote_root = client.remote_root(), "Connected, disconnecting");
        client.disconnect().await
    }
}

impl std::fmt::Debug for ConnectionTester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionTester")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

fn failure(kind: &str, message: &str) -> ValidationResult {
    ValidationResult::error(messages::TEST_CONNECTION_ERROR).with_detail(format!("{kind}: {message}"))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    #![allow(clippy::expect_used)]

    use super::*;
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use dropbox_publisher_client::{ClientOptions, DropboxClientFactory, FileMetadata, HostClient};
    use dropbox_publisher_common::ValidationKind;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Default)]
    struct FakeFactory {
        fail_with: Option<fn() -> ClientError>,
        calls: Mutex<Vec<(String, PathBuf)>>,
        disconnects: Arc<Mutex<usize>>,
    }

    struct FakeClient {
        disconnects: Arc<Mutex<usize>>,
    }

    #[async_trait]
    impl HostClient for FakeClient {
        fn remote_root(&self) -> &str {
            ""
        }

        async fn create_folder(&mut self, _path: &str) -> Result<(), ClientError> {
            Ok(())
        }

        async fn upload(
            &mut self,
            _local: &Path,
            _remote_path: &str,
        ) -> Result<FileMetadata, ClientError> {
            Err(ClientError::ConfigurationError("not supported".to_string()))
        }

        async fn disconnect(&mut self) -> Result<(), ClientError> {
            *self.disconnects.lock().unwrap() += 1;
            Ok(())
        }
    }

    #[async_trait]
    impl ClientFactory for FakeFactory {
        async fn create_client(
            &self,
            host: &HostConfiguration,
            build_info: &BuildInfo,
        ) -> Result<Box<dyn HostClient>, ClientError> {
            self.calls
                .lock()
                .unwrap()
                .push((host.name.clone(), build_info.base_directory().to_path_buf()));
            if let Some(make_error) = self.fail_with {
                return Err(make_error());
            }
            Ok(Box::new(FakeClient {
                disconnects: Arc::clone(&self.disconnects),
            }))
        }
    }

    fn host() -> HostConfiguration {
        HostConfiguration::builder()
            .name("prod")
            .token("test-token")
            .build()
    }

    #[tokio::test]
    async fn test_success_disconnects() {
        let factory = Arc::new(FakeFactory::default());
        let tester = ConnectionTester::new(factory.clone(), "/var/lib/publisher");

        let result = tester.test_connection(&host()).await;

        assert_eq!(result.kind, ValidationKind::Ok);
        assert_eq!(result.summary, messages::TEST_CONNECTION_OK);
        assert_eq!(*factory.disconnects.lock().unwrap(), 1);

        let calls = factory.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "prod");
        assert_eq!(calls[0].1, PathBuf::from("/var/lib/publisher"));
    }

    #[tokio::test]
    async fn test_failure_reports_kind() {
        let factory = Arc::new(FakeFactory {
            fail_with: Some(|| ClientError::PathNotFound("/builds".to_string())),
            ..FakeFactory::default()
        });
        let tester = ConnectionTester::new(factory.clone(), "/tmp");

        let result = tester.test_connection(&host()).await;

        assert_eq!(result.kind, ValidationKind::Error);
        assert_eq!(result.summary, messages::TEST_CONNECTION_ERROR);
        let detail = result.detail.as_deref().unwrap();
        assert!(detail.starts_with("PathNotFound: "));
        assert!(detail.contains("/builds"));
        assert_eq!(*factory.disconnects.lock().unwrap(), 0);
        // Single attempt
        assert_eq!(factory.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failure_html_is_escaped() {
        let factory = Arc::new(FakeFactory {
            fail_with: Some(|| ClientError::ConfigurationError("<bad & worse>".to_string())),
            ..FakeFactory::default()
        });
        let tester = ConnectionTester::new(factory, "/tmp");

        let html = tester.test_connection(&host()).await.to_html();

        assert!(html.contains("ConfigurationError"));
        assert!(html.contains("&lt;bad &amp; worse&gt;"));
        assert!(!html.contains("<bad"));
    }

    #[tokio::test]
    async fn test_params_binding_failure() {
        let factory = Arc::new(FakeFactory::default());
        let tester = ConnectionTester::new(factory.clone(), "/tmp");

        let result = tester
            .test_connection_params(&json!({"name": "prod"}))
            .await;

        assert_eq!(result.kind, ValidationKind::Error);
        assert!(result.detail.unwrap().starts_with("BindingError: "));
        assert!(factory.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_params_success() {
        let factory = Arc::new(FakeFactory::default());
        let tester = ConnectionTester::new(factory.clone(), "/tmp");

        let result = tester
            .test_connection_params(&json!({
                "name": "adhoc",
                "token": "t",
                "remote_root_dir": "/x",
                "timeout_ms": "2000"
            }))
            .await;

        assert!(result.is_ok());
        assert_eq!(factory.calls.lock().unwrap()[0].0, "adhoc");
    }

    #[tokio::test]
    async fn test_reachable_dropbox_host() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/get_current_account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "account_id": "dbid:1",
                "name": { "display_name": "Build Bot" }
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let factory = DropboxClientFactory::new(
            ClientOptions::default().with_base_url(mock_server.uri()),
        );
        let tester = ConnectionTester::new(Arc::new(factory), "/tmp");

        let result = tester.test_connection(&host()).await;
        assert_eq!(result.kind, ValidationKind::Ok);
        assert_eq!(result.message(), messages::TEST_CONNECTION_OK);
    }

    #[tokio::test]
    async fn test_rejected_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/users/get_current_account"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error_summary": "invalid_access_token/..."
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let factory = DropboxClientFactory::new(
            ClientOptions::default().with_base_url(mock_server.uri()),
        );
        let tester = ConnectionTester::new(Arc::new(factory), "/tmp");

        let result = tester.test_connection(&host()).await;
        assert_eq!(result.kind, ValidationKind::Error);
        assert!(result.message().contains("AuthenticationError"));
    }
}
