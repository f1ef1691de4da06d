//! Remote catalog fetching and manifest parsing.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::app_id::ApplicationId;
use super::error::{ManagerError, Result};
use crate::config::CatalogConfig;

/// Source of catalog data: the manifest, per-application versions and packages.
///
/// Implementations hold no state between calls beyond connection reuse.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the ordered list of application ids from the manifest.
    async fn fetch_catalog_ids(&self) -> Result<Vec<ApplicationId>>;

    /// Fetch the raw, untrimmed latest version string for `id`.
    async fn fetch_latest_version(&self, id: &ApplicationId) -> Result<String>;

    /// Fetch the full package archive for `id`.
    async fn fetch_package(&self, id: &ApplicationId) -> Result<Vec<u8>>;

    /// Location the package for `id` is downloaded from.
    fn package_location(&self, id: &ApplicationId) -> String;
}

/// Split a manifest into application ids.
///
/// Lines are separated by any run of CR and/or LF. Surrounding whitespace is
/// trimmed, empty lines are dropped and invalid ids are skipped. Order is kept.
pub fn parse_manifest(text: &str) -> Vec<ApplicationId> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match ApplicationId::new(line) {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("Skipping catalog entry: {e}");
                None
            }
        })
        .collect()
}

/// Decode a text resource as UTF-8, dropping a leading byte order mark.
fn decode_text(url: &str, bytes: Vec<u8>) -> Result<String> {
    let text = String::from_utf8(bytes).map_err(|e| ManagerError::CatalogFormat {
        url: url.to_string(),
        reason: e.to_string(),
    })?;
    Ok(match text.strip_prefix('\u{feff}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    })
}

/// HTTP catalog client.
///
/// Owns a single `reqwest::Client` for the lifetime of the process so every
/// request shares one connection pool.
#[derive(Debug, Clone)]
pub struct RemoteCatalog {
    client: reqwest::Client,
    config: CatalogConfig,
}

impl RemoteCatalog {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(config: CatalogConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| ManagerError::network(&config.manifest_url, &e))?;
        Ok(Self { client, config })
    }

    /// Catalog settings this client was built with.
    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    async fn get(&self, url: &str) -> Result<reqwest::Response> {
        debug!("GET {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ManagerError::network(url, &e))?;

        if !response.status().is_success() {
            return Err(ManagerError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(response)
    }

    async fn get_bytes(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.get(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ManagerError::network(url, &e))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl CatalogSource for RemoteCatalog {
    async fn fetch_catalog_ids(&self) -> Result<Vec<ApplicationId>> {
        let url = &self.config.manifest_url;
        let bytes = self.get_bytes(url).await?;
        let text = decode_text(url, bytes)?;
        let ids = parse_manifest(&text);
        debug!("Catalog lists {} application(s)", ids.len());
        Ok(ids)
    }

    async fn fetch_latest_version(&self, id: &ApplicationId) -> Result<String> {
        let url = self.config.version_url(id);
        let bytes = self.get_bytes(&url).await?;
        decode_text(&url, bytes)
    }

    async fn fetch_package(&self, id: &ApplicationId) -> Result<Vec<u8>> {
        let url = self.config.package_url(id);
        let bytes = self.get_bytes(&url).await?;
        debug!("Downloaded {} bytes from {url}", bytes.len());
        Ok(bytes)
    }

    fn package_location(&self, id: &ApplicationId) -> String {
        self.config.package_url(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ids: &[ApplicationId]) -> Vec<&str> {
        ids.iter().map(ApplicationId::as_str).collect()
    }

    #[test]
    fn test_parse_manifest_mixed_line_endings() {
        let ids = parse_manifest("app1\r\napp2\n\napp3");
        assert_eq!(names(&ids), vec!["app1", "app2", "app3"]);
    }

    #[test]
    fn test_parse_manifest_keeps_order() {
        let ids = parse_manifest("zeta\nalpha\rmid\r\n");
        assert_eq!(names(&ids), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_parse_manifest_empty() {
        assert!(parse_manifest("").is_empty());
        assert!(parse_manifest("\r\n\r\n  \n").is_empty());
    }

    #[test]
    fn test_parse_manifest_skips_invalid_ids() {
        let ids = parse_manifest("good\n../bad\nalso good\nfine-2 \n");
        assert_eq!(names(&ids), vec!["good", "fine-2"]);
    }

    #[test]
    fn test_decode_text_strips_bom() -> Result<()> {
        let text = decode_text("u", b"\xef\xbb\xbf1.2.0\n".to_vec())?;
        assert_eq!(text, "1.2.0\n");
        Ok(())
    }

    #[test]
    fn test_decode_text_rejects_binary() {
        let err = decode_text("u", vec![0xff, 0xfe, 0x00]);
        assert!(matches!(err, Err(ManagerError::CatalogFormat { .. })));
    }

    #[test]
    fn test_remote_catalog_package_location() -> Result<()> {
        let config = CatalogConfig {
            base_url: "https://example.com/".to_string(),
            package_file: Some("latest_win.zip".to_string()),
            ..Default::default()
        };
        let catalog = RemoteCatalog::new(config)?;
        let id = ApplicationId::new("writer")?;
        assert_eq!(
            catalog.package_location(&id),
            "https://example.com/writer/raw/refs/heads/main/latest_win.zip"
        );
        Ok(())
    }

    mod http {
        use super::*;
        use crate::catalog::error::ErrorCategory;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn catalog_for(server: &MockServer) -> Result<RemoteCatalog> {
            RemoteCatalog::new(CatalogConfig {
                manifest_url: format!("{}/apps.txt", server.uri()),
                base_url: server.uri(),
                content_path: String::new(),
                package_file: Some("latest_win.zip".to_string()),
                ..Default::default()
            })
        }

        async fn serve(server: &MockServer, route: &str, response: ResponseTemplate) {
            Mock::given(method("GET"))
                .and(path(route))
                .respond_with(response)
                .mount(server)
                .await;
        }

        #[tokio::test]
        async fn test_manifest_over_http_keeps_order() -> Result<()> {
            let server = MockServer::start().await;
            serve(
                &server,
                "/apps.txt",
                ResponseTemplate::new(200).set_body_string("app1\r\napp2\n\napp3"),
            )
            .await;

            let ids = catalog_for(&server)?.fetch_catalog_ids().await?;
            assert_eq!(names(&ids), vec!["app1", "app2", "app3"]);
            Ok(())
        }

        #[tokio::test]
        async fn test_manifest_not_found_is_network_error() -> Result<()> {
            let server = MockServer::start().await;
            serve(&server, "/apps.txt", ResponseTemplate::new(404)).await;

            let Err(err) = catalog_for(&server)?.fetch_catalog_ids().await else {
                panic!("a 404 manifest should fail");
            };
            assert!(matches!(err, ManagerError::HttpStatus { status: 404, .. }));
            assert_eq!(err.category(), ErrorCategory::Network);
            Ok(())
        }

        #[tokio::test]
        async fn test_binary_manifest_is_format_error() -> Result<()> {
            let server = MockServer::start().await;
            serve(
                &server,
                "/apps.txt",
                ResponseTemplate::new(200).set_body_bytes(vec![0xff, 0xfe, 0x00, 0x81]),
            )
            .await;

            let Err(err) = catalog_for(&server)?.fetch_catalog_ids().await else {
                panic!("binary manifest should not decode");
            };
            assert_eq!(err.category(), ErrorCategory::CatalogFormat);
            Ok(())
        }

        #[tokio::test]
        async fn test_version_body_is_untrimmed() -> Result<()> {
            let server = MockServer::start().await;
            serve(
                &server,
                "/writer/version.txt",
                ResponseTemplate::new(200).set_body_string("1.2.0\n"),
            )
            .await;

            let id = ApplicationId::new("writer")?;
            let version = catalog_for(&server)?.fetch_latest_version(&id).await?;
            assert_eq!(version, "1.2.0\n");
            Ok(())
        }

        #[tokio::test]
        async fn test_package_fetch() -> Result<()> {
            let server = MockServer::start().await;
            serve(
                &server,
                "/writer/latest_win.zip",
                ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04".to_vec()),
            )
            .await;
            serve(&server, "/calc/latest_win.zip", ResponseTemplate::new(500)).await;

            let catalog = catalog_for(&server)?;
            let bytes = catalog.fetch_package(&ApplicationId::new("writer")?).await?;
            assert_eq!(bytes, b"PK\x03\x04".to_vec());

            let result = catalog.fetch_package(&ApplicationId::new("calc")?).await;
            assert!(matches!(
                result,
                Err(ManagerError::HttpStatus { status: 500, .. })
            ));
            Ok(())
        }
    }
}
