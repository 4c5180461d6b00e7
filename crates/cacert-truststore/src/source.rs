//! Certificate content sources: local files, HTTP(S) URLs, inline text.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use crate::TrustStoreError;

const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Where a certificate's bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CertSource {
    Path(PathBuf),
    Url(Url),
    Inline(String),
}

impl CertSource {
    /// Parse a `source` reference: `http(s)://` URLs, `file://` URLs and
    /// plain filesystem paths. Other schemes are rejected.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err("source must not be empty".to_string());
        }
        if !raw.contains("://") {
            return Ok(Self::Path(PathBuf::from(raw)));
        }
        let url = Url::parse(raw).map_err(|e| format!("invalid source URL {raw:?}: {e}"))?;
        match url.scheme() {
            "http" | "https" => Ok(Self::Url(url)),
            "file" => url
                .to_file_path()
                .map(Self::Path)
                .map_err(|_| format!("invalid file URL {raw:?}")),
            other => Err(format!("unsupported source scheme {other:?}")),
        }
    }
}

impl fmt::Display for CertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u.as_str()),
            Self::Inline(text) => write!(f, "<inline {} bytes>", text.len()),
        }
    }
}

/// Capability to materialize certificate content.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    async fn fetch(&self, source: &CertSource, verify_https: bool)
        -> Result<Vec<u8>, TrustStoreError>;
}

/// Reads local files and fetches URLs with `reqwest`.
pub struct HostSources {
    strict: reqwest::Client,
    insecure: reqwest::Client,
}

impl HostSources {
    pub fn new() -> Result<Self, TrustStoreError> {
        let build = |verify: bool| {
            reqwest::Client::builder()
                .timeout(FETCH_TIMEOUT)
                .danger_accept_invalid_certs(!verify)
                .build()
                .map_err(|e| TrustStoreError::Source(format!("http client: {e}")))
        };
        Ok(Self {
            strict: build(true)?,
            insecure: build(false)?,
        })
    }
}

#[async_trait]
impl SourceResolver for HostSources {
    async fn fetch(
        &self,
        source: &CertSource,
        verify_https: bool,
    ) -> Result<Vec<u8>, TrustStoreError> {
        match source {
            CertSource::Inline(text) => Ok(text.as_bytes().to_vec()),
            CertSource::Path(path) => tokio::fs::read(path)
                .await
                .map_err(|e| TrustStoreError::Source(format!("{}: {e}", path.display()))),
            CertSource::Url(url) => {
                if !verify_https && url.scheme() == "https" {
                    tracing::warn!(url = %url, "Fetching without server certificate verification");
                }
                let client = if verify_https { &self.strict } else { &self.insecure };
                let response = client
                    .get(url.clone())
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| TrustStoreError::Source(format!("{url}: {e}")))?;
                let body = response
                    .bytes()
                    .await
                    .map_err(|e| TrustStoreError::Source(format!("{url}: {e}")))?;
                Ok(body.to_vec())
            }
        }
    }
}
