use bytes::Bytes;
use futures::stream::BoxStream;
use reqwest::StatusCode;
use serde::Deserialize;

use super::client::ApiError;

/// Placeholder replaced by the package name in `ApiConfig::index_url`.
pub const PACKAGE_PLACEHOLDER: &str = "{PACKAGE}";

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub index_url: String,
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            index_url: "https://pypi.org/simple/{PACKAGE}/".to_string(),
            user_agent: concat!("wheelgrab/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ApiConfig {
    pub fn listing_url(&self, package: &str) -> String {
        self.index_url.replace(PACKAGE_PLACEHOLDER, package)
    }
}

/// JSON flavour of a simple index project page
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectPage {
    #[serde(default)]
    pub files: Vec<ProjectFile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectFile {
    pub filename: String,
    pub url: String,
}

/// An opened download: status and length as reported, body not yet consumed.
pub struct FetchResponse {
    pub status: StatusCode,
    /// `None` when the server did not announce a length.
    pub content_length: Option<u64>,
    pub body: BoxStream<'static, Result<Bytes, ApiError>>,
}

impl std::fmt::Debug for FetchResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FetchResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_url() {
        let config = ApiConfig::default();
        assert_eq!(
            config.listing_url("requests"),
            "https://pypi.org/simple/requests/"
        );
    }
}
