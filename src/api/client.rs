use futures::{StreamExt, TryStreamExt};
use regex::Regex;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use thiserror::Error;
use tracing::debug;
use url::Url;

use super::models::{ApiConfig, FetchResponse, ProjectPage};
use super::{FileFetcher, IndexLister};
use crate::domain::ListEntry;

const LISTING_ACCEPT: &str = "application/vnd.pypi.simple.v1+json, text/html;q=0.1";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("receiving status of {status} for url: {url}")]
    Status { status: u16, url: String },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    http: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Result<Self> {
        let http = Client::builder().user_agent(&config.user_agent).build()?;
        Ok(Self { config, http })
    }
}

impl IndexLister for ApiClient {
    async fn list(&self, package: &str) -> Result<Vec<ListEntry>> {
        let url = self.config.listing_url(package);
        debug!(%url, "fetching index listing");

        let response = self
            .http
            .get(&url)
            .header(ACCEPT, LISTING_ACCEPT)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.contains("json"))
            .unwrap_or(false);
        // relative links resolve against wherever redirects landed us
        let base = response.url().to_string();
        let body = response.text().await?;

        let entries = if is_json {
            parse_json_listing(&body, &base)?
        } else {
            parse_html_listing(&body, &base)?
        };
        debug!(count = entries.len(), json = is_json, "parsed index listing");
        Ok(entries)
    }
}

impl FileFetcher for ApiClient {
    async fn fetch(&self, url: &str) -> Result<FetchResponse> {
        debug!(%url, "opening download");
        let response = self.http.get(url).send().await?;

        let status = response.status();
        let content_length = response.content_length().filter(|&len| len > 0);
        let body = response
            .bytes_stream()
            .map_err(ApiError::RequestError)
            .boxed();

        Ok(FetchResponse {
            status,
            content_length,
            body,
        })
    }
}

/// Collect every `<a href=...>label</a>` in document order.
pub fn parse_html_listing(html: &str, base: &str) -> Result<Vec<ListEntry>> {
    let anchor = Regex::new(r#"(?is)<a\b((?:[^>"']|"[^"]*"|'[^']*')*)>(.*?)</a\s*>"#)
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    let href = Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#)
        .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
    let inner_tag =
        Regex::new(r"<[^>]*>").map_err(|e| ApiError::InvalidResponse(e.to_string()))?;

    let entries = anchor
        .captures_iter(html)
        .filter_map(|caps| {
            let attrs = caps.get(1)?.as_str();
            let target = href.captures(attrs).and_then(|h| {
                h.get(1)
                    .or_else(|| h.get(2))
                    .or_else(|| h.get(3))
                    .map(|m| decode_entities(m.as_str()))
            })?;
            let text = inner_tag.replace_all(caps.get(2)?.as_str(), "");
            let label = decode_entities(text.trim());
            Some(ListEntry::new(label, resolve_url(base, &target)))
        })
        .collect();

    Ok(entries)
}

pub fn parse_json_listing(body: &str, base: &str) -> Result<Vec<ListEntry>> {
    let page: ProjectPage = serde_json::from_str(body)
        .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

    Ok(page
        .files
        .into_iter()
        .map(|file| ListEntry::new(file.filename, resolve_url(base, &file.url)))
        .collect())
}

fn resolve_url(base: &str, target: &str) -> String {
    Url::parse(base)
        .and_then(|base| base.join(target))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| target.to_string())
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}
