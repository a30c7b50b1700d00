//! Remote collaborators: the index listing and the artifact download.

pub mod client;
pub mod models;

pub use client::{ApiClient, ApiError, Result};
pub use models::{ApiConfig, FetchResponse};

use crate::domain::ListEntry;

/// Produces the candidate artifacts for a package, in listing order.
pub trait IndexLister {
    async fn list(&self, package: &str) -> Result<Vec<ListEntry>>;
}

/// Opens an artifact download. A non-success status is reported, not raised.
pub trait FileFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse>;
}
