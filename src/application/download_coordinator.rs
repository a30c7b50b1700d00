use std::path::{Path, PathBuf};
use std::sync::Arc;

use ratatui::backend::Backend;
use tracing::{info, warn};

use super::transfer::TransferStream;
use crate::{
    api::{FetchResponse, FileFetcher, IndexLister},
    domain::{AppError, Outcome, Selection, TransferState},
    ui::{run_selection, EventSource, Matcher, ProgressSession, Screen},
    utils::file_name_from_url,
};

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub download_dir: PathBuf,
    /// Refuse downloads whose length is not announced.
    pub require_content_length: bool,
    pub matcher: Matcher,
}

/// Sequences list, select, download and report for one package.
pub struct DownloadCoordinator<L, F> {
    lister: L,
    fetcher: F,
    config: DownloadConfig,
}

impl<L, F> DownloadCoordinator<L, F>
where
    L: IndexLister,
    F: FileFetcher,
{
    pub fn new(lister: L, fetcher: F, config: DownloadConfig) -> Self {
        Self {
            lister,
            fetcher,
            config,
        }
    }

    pub async fn run<B, E>(&self, package: &str, screen: &mut Screen<B, E>) -> Outcome
    where
        B: Backend,
        E: EventSource,
    {
        let result = self.try_run(package, screen).await;

        if let Err(e) = screen.leave() {
            warn!(error = %e, "failed to restore terminal");
        }

        match result {
            Ok(final_path) => Outcome::Success { final_path },
            Err(e) => {
                info!(reason = %e, "run failed");
                Outcome::Failure {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn try_run<B, E>(&self, package: &str, screen: &mut Screen<B, E>) -> Result<PathBuf, AppError>
    where
        B: Backend,
        E: EventSource,
    {
        let entries = self
            .lister
            .list(package)
            .await
            .map_err(|e| AppError::IndexFetch(e.to_string()))?;
        if entries.is_empty() {
            return Err(AppError::IndexEmpty {
                package: package.to_string(),
            });
        }
        info!(package, count = entries.len(), "index listed");

        screen.enter()?;
        let title = format!("Which file of {} would you like to download?", package);
        let entry = match run_selection(screen, &title, entries, self.config.matcher).await? {
            Selection::Chosen(entry) => entry,
            Selection::Cancelled => return Err(AppError::Cancelled),
        };
        info!(label = %entry.label, url = %entry.url, "entry selected");

        let file_name = file_name_from_url(&entry.url).ok_or_else(|| {
            AppError::Preflight(format!("cannot derive a file name from {}", entry.url))
        })?;

        let response = self
            .fetcher
            .fetch(&entry.url)
            .await
            .map_err(|e| AppError::Preflight(e.to_string()))?;
        let total = preflight(&entry.url, &response, self.config.require_content_length)?;

        let destination = self.config.download_dir.join(file_name);
        let file = create_destination(&self.config.download_dir, &destination).await?;
        info!(path = %destination.display(), total, "download started");

        let state = Arc::new(TransferState::new(total, destination));
        let (session, events) = ProgressSession::new(state.clone());
        let transfer = TransferStream::new(response.body, file, state, events);
        session.run(screen, transfer).await
    }
}

/// Checks status and length before anything touches the disk.
/// Returns the total length, `0` when unknown.
fn preflight(url: &str, response: &FetchResponse, require_length: bool) -> Result<u64, AppError> {
    if !response.status.is_success() {
        return Err(AppError::Preflight(format!(
            "receiving status of {} for url: {}",
            response.status, url
        )));
    }

    match response.content_length {
        Some(len) => Ok(len),
        None if require_length => Err(AppError::Preflight(format!(
            "content length unknown for url: {}",
            url
        ))),
        None => Ok(0),
    }
}

/// Create-or-truncate; a same-named file from an earlier run is overwritten.
async fn create_destination(dir: &Path, path: &Path) -> Result<tokio::fs::File, AppError> {
    let destination_error = |e: std::io::Error| AppError::Destination {
        path: path.display().to_string(),
        message: e.to_string(),
    };

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(destination_error)?;
    tokio::fs::File::create(path)
        .await
        .map_err(destination_error)
}
