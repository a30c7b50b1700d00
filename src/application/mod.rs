pub mod download_coordinator;
pub mod transfer;

pub use download_coordinator::{DownloadConfig, DownloadCoordinator};
