use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// One selectable artifact from an index listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListEntry {
    pub label: String,
    pub url: String,
}

impl ListEntry {
    pub fn new(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: url.into(),
        }
    }
}

/// Result of a selection session. The chosen entry carries its own URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Chosen(ListEntry),
    Cancelled,
}

/// Progress counters for an in-flight download.
///
/// Only the transfer task writes `bytes_transferred`; the progress session
/// reads it while redrawing.
#[derive(Debug)]
pub struct TransferState {
    bytes_transferred: AtomicU64,
    total_bytes: u64,
    destination: PathBuf,
}

impl TransferState {
    /// `total_bytes == 0` means the length is unknown.
    pub fn new(total_bytes: u64, destination: PathBuf) -> Self {
        Self {
            bytes_transferred: AtomicU64::new(0),
            total_bytes,
            destination,
        }
    }

    pub fn bytes_transferred(&self) -> u64 {
        self.bytes_transferred.load(Ordering::Acquire)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn is_indeterminate(&self) -> bool {
        self.total_bytes == 0
    }

    /// Fraction transferred, or `None` while the length is unknown.
    pub fn ratio(&self) -> Option<f64> {
        if self.total_bytes == 0 {
            return None;
        }
        let ratio = self.bytes_transferred() as f64 / self.total_bytes as f64;
        Some(ratio.min(1.0))
    }

    /// Records `n` more bytes and returns the new running total.
    pub(crate) fn advance(&self, n: u64) -> u64 {
        self.bytes_transferred.fetch_add(n, Ordering::AcqRel) + n
    }
}

/// Terminal result of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { final_path: PathBuf },
    Failure { reason: String },
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ratio_unknown_length() {
        let state = TransferState::new(0, PathBuf::from("/tmp/x"));
        state.advance(10);
        assert!(state.is_indeterminate());
        assert_eq!(state.ratio(), None);
        assert_eq!(state.bytes_transferred(), 10);
    }

    #[test]
    fn test_ratio_known_length() {
        let state = TransferState::new(200, PathBuf::from("/tmp/x"));
        assert_eq!(state.advance(50), 50);
        assert_eq!(state.ratio(), Some(0.25));
        assert_eq!(state.advance(150), 200);
        assert_eq!(state.ratio(), Some(1.0));
    }
}
