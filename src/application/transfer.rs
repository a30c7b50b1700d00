use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use futures::{stream::BoxStream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::domain::{AppError, TransferState};

/// Largest slice written (and reported) at once.
pub const CHUNK_SIZE: usize = 32 * 1024;

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    /// Fraction of the announced length written so far.
    Progress(f64),
    /// Bytes written so far when no length was announced.
    Indeterminate(u64),
    Completed(PathBuf),
    Failed(AppError),
}

impl DownloadEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadEvent::Completed(_) | DownloadEvent::Failed(_))
    }
}

pub type ProgressSender = mpsc::Sender<DownloadEvent>;
pub type ProgressReceiver = mpsc::Receiver<DownloadEvent>;

pub fn progress_channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::channel(CHANNEL_CAPACITY)
}

/// Copies a download body into a writer, counting bytes into the shared
/// [`TransferState`] and reporting each written slice on the progress channel.
///
/// The final event is always `Completed` or `Failed`; errors never escape
/// [`TransferStream::run`] any other way.
pub struct TransferStream<W> {
    source: BoxStream<'static, Result<Bytes, ApiError>>,
    writer: W,
    state: Arc<TransferState>,
    events: ProgressSender,
}

impl<W> TransferStream<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        source: BoxStream<'static, Result<Bytes, ApiError>>,
        writer: W,
        state: Arc<TransferState>,
        events: ProgressSender,
    ) -> Self {
        Self {
            source,
            writer,
            state,
            events,
        }
    }

    pub async fn run(self) {
        let TransferStream {
            mut source,
            mut writer,
            state,
            events,
        } = self;

        let event = match copy(&mut source, &mut writer, &state, &events).await {
            Ok(()) => {
                debug!(
                    bytes = state.bytes_transferred(),
                    path = %state.destination().display(),
                    "transfer complete"
                );
                DownloadEvent::Completed(state.destination().to_path_buf())
            }
            Err(e) => {
                warn!(error = %e, bytes = state.bytes_transferred(), "transfer failed");
                // the partial file stays on disk
                let _ = writer.flush().await;
                DownloadEvent::Failed(e)
            }
        };

        // the session may already be gone
        let _ = events.send(event).await;
    }
}

async fn copy<W>(
    source: &mut BoxStream<'static, Result<Bytes, ApiError>>,
    writer: &mut W,
    state: &TransferState,
    events: &ProgressSender,
) -> Result<(), AppError>
where
    W: AsyncWrite + Unpin,
{
    let total = state.total_bytes();

    while let Some(chunk) = source.next().await {
        let chunk = chunk.map_err(|e| AppError::TransferIo(format!("read error: {}", e)))?;

        for piece in chunk.chunks(CHUNK_SIZE) {
            writer
                .write_all(piece)
                .await
                .map_err(|e| AppError::TransferIo(format!("write error: {}", e)))?;

            let transferred = state.advance(piece.len() as u64);
            if total > 0 && transferred > total {
                return Err(AppError::TransferIo(format!(
                    "long read: received more than the announced {} bytes",
                    total
                )));
            }
            let event = if total > 0 {
                DownloadEvent::Progress((transferred as f64 / total as f64).min(1.0))
            } else {
                DownloadEvent::Indeterminate(transferred)
            };

            if events.send(event).await.is_err() {
                return Err(AppError::Interrupted);
            }
        }
    }

    let received = state.bytes_transferred();
    if total > 0 && received < total {
        return Err(AppError::TransferIo(format!(
            "short read: received {} of {} bytes",
            received, total
        )));
    }

    writer
        .shutdown()
        .await
        .map_err(|e| AppError::TransferIo(format!("failed to flush file: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};

    fn body(chunks: &[usize]) -> BoxStream<'static, Result<Bytes, ApiError>> {
        let items: Vec<Result<Bytes, ApiError>> = chunks
            .iter()
            .map(|&len| Ok(Bytes::from(vec![b'x'; len])))
            .collect();
        futures::stream::iter(items).boxed()
    }

    async fn run_to_end<W>(transfer: TransferStream<W>, mut rx: ProgressReceiver) -> Vec<DownloadEvent>
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let task = tokio::spawn(transfer.run());
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        task.await.unwrap();
        events
    }

    fn ratios(events: &[DownloadEvent]) -> Vec<f64> {
        events
            .iter()
            .filter_map(|e| match e {
                DownloadEvent::Progress(r) => Some(*r),
                _ => None,
            })
            .collect()
    }

    struct BrokenWriter;

    impl AsyncWrite for BrokenWriter {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn test_two_halves_report_half_then_full() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg-1.0.1.whl");
        let file = tokio::fs::File::create(&path).await.unwrap();
        let state = Arc::new(TransferState::new(100, path.clone()));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(body(&[50, 50]), file, state.clone(), tx), rx).await;

        assert_eq!(
            events,
            vec![
                DownloadEvent::Progress(0.5),
                DownloadEvent::Progress(1.0),
                DownloadEvent::Completed(path.clone()),
            ]
        );
        assert_eq!(state.bytes_transferred(), 100);
        assert_eq!(std::fs::read(&path).unwrap(), vec![b'x'; 100]);
    }

    #[tokio::test]
    async fn test_ratios_are_monotonic_and_reach_one_once() {
        for sizes in [vec![1, 7, 30, 62], vec![100], vec![99, 1], vec![25, 25, 25, 25]] {
            let state = Arc::new(TransferState::new(100, PathBuf::from("unused")));
            let (tx, rx) = progress_channel();
            let events =
                run_to_end(TransferStream::new(body(&sizes), Vec::<u8>::new(), state, tx), rx).await;

            let seen = ratios(&events);
            assert_eq!(seen.len(), sizes.len());
            assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{seen:?}");
            assert_eq!(seen.iter().filter(|&&r| r == 1.0).count(), 1);
            assert_eq!(seen.last(), Some(&1.0));
            assert!(events.last().unwrap().is_terminal());
        }
    }

    #[tokio::test]
    async fn test_large_chunk_is_split() {
        let total = 3 * CHUNK_SIZE + 10;
        let state = Arc::new(TransferState::new(total as u64, PathBuf::from("unused")));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(body(&[total]), Vec::<u8>::new(), state, tx), rx).await;

        assert_eq!(ratios(&events).len(), 4);
        assert!(matches!(events.last(), Some(DownloadEvent::Completed(_))));
    }

    #[tokio::test]
    async fn test_unknown_length_reports_indeterminate() {
        let state = Arc::new(TransferState::new(0, PathBuf::from("out.bin")));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(body(&[10, 20]), Vec::<u8>::new(), state, tx), rx).await;

        assert_eq!(
            events,
            vec![
                DownloadEvent::Indeterminate(10),
                DownloadEvent::Indeterminate(30),
                DownloadEvent::Completed(PathBuf::from("out.bin")),
            ]
        );
    }

    #[tokio::test]
    async fn test_short_read_fails() {
        let state = Arc::new(TransferState::new(100, PathBuf::from("unused")));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(body(&[40]), Vec::<u8>::new(), state, tx), rx).await;

        match events.last() {
            Some(DownloadEvent::Failed(AppError::TransferIo(message))) => {
                assert!(message.contains("40 of 100"), "{message}");
            }
            other => panic!("unexpected final event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_long_read_fails_without_second_full_ratio() {
        let state = Arc::new(TransferState::new(100, PathBuf::from("unused")));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(body(&[60, 60]), Vec::<u8>::new(), state, tx), rx).await;

        assert_eq!(ratios(&events), vec![0.6]);
        match events.last() {
            Some(DownloadEvent::Failed(AppError::TransferIo(message))) => {
                assert!(message.contains("long read"), "{message}");
            }
            other => panic!("unexpected final event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_read_error_fails() {
        let source = futures::stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err(ApiError::InvalidResponse("connection reset".into())),
        ])
        .boxed();
        let state = Arc::new(TransferState::new(10, PathBuf::from("unused")));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(source, Vec::<u8>::new(), state.clone(), tx), rx).await;

        assert_eq!(state.bytes_transferred(), 3);
        assert!(matches!(
            events.last(),
            Some(DownloadEvent::Failed(AppError::TransferIo(m))) if m.contains("connection reset")
        ));
    }

    #[tokio::test]
    async fn test_write_error_fails() {
        let state = Arc::new(TransferState::new(10, PathBuf::from("unused")));
        let (tx, rx) = progress_channel();

        let events = run_to_end(TransferStream::new(body(&[10]), BrokenWriter, state, tx), rx).await;

        assert_eq!(events.len(), 1);
        assert!(matches!(
            &events[0],
            DownloadEvent::Failed(AppError::TransferIo(m)) if m.contains("disk full")
        ));
    }
}
