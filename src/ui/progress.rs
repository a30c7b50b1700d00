use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Gauge, Paragraph};
use ratatui::Frame;
use tokio::io::AsyncWrite;
use tracing::{debug, info};

use super::terminal::{EventSource, Screen, UiEvent};
use crate::application::transfer::{
    progress_channel, DownloadEvent, ProgressReceiver, ProgressSender, TransferStream,
};
use crate::domain::{AppError, TransferState};
use crate::utils::format_bytes;

const REDRAW_INTERVAL: Duration = Duration::from_millis(100);
const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];
const BAR_COLOR: Color = Color::Rgb(0xe2, 0x87, 0x43);

#[derive(Debug, Clone, PartialEq)]
pub enum ProgressPhase {
    Running,
    Done(PathBuf),
    Failed(AppError),
}

pub struct ProgressModel {
    state: Arc<TransferState>,
    ratio: Option<f64>,
    phase: ProgressPhase,
    tick: usize,
}

impl ProgressModel {
    pub fn new(state: Arc<TransferState>) -> Self {
        Self {
            state,
            ratio: None,
            phase: ProgressPhase::Running,
            tick: 0,
        }
    }

    pub fn phase(&self) -> &ProgressPhase {
        &self.phase
    }

    #[cfg(test)]
    pub fn ratio(&self) -> Option<f64> {
        self.ratio
    }

    pub fn update(&mut self, event: DownloadEvent) {
        if self.phase != ProgressPhase::Running {
            return;
        }
        match event {
            DownloadEvent::Progress(ratio) => self.ratio = Some(ratio),
            // bytes are read from the shared state when drawing
            DownloadEvent::Indeterminate(_) => {}
            DownloadEvent::Completed(path) => self.phase = ProgressPhase::Done(path),
            DownloadEvent::Failed(error) => self.phase = ProgressPhase::Failed(error),
        }
    }

    fn tick(&mut self) {
        self.tick = self.tick.wrapping_add(1);
    }

    fn file_name(&self) -> String {
        self.state
            .destination()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

pub fn view(frame: &mut Frame, model: &ProgressModel) {
    let area = frame.area();
    let block = Block::default()
        .title(format!(" Downloading {} ", model.file_name()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(1), // Indicator
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Status
        ])
        .split(inner);

    if model.state.is_indeterminate() {
        let transferred = model.state.bytes_transferred();
        let glyph = match model.phase {
            ProgressPhase::Running => SPINNER[model.tick % SPINNER.len()],
            _ => "•",
        };
        let indicator = Paragraph::new(Line::from(vec![
            Span::styled(format!("{} ", glyph), Style::default().fg(BAR_COLOR)),
            Span::raw(format!("{} received (size unknown)", format_bytes(transferred))),
        ]));
        frame.render_widget(indicator, chunks[0]);
    } else {
        let ratio = model
            .ratio
            .or_else(|| model.state.ratio())
            .unwrap_or(0.0)
            .clamp(0.0, 1.0);
        // label bytes follow the drawn ratio, not the live counter
        let total = model.state.total_bytes();
        let shown = (ratio * total as f64).round() as u64;
        let gauge = Gauge::default()
            .gauge_style(Style::default().fg(BAR_COLOR))
            .ratio(ratio)
            .label(format!(
                "{:.1}% ({} / {})",
                ratio * 100.0,
                format_bytes(shown),
                format_bytes(total)
            ));
        frame.render_widget(gauge, chunks[0]);
    }

    let status = match &model.phase {
        ProgressPhase::Running => Paragraph::new("Ctrl-C: abort")
            .style(Style::default().fg(Color::DarkGray)),
        ProgressPhase::Done(path) => Paragraph::new(format!("Downloaded to {}", path.display()))
            .style(Style::default().fg(Color::Green)),
        ProgressPhase::Failed(error) => {
            Paragraph::new(error.to_string()).style(Style::default().fg(Color::Red))
        }
    };
    frame.render_widget(status, chunks[2]);
}

/// Redraws a progress indicator while a [`TransferStream`] runs on a
/// background task. Owns the progress channel; the sender half goes to the
/// transfer's constructor.
pub struct ProgressSession {
    state: Arc<TransferState>,
    events: ProgressReceiver,
}

impl ProgressSession {
    pub fn new(state: Arc<TransferState>) -> (Self, ProgressSender) {
        let (tx, rx) = progress_channel();
        (Self { state, events: rx }, tx)
    }

    /// Runs until the transfer reports completion or failure.
    ///
    /// There is no timeout: a stalled transfer leaves the bar frozen until
    /// the user aborts.
    pub async fn run<B, E, W>(
        mut self,
        screen: &mut Screen<B, E>,
        transfer: TransferStream<W>,
    ) -> Result<PathBuf, AppError>
    where
        B: Backend,
        E: EventSource,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let task = tokio::spawn(transfer.run());
        let mut model = ProgressModel::new(self.state.clone());

        let driven = self.drive(screen, &mut model, &task).await;
        if !matches!(driven, Ok(ProgressPhase::Done(_))) {
            task.abort();
        }
        let _ = task.await;

        match driven? {
            ProgressPhase::Done(path) => {
                info!(path = %path.display(), "download finished");
                Ok(path)
            }
            ProgressPhase::Failed(error) => Err(error),
            ProgressPhase::Running => Err(AppError::TransferIo(
                "transfer stopped without a result".to_string(),
            )),
        }
    }

    async fn drive<B, E>(
        &mut self,
        screen: &mut Screen<B, E>,
        model: &mut ProgressModel,
        task: &tokio::task::JoinHandle<()>,
    ) -> Result<ProgressPhase, AppError>
    where
        B: Backend,
        E: EventSource,
    {
        let mut ticker = tokio::time::interval(REDRAW_INTERVAL);

        loop {
            screen.draw(|frame| view(frame, &*model))?;
            if model.phase != ProgressPhase::Running {
                return Ok(model.phase.clone());
            }

            tokio::select! {
                event = self.events.recv() => match event {
                    Some(event) => {
                        if event.is_terminal() {
                            debug!(?event, "transfer reported its result");
                        }
                        model.update(event)
                    }
                    None => model.update(DownloadEvent::Failed(AppError::TransferIo(
                        "transfer task ended without a result".to_string(),
                    ))),
                },
                _ = ticker.tick() => model.tick(),
            }
            while let Ok(event) = self.events.try_recv() {
                model.update(event);
            }

            while let Some(input) = screen.next_event(Duration::ZERO).await? {
                if input == UiEvent::Cancel && model.phase == ProgressPhase::Running {
                    debug!("transfer aborted by user");
                    task.abort();
                    model.update(DownloadEvent::Failed(AppError::Interrupted));
                }
            }
        }
    }
}
