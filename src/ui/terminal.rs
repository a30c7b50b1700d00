use std::io::{self, Stdout};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use ratatui::backend::{Backend, CrosstermBackend};
use ratatui::{Frame, Terminal};

/// Input understood by the interactive sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiEvent {
    Up,
    Down,
    PageUp,
    PageDown,
    Home,
    End,
    Confirm,
    Cancel,
    Input(char),
    Backspace,
    ClearFilter,
    Resize(u16, u16),
}

pub trait EventSource {
    /// Waits up to `timeout` for the next event. `Ok(None)` means the timer fired.
    async fn next_event(&mut self, timeout: Duration) -> io::Result<Option<UiEvent>>;
}

/// Keyboard and resize events read from the controlling terminal.
///
/// crossterm's poll blocks, so it runs on the blocking pool and the runtime
/// keeps driving other tasks while the user thinks.
pub struct CrosstermEvents;

impl EventSource for CrosstermEvents {
    async fn next_event(&mut self, timeout: Duration) -> io::Result<Option<UiEvent>> {
        tokio::task::spawn_blocking(move || read_event(timeout))
            .await
            .map_err(io::Error::other)?
    }
}

fn read_event(timeout: Duration) -> io::Result<Option<UiEvent>> {
    if !event::poll(timeout)? {
        return Ok(None);
    }
    match event::read()? {
        // Windows reports releases too
        Event::Key(key) if key.kind == KeyEventKind::Press => Ok(map_key(key)),
        Event::Resize(width, height) => Ok(Some(UiEvent::Resize(width, height))),
        _ => Ok(None),
    }
}

pub fn map_key(key: KeyEvent) -> Option<UiEvent> {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Char('c') if ctrl => Some(UiEvent::Cancel),
        KeyCode::Char('p') if ctrl => Some(UiEvent::Up),
        KeyCode::Char('n') if ctrl => Some(UiEvent::Down),
        KeyCode::Char('u') if ctrl => Some(UiEvent::ClearFilter),
        KeyCode::Char(_) if ctrl || key.modifiers.contains(KeyModifiers::ALT) => None,
        KeyCode::Char(c) => Some(UiEvent::Input(c)),
        KeyCode::Up => Some(UiEvent::Up),
        KeyCode::Down => Some(UiEvent::Down),
        KeyCode::PageUp => Some(UiEvent::PageUp),
        KeyCode::PageDown => Some(UiEvent::PageDown),
        KeyCode::Home => Some(UiEvent::Home),
        KeyCode::End => Some(UiEvent::End),
        KeyCode::Enter => Some(UiEvent::Confirm),
        KeyCode::Esc => Some(UiEvent::Cancel),
        KeyCode::Backspace => Some(UiEvent::Backspace),
        _ => None,
    }
}

/// Replays a fixed list of events, then reports only timer ticks.
#[cfg(test)]
pub struct ScriptedEvents {
    queue: std::collections::VecDeque<UiEvent>,
}

#[cfg(test)]
impl ScriptedEvents {
    pub fn new(events: impl IntoIterator<Item = UiEvent>) -> Self {
        Self {
            queue: events.into_iter().collect(),
        }
    }
}

#[cfg(test)]
impl EventSource for ScriptedEvents {
    async fn next_event(&mut self, _timeout: Duration) -> io::Result<Option<UiEvent>> {
        Ok(self.queue.pop_front())
    }
}

/// The drawing surface and input source shared by the sessions, one at a time.
pub struct Screen<B: Backend, E: EventSource> {
    terminal: Terminal<B>,
    events: E,
    owns_tty: bool,
    entered: bool,
}

impl Screen<CrosstermBackend<Stdout>, CrosstermEvents> {
    pub fn stdout() -> io::Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
        Ok(Self {
            terminal,
            events: CrosstermEvents,
            owns_tty: true,
            entered: false,
        })
    }
}

impl<B: Backend, E: EventSource> Screen<B, E> {
    /// A screen over an arbitrary backend; raw mode is never touched.
    pub fn new(backend: B, events: E) -> io::Result<Self> {
        Ok(Self {
            terminal: Terminal::new(backend)?,
            events,
            owns_tty: false,
            entered: false,
        })
    }

    pub fn enter(&mut self) -> io::Result<()> {
        if self.entered {
            return Ok(());
        }
        if self.owns_tty {
            enable_raw_mode()?;
            crossterm::execute!(io::stdout(), EnterAlternateScreen)?;
        }
        self.terminal.clear()?;
        self.entered = true;
        Ok(())
    }

    pub fn leave(&mut self) -> io::Result<()> {
        if !self.entered {
            return Ok(());
        }
        self.entered = false;
        if self.owns_tty {
            disable_raw_mode()?;
            crossterm::execute!(io::stdout(), LeaveAlternateScreen)?;
        }
        self.terminal.show_cursor()?;
        Ok(())
    }

    pub fn draw<F>(&mut self, render: F) -> io::Result<()>
    where
        F: FnOnce(&mut Frame),
    {
        self.terminal.draw(render)?;
        Ok(())
    }

    pub async fn next_event(&mut self, timeout: Duration) -> io::Result<Option<UiEvent>> {
        self.events.next_event(timeout).await
    }

    #[cfg(test)]
    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }
}

impl<B: Backend, E: EventSource> Drop for Screen<B, E> {
    fn drop(&mut self) {
        let _ = self.leave();
    }
}
