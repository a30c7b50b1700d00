//! Interactive terminal sessions.
//!
//! Uses `ratatui` + `crossterm`. The selection and progress sessions run one
//! after the other on the same [`terminal::Screen`].

pub mod progress;
pub mod selection;
pub mod terminal;

pub use progress::ProgressSession;
pub use selection::{run_selection, Matcher};
pub use terminal::{EventSource, Screen, UiEvent};
