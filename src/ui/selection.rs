//! Filterable, scrollable list that resolves to one entry or a cancellation.
//!
//! Navigation clamps at both ends of the visible list. Typing any printable
//! character filters; the filter stays active (even when emptied) until the
//! session is confirmed or cancelled.

use std::io;
use std::time::Duration;

use ratatui::backend::Backend;
use ratatui::layout::{Constraint, Direction, Layout};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{List, ListItem, ListState, Paragraph};
use ratatui::Frame;
use tracing::debug;

use super::terminal::{EventSource, Screen, UiEvent};
use crate::domain::{ListEntry, Selection};

const POLL_INTERVAL: Duration = Duration::from_millis(250);
const HIGHLIGHT: Color = Color::Indexed(170);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Browsing,
    Filtering,
    Confirmed,
    Cancelled,
}

/// How typed filter text is matched against labels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Matcher {
    /// Case-insensitive subsequence.
    #[default]
    Fuzzy,
    /// Case-insensitive substring.
    Substring,
}

impl Matcher {
    pub fn matches(self, label: &str, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }
        match self {
            Matcher::Fuzzy => {
                let mut haystack = label.chars().flat_map(char::to_lowercase);
                query
                    .chars()
                    .flat_map(char::to_lowercase)
                    .all(|q| haystack.any(|h| h == q))
            }
            Matcher::Substring => label.to_lowercase().contains(&query.to_lowercase()),
        }
    }
}

pub struct SelectionModel {
    title: String,
    entries: Vec<ListEntry>,
    matcher: Matcher,
    filter: String,
    /// Indices into `entries` that pass the filter, in listing order.
    visible: Vec<usize>,
    /// Index into `entries`, so it survives re-filtering.
    highlighted: Option<usize>,
    state: SelectionState,
    list_state: ListState,
    page_size: usize,
    width: u16,
}

impl SelectionModel {
    pub fn new(title: impl Into<String>, entries: Vec<ListEntry>, matcher: Matcher) -> Self {
        let visible: Vec<usize> = (0..entries.len()).collect();
        let highlighted = visible.first().copied();
        Self {
            title: title.into(),
            entries,
            matcher,
            filter: String::new(),
            visible,
            highlighted,
            state: SelectionState::Browsing,
            list_state: ListState::default(),
            page_size: 10,
            width: 0,
        }
    }

    pub fn state(&self) -> SelectionState {
        self.state
    }

    #[cfg(test)]
    pub fn filter(&self) -> &str {
        &self.filter
    }

    pub fn visible_entries(&self) -> impl Iterator<Item = &ListEntry> {
        self.visible.iter().map(|&i| &self.entries[i])
    }

    pub fn highlighted(&self) -> Option<&ListEntry> {
        self.highlighted.map(|i| &self.entries[i])
    }

    /// `Some` once the session has reached a terminal state.
    pub fn selection(&self) -> Option<Selection> {
        match self.state {
            SelectionState::Confirmed => self.highlighted().cloned().map(Selection::Chosen),
            SelectionState::Cancelled => Some(Selection::Cancelled),
            _ => None,
        }
    }

    pub fn update(&mut self, event: UiEvent) {
        if matches!(
            self.state,
            SelectionState::Confirmed | SelectionState::Cancelled
        ) {
            return;
        }

        match event {
            UiEvent::Up => self.move_by(-1),
            UiEvent::Down => self.move_by(1),
            UiEvent::PageUp => self.move_by(-(self.page_size.max(1) as isize)),
            UiEvent::PageDown => self.move_by(self.page_size.max(1) as isize),
            UiEvent::Home => self.highlighted = self.visible.first().copied(),
            UiEvent::End => self.highlighted = self.visible.last().copied(),
            UiEvent::Confirm => {
                if self.highlighted.is_some() {
                    self.state = SelectionState::Confirmed;
                }
            }
            UiEvent::Cancel => self.state = SelectionState::Cancelled,
            UiEvent::Input(c) => {
                self.filter.push(c);
                self.state = SelectionState::Filtering;
                self.refilter();
            }
            UiEvent::Backspace => {
                if self.filter.pop().is_some() {
                    self.refilter();
                }
            }
            UiEvent::ClearFilter => {
                self.filter.clear();
                self.refilter();
            }
            UiEvent::Resize(width, _) => self.width = width,
        }
    }

    fn position(&self) -> Option<usize> {
        let highlighted = self.highlighted?;
        self.visible.iter().position(|&i| i == highlighted)
    }

    fn move_by(&mut self, delta: isize) {
        let Some(current) = self.position() else {
            return;
        };
        let last = self.visible.len() as isize - 1;
        let next = (current as isize + delta).clamp(0, last) as usize;
        self.highlighted = Some(self.visible[next]);
    }

    fn refilter(&mut self) {
        let (filter, matcher) = (&self.filter, self.matcher);
        self.visible = self
            .entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| matcher.matches(&entry.label, filter))
            .map(|(i, _)| i)
            .collect();

        let still_visible = self
            .highlighted
            .is_some_and(|h| self.visible.contains(&h));
        if !still_visible {
            self.highlighted = self.visible.first().copied();
        }
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let keep = width.saturating_sub(1);
    let mut out: String = text.chars().take(keep).collect();
    out.push('…');
    out
}

pub fn view(frame: &mut Frame, model: &mut SelectionModel) {
    let area = frame.area();
    model.width = area.width;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title
            Constraint::Length(1), // Filter
            Constraint::Min(1),    // Entries
            Constraint::Length(1), // Status
            Constraint::Length(1), // Help
        ])
        .split(area);

    let title = Paragraph::new(Line::from(Span::styled(
        format!("  {}", model.title),
        Style::default().add_modifier(Modifier::BOLD),
    )));
    frame.render_widget(title, chunks[0]);

    if model.state == SelectionState::Filtering {
        let filter = Paragraph::new(Line::from(vec![
            Span::styled("  Filter: ", Style::default().fg(Color::DarkGray)),
            Span::raw(model.filter.clone()),
            Span::styled("█", Style::default().fg(HIGHLIGHT)),
        ]));
        frame.render_widget(filter, chunks[1]);
    }

    model.page_size = chunks[2].height as usize;
    let label_width = (model.width as usize).saturating_sub(10);
    let position = model.position();

    let items: Vec<ListItem> = model
        .visible
        .iter()
        .enumerate()
        .map(|(row, &i)| {
            let text = format!("{}. {}", row + 1, truncate(&model.entries[i].label, label_width));
            if Some(row) == position {
                ListItem::new(Line::from(Span::styled(
                    format!("  > {}", text),
                    Style::default().fg(HIGHLIGHT),
                )))
            } else {
                ListItem::new(Line::from(format!("    {}", text)))
            }
        })
        .collect();

    model.list_state.select(position);
    frame.render_stateful_widget(List::new(items), chunks[2], &mut model.list_state);

    let status = Paragraph::new(format!(
        "    {}/{} entries",
        model.visible.len(),
        model.entries.len()
    ))
    .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(status, chunks[3]);

    let help = Paragraph::new("    ↑/↓: navigate | type: filter | Enter: download | Esc: quit")
        .style(Style::default().fg(Color::DarkGray));
    frame.render_widget(help, chunks[4]);
}

/// Runs the selection loop until the user confirms an entry or cancels.
pub async fn run_selection<B, E>(
    screen: &mut Screen<B, E>,
    title: &str,
    entries: Vec<ListEntry>,
    matcher: Matcher,
) -> io::Result<Selection>
where
    B: Backend,
    E: EventSource,
{
    let mut model = SelectionModel::new(title, entries, matcher);

    loop {
        screen.draw(|frame| view(frame, &mut model))?;

        if let Some(selection) = model.selection() {
            debug!(?selection, "selection finished");
            return Ok(selection);
        }

        if let Some(event) = screen.next_event(POLL_INTERVAL).await? {
            model.update(event);
        }
    }
}
