pub mod quickfix;
pub mod terminal;

use std::sync::{Arc, Mutex, MutexGuard};
use crate::stream::{Location, Stream};

pub use quickfix::{Quickfix, QuickfixEntry, Step};
pub use terminal::TerminalRenderer;

/// Shared between every running process and the executor.
pub type SharedSink = Arc<Mutex<dyn Sink>>;

/// Locks the sink, recovering it if a writer panicked mid-update.
pub fn lock_sink(sink: &SharedSink) -> MutexGuard<'_, dyn Sink + 'static> {
    sink.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Style {
    Echo,
    Stdout,
    Stderr,
    StdoutMatch,
    StderrMatch,
    Error,
}

impl Style {
    pub fn class_name(self) -> &'static str {
        match self {
            Style::Echo => "echo",
            Style::Stdout => "stdout",
            Style::Stderr => "stderr",
            Style::StdoutMatch => "stdout-match",
            Style::StderrMatch => "stderr-match",
            Style::Error => "error",
        }
    }

    /// Style used once a line of this style produced a diagnostic.
    pub fn matched(self) -> Style {
        match self {
            Style::Stdout => Style::StdoutMatch,
            Style::Stderr => Style::StderrMatch,
            other => other,
        }
    }
}

impl From<Stream> for Style {
    fn from(stream: Stream) -> Self {
        match stream {
            Stream::Stdout => Style::Stdout,
            Stream::Stderr => Style::Stderr,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub style: Style,
    pub location: Option<Location>,
    pub selected: bool,
}

/// Collector of output lines and diagnostics.
///
/// Diagnostic-producing calls also record a quickfix entry; `clear` resets both.
pub trait Sink: Send {
    fn append_plain(&mut self, text: &str, style: Style) -> MessageId;
    fn replace_last_plain(&mut self, text: &str, style: Style) -> MessageId;
    fn append_diagnostic(&mut self, location: Location, text: &str, style: Style) -> MessageId;
    fn replace_last_diagnostic(&mut self, location: Location, text: &str, style: Style) -> MessageId;
    fn clear(&mut self);

    fn show(&mut self);
    fn hide(&mut self);
    /// Dismisses the view, e.g. after a clean run.
    fn close(&mut self);
    fn is_visible(&self) -> bool;

    fn last_message(&self) -> Option<MessageId>;
    fn quickfix(&self) -> &Quickfix;
    /// Moves the quickfix selection and returns the newly selected entry.
    fn navigate(&mut self, step: Step) -> Option<QuickfixEntry>;
}

/// Presentation of a console. The console decides what changes; a renderer only shows it.
pub trait Render: Send {
    fn append(&mut self, message: &Message);
    fn replace_last(&mut self, message: &Message);
    fn clear(&mut self);
    fn redraw(&mut self, messages: &[Message]);
    fn set_visible(&mut self, visible: bool);
    fn select(&mut self, _message: &Message) {}
}

/// In-memory console: the message list, its quickfix state and an optional renderer.
#[derive(Default)]
pub struct Console {
    messages: Vec<Message>,
    quickfix: Quickfix,
    visible: bool,
    next_id: u64,
    renderer: Option<Box<dyn Render>>,
}

impl Console {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_renderer(renderer: Box<dyn Render>) -> Self {
        Self {
            renderer: Some(renderer),
            ..Self::default()
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }

    fn message(&mut self, text: &str, style: Style, location: Option<Location>) -> Message {
        let id = MessageId(self.next_id);
        self.next_id += 1;
        Message {
            id,
            text: text.to_string(),
            style,
            location,
            selected: false,
        }
    }

    fn push(&mut self, message: Message) -> MessageId {
        let id = message.id;
        if self.visible {
            if let Some(r) = self.renderer.as_mut() {
                r.append(&message);
            }
        }
        self.messages.push(message);
        id
    }

    fn replace(&mut self, message: Message) -> MessageId {
        let Some(last) = self.messages.last_mut() else {
            return self.push(message);
        };
        let id = message.id;
        *last = message;
        if self.visible {
            if let Some(r) = self.renderer.as_mut() {
                r.replace_last(last);
            }
        }
        id
    }

    fn record(&mut self, id: MessageId, location: Location, style: Style) {
        let scroll_position = self.messages.len().saturating_sub(1);
        self.quickfix.push(QuickfixEntry {
            message: id,
            location,
            scroll_position,
            style,
        });
    }

    fn set_visible(&mut self, visible: bool) {
        if self.visible == visible {
            return;
        }
        self.visible = visible;
        if let Some(r) = self.renderer.as_mut() {
            r.set_visible(visible);
            if visible {
                r.redraw(&self.messages);
            }
        }
    }
}

impl Sink for Console {
    fn append_plain(&mut self, text: &str, style: Style) -> MessageId {
        let message = self.message(text, style, None);
        self.push(message)
    }

    fn replace_last_plain(&mut self, text: &str, style: Style) -> MessageId {
        let message = self.message(text, style, None);
        self.replace(message)
    }

    fn append_diagnostic(&mut self, location: Location, text: &str, style: Style) -> MessageId {
        let message = self.message(text, style, Some(location.clone()));
        let id = self.push(message);
        self.record(id, location, style);
        id
    }

    fn replace_last_diagnostic(&mut self, location: Location, text: &str, style: Style) -> MessageId {
        let message = self.message(text, style, Some(location.clone()));
        let id = self.replace(message);
        self.record(id, location, style);
        id
    }

    fn clear(&mut self) {
        self.messages.clear();
        self.quickfix.reset();
        if let Some(r) = self.renderer.as_mut() {
            r.clear();
        }
    }

    fn show(&mut self) {
        self.set_visible(true);
    }

    fn hide(&mut self) {
        self.set_visible(false);
    }

    fn close(&mut self) {
        self.set_visible(false);
    }

    fn is_visible(&self) -> bool {
        self.visible
    }

    fn last_message(&self) -> Option<MessageId> {
        self.messages.last().map(|m| m.id)
    }

    fn quickfix(&self) -> &Quickfix {
        &self.quickfix
    }

    fn navigate(&mut self, step: Step) -> Option<QuickfixEntry> {
        let target = self.quickfix.target(step)?;

        if let Some(previous) = self.quickfix.current().map(|e| e.message) {
            if let Some(m) = self.messages.iter_mut().find(|m| m.id == previous) {
                m.selected = false;
            }
        }

        let entry = self.quickfix.activate(target)?.clone();
        if let Some(m) = self.messages.iter_mut().find(|m| m.id == entry.message) {
            m.selected = true;
            if self.visible {
                if let Some(r) = self.renderer.as_mut() {
                    r.select(m);
                }
            }
        }
        Some(entry)
    }
}
