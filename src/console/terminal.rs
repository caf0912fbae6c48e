use colored::*;
use std::io::{self, Write};
use super::{Message, Render, Style};

/// Prints console messages to stdout, one line each.
///
/// Replacing the last message rewrites the previous terminal line in place,
/// which is how in-progress output ("provisional" lines) stays on one row.
pub struct TerminalRenderer {
    out: Box<dyn Write + Send>,
    visible: bool,
    /// Whether the last printed row belongs to the last message.
    last_on_screen: bool,
}

impl TerminalRenderer {
    pub fn stdout() -> Self {
        Self::new(Box::new(io::stdout()))
    }

    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            visible: false,
            last_on_screen: false,
        }
    }

    fn paint(message: &Message) -> String {
        let text = message.text.as_str();
        let painted = match message.style {
            Style::Echo => text.cyan().dimmed(),
            Style::Stdout => text.normal(),
            Style::Stderr => text.yellow(),
            Style::StdoutMatch | Style::StderrMatch => text.bright_red().underline(),
            Style::Error => text.red().bold(),
        };
        if message.selected {
            painted.reversed().to_string()
        } else {
            painted.to_string()
        }
    }

    fn write_line(&mut self, message: &Message) {
        let line = Self::paint(message);
        // A broken stdout is not worth failing a run over.
        let _ = writeln!(self.out, "{}", line);
        let _ = self.out.flush();
        self.last_on_screen = true;
    }
}

impl Render for TerminalRenderer {
    fn append(&mut self, message: &Message) {
        if self.visible {
            self.write_line(message);
        }
    }

    fn replace_last(&mut self, message: &Message) {
        if !self.visible {
            return;
        }
        if self.last_on_screen {
            // Cursor up one row, then erase it.
            let _ = write!(self.out, "\x1b[1A\r\x1b[2K");
        }
        self.write_line(message);
    }

    fn clear(&mut self) {
        self.last_on_screen = false;
    }

    fn redraw(&mut self, messages: &[Message]) {
        for message in messages {
            self.write_line(message);
        }
    }

    fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
        self.last_on_screen = false;
    }

    fn select(&mut self, message: &Message) {
        if let Some(loc) = &message.location {
            let _ = writeln!(
                self.out,
                "{} {}:{}:{}",
                "→".green().bold(),
                loc.file.display(),
                loc.line,
                loc.column
            );
            let _ = self.out.flush();
            self.last_on_screen = false;
        }
    }
}
