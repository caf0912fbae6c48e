use crate::console::{MessageId, Sink, Style};
use crate::stream::{LineBuffer, PatternMatcher, Stream, trim_line_ending};

/// Turns one process's raw output into sink calls.
///
/// Owns both line buffers and the single provisional line the process may
/// have on display. A completed line or a newer fragment replaces that
/// provisional line only while it is still the sink's last message.
pub struct OutputPipeline {
    matcher: PatternMatcher,
    stdout: LineBuffer,
    stderr: LineBuffer,
    provisional: Option<(Stream, MessageId)>,
    matched: bool,
}

impl OutputPipeline {
    pub fn new(matcher: PatternMatcher) -> Self {
        Self {
            matcher,
            stdout: LineBuffer::new(),
            stderr: LineBuffer::new(),
            provisional: None,
            matched: false,
        }
    }

    /// Whether any line produced a diagnostic so far.
    pub fn matched(&self) -> bool {
        self.matched
    }

    fn buffer(&mut self, stream: Stream) -> &mut LineBuffer {
        match stream {
            Stream::Stdout => &mut self.stdout,
            Stream::Stderr => &mut self.stderr,
        }
    }

    pub fn on_data(&mut self, sink: &mut dyn Sink, stream: Stream, chunk: &[u8]) {
        let feed = self.buffer(stream).feed(chunk);
        for line in &feed.lines {
            self.complete_line(sink, stream, line);
        }
        if let Some(text) = feed.provisional {
            self.provisional_line(sink, stream, &text);
        }
    }

    /// End of stream: whatever is left counts as a completed line.
    pub fn on_end(&mut self, sink: &mut dyn Sink, stream: Stream) {
        if let Some(rest) = self.buffer(stream).finish() {
            self.complete_line(sink, stream, &rest);
        }
    }

    /// Takes ownership of this stream's provisional line; true if it can be overwritten.
    fn claim_provisional(&mut self, sink: &dyn Sink, stream: Stream) -> bool {
        match self.provisional {
            Some((owner, id)) if owner == stream => {
                self.provisional = None;
                sink.last_message() == Some(id)
            }
            _ => false,
        }
    }

    fn complete_line(&mut self, sink: &mut dyn Sink, stream: Stream, line: &str) {
        let text = trim_line_ending(line);
        let replace = self.claim_provisional(sink, stream);
        let style = Style::from(stream);

        match self.matcher.match_line(text) {
            Some(location) => {
                self.matched = true;
                let style = style.matched();
                if replace {
                    sink.replace_last_diagnostic(location, text, style);
                } else {
                    sink.append_diagnostic(location, text, style);
                }
            }
            None => {
                if replace {
                    sink.replace_last_plain(text, style);
                } else {
                    sink.append_plain(text, style);
                }
            }
        }
    }

    fn provisional_line(&mut self, sink: &mut dyn Sink, stream: Stream, text: &str) {
        let style = Style::from(stream);
        let id = if self.claim_provisional(sink, stream) {
            sink.replace_last_plain(text, style)
        } else {
            sink.append_plain(text, style)
        };
        self.provisional = Some((stream, id));
    }
}
