/// Lines produced by one `feed` call.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Feed {
    /// Completed lines in arrival order, each still carrying its newline.
    pub lines: Vec<String>,
    /// The unterminated tail, if there is anything displayable in it.
    pub provisional: Option<String>,
}

/// Reassembles lines from arbitrarily split chunks of one stream.
///
/// Works on bytes: a newline never occurs inside a UTF-8 sequence, so a chunk
/// boundary that splits a character only ever lands in the pending tail.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, chunk: &[u8]) -> Feed {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos + 1;
            lines.push(String::from_utf8_lossy(&self.pending[start..end]).into_owned());
            start = end;
        }
        self.pending.drain(..start);

        let provisional = Some(displayable_prefix(&self.pending)).filter(|s| !s.is_empty());
        Feed { lines, provisional }
    }

    /// Flushes the tail at end of stream as a final completed line.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }

    pub fn pending(&self) -> &[u8] {
        &self.pending
    }
}

/// Text up to the last complete character; a truncated trailing sequence is held back.
fn displayable_prefix(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(e) if e.error_len().is_none() => {
            String::from_utf8_lossy(&bytes[..e.valid_up_to()]).into_owned()
        }
        Err(_) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Drops a trailing `\n` or `\r\n`.
pub fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}
