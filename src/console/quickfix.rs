use super::{MessageId, Style};
use crate::stream::Location;

/// One navigable diagnostic.
#[derive(Debug, Clone, PartialEq)]
pub struct QuickfixEntry {
    pub message: MessageId,
    pub location: Location,
    /// Row of the message in the console at the time it was recorded.
    pub scroll_position: usize,
    pub style: Style,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    First,
    Last,
    Next,
    Prev,
    Index(usize),
}

/// Ordered diagnostics plus the current selection.
#[derive(Debug, Default)]
pub struct Quickfix {
    entries: Vec<QuickfixEntry>,
    selected: Option<usize>,
}

impl Quickfix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: QuickfixEntry) {
        self.entries.push(entry);
    }

    pub fn reset(&mut self) {
        self.entries.clear();
        self.selected = None;
    }

    pub fn entries(&self) -> &[QuickfixEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Selection as a signed index; `-1` means nothing selected.
    pub fn index(&self) -> isize {
        self.selected.map_or(-1, |i| i as isize)
    }

    pub fn current(&self) -> Option<&QuickfixEntry> {
        self.selected.and_then(|i| self.entries.get(i))
    }

    /// Index a step would move to, or `None` when the step is a no-op.
    pub fn target(&self, step: Step) -> Option<usize> {
        let len = self.entries.len();
        match step {
            Step::First => (len > 0).then_some(0),
            Step::Last => len.checked_sub(1),
            Step::Next => match self.selected {
                Some(i) if i + 1 < len => Some(i + 1),
                None if len > 0 => Some(0),
                _ => None,
            },
            Step::Prev => match self.selected {
                Some(i) if i > 0 => Some(i - 1),
                _ => None,
            },
            Step::Index(i) => Some(i),
        }
    }

    /// Clears the selection, then selects `index` if it is in range.
    pub fn activate(&mut self, index: usize) -> Option<&QuickfixEntry> {
        self.selected = None;
        if index >= self.entries.len() {
            return None;
        }
        self.selected = Some(index);
        self.entries.get(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn filled(n: usize) -> Quickfix {
        let mut qf = Quickfix::new();
        for i in 0..n {
            qf.push(QuickfixEntry {
                message: MessageId(i as u64),
                location: Location {
                    file: PathBuf::from("a.c"),
                    line: i as u32 + 1,
                    column: 1,
                },
                scroll_position: i,
                style: Style::StderrMatch,
            });
        }
        qf
    }

    fn step(qf: &mut Quickfix, s: Step) {
        if let Some(i) = qf.target(s) {
            qf.activate(i);
        }
    }

    #[test]
    fn test_starts_unselected() {
        let qf = filled(3);
        assert_eq!(qf.index(), -1);
        assert!(qf.current().is_none());
    }

    #[test]
    fn test_next_stops_at_last() {
        let mut qf = filled(2);
        step(&mut qf, Step::Next);
        assert_eq!(qf.index(), 0);
        step(&mut qf, Step::Next);
        assert_eq!(qf.index(), 1);
        step(&mut qf, Step::Next);
        assert_eq!(qf.index(), 1);
    }

    #[test]
    fn test_prev_is_noop_at_start_or_unselected() {
        let mut qf = filled(3);
        step(&mut qf, Step::Prev);
        assert_eq!(qf.index(), -1);

        step(&mut qf, Step::First);
        step(&mut qf, Step::Prev);
        assert_eq!(qf.index(), 0);

        step(&mut qf, Step::Last);
        step(&mut qf, Step::Prev);
        assert_eq!(qf.index(), 1);
    }

    #[test]
    fn test_first_last_on_empty_are_noops() {
        let mut qf = Quickfix::new();
        assert_eq!(qf.target(Step::First), None);
        assert_eq!(qf.target(Step::Last), None);
        assert_eq!(qf.target(Step::Next), None);
        step(&mut qf, Step::Last);
        assert_eq!(qf.index(), -1);
    }

    #[test]
    fn test_out_of_range_activation_deselects() {
        let mut qf = filled(2);
        qf.activate(1);
        assert!(qf.activate(5).is_none());
        assert_eq!(qf.index(), -1);
    }

    #[test]
    fn test_reset() {
        let mut qf = filled(2);
        qf.activate(0);
        qf.reset();
        assert!(qf.is_empty());
        assert_eq!(qf.index(), -1);
    }
}
