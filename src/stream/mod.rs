pub mod line_buffer;
pub mod matcher;

pub use line_buffer::{Feed, LineBuffer, trim_line_ending};
pub use matcher::{Location, PatternMatcher};

/// Which pipe of the child a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stream {
    Stdout,
    Stderr,
}
