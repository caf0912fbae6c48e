use anyhow::{Context, Result};
use regex::{Match, Regex};
use std::path::{Path, PathBuf};

/// Where a diagnostic points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub file: PathBuf,
    pub line: u32,
    pub column: u32,
}

/// Ordered list of compiled patterns for one run.
#[derive(Debug, Clone)]
pub struct PatternMatcher {
    patterns: Vec<Regex>,
    cwd: PathBuf,
}

impl PatternMatcher {
    /// Compiles every pattern, stopping at the first one that is malformed.
    ///
    /// Patterns use `regex` syntax with named groups `file`, `line` and `col`.
    /// Lookaround and backreferences are not supported and are reported as
    /// invalid patterns.
    pub fn compile<S: AsRef<str>>(patterns: &[S], cwd: impl Into<PathBuf>) -> Result<Self> {
        let patterns = patterns
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let source = p.as_ref();
                Regex::new(source)
                    .with_context(|| format!("Invalid match pattern #{}: '{}'", i + 1, source))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            patterns,
            cwd: cwd.into(),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    /// First pattern with a non-empty `file` capture wins.
    pub fn match_line(&self, line: &str) -> Option<Location> {
        self.patterns.iter().find_map(|re| {
            let caps = re.captures(line)?;
            let file = caps.name("file").map(|m| m.as_str()).filter(|f| !f.is_empty())?;

            Some(Location {
                file: self.resolve(file),
                line: position(caps.name("line")),
                column: position(caps.name("col")),
            })
        })
    }

    fn resolve(&self, file: &str) -> PathBuf {
        let path = Path::new(file);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd.join(path)
        }
    }
}

fn position(capture: Option<Match<'_>>) -> u32 {
    capture
        .and_then(|m| m.as_str().trim().parse::<u32>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GCC: &str = r"^(?P<file>[^:\s]+):(?P<line>\d+):(?P<col>\d+): ";

    #[test]
    fn test_gcc_style_line() {
        let matcher = PatternMatcher::compile(&[GCC], "/src").unwrap();
        let loc = matcher.match_line("file.c:10:3: error: bad").unwrap();
        assert_eq!(
            loc,
            Location {
                file: PathBuf::from("/src/file.c"),
                line: 10,
                column: 3
            }
        );
    }

    #[test]
    fn test_absolute_path_kept() {
        let matcher = PatternMatcher::compile(&[GCC], "/src").unwrap();
        let loc = matcher.match_line("/abs/x.c:1:1: note").unwrap();
        assert_eq!(loc.file, PathBuf::from("/abs/x.c"));
    }

    #[test]
    fn test_missing_positions_default_to_one() {
        let matcher =
            PatternMatcher::compile(&[r"in (?<file>\S+) at line (?<line>\w+)"], "/").unwrap();

        let loc = matcher.match_line("in a.rs at line xyz").unwrap();
        assert_eq!((loc.line, loc.column), (1, 1));

        let loc = matcher.match_line("in a.rs at line 0").unwrap();
        assert_eq!(loc.line, 1);

        let loc = matcher.match_line("in a.rs at line 7").unwrap();
        assert_eq!((loc.line, loc.column), (7, 1));
    }

    #[test]
    fn test_fileless_match_is_skipped() {
        let patterns = [r"error: (?P<line>\d+)", r"(?P<file>\w+\.py), line (?P<line>\d+)"];
        let matcher = PatternMatcher::compile(&patterns, "/p").unwrap();
        let loc = matcher.match_line("error: 5 in main.py, line 12").unwrap();
        assert_eq!(loc.file, PathBuf::from("/p/main.py"));
        assert_eq!(loc.line, 12);
    }

    #[test]
    fn test_first_usable_pattern_wins() {
        let line = "main.py:3:9: boom";
        let a = r"(?P<file>\w+\.py):(?P<line>\d+)";
        let b = r"(?P<file>main)\.py:\d+:(?P<line>\d+)";

        let ab = PatternMatcher::compile(&[a, b], "/").unwrap();
        assert_eq!(ab.match_line(line).unwrap().line, 3);

        let ba = PatternMatcher::compile(&[b, a], "/").unwrap();
        assert_eq!(ba.match_line(line).unwrap().line, 9);
    }

    #[test]
    fn test_empty_file_capture_is_not_usable() {
        let matcher = PatternMatcher::compile(&[r"^(?P<file>\w*):"], "/").unwrap();
        assert!(matcher.match_line(": nothing").is_none());
    }

    #[test]
    fn test_no_match_is_plain() {
        let matcher = PatternMatcher::compile(&[GCC], "/").unwrap();
        assert!(matcher.match_line("Compiling...").is_none());
        assert!(PatternMatcher::compile::<&str>(&[], "/").unwrap().match_line("x:1:1: y").is_none());
    }

    #[test]
    fn test_malformed_pattern_names_offender() {
        let err = PatternMatcher::compile(&[GCC, r"(?P<file>[a-"], "/").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("#2"), "{}", message);
        assert!(message.contains("[a-"), "{}", message);
    }

    #[test]
    fn test_lookaround_is_rejected_up_front() {
        let err = PatternMatcher::compile(&[r"(?P<file>\w+\.c)", r"(?P<file>\S+)(?=:\d+)"], "/")
            .err()
            .unwrap();
        assert!(format!("{:#}", err).starts_with("Invalid match pattern #2"));
    }
}
