//! Errors raised by the load pipeline.
//!
//! Every stage reports problems through [`YamlError`]. Scanner, parser and
//! composer failures carry a [`MarkedError`]: a short context description
//! with its mark and a problem description with its mark. Rendering prints
//! the context, the context snippet (only when it points somewhere other
//! than the problem), then the problem and its snippet.

use core::fmt;

use thiserror::Error;

use crate::mark::Mark;
use crate::reader::ReaderError;

/// Result type alias for load operations.
pub type Result<T> = core::result::Result<T, YamlError>;

/// A positioned error with an optional context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedError {
    /// What was being processed, e.g. `while scanning a simple key`
    pub context: Option<String>,
    /// Where that processing started
    pub context_mark: Option<Mark>,
    /// What went wrong
    pub problem: String,
    /// Where it went wrong
    pub problem_mark: Option<Mark>,
}

impl MarkedError {
    /// Create a new positioned error.
    pub fn new(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        Self {
            context: context.map(str::to_string),
            context_mark,
            problem: problem.into(),
            problem_mark,
        }
    }

    fn show_context_mark(&self) -> bool {
        match (&self.context_mark, &self.problem_mark) {
            (Some(_), None) => true,
            (Some(context), Some(problem)) => !context.same_position(problem),
            (None, _) => false,
        }
    }
}

impl fmt::Display for MarkedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(context) = &self.context {
            writeln!(f, "{}", context)?;
        }
        if self.show_context_mark() {
            if let Some(mark) = &self.context_mark {
                writeln!(f, "{}", mark)?;
            }
        }
        write!(f, "{}", self.problem)?;
        if let Some(mark) = &self.problem_mark {
            write!(f, "\n{}", mark)?;
        }
        Ok(())
    }
}

/// Errors that can occur while loading YAML.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum YamlError {
    /// The input could not be decoded or contains disallowed code points.
    #[error("{0}")]
    Reader(#[from] ReaderError),

    /// Malformed lexical structure.
    #[error("{0}")]
    Scanner(MarkedError),

    /// Grammar violation.
    #[error("{0}")]
    Parser(MarkedError),

    /// Invalid node graph: undefined alias, bad merge, recursive key, ...
    #[error("{0}")]
    Composer(MarkedError),

    /// A `%YAML` directive rejected by the version check.
    #[error("{0}")]
    Version(MarkedError),

    /// A scalar could not be constructed for its tag.
    #[error("{0}")]
    Construct(MarkedError),

    /// Anchor name with characters outside the allowed set.
    #[error("invalid anchor name: {0}")]
    InvalidAnchor(String),

    /// `next()` was called after the end of the stream was reported.
    #[error("no more events: the stream has already ended")]
    Exhausted,
}

impl YamlError {
    pub(crate) fn scanner(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        YamlError::Scanner(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        ))
    }

    pub(crate) fn parser(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        YamlError::Parser(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        ))
    }

    pub(crate) fn composer(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        YamlError::Composer(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        ))
    }

    pub(crate) fn construct(
        context: Option<&str>,
        context_mark: Option<Mark>,
        problem: impl Into<String>,
        problem_mark: Option<Mark>,
    ) -> Self {
        YamlError::Construct(MarkedError::new(
            context,
            context_mark,
            problem,
            problem_mark,
        ))
    }

    /// The positioned details, if this error carries any.
    pub fn marked(&self) -> Option<&MarkedError> {
        match self {
            YamlError::Scanner(e)
            | YamlError::Parser(e)
            | YamlError::Composer(e)
            | YamlError::Version(e)
            | YamlError::Construct(e) => Some(e),
            _ => None,
        }
    }

    /// The mark of the problem location, if known.
    pub fn problem_mark(&self) -> Option<&Mark> {
        self.marked().and_then(|e| e.problem_mark.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(line: usize, column: usize, text: &str) -> Mark {
        Mark::new("test", 0, line, column, text.chars().collect(), column)
    }

    #[test]
    fn test_problem_only() {
        let err = MarkedError::new(None, None, "found undefined alias x", None);
        assert_eq!(err.to_string(), "found undefined alias x");
    }

    #[test]
    fn test_context_mark_hidden_when_same_position() {
        let err = MarkedError::new(
            Some("while scanning a quoted scalar"),
            Some(mark(0, 3, "a: \"b")),
            "found unexpected end of stream",
            Some(mark(0, 3, "a: \"b")),
        );
        let text = err.to_string();
        assert_eq!(text.matches("line 1, column 4").count(), 1);
        assert!(text.starts_with("while scanning a quoted scalar\n"));
    }

    #[test]
    fn test_context_mark_shown_when_distinct() {
        let err = MarkedError::new(
            Some("while parsing a flow sequence"),
            Some(mark(0, 0, "[a, b")),
            "expected ',' or ']', but got <stream end>",
            Some(mark(0, 5, "[a, b")),
        );
        let text = err.to_string();
        assert!(text.contains("line 1, column 1"));
        assert!(text.contains("line 1, column 6"));
        let context_at = text.find("line 1, column 1").unwrap();
        let problem_at = text.find("expected ','").unwrap();
        assert!(context_at < problem_at);
    }

    #[test]
    fn test_yaml_error_display_delegates() {
        let err = YamlError::composer(None, None, "found duplicate key a", None);
        assert_eq!(err.to_string(), "found duplicate key a");
        assert!(err.marked().is_some());
        assert!(YamlError::Exhausted.marked().is_none());
    }
}
