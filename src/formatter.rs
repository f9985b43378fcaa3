use std::backtrace::{Backtrace, BacktraceStatus};

use crate::token::{Position, Token};
use crate::unit::UnitKind;

/// Message carried by every [`AmbiguousTerminationError`].
pub const MESSAGE: &str = "Unexpected end of input";

/// Source text ended where the grammar still needed a token.
///
/// Displays as the location, the offending source line up to the end
/// of the last token, and a caret under the failure column, followed
/// by the message:
///
/// ```text
/// evalmachine.<anonymous>:1:3
/// 1 +
///    ^
/// SyntaxError: Unexpected end of input
/// ```
#[derive(Debug, Clone, thiserror::Error)]
#[error(
    "{filename}:{line}:{column}\n{snippet}\n{caret}\nSyntaxError: Unexpected end of input"
)]
pub struct AmbiguousTerminationError {
    pub filename: String,
    /// Line of the last token's end (1-based).
    pub line: usize,
    /// Column of the last token's end (0-based).
    pub column: usize,
    /// Source from the start of the last token's line to its end.
    pub snippet: String,
    /// Spaces followed by `^`.
    pub caret: String,
    /// Backtrace captured when the error was built; empty unless
    /// backtraces are enabled.
    pub trace: String,
}

impl AmbiguousTerminationError {
    #[must_use]
    pub const fn message(&self) -> &'static str {
        MESSAGE
    }

    /// `<filename>:<line>:<column>`
    #[must_use]
    pub fn location(&self) -> String {
        format!("{}:{}:{}", self.filename, self.line, self.column)
    }

    /// The rendered error followed by the captured backtrace.
    #[must_use]
    pub fn stack(&self) -> String {
        if self.trace.is_empty() {
            self.to_string()
        } else {
            format!("{self}\n{}", self.trace)
        }
    }
}

/// Build the annotated error for a parse that ran out of input after
/// `last`. Without a last token the location is the start of the
/// source and the snippet is empty.
pub(crate) fn annotate(
    source: &str,
    filename: &str,
    kind: UnitKind,
    last: Option<&Token>,
    prologue: Option<&str>,
) -> AmbiguousTerminationError {
    // spans from a foreign parser may not fit this source
    let (start, end) = last
        .filter(|token| {
            source
                .get(token.span.start_offset()..token.span.end_offset())
                .is_some()
        })
        .map_or((Position::START, Position::START), |token| {
            (token.span.start, token.span.end)
        });

    let mut snippet = source
        .get(line_start_offset(source, start)..end.offset)
        .unwrap_or_default();
    let mut arrow = end.column;

    // undo the engine's function wrapper so the user sees their code
    if kind == UnitKind::Script {
        if let Some(rest) = prologue.and_then(|p| snippet.strip_prefix(p)) {
            let stripped = snippet.len() - rest.len();
            arrow = arrow.saturating_sub(snippet[..stripped].chars().count());
            snippet = rest;
        }
    }

    let backtrace = Backtrace::capture();
    let trace = if backtrace.status() == BacktraceStatus::Captured {
        backtrace.to_string()
    } else {
        String::new()
    };

    AmbiguousTerminationError {
        filename: filename.to_string(),
        line: end.line,
        column: end.column,
        snippet: snippet.to_string(),
        caret: caret_line(arrow),
        trace,
    }
}

/// Byte offset of the start of the line containing `start`.
fn line_start_offset(source: &str, start: Position) -> usize {
    source.get(..start.offset).map_or(0, |before| {
        before
            .char_indices()
            .rev()
            .take(start.column)
            .last()
            .map_or(start.offset, |(index, _)| index)
    })
}

fn caret_line(column: usize) -> String {
    let mut caret = " ".repeat(column);
    caret.push('^');
    caret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::{Span, TokenKind};

    fn token(start: (usize, usize, usize), end: (usize, usize, usize)) -> Token {
        let at = |(offset, line, column)| Position {
            offset,
            line,
            column,
        };
        Token {
            kind: TokenKind::Punctuator,
            span: Span {
                start: at(start),
                end: at(end),
            },
            newline_before: false,
        }
    }

    #[test]
    fn snippet_starts_at_line_start() {
        let source = "a();\nfoo(1 +";
        let plus = token((11, 2, 6), (12, 2, 7));
        let err = annotate(source, "x.js", UnitKind::Script, Some(&plus), None);
        assert_eq!(err.location(), "x.js:2:7");
        assert_eq!(err.snippet, "foo(1 +");
        assert_eq!(err.caret, "       ^");
    }

    #[test]
    fn prologue_is_stripped_for_scripts() {
        let source = "(fn { 1 +";
        let plus = token((8, 1, 8), (9, 1, 9));
        let err = annotate(source, "w.js", UnitKind::Script, Some(&plus), Some("(fn { "));
        assert_eq!(err.snippet, "1 +");
        assert_eq!(err.caret, "   ^");
        // location keeps the wrapped column
        assert_eq!(err.column, 9);
    }

    #[test]
    fn prologue_is_kept_for_modules() {
        let source = "(fn { 1 +";
        let plus = token((8, 1, 8), (9, 1, 9));
        let err = annotate(source, "w.mjs", UnitKind::Module, Some(&plus), Some("(fn { "));
        assert_eq!(err.snippet, "(fn { 1 +");
    }

    #[test]
    fn missing_token_falls_back_to_start() {
        let err = annotate("", "empty.js", UnitKind::Script, None, None);
        assert_eq!(err.location(), "empty.js:1:0");
        assert_eq!(err.snippet, "");
        assert_eq!(err.caret, "^");
    }

    #[test]
    fn out_of_range_token_falls_back_to_start() {
        let far = token((40, 3, 10), (41, 3, 11));
        let err = annotate("a +", "bad.js", UnitKind::Script, Some(&far), None);
        assert_eq!(err.location(), "bad.js:1:0");
        assert_eq!(err.snippet, "");
        assert_eq!(err.caret, "^");
    }

    #[test]
    fn split_character_falls_back_to_start() {
        // byte 1 is inside `é`
        let split = token((1, 1, 1), (2, 1, 2));
        let err = annotate("é +", "bad.js", UnitKind::Script, Some(&split), None);
        assert_eq!(err.location(), "bad.js:1:0");
        assert_eq!(err.snippet, "");
    }

    #[test]
    fn reversed_span_falls_back_to_start() {
        let reversed = token((3, 1, 3), (1, 1, 1));
        let err = annotate("a + b", "bad.js", UnitKind::Script, Some(&reversed), None);
        assert_eq!(err.column, 0);
    }

    #[test]
    fn multibyte_line_prefix() {
        let source = "é = 1 +";
        // `+` starts at byte 7, char column 6
        let plus = token((7, 1, 6), (8, 1, 7));
        let err = annotate(source, "u.js", UnitKind::Script, Some(&plus), None);
        assert_eq!(err.snippet, "é = 1 +");
    }

    #[test]
    fn display_layout() {
        let plus = token((2, 1, 2), (3, 1, 3));
        let err = annotate("1 +\n", "evalmachine.<anonymous>", UnitKind::Script, Some(&plus), None);
        assert_eq!(
            err.to_string(),
            "evalmachine.<anonymous>:1:3\n1 +\n   ^\nSyntaxError: Unexpected end of input"
        );
        assert_eq!(err.message(), MESSAGE);
    }
}
