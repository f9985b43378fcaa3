use std::ops::ControlFlow;

use crate::formatter::{self, AmbiguousTerminationError};
use crate::parser::{EcmaParser, ParseHooks, SyntaxParser};
use crate::token::{Position, Token};
use crate::unit::CompileRequest;

/// Filename shown when the caller did not supply one.
pub const DEFAULT_FILENAME: &str = "evalmachine.<anonymous>";

/// Prefix the engine adds when it wraps a CommonJS module body in a
/// function before compiling it.
pub const COMMONJS_WRAPPER_PROLOGUE: &str =
    "(function (exports, require, module, __filename, __dirname) { ";

/// Second-pass validator.
///
/// Re-parses source with a strict parser and raises an
/// [`AmbiguousTerminationError`] when the parse failed because the
/// input ended inside an open construct. Every other outcome is left
/// for the engine to report.
#[derive(Debug, Clone)]
pub struct Validator<P = EcmaParser> {
    pub(crate) parser: P,
    pub(crate) default_filename: String,
    pub(crate) wrapper_prologue: Option<String>,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

impl Validator {
    #[must_use]
    pub fn new() -> Self {
        Self::with_parser(EcmaParser)
    }
}

impl<P: SyntaxParser> Validator<P> {
    /// Validator driven by a custom parser.
    #[must_use]
    pub fn with_parser(parser: P) -> Self {
        Self {
            parser,
            default_filename: DEFAULT_FILENAME.to_string(),
            wrapper_prologue: Some(COMMONJS_WRAPPER_PROLOGUE.to_string()),
        }
    }

    /// Filename used in reports for `request`.
    #[must_use]
    pub fn display_filename<'r>(&'r self, request: &CompileRequest<'r>) -> &'r str {
        request.filename.unwrap_or(self.default_filename.as_str())
    }

    /// Validate one compile request.
    ///
    /// # Errors
    ///
    /// Returns `AmbiguousTerminationError` when the strict parse ran out
    /// of input while a construct was still open. Unrelated syntax
    /// errors return `Ok(())`.
    pub fn check(&self, request: &CompileRequest<'_>) -> Result<(), AmbiguousTerminationError> {
        let filename = self.display_filename(request);
        let mut observer = TerminationObserver::default();

        let Err(err) = self
            .parser
            .parse(request.source, request.kind, &mut observer)
        else {
            tracing::trace!(filename, kind = %request.kind, "strict parse succeeded");
            return Ok(());
        };

        let Some(at) = observer.inserted_at else {
            tracing::debug!(
                filename,
                kind = %request.kind,
                error = %err,
                "strict parse failed for an unrelated reason, deferring to engine"
            );
            return Ok(());
        };

        let annotated = formatter::annotate(
            request.source,
            filename,
            request.kind,
            observer.last_token.as_ref(),
            self.wrapper_prologue.as_deref(),
        );
        tracing::debug!(
            filename,
            kind = %request.kind,
            line = at.line,
            column = at.column,
            "source ends inside an open construct"
        );
        Err(annotated)
    }
}

/// Per-call parser state. Never shared between requests.
#[derive(Debug, Default)]
struct TerminationObserver {
    last_token: Option<Token>,
    inserted_at: Option<Position>,
}

impl ParseHooks for TerminationObserver {
    fn on_token(&mut self, token: &Token) {
        self.last_token = Some(*token);
    }

    fn on_terminator_insertion(&mut self, at: Position) -> ControlFlow<()> {
        self.inserted_at = Some(at);
        // stop at the exact point instead of reporting a later error
        ControlFlow::Break(())
    }
}
