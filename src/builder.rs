use std::time::Duration;

use crate::detector::Validator;
use crate::parser::SyntaxParser;
use crate::unit::ScriptOptions;

impl<P: SyntaxParser> Validator<P> {
    /// Set the filename reported when a request carries none.
    #[must_use]
    pub fn default_filename(mut self, filename: &str) -> Self {
        self.default_filename = filename.to_string();
        self
    }

    /// Set the wrapper prologue stripped from script snippets, or
    /// `None` to report snippets verbatim.
    #[must_use]
    pub fn wrapper_prologue(mut self, prologue: Option<&str>) -> Self {
        self.wrapper_prologue = prologue.map(str::to_string);
        self
    }

    /// Swap the strict parser, keeping the rest of the configuration.
    #[must_use]
    pub fn parser<Q: SyntaxParser>(self, parser: Q) -> Validator<Q> {
        Validator {
            parser,
            default_filename: self.default_filename,
            wrapper_prologue: self.wrapper_prologue,
        }
    }
}

impl ScriptOptions {
    /// Create options with engine defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the filename used in stack traces and reports.
    #[must_use]
    pub fn filename(mut self, filename: &str) -> Self {
        self.filename = Some(filename.to_string());
        self
    }

    #[must_use]
    pub const fn line_offset(mut self, offset: i64) -> Self {
        self.line_offset = offset;
        self
    }

    #[must_use]
    pub const fn column_offset(mut self, offset: i64) -> Self {
        self.column_offset = offset;
        self
    }

    #[must_use]
    pub const fn display_errors(mut self, display: bool) -> Self {
        self.display_errors = display;
        self
    }

    /// Limit how long a run may take.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
