//! Strict second-pass validation for script engines.
//!
//! Engines often report source that stops in the middle of a
//! statement as a bare "Unexpected end of input" with no location.
//! This crate re-parses every unit with a strict ECMAScript parser
//! before the engine sees it. When the input ran out while a construct
//! was still open, the compile fails with an
//! [`AmbiguousTerminationError`] that names the file, line and column
//! and points at the offending source. Anything else goes to the
//! engine untouched.
//!
//! # Quick start
//!
//! ## Check source directly
//!
//! ```
//! use asi_guard::check_script;
//!
//! assert!(check_script("const x = 1", None).is_ok());
//!
//! let err = check_script("1 +\n", None).unwrap_err();
//! assert_eq!(err.location(), "evalmachine.<anonymous>:1:3");
//! assert_eq!(err.snippet, "1 +");
//! assert_eq!(err.caret, "   ^");
//! ```
//!
//! ## Wrap an engine
//!
//! Implement [`Engine`] (and [`ModuleEngine`] if the host compiles
//! modules) for the host, then wrap it in [`Intercepted`]. The wrapper
//! is itself an `Engine`, so callers keep the same API.

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod builder;
pub mod detector;
pub mod engine;
pub mod formatter;
pub mod intercept;
pub mod lexer;
pub mod parser;
pub mod token;
pub mod unit;

pub use detector::{COMMONJS_WRAPPER_PROLOGUE, DEFAULT_FILENAME, Validator};
pub use engine::{Engine, ModuleEngine};
pub use formatter::{AmbiguousTerminationError, MESSAGE};
pub use intercept::Intercepted;
pub use lexer::{LexError, LexErrorKind, tokenize};
pub use parser::{
    EcmaParser, MAX_NESTING_DEPTH, ParseError, ParseErrorKind, ParseHooks, SyntaxParser, parse,
    parse_with_hooks,
};
pub use token::{Position, Span, Token, TokenKind};
pub use unit::{CompileOptions, CompileRequest, ModuleSource, ScriptOptions, UnitKind};

/// Error returned by an [`Intercepted`] engine.
#[derive(Debug, thiserror::Error)]
pub enum CompileError<E> {
    /// Source ended inside an open construct. Raised by the validator
    /// before the engine saw the source.
    #[error(transparent)]
    AmbiguousTermination(#[from] AmbiguousTerminationError),
    /// The engine's own error, unchanged.
    #[error(transparent)]
    Engine(E),
}

impl<E> CompileError<E> {
    /// Whether this error was produced by the validator rather than
    /// the engine.
    #[must_use]
    pub const fn is_diagnostic(&self) -> bool {
        matches!(self, Self::AmbiguousTermination(_))
    }

    /// The diagnostic, if this is one.
    #[must_use]
    pub const fn as_ambiguous(&self) -> Option<&AmbiguousTerminationError> {
        match self {
            Self::AmbiguousTermination(err) => Some(err),
            Self::Engine(_) => None,
        }
    }

    /// The engine error, if this is one.
    #[must_use]
    pub fn into_engine(self) -> Option<E> {
        match self {
            Self::Engine(err) => Some(err),
            Self::AmbiguousTermination(_) => None,
        }
    }
}

/// Validate script source with the default validator.
pub fn check_script(
    source: &str,
    filename: Option<&str>,
) -> Result<(), AmbiguousTerminationError> {
    Validator::new().check(&CompileRequest::script(source, filename))
}

/// Validate module source with the default validator.
pub fn check_module(source: &ModuleSource<'_>) -> Result<(), AmbiguousTerminationError> {
    Validator::new().check(&source.request())
}
