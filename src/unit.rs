use std::fmt;
use std::time::Duration;

/// Goal symbol a unit of source is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum UnitKind {
    /// Classic script; `import`/`export` declarations are rejected.
    #[default]
    Script,
    /// ES module; allows `import`/`export` and top-level `await`.
    Module,
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Script => write!(f, "script"),
            Self::Module => write!(f, "module"),
        }
    }
}

/// A single request to compile a unit of source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileRequest<'a> {
    pub source: &'a str,
    /// Filename supplied by the caller, if any.
    pub filename: Option<&'a str>,
    pub kind: UnitKind,
}

impl<'a> CompileRequest<'a> {
    #[must_use]
    pub const fn script(source: &'a str, filename: Option<&'a str>) -> Self {
        Self {
            source,
            filename,
            kind: UnitKind::Script,
        }
    }

    #[must_use]
    pub const fn module(source: &'a str, identifier: &'a str) -> Self {
        Self {
            source,
            filename: Some(identifier),
            kind: UnitKind::Module,
        }
    }
}

/// Engine options that may name the file being compiled.
pub trait CompileOptions {
    fn source_filename(&self) -> Option<&str>;
}

impl CompileOptions for () {
    fn source_filename(&self) -> Option<&str> {
        None
    }
}

impl<T: CompileOptions> CompileOptions for Option<T> {
    fn source_filename(&self) -> Option<&str> {
        self.as_ref().and_then(CompileOptions::source_filename)
    }
}

/// Script compilation options.
///
/// Only `filename` is read during validation; the other settings are
/// passed through to the engine untouched.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScriptOptions {
    pub filename: Option<String>,
    pub line_offset: i64,
    pub column_offset: i64,
    pub display_errors: bool,
    pub timeout: Option<Duration>,
}

impl CompileOptions for ScriptOptions {
    fn source_filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }
}

/// Module source text together with its resolved identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModuleSource<'a> {
    pub text: &'a str,
    /// Resolved module identifier, such as a `file://` URL.
    pub identifier: &'a str,
}

impl<'a> ModuleSource<'a> {
    #[must_use]
    pub const fn new(text: &'a str, identifier: &'a str) -> Self {
        Self { text, identifier }
    }

    #[must_use]
    pub const fn request(&self) -> CompileRequest<'a> {
        CompileRequest::module(self.text, self.identifier)
    }
}
