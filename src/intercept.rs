use crate::CompileError;
use crate::detector::Validator;
use crate::engine::{Engine, ModuleEngine};
use crate::parser::{EcmaParser, SyntaxParser};
use crate::unit::{CompileOptions, CompileRequest, ModuleSource};

/// An [`Engine`] that validates every compile request before handing
/// it to the wrapped engine.
///
/// Compiled units are the wrapped engine's own, returned as-is. Engine
/// errors pass through unchanged as [`CompileError::Engine`].
///
/// ```
/// use asi_guard::{Engine, Intercepted, ScriptOptions};
/// # #[derive(Debug)]
/// # struct Never;
/// # impl std::fmt::Display for Never {
/// #     fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str("never") }
/// # }
/// # impl std::error::Error for Never {}
/// # struct Echo;
/// # impl Engine for Echo {
/// #     type Script = String;
/// #     type Options = ScriptOptions;
/// #     type Sandbox = ();
/// #     type Value = String;
/// #     type Error = Never;
/// #     fn compile_script(&self, s: &str, _: &ScriptOptions) -> Result<String, Never> { Ok(s.to_string()) }
/// #     fn run_script(&self, s: &String, _: &ScriptOptions) -> Result<String, Never> { Ok(s.clone()) }
/// #     fn run_script_in_new_context(&self, s: &String, _: (), _: &ScriptOptions) -> Result<String, Never> { Ok(s.clone()) }
/// # }
/// let engine = Intercepted::new(Echo);
///
/// assert!(engine.compile_script("1 + 1", &ScriptOptions::new()).is_ok());
///
/// let err = engine.compile_script("1 +\n", &ScriptOptions::new()).unwrap_err();
/// assert!(err.is_diagnostic());
/// ```
#[derive(Debug, Clone)]
pub struct Intercepted<E, P = EcmaParser> {
    engine: E,
    validator: Validator<P>,
}

impl<E: Engine> Intercepted<E> {
    /// Wrap `engine` with the default validator.
    #[must_use]
    pub fn new(engine: E) -> Self {
        Self::with_validator(engine, Validator::new())
    }
}

impl<E: Engine, P: SyntaxParser> Intercepted<E, P> {
    #[must_use]
    pub const fn with_validator(engine: E, validator: Validator<P>) -> Self {
        Self { engine, validator }
    }

    /// The wrapped engine.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    #[must_use]
    pub const fn validator(&self) -> &Validator<P> {
        &self.validator
    }

    /// Unwrap into the original engine.
    #[must_use]
    pub fn into_inner(self) -> E {
        self.engine
    }
}

impl<E: Engine, P: SyntaxParser> Engine for Intercepted<E, P> {
    type Script = E::Script;
    type Options = E::Options;
    type Sandbox = E::Sandbox;
    type Value = E::Value;
    type Error = CompileError<E::Error>;

    fn compile_script(
        &self,
        source: &str,
        options: &Self::Options,
    ) -> Result<Self::Script, Self::Error> {
        let request = CompileRequest::script(source, options.source_filename());
        self.validator.check(&request)?;
        self.engine
            .compile_script(source, options)
            .map_err(CompileError::Engine)
    }

    fn run_script(
        &self,
        script: &Self::Script,
        options: &Self::Options,
    ) -> Result<Self::Value, Self::Error> {
        self.engine
            .run_script(script, options)
            .map_err(CompileError::Engine)
    }

    fn run_script_in_new_context(
        &self,
        script: &Self::Script,
        sandbox: Self::Sandbox,
        options: &Self::Options,
    ) -> Result<Self::Value, Self::Error> {
        self.engine
            .run_script_in_new_context(script, sandbox, options)
            .map_err(CompileError::Engine)
    }
}

impl<E: ModuleEngine, P: SyntaxParser> ModuleEngine for Intercepted<E, P> {
    type Module = E::Module;
    type ModuleOptions = E::ModuleOptions;

    fn compile_module(
        &self,
        source: &ModuleSource<'_>,
        options: &Self::ModuleOptions,
    ) -> Result<Self::Module, Self::Error> {
        self.validator.check(&source.request())?;
        self.engine
            .compile_module(source, options)
            .map_err(CompileError::Engine)
    }
}
