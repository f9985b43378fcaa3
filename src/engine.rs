//! The host script engine, seen from the outside.

use crate::unit::{CompileOptions, ModuleSource};

/// A script engine that compiles source into runnable units.
///
/// The provided methods always compile through
/// [`compile_script`](Engine::compile_script), so a wrapper that
/// overrides compilation also covers them.
pub trait Engine {
    type Script;
    type Options: CompileOptions;
    /// Global bindings for a freshly created context.
    type Sandbox;
    /// Completion value of a run.
    type Value;
    type Error: std::error::Error + 'static;

    fn compile_script(
        &self,
        source: &str,
        options: &Self::Options,
    ) -> Result<Self::Script, Self::Error>;

    /// Run a compiled script in the caller's context.
    fn run_script(
        &self,
        script: &Self::Script,
        options: &Self::Options,
    ) -> Result<Self::Value, Self::Error>;

    /// Run a compiled script against a fresh, isolated set of globals.
    fn run_script_in_new_context(
        &self,
        script: &Self::Script,
        sandbox: Self::Sandbox,
        options: &Self::Options,
    ) -> Result<Self::Value, Self::Error>;

    /// Older spelling of [`compile_script`](Engine::compile_script).
    fn create_script(
        &self,
        source: &str,
        options: &Self::Options,
    ) -> Result<Self::Script, Self::Error> {
        self.compile_script(source, options)
    }

    /// Compile `source` and run it in the caller's context.
    fn run_in_this_context(
        &self,
        source: &str,
        options: &Self::Options,
    ) -> Result<Self::Value, Self::Error> {
        let script = self.compile_script(source, options)?;
        self.run_script(&script, options)
    }

    /// Compile `source` and run it in a new context built from
    /// `sandbox`.
    fn run_in_new_context(
        &self,
        source: &str,
        sandbox: Self::Sandbox,
        options: &Self::Options,
    ) -> Result<Self::Value, Self::Error> {
        let script = self.compile_script(source, options)?;
        self.run_script_in_new_context(&script, sandbox, options)
    }
}

/// An engine that can also compile ES modules.
pub trait ModuleEngine: Engine {
    type Module;
    type ModuleOptions;

    fn compile_module(
        &self,
        source: &ModuleSource<'_>,
        options: &Self::ModuleOptions,
    ) -> Result<Self::Module, Self::Error>;
}
