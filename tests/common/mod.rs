#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use asi_guard::{
    Engine, ModuleEngine, ModuleSource, ParseErrorKind, ScriptOptions, UnitKind, parse,
};

/// A compiled script as the in-memory engine sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledScript {
    pub source: String,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledModule {
    pub source: String,
    pub identifier: String,
}

/// The engine's own syntax error. Carries no location, like the
/// terse messages real engines produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("SyntaxError: {0}")]
pub struct NativeError(pub String);

impl NativeError {
    fn from_source(source: &str, kind: UnitKind) -> Option<Self> {
        let err = parse(source, kind).err()?;
        let message = match err.kind {
            ParseErrorKind::UnexpectedEof => "Unexpected end of input".to_string(),
            ParseErrorKind::UnexpectedToken(token) => format!("Unexpected token '{token}'"),
            other => other.to_string(),
        };
        Some(Self(message))
    }
}

/// In-memory engine that records every call it receives.
#[derive(Debug, Default)]
pub struct RecordingEngine {
    pub compiled: RefCell<Vec<String>>,
    pub runs: Cell<usize>,
}

impl RecordingEngine {
    pub fn compile_count(&self) -> usize {
        self.compiled.borrow().len()
    }
}

impl Engine for RecordingEngine {
    type Script = CompiledScript;
    type Options = ScriptOptions;
    type Sandbox = HashMap<String, String>;
    type Value = String;
    type Error = NativeError;

    fn compile_script(
        &self,
        source: &str,
        options: &ScriptOptions,
    ) -> Result<CompiledScript, NativeError> {
        self.compiled.borrow_mut().push(source.to_string());
        if let Some(err) = NativeError::from_source(source, UnitKind::Script) {
            return Err(err);
        }
        Ok(CompiledScript {
            source: source.to_string(),
            filename: options.filename.clone(),
        })
    }

    fn run_script(
        &self,
        script: &CompiledScript,
        _options: &ScriptOptions,
    ) -> Result<String, NativeError> {
        self.runs.set(self.runs.get() + 1);
        Ok(format!("ran {}", script.source))
    }

    fn run_script_in_new_context(
        &self,
        script: &CompiledScript,
        sandbox: HashMap<String, String>,
        _options: &ScriptOptions,
    ) -> Result<String, NativeError> {
        self.runs.set(self.runs.get() + 1);
        Ok(format!("ran {} with {} globals", script.source, sandbox.len()))
    }
}

impl ModuleEngine for RecordingEngine {
    type Module = CompiledModule;
    type ModuleOptions = ();

    fn compile_module(
        &self,
        source: &ModuleSource<'_>,
        _options: &(),
    ) -> Result<CompiledModule, NativeError> {
        self.compiled.borrow_mut().push(source.text.to_string());
        if let Some(err) = NativeError::from_source(source.text, UnitKind::Module) {
            return Err(err);
        }
        Ok(CompiledModule {
            source: source.text.to_string(),
            identifier: source.identifier.to_string(),
        })
    }
}

/// Engine that only compiles scripts.
#[derive(Debug, Default)]
pub struct ScriptOnlyEngine;

impl Engine for ScriptOnlyEngine {
    type Script = String;
    type Options = ();
    type Sandbox = ();
    type Value = usize;
    type Error = NativeError;

    fn compile_script(&self, source: &str, _options: &()) -> Result<String, NativeError> {
        Ok(source.to_string())
    }

    fn run_script(&self, script: &String, _options: &()) -> Result<usize, NativeError> {
        Ok(script.len())
    }

    fn run_script_in_new_context(
        &self,
        script: &String,
        _sandbox: (),
        _options: &(),
    ) -> Result<usize, NativeError> {
        Ok(script.len())
    }
}
