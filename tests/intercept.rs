//! The intercepting engine wrapper against an in-memory engine.

mod common;

use std::collections::HashMap;

use asi_guard::{
    CompileError, Engine, Intercepted, ModuleEngine, ModuleSource, ScriptOptions, Validator,
};
use common::{CompiledScript, NativeError, RecordingEngine, ScriptOnlyEngine};

fn options(filename: &str) -> ScriptOptions {
    ScriptOptions::new().filename(filename)
}

// -----------------------------------------------------------
// Transparency for valid and natively failing sources.
// -----------------------------------------------------------

#[test]
fn valid_script_matches_plain_engine() {
    let source = "const greeting = 'hi'\nconsole.log(greeting)\n";
    let plain = RecordingEngine::default();
    let wrapped = Intercepted::new(RecordingEngine::default());

    let expected = plain.compile_script(source, &options("a.js")).expect("plain");
    let actual = wrapped
        .compile_script(source, &options("a.js"))
        .expect("wrapped");

    assert_eq!(actual, expected);
    assert_eq!(
        actual,
        CompiledScript {
            source: source.to_string(),
            filename: Some("a.js".to_string()),
        }
    );
    assert_eq!(wrapped.engine().compile_count(), 1);
}

#[test]
fn native_errors_pass_through_unchanged() {
    for source in ["let x = );", "foo(]", "'open", "return 1"] {
        let plain = RecordingEngine::default();
        let wrapped = Intercepted::new(RecordingEngine::default());

        let native = plain
            .compile_script(source, &ScriptOptions::new())
            .expect_err("engine rejects");
        let err = wrapped
            .compile_script(source, &ScriptOptions::new())
            .expect_err("engine rejects");

        assert!(!err.is_diagnostic(), "source: {source:?}");
        assert_eq!(err.to_string(), native.to_string());
        assert_eq!(err.into_engine(), Some(native));
    }
}

// -----------------------------------------------------------
// Ambiguous endings are caught before the engine compiles.
// -----------------------------------------------------------

#[test]
fn ambiguous_script_never_reaches_engine() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let err = wrapped
        .compile_script("1 +\n", &ScriptOptions::new())
        .expect_err("ambiguous");

    assert!(err.is_diagnostic());
    let diagnostic = err.as_ambiguous().expect("diagnostic");
    assert_eq!(diagnostic.location(), "evalmachine.<anonymous>:1:3");
    assert_eq!(wrapped.engine().compile_count(), 0);
}

#[test]
fn error_accessors_match_their_variant() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let diagnostic = wrapped
        .compile_script("x =", &ScriptOptions::new())
        .expect_err("ambiguous");
    let native = wrapped
        .compile_script("x = )", &ScriptOptions::new())
        .expect_err("engine rejects");

    assert!(native.as_ambiguous().is_none());
    assert!(diagnostic.as_ambiguous().is_some());
    assert_eq!(diagnostic.into_engine(), None);
}

#[test]
fn ambiguous_script_replaces_vague_native_error() {
    let source = "function f() { return";
    let native = RecordingEngine::default()
        .compile_script(source, &ScriptOptions::new())
        .expect_err("engine rejects");
    assert_eq!(native, NativeError("Unexpected end of input".to_string()));

    let err = Intercepted::new(RecordingEngine::default())
        .compile_script(source, &options("fn.js"))
        .expect_err("ambiguous");
    let CompileError::AmbiguousTermination(diagnostic) = err else {
        panic!("expected a diagnostic");
    };
    assert_eq!(diagnostic.location(), "fn.js:1:21");
    assert!(diagnostic.to_string().ends_with(&native.to_string()));
}

#[test]
fn options_filename_is_reported() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let err = wrapped
        .compile_script("items.push(", &options("/srv/app/list.js"))
        .expect_err("ambiguous");
    assert_eq!(
        err.as_ambiguous().map(|e| e.filename.as_str()),
        Some("/srv/app/list.js")
    );
}

// -----------------------------------------------------------
// Convenience entry points.
// -----------------------------------------------------------

#[test]
fn legacy_alias_validates() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    assert!(wrapped.create_script("x = 1", &ScriptOptions::new()).is_ok());
    let err = wrapped
        .create_script("x = [", &ScriptOptions::new())
        .expect_err("ambiguous");
    assert!(err.is_diagnostic());
}

#[test]
fn run_in_this_context_validates_then_runs() {
    let wrapped = Intercepted::new(RecordingEngine::default());

    let value = wrapped
        .run_in_this_context("answer()", &ScriptOptions::new())
        .expect("runs");
    assert_eq!(value, "ran answer()");
    assert_eq!(wrapped.engine().runs.get(), 1);

    let err = wrapped
        .run_in_this_context("answer(", &ScriptOptions::new())
        .expect_err("ambiguous");
    assert!(err.is_diagnostic());
    assert_eq!(wrapped.engine().runs.get(), 1);
}

#[test]
fn run_in_new_context_validates_then_runs() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let sandbox = HashMap::from([("x".to_string(), "1".to_string())]);

    let value = wrapped
        .run_in_new_context("x + 1", sandbox.clone(), &ScriptOptions::new())
        .expect("runs");
    assert_eq!(value, "ran x + 1 with 1 globals");

    let err = wrapped
        .run_in_new_context("x +", sandbox, &ScriptOptions::new())
        .expect_err("ambiguous");
    assert!(err.is_diagnostic());
    assert_eq!(wrapped.engine().runs.get(), 1);
}

#[test]
fn run_compiled_script_passes_through() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let script = wrapped
        .compile_script("tick()", &ScriptOptions::new())
        .expect("compiles");
    let value = wrapped
        .run_script(&script, &ScriptOptions::new())
        .expect("runs");
    assert_eq!(value, "ran tick()");
}

// -----------------------------------------------------------
// Modules.
// -----------------------------------------------------------

#[test]
fn module_compiles_through_wrapper() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let source = ModuleSource::new("export const x = 1;", "file:///app/x.mjs");
    let module = wrapped.compile_module(&source, &()).expect("compiles");
    assert_eq!(module.identifier, "file:///app/x.mjs");
    assert_eq!(wrapped.engine().compile_count(), 1);
}

#[test]
fn truncated_module_is_diagnosed() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let source = ModuleSource::new("import { a,", "file:///app/y.mjs");
    let err = wrapped.compile_module(&source, &()).expect_err("ambiguous");
    let diagnostic = err.as_ambiguous().expect("diagnostic");
    assert_eq!(diagnostic.location(), "file:///app/y.mjs:1:11");
    assert_eq!(wrapped.engine().compile_count(), 0);
}

#[test]
fn script_only_engine_still_validates() {
    let wrapped = Intercepted::new(ScriptOnlyEngine);
    assert_eq!(wrapped.run_in_this_context("abc", &()).expect("runs"), 3);
    let err = wrapped
        .run_in_this_context("abc +", &())
        .expect_err("ambiguous");
    assert_eq!(
        err.as_ambiguous().map(|e| e.filename.as_str()),
        Some("evalmachine.<anonymous>")
    );
}

// -----------------------------------------------------------
// Configuration and repeat calls.
// -----------------------------------------------------------

#[test]
fn custom_validator_configuration() {
    let validator = Validator::new().default_filename("repl").wrapper_prologue(None);
    let wrapped = Intercepted::with_validator(RecordingEngine::default(), validator);
    let err = wrapped
        .compile_script("a &&", &ScriptOptions::new())
        .expect_err("ambiguous");
    assert_eq!(
        err.as_ambiguous().map(asi_guard::AmbiguousTerminationError::location),
        Some("repl:1:4".to_string())
    );
}

#[test]
fn repeated_failures_render_identically() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    let first = wrapped
        .compile_script("while (true) {", &ScriptOptions::new())
        .expect_err("first");
    let second = wrapped
        .compile_script("while (true) {", &ScriptOptions::new())
        .expect_err("second");
    assert_eq!(first.to_string(), second.to_string());
    assert_eq!(wrapped.engine().compile_count(), 0);
}

#[test]
fn into_inner_returns_engine() {
    let wrapped = Intercepted::new(RecordingEngine::default());
    wrapped
        .compile_script("ok", &ScriptOptions::new())
        .expect("compiles");
    let engine = wrapped.into_inner();
    assert_eq!(engine.compiled.borrow().as_slice(), ["ok".to_string()]);
}
