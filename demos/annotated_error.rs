//! Show the annotated error for source that stops mid-statement.
//!
//! ```bash
//! RUST_LOG=asi_guard=debug cargo run --example annotated_error
//! ```

use std::convert::Infallible;

use asi_guard::{CompileError, Engine, Intercepted, ScriptOptions};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Stand-in engine that accepts everything.
struct Accepting;

impl Engine for Accepting {
    type Script = String;
    type Options = ScriptOptions;
    type Sandbox = ();
    type Value = String;
    type Error = Infallible;

    fn compile_script(&self, source: &str, _: &ScriptOptions) -> Result<String, Infallible> {
        Ok(source.to_string())
    }

    fn run_script(&self, script: &String, _: &ScriptOptions) -> Result<String, Infallible> {
        Ok(format!("ran {} bytes", script.len()))
    }

    fn run_script_in_new_context(
        &self,
        script: &String,
        (): (),
        options: &ScriptOptions,
    ) -> Result<String, Infallible> {
        self.run_script(script, options)
    }
}

fn main() {
    // respects RUST_LOG
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let engine = Intercepted::new(Accepting);
    let sources = [
        ("complete.js", "const total = price * quantity\n"),
        ("truncated.js", "function total(items) {\n  return items.length *\n"),
        ("unrelated.js", "let x = );"),
    ];

    for (filename, source) in sources {
        let options = ScriptOptions::new().filename(filename);
        match engine.run_in_this_context(source, &options) {
            Ok(value) => println!("{filename}: {value}"),
            Err(CompileError::AmbiguousTermination(err)) => println!("{}\n", err.stack()),
            Err(CompileError::Engine(err)) => match err {},
        }
    }
}
