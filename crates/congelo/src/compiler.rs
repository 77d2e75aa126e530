//! Source-to-bytecode compilation
//!
//! The marshalled bytecode format belongs to the interpreter that will import
//! the frozen modules, so compilation is delegated to a CPython subprocess
//! rather than reimplemented. The trait boundary keeps the rest of the
//! pipeline compiler-agnostic and testable with a fake.

use std::{
    io::Write,
    path::Path,
    process::{Command, Stdio},
};

use anyhow::{Context, Result, bail};

/// Compiles Python source text into a marshalled code object.
pub trait BytecodeCompiler {
    /// Compile `source`, embedding `origin` as the logical file name shown in
    /// tracebacks and syntax errors. `origin` is never reopened.
    fn compile(&self, source: &str, origin: &Path) -> Result<Vec<u8>>;
}

/// Helper passed to `python -c`: reads the whole of stdin, compiles it under
/// the file name given as the first argument, and writes the marshalled code
/// object to stdout.
const COMPILE_HELPER: &str = r#"
import marshal, sys

source = sys.stdin.buffer.read().decode("utf-8")
code = compile(source, sys.argv[1], "exec")
sys.stdout.buffer.write(marshal.dumps(code))
"#;

/// Production compiler backed by one short-lived CPython subprocess per file.
#[derive(Debug, Clone)]
pub struct CPythonCompiler {
    python: String,
}

impl CPythonCompiler {
    pub fn new(python: impl Into<String>) -> Self {
        Self {
            python: python.into(),
        }
    }
}

impl BytecodeCompiler for CPythonCompiler {
    fn compile(&self, source: &str, origin: &Path) -> Result<Vec<u8>> {
        let mut child = Command::new(&self.python)
            .arg("-c")
            .arg(COMPILE_HELPER)
            .arg(origin)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("failed to start python interpreter `{}`", self.python))?;

        // The helper reads stdin to EOF before producing any output, so the
        // whole source can be written up front without risking a pipe
        // deadlock.
        let mut stdin = child.stdin.take().context("child stdin not captured")?;
        stdin
            .write_all(source.as_bytes())
            .with_context(|| format!("failed to stream {} to the compiler", origin.display()))?;
        drop(stdin);

        let output = child
            .wait_with_output()
            .with_context(|| format!("failed to collect output from `{}`", self.python))?;

        if !output.status.success() {
            bail!(
                "failed to compile {}:\n{}",
                origin.display(),
                String::from_utf8_lossy(&output.stderr).trim_end()
            );
        }
        Ok(output.stdout)
    }
}
