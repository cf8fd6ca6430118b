//! Shared test infrastructure for integration tests.

use std::env;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn manifest_dir() -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_else(|_| ".".into()))
}

/// Scenario fixture plus a scratch directory for generated plans.
pub struct TestFixture {
    pub scenario: PathBuf,
    pub work_dir: TempDir,
}

/// Captured `jmxb` invocation.
#[derive(Debug)]
pub struct RunResult {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

impl From<Output> for RunResult {
    fn from(output: Output) -> Self {
        Self {
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl TestFixture {
    /// Load a fixture by name from tests/fixtures/{name}/scenario.json.
    pub fn load(name: &str) -> anyhow::Result<Self> {
        let scenario = manifest_dir()
            .join("tests/fixtures")
            .join(name)
            .join("scenario.json");
        if !scenario.is_file() {
            anyhow::bail!("missing fixture {}", scenario.display());
        }
        Ok(Self {
            scenario,
            work_dir: TempDir::new()?,
        })
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.work_dir.path().join(name)
    }

    /// Compile the fixture scenario to `out` for `version`.
    pub fn compile(&self, version: &str, out: &Path) -> RunResult {
        run_jmxb(&[
            "compile",
            "--scenario",
            path_arg(&self.scenario),
            "--out",
            path_arg(out),
            "--jmeter-version",
            version,
        ])
    }
}

pub fn path_arg(path: &Path) -> &str {
    path.to_str().expect("utf-8 test path")
}

pub fn run_jmxb(args: &[&str]) -> RunResult {
    Command::new(env!("CARGO_BIN_EXE_jmxb"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("spawn jmxb")
        .into()
}
