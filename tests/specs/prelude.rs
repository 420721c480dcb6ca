//! Spec harness: throwaway deployments and a fluent wrapper around the
//! `rb` binary.

use std::path::{Path, PathBuf};
use std::process::Output;

pub use serde_json::Value;

pub const ENVIRONMENTS: [&str; 2] = ["staging", "production"];

/// Run `rb` outside any project.
pub fn cli() -> Cli {
    Cli::new()
}

/// A temp dir holding one deployment per environment plus `rollback.toml`.
///
/// ```text
/// <root>/rollback.toml
/// <root>/state/                 rb state directory
/// <root>/<env>/repo/VERSION     git work tree
/// <root>/<env>/app.toml         configuration snapshot set
/// <root>/<env>/data.txt         the "data store"
/// ```
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: tempfile::tempdir().unwrap() }
    }

    /// Both environments deployed at release `v1`.
    pub fn deployed() -> Self {
        let project = Self::empty();
        for env in ENVIRONMENTS {
            project.file(&format!("{env}/repo/VERSION"), "v1\n");
            project.git(env, &["init", "-q"]);
            project.git(env, &["add", "VERSION"]);
            project.git(env, &["commit", "-q", "-m", "v1"]);
            project.file(&format!("{env}/app.toml"), "release = \"v1\"\n");
            project.file(&format!("{env}/data.txt"), "rows=v1\n");
        }
        project.file("rollback.toml", &project.config());
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    /// Release `version` to `env`: new commit, config and data.
    pub fn deploy(&self, env: &str, version: &str) {
        self.file(&format!("{env}/repo/VERSION"), &format!("{version}\n"));
        self.git(env, &["commit", "-q", "-am", version]);
        self.file(&format!("{env}/app.toml"), &format!("release = \"{version}\"\n"));
        self.file(&format!("{env}/data.txt"), &format!("rows={version}\n"));
    }

    /// Make the named operation of `env` fail until the marker is removed.
    pub fn break_operation(&self, env: &str, operation: &str) {
        self.file(&format!("{env}/break-{operation}"), "");
    }

    pub fn git(&self, env: &str, args: &[&str]) -> String {
        let repo = self.path().join(env).join("repo");
        let output = std::process::Command::new("git")
            .arg("-C")
            .arg(&repo)
            .args(args)
            .env("GIT_AUTHOR_NAME", "spec")
            .env("GIT_AUTHOR_EMAIL", "spec@example.com")
            .env("GIT_COMMITTER_NAME", "spec")
            .env("GIT_COMMITTER_EMAIL", "spec@example.com")
            .env_remove("GIT_DIR")
            .env_remove("GIT_WORK_TREE")
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    pub fn head(&self, env: &str) -> String {
        self.git(env, &["rev-parse", "HEAD"])
    }

    pub fn state_dir(&self) -> PathBuf {
        self.path().join("state")
    }

    fn config(&self) -> String {
        let root = self.path().display();
        let mut config = format!(
            "state_dir = \"{root}/state\"\n\
             step_timeout_ms = 30000\n\
             capture_timeout_ms = 30000\n"
        );
        for env in ENVIRONMENTS {
            config.push_str(&format!(
                r#"
[environments.{env}]
config_files = ["{root}/{env}/app.toml"]
repo = "{root}/{env}/repo"
data_dump = 'cp ../data.txt "$RB_DUMP_PATH"'
data_restore = 'test ! -e ../break-data-restore && cp "$RB_DUMP_PATH" ../data.txt'

[environments.{env}.operations]
environment-ping = 'test ! -e ../break-environment-ping'
data-store-ping = 'test -f ../data.txt'
release-version = 'cat VERSION'
stop-services = 'touch ../stopped'
resume-services = 'rm -f ../stopped'
liveness = 'test ! -e ../stopped'
smoke-test = 'test ! -e ../break-smoke-test'
"#
            ));
        }
        config
    }

    /// Run `rb` from the project root.
    pub fn rb(&self) -> Cli {
        Cli::new().current_dir(self.path())
    }

    /// Create a rollback point of `env` and return its id.
    pub fn create_point(&self, env: &str) -> String {
        let run = self.rb().args(&["create-point", env, "-o", "json"]).passes();
        run.json()["id"].as_str().unwrap().to_string()
    }
}

pub struct Cli {
    cmd: assert_cmd::Command,
}

impl Cli {
    fn new() -> Self {
        let mut cmd = assert_cmd::Command::cargo_bin("rb").unwrap();
        cmd.env("NO_COLOR", "1")
            .env("USER", "spec")
            .env_remove("COLOR")
            .env_remove("RB_CONFIG")
            .env_remove("RB_STATE_DIR")
            .env_remove("RB_LOG");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    fn run(mut self) -> Run {
        Run { output: self.cmd.output().unwrap() }
    }

    pub fn passes(self) -> Run {
        let run = self.run();
        assert!(run.output.status.success(), "expected success\n{}", run.describe());
        run
    }

    pub fn fails(self) -> Run {
        let run = self.run();
        assert!(!run.output.status.success(), "expected failure\n{}", run.describe());
        run
    }

    pub fn exits(self, code: i32) -> Run {
        let run = self.run();
        assert_eq!(run.output.status.code(), Some(code), "{}", run.describe());
        run
    }
}

pub struct Run {
    output: Output,
}

impl Run {
    pub fn stdout(&self) -> String {
        String::from_utf8_lossy(&self.output.stdout).into_owned()
    }

    pub fn stderr(&self) -> String {
        String::from_utf8_lossy(&self.output.stderr).into_owned()
    }

    fn describe(&self) -> String {
        format!("stdout:\n{}\nstderr:\n{}", self.stdout(), self.stderr())
    }

    pub fn stdout_has(self, expected: &str) -> Self {
        assert!(self.stdout().contains(expected), "stdout lacks {expected:?}\n{}", self.describe());
        self
    }

    pub fn stdout_lacks(self, unexpected: &str) -> Self {
        let stdout = self.stdout();
        assert!(!stdout.contains(unexpected), "stdout has {unexpected:?}\n{}", self.describe());
        self
    }

    pub fn stderr_has(self, expected: &str) -> Self {
        assert!(self.stderr().contains(expected), "stderr lacks {expected:?}\n{}", self.describe());
        self
    }

    pub fn stdout_eq(self, expected: &str) -> Self {
        similar_asserts::assert_eq!(self.stdout(), expected);
        self
    }

    pub fn json(&self) -> Value {
        serde_json::from_str(&self.stdout())
            .unwrap_or_else(|e| panic!("invalid JSON ({e})\n{}", self.describe()))
    }
}
