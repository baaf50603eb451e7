// Shared test helpers for integration tests
#![allow(dead_code)]

use lab_grader::core::config::{GraderConfig, ProjectPaths};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{TempDir, tempdir};

/// A throwaway grading project: `grader_config.toml` plus case directories
/// under `tests/cases`.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = tempdir().expect("Failed to create temporary directory");
        fs::create_dir_all(dir.path().join("tests/cases")).expect("Failed to create cases directory");
        fs::create_dir_all(dir.path().join("tests/common")).expect("Failed to create common directory");
        Self { dir }
    }

    /// Canonical project root, so paths compare equal to what the grader reports.
    pub fn root(&self) -> PathBuf {
        self.dir.path().canonicalize().expect("Failed to canonicalize project root")
    }

    pub fn cases_dir(&self) -> PathBuf {
        self.root().join("tests/cases")
    }

    pub fn write_config(&self, content: &str) {
        self.write_file("grader_config.toml", content);
    }

    /// Writes `content` at `relative` under the project root, creating parents.
    pub fn write_file(&self, relative: &str, content: &str) -> PathBuf {
        let path = self.root().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("Failed to create parent directory");
        }
        fs::write(&path, content).expect("Failed to write file");
        path
    }

    /// Creates `tests/cases/<dir_name>/config.toml` and returns the case directory.
    pub fn add_case(&self, dir_name: &str, config: &str) -> PathBuf {
        let dir = self.cases_dir().join(dir_name);
        fs::create_dir_all(&dir).expect("Failed to create case directory");
        fs::write(dir.join("config.toml"), config).expect("Failed to write case config");
        dir
    }

    /// Writes a file inside an existing case directory.
    pub fn add_case_file(&self, dir_name: &str, file: &str, content: &str) -> PathBuf {
        self.write_file(&format!("tests/cases/{dir_name}/{file}"), content)
    }

    pub fn paths(&self) -> ProjectPaths {
        let root = self.root();
        let config = GraderConfig::load(&root).expect("Failed to load grader config");
        ProjectPaths::new(&root, &config)
    }
}

/// A case definition with a `[meta]` section followed by `steps`, which must
/// be one or more `[[run]]` tables.
pub fn case_toml(name: &str, score: f64, steps: &str) -> String {
    format!("[meta]\nname = \"{name}\"\nscore = {score:.1}\n\n{steps}")
}

/// A single `sh -c` step with an expected return code.
pub fn shell_step(script: &str, return_code: i32) -> String {
    format!(
        "[[run]]\ncommand = \"sh\"\nargs = [\"-c\", {script:?}]\n\n[run.check]\nreturn_code = {return_code}\n"
    )
}

/// Marks a script file as executable.
#[cfg(unix)]
pub fn make_executable(path: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = fs::metadata(path).expect("Failed to stat file").permissions();
    perms.set_mode(0o755);
    fs::set_permissions(path, perms).expect("Failed to set permissions");
}
