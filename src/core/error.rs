//! # Error Types Module / 错误类型模块
//!
//! Typed errors for every component that can abort a grading run. Step-level
//! failures are not errors: they are recorded in the case result as
//! [`FailureKind`](crate::core::models::FailureKind) values.
//!
//! 可中止评测运行的各组件错误类型。步骤级失败不是错误，而是以
//! `FailureKind` 的形式记录在用例结果中。

use std::path::PathBuf;
use thiserror::Error;

/// Malformed or incomplete case definitions and global configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("missing '{section}' section in {path}")]
    MissingSection { path: PathBuf, section: &'static str },
    #[error("missing '{field}' in {path}")]
    MissingField { path: PathBuf, field: &'static str },
    #[error("invalid '{field}' in {path}: {reason}")]
    InvalidField {
        path: PathBuf,
        field: String,
        reason: String,
    },
}

/// Failures while turning a user-supplied identifier into concrete cases.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SelectionError {
    #[error("no group matching '{0}' found in config")]
    NoGroup(String),
    #[error("multiple groups match '{query}': {}", .candidates.join(", "))]
    AmbiguousGroup {
        query: String,
        candidates: Vec<String>,
    },
    #[error("no test cases found in group '{0}'")]
    EmptyGroup(String),
    #[error("no test cases with prefix number '{0}' found")]
    NoCaseWithNumber(String),
    #[error("no test cases starting with '{0}' found")]
    NoCase(String),
    #[error("multiple test cases match '{query}': {}", .candidates.join(", "))]
    AmbiguousCase {
        query: String,
        candidates: Vec<String>,
    },
    #[error("no valid test cases found in specified paths")]
    NoValidPaths,
    #[error("cases directory not found: {}", .0.display())]
    CasesDirMissing(PathBuf),
    #[error("no test cases found in {}", .0.display())]
    NoCases(PathBuf),
}

/// A pre-run setup command did not complete successfully.
#[derive(Error, Debug)]
pub enum SetupError {
    #[error("unknown setup step type: {0}")]
    UnknownStepType(String),
    #[error("failed to start setup command '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("setup command '{command}' has an invalid timeout: {timeout}")]
    InvalidTimeout { command: String, timeout: f64 },
    #[error("setup command '{command}' timed out after {timeout}s")]
    Timeout { command: String, timeout: f64 },
    #[error("setup command '{command}' failed with exit code {code}:\n{stderr}")]
    Failed {
        command: String,
        code: i32,
        stderr: String,
    },
}

/// Errors from reading or writing the run history file.
#[derive(Error, Debug)]
pub enum HistoryError {
    #[error("no test history found")]
    NotFound,
    #[error("test history is empty")]
    Empty,
    #[error("no failed test found in last run")]
    NoFailures,
    #[error("test history is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from generating IDE debug profiles.
#[derive(Error, Debug)]
pub enum DebugConfigError {
    #[error("unsupported debug type: {0}")]
    UnsupportedDebugType(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
