//! # Run History Module / 运行历史模块
//!
//! Persists a summary of the most recent grading runs as a pretty-printed
//! JSON array, so that failed cases can be located and rerun later.
//!
//! 以格式化 JSON 数组的形式保存最近几次评测运行的摘要，以便之后定位并重跑失败的用例。

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::TestCase;
use crate::core::error::HistoryError;
use crate::core::models::{ErrorDetail, Status, StepScore, TestResult, percentage, round_to};

/// File name of the history store inside the project root.
pub const HISTORY_FILE: &str = ".test_history";
/// Number of runs kept; older runs are evicted first.
pub const MAX_ENTRIES: usize = 10;

/// Summary of one case within a run.
/// 一次运行中单个用例的摘要。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub path: PathBuf,
    pub build_path: PathBuf,
    pub score: f64,
    pub max_score: f64,
    pub status: Status,
    pub time: f64,
    pub message: String,
    #[serde(default)]
    pub step_scores: Vec<StepScore>,
    /// First failure of a case that did not pass / 未通过用例的首个失败记录
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_details: Option<ErrorDetail>,
}

impl CaseSummary {
    pub fn new(case: &TestCase, result: &TestResult) -> Self {
        let status = result.status();
        let error_details = if status == Status::Pass {
            None
        } else {
            result.first_error().cloned()
        };
        Self {
            name: case.meta.name.clone(),
            description: case.meta.description.clone().unwrap_or_default(),
            path: case.path.clone(),
            build_path: case.build_dir(),
            score: result.score,
            max_score: result.max_score,
            status,
            time: result.time,
            message: result.message.clone(),
            step_scores: result.step_scores.clone(),
            error_details,
        }
    }
}

/// One grading run.
/// 一次评测运行。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Local time, `%Y-%m-%d %H:%M:%S`
    pub timestamp: String,
    pub total_score: f64,
    pub max_score: f64,
    pub percentage: f64,
    pub tests: Vec<CaseSummary>,
}

impl HistoryEntry {
    /// Builds the record of a run from its cases and results, stamped with
    /// the current local time.
    pub fn from_run(cases: &[TestCase], results: &[TestResult]) -> Self {
        let total_score: f64 = results.iter().map(|r| r.score).sum();
        let max_score: f64 = results.iter().map(|r| r.max_score).sum();
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            total_score: round_to(total_score, 1),
            max_score: round_to(max_score, 1),
            percentage: round_to(percentage(total_score, max_score), 1),
            tests: cases
                .iter()
                .zip(results)
                .map(|(case, result)| CaseSummary::new(case, result))
                .collect(),
        }
    }

    /// Cases of this run that did not pass, in run order.
    pub fn failed(&self) -> impl Iterator<Item = &CaseSummary> {
        self.tests.iter().filter(|t| t.status != Status::Pass)
    }
}

/// The history file of a project.
/// 项目的历史记录文件。
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The store at its usual place inside `project_root`.
    pub fn in_project(project_root: &Path) -> Self {
        Self::new(project_root.join(HISTORY_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends `entry`, keeping only the most recent [`MAX_ENTRIES`] runs.
    ///
    /// A missing or unreadable history is started afresh rather than
    /// reported; only the final write can fail.
    pub fn append(&self, entry: HistoryEntry) -> Result<(), HistoryError> {
        let mut entries = self.entries().unwrap_or_default();
        entries.push(entry);
        if entries.len() > MAX_ENTRIES {
            let excess = entries.len() - MAX_ENTRIES;
            entries.drain(..excess);
        }
        let content = serde_json::to_string_pretty(&entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }

    /// Reads every stored run, oldest first.
    pub fn entries(&self) -> Result<Vec<HistoryEntry>, HistoryError> {
        if !self.path.exists() {
            return Err(HistoryError::NotFound);
        }
        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// The most recent run.
    pub fn latest(&self) -> Result<HistoryEntry, HistoryError> {
        self.entries()?.pop().ok_or(HistoryError::Empty)
    }

    /// The first case of the most recent run that did not pass.
    pub fn last_failed_case(&self) -> Result<CaseSummary, HistoryError> {
        let latest = self.latest()?;
        latest.failed().next().cloned().ok_or(HistoryError::NoFailures)
    }

    /// Every case of the most recent run that did not pass.
    pub fn last_failed_cases(&self) -> Result<Vec<CaseSummary>, HistoryError> {
        let latest = self.latest()?;
        let failed: Vec<CaseSummary> = latest.failed().cloned().collect();
        if failed.is_empty() {
            return Err(HistoryError::NoFailures);
        }
        Ok(failed)
    }
}
