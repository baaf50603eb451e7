//! # Data Models Module / 数据模型模块
//!
//! This module defines the result types produced while grading: the outcome
//! of a single step, the structured failure record attached to failed steps,
//! and the immutable per-case [`TestResult`].
//!
//! 此模块定义评测过程中产生的结果类型：单个步骤的结果、失败步骤附带的结构化
//! 失败记录，以及每个用例不可变的 [`TestResult`]。

use serde::{Deserialize, Serialize};
use std::fmt;

/// Enumerates the possible reasons for a step failure.
/// This helps in categorizing errors for reporting and handling.
/// 枚举步骤失败的可能原因，便于报告和处理时对错误分类。
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The step exceeded its wall-clock limit.
    /// 步骤超出墙钟时间限制。
    Timeout,
    /// The process could not be started or inspected.
    /// 进程无法启动或无法获取状态。
    Runner,
    ReturnCodeMismatch,
    OutputMismatch,
    PatternMismatch,
    MissingFile,
    SpecialJudgeFailure,
    /// The expected-output file referenced by the check does not exist.
    /// 检查引用的期望输出文件不存在。
    ExpectedFileMissing,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::Timeout => "timeout",
            FailureKind::Runner => "runner error",
            FailureKind::ReturnCodeMismatch => "return code mismatch",
            FailureKind::OutputMismatch => "output mismatch",
            FailureKind::PatternMismatch => "pattern mismatch",
            FailureKind::MissingFile => "missing file",
            FailureKind::SpecialJudgeFailure => "special judge failure",
            FailureKind::ExpectedFileMissing => "expected file missing",
        };
        f.write_str(text)
    }
}

/// Structured record of one failed step.
/// 单个失败步骤的结构化记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// 1-based index of the step / 步骤序号（从 1 开始）
    pub step: usize,
    pub step_name: String,
    pub kind: FailureKind,
    pub error_message: String,
    /// The command line as it can be pasted into a shell from the current
    /// directory / 可在当前目录直接粘贴执行的命令行
    pub command: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stderr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub return_code: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_output: Option<String>,
}

/// Score awarded to one weighted step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepScore {
    pub label: String,
    pub awarded: f64,
    pub cap: f64,
}

/// What a step's subprocess left behind.
/// 步骤子进程的输出。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapturedOutput {
    pub stdout: String,
    pub stderr: String,
    pub return_code: i32,
}

/// Outcome of executing (and checking) one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    /// 1-based index of the step / 步骤序号（从 1 开始）
    pub index: usize,
    pub label: String,
    pub success: bool,
    pub must_pass: bool,
    /// Score awarded for this step; always zero on failure.
    pub awarded: f64,
    /// Declared weight of the step, if any.
    pub cap: Option<f64>,
    pub message: String,
    pub time: f64,
    /// Present when the step failed / 步骤失败时存在
    pub detail: Option<ErrorDetail>,
}

/// Derived status of a case result.
/// 用例结果的派生状态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Pass,
    Partial,
    Fail,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pass => "PASS",
            Status::Partial => "PARTIAL",
            Status::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents the final result of a single test case.
/// Produced once per case per run and never modified afterwards.
///
/// 表示单个测试用例的最终结果。每次运行每个用例只产生一次，之后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestResult {
    pub success: bool,
    pub message: String,
    /// Wall-clock seconds spent on the case / 用例耗时（秒）
    pub time: f64,
    pub score: f64,
    pub max_score: f64,
    #[serde(default)]
    pub step_scores: Vec<StepScore>,
    #[serde(default)]
    pub error_details: Vec<ErrorDetail>,
}

impl TestResult {
    /// FAIL if not successful, PASS on full marks, PARTIAL otherwise.
    pub fn status(&self) -> Status {
        if !self.success {
            Status::Fail
        } else if (self.score - self.max_score).abs() < f64::EPSILON {
            Status::Pass
        } else {
            Status::Partial
        }
    }

    /// The first failure record, if any step failed.
    pub fn first_error(&self) -> Option<&ErrorDetail> {
        self.error_details.first()
    }
}

/// Rounds `value` to `digits` decimal places for reports.
pub fn round_to(value: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (value * factor).round() / factor
}

/// Percentage of `total` over `max`, zero when nothing could be scored.
pub fn percentage(total: f64, max: f64) -> f64 {
    if max > 0.0 { total / max * 100.0 } else { 0.0 }
}
