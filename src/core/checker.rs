//! # Composite Checker Module / 组合检查模块
//!
//! Verifies what a step left behind. The checks declared in a step's
//! `[run.check]` table are turned into an ordered chain of [`Check`]s:
//! return code, required files, expected stdout, expected stderr, the
//! special judge, and finally the output patterns. The first failing check
//! short-circuits the chain.
//!
//! 校验步骤的执行结果。步骤 `[run.check]` 中声明的检查被转换为有序的 [`Check`] 链：
//! 退出码、必需文件、期望标准输出、期望标准错误、特判程序，最后是输出模式匹配。
//! 第一个失败的检查会终止整条链。

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::process::Command;

use crate::core::config::CheckSpec;
use crate::core::models::{CapturedOutput, FailureKind};
use crate::core::resolver::ResolveContext;
use crate::infra::{command, fs::anchor, t};

/// Upper bound on how long a special judge may run.
pub const JUDGE_TIMEOUT: Duration = Duration::from_secs(30);

/// One verification strategy.
/// 单个校验策略。
#[derive(Debug, Clone)]
pub enum Check {
    ReturnCode(i32),
    /// Raw file references, resolved when the check runs.
    Files(Vec<String>),
    StdoutExact(PathBuf),
    StderrExact(PathBuf),
    SpecialJudge(PathBuf),
    StdoutPattern(Regex),
    StderrPattern(Regex),
}

/// Everything a check needs besides the captured output.
#[derive(Debug, Clone, Copy)]
pub struct CheckContext<'a> {
    pub case_dir: &'a Path,
    pub resolver: &'a ResolveContext,
    /// Declared weight of the step, zero when it has none.
    pub cap: f64,
}

/// Why a check failed.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckFailure {
    pub kind: FailureKind,
    pub message: String,
    pub expected_output: Option<String>,
}

impl CheckFailure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            expected_output: None,
        }
    }
}

/// Result of running the whole chain.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckOutcome {
    /// Every check passed. A special judge may have decided the step's score.
    Pass { score_override: Option<f64> },
    Fail(CheckFailure),
}

/// Payload written to a special judge's standard input.
#[derive(Debug, Serialize)]
pub struct JudgeInput<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
    pub return_code: i32,
    pub test_dir: String,
    pub max_score: f64,
}

/// What a special judge prints on its standard output.
#[derive(Debug, Deserialize)]
pub struct JudgeVerdict {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
}

/// The ordered check chain of one step.
#[derive(Debug, Clone, Default)]
pub struct CompositeChecker {
    checks: Vec<Check>,
    ignore_whitespace: bool,
}

impl CompositeChecker {
    /// Builds the chain from a step's check spec. Expected-output and judge
    /// paths are taken relative to `case_dir`.
    pub fn from_spec(spec: &CheckSpec, case_dir: &Path) -> Result<Self, regex::Error> {
        let mut checks = Vec::new();
        if let Some(code) = spec.return_code {
            checks.push(Check::ReturnCode(code));
        }
        if !spec.files.is_empty() {
            checks.push(Check::Files(spec.files.clone()));
        }
        if let Some(expected) = &spec.stdout {
            checks.push(Check::StdoutExact(case_dir.join(expected)));
        }
        if let Some(expected) = &spec.stderr {
            checks.push(Check::StderrExact(case_dir.join(expected)));
        }
        if let Some(judge) = &spec.special_judge {
            checks.push(Check::SpecialJudge(case_dir.join(judge)));
        }
        if let Some(pattern) = &spec.stdout_pattern {
            checks.push(Check::StdoutPattern(multi_line(pattern)?));
        }
        if let Some(pattern) = &spec.stderr_pattern {
            checks.push(Check::StderrPattern(multi_line(pattern)?));
        }
        Ok(Self {
            checks,
            ignore_whitespace: spec.ignore_whitespace,
        })
    }

    pub fn checks(&self) -> &[Check] {
        &self.checks
    }

    /// Runs the chain against `output`, stopping at the first failure.
    pub async fn check(&self, output: &CapturedOutput, ctx: CheckContext<'_>) -> CheckOutcome {
        let mut score_override = None;
        for check in &self.checks {
            let result = match check {
                Check::ReturnCode(expected) => check_return_code(*expected, output.return_code),
                Check::Files(files) => check_files(files, ctx),
                Check::StdoutExact(path) => {
                    compare_output(path, &output.stdout, self.ignore_whitespace, Stream::Stdout)
                }
                Check::StderrExact(path) => {
                    compare_output(path, &output.stderr, self.ignore_whitespace, Stream::Stderr)
                }
                Check::SpecialJudge(judge) => match run_judge(judge, output, ctx).await {
                    Ok(score) => {
                        score_override = score;
                        Ok(())
                    }
                    Err(failure) => Err(failure),
                },
                Check::StdoutPattern(re) => check_pattern(re, &output.stdout, Stream::Stdout),
                Check::StderrPattern(re) => check_pattern(re, &output.stderr, Stream::Stderr),
            };
            if let Err(failure) = result {
                return CheckOutcome::Fail(failure);
            }
        }
        CheckOutcome::Pass { score_override }
    }
}

#[derive(Debug, Clone, Copy)]
enum Stream {
    Stdout,
    Stderr,
}

fn multi_line(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).multi_line(true).build()
}

fn check_return_code(expected: i32, actual: i32) -> Result<(), CheckFailure> {
    if expected == actual {
        return Ok(());
    }
    Err(CheckFailure::new(
        FailureKind::ReturnCodeMismatch,
        t!("check.return_code_mismatch", expected = expected, actual = actual),
    ))
}

fn check_files(files: &[String], ctx: CheckContext<'_>) -> Result<(), CheckFailure> {
    for file in files {
        let resolved = ctx.resolver.resolve(file).map_err(|e| {
            CheckFailure::new(FailureKind::Runner, format!("{file}: {e}"))
        })?;
        if !anchor(ctx.case_dir, &resolved).exists() {
            return Err(CheckFailure::new(
                FailureKind::MissingFile,
                t!("check.missing_file", file = file),
            ));
        }
    }
    Ok(())
}

fn compare_output(
    expected_path: &Path,
    actual: &str,
    ignore_whitespace: bool,
    stream: Stream,
) -> Result<(), CheckFailure> {
    let expected = std::fs::read_to_string(expected_path).map_err(|_| {
        let file = expected_path.display();
        CheckFailure::new(
            FailureKind::ExpectedFileMissing,
            match stream {
                Stream::Stdout => t!("check.expected_stdout_missing", file = file),
                Stream::Stderr => t!("check.expected_stderr_missing", file = file),
            },
        )
    })?;
    if outputs_match(&expected, actual, ignore_whitespace) {
        return Ok(());
    }
    let message = match stream {
        Stream::Stdout => t!("check.stdout_mismatch"),
        Stream::Stderr => t!("check.stderr_mismatch"),
    };
    Err(CheckFailure {
        kind: FailureKind::OutputMismatch,
        message: message.to_string(),
        expected_output: Some(expected),
    })
}

/// Compares expected and actual output. Trailing whitespace is always
/// ignored; with `ignore_whitespace` every whitespace run counts as one space.
pub fn outputs_match(expected: &str, actual: &str, ignore_whitespace: bool) -> bool {
    if ignore_whitespace {
        collapse_whitespace(expected) == collapse_whitespace(actual)
    } else {
        expected.trim_end() == actual.trim_end()
    }
}

/// Collapses each whitespace run to a single space and trims both ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn check_pattern(re: &Regex, haystack: &str, stream: Stream) -> Result<(), CheckFailure> {
    if re.is_match(haystack) {
        return Ok(());
    }
    let pattern = re.as_str();
    Err(CheckFailure::new(
        FailureKind::PatternMismatch,
        match stream {
            Stream::Stdout => t!("check.stdout_pattern_mismatch", pattern = pattern),
            Stream::Stderr => t!("check.stderr_pattern_mismatch", pattern = pattern),
        },
    ))
}

/// Clamps a judge-reported score into `[0, cap]`.
pub fn clamp_score(score: f64, cap: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, cap.max(0.0))
}

async fn run_judge(
    judge: &Path,
    output: &CapturedOutput,
    ctx: CheckContext<'_>,
) -> Result<Option<f64>, CheckFailure> {
    let judge_failure = |message: String| CheckFailure::new(FailureKind::SpecialJudgeFailure, message);

    if !judge.exists() {
        return Err(judge_failure(
            t!("check.judge_not_found", file = judge.display()).to_string(),
        ));
    }

    let mut cmd = if judge.extension().is_some_and(|ext| ext == "py") {
        let mut cmd = Command::new("python3");
        cmd.arg(judge);
        cmd
    } else {
        Command::new(judge)
    };
    cmd.current_dir(ctx.case_dir);

    let input = JudgeInput {
        stdout: &output.stdout,
        stderr: &output.stderr,
        return_code: output.return_code,
        test_dir: ctx.case_dir.to_string_lossy().into_owned(),
        max_score: ctx.cap,
    };
    let payload = serde_json::to_vec(&input)
        .map_err(|e| judge_failure(t!("check.judge_error", error = e).to_string()))?;

    let captured = command::run_with_timeout(cmd, Some(payload), JUDGE_TIMEOUT)
        .await
        .map_err(|e| judge_failure(t!("check.judge_error", error = e).to_string()))?;

    let verdict: JudgeVerdict = serde_json::from_str(captured.stdout.trim()).map_err(|e| {
        judge_failure(t!("check.judge_bad_output", error = e).to_string())
    })?;

    if !verdict.success {
        let message = verdict
            .message
            .unwrap_or_else(|| t!("check.judge_rejected").to_string());
        return Err(judge_failure(message));
    }
    Ok(verdict.score.map(|score| clamp_score(score, ctx.cap)))
}
