//! # Test Execution Engine Module / 测试执行引擎模块
//!
//! This module runs a single test case: it resets the case's build directory,
//! executes every step in declared order with its timeout, feeds declared
//! input files, verifies each step through the composite checker and folds
//! the outcomes into a [`TestResult`]. It also runs the global setup steps.
//!
//! 此模块执行单个测试用例：重置用例构建目录，按声明顺序执行每个带超时的步骤，
//! 注入输入文件，通过组合检查器校验每个步骤，并将结果汇总为 [`TestResult`]。
//! 此外还负责执行全局准备步骤。

use colored::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::process::Command;

use crate::{
    core::{
        checker::{CheckContext, CheckOutcome, CompositeChecker},
        config::{self, CheckSpec, ProjectPaths, SetupConfig, Step, TestCase},
        error::SetupError,
        models::{CapturedOutput, ErrorDetail, FailureKind, StepOutcome, TestResult},
        resolver::ResolveContext,
        scoring::{Flow, ScoreAggregator},
    },
    infra::{
        command::{self, ExecError},
        fs::reset_build_dir,
        t,
    },
};

/// Switches that change how cases are executed.
/// 控制用例执行方式的开关。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Print each step's command, output and exit code.
    pub verbose: bool,
    /// Print what would run without running anything.
    pub dry_run: bool,
    /// Skip the check chain; a zero exit code is enough.
    pub no_check: bool,
    /// Print nothing at all (JSON output).
    pub quiet: bool,
}

/// Shared, read-only state for executing cases of one invocation.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub paths: ProjectPaths,
    pub options: RunOptions,
    /// Directory the grader was started from; command lines in failure
    /// records are expressed relative to it.
    pub invocation_dir: PathBuf,
}

impl RunContext {
    pub fn new(paths: ProjectPaths, options: RunOptions) -> Self {
        let invocation_dir = std::env::current_dir()
            .ok()
            .and_then(|dir| std::path::absolute(dir).ok())
            .unwrap_or_else(|| paths.root.clone());
        Self {
            paths,
            options,
            invocation_dir,
        }
    }

    fn announce(&self) -> bool {
        !self.options.quiet
    }
}

/// The main entry point for running a single test case.
///
/// Failures inside the case never escape as errors: they are recorded in the
/// returned [`TestResult`] so that other cases still run.
///
/// # Arguments
/// * `case` - The loaded test case
/// * `ctx` - Project paths and run options
///
/// # Returns
/// The final `TestResult` of the case
pub async fn run_test_case(case: &TestCase, ctx: &RunContext) -> TestResult {
    let start_time = Instant::now();

    if ctx.announce() {
        println!("{}", t!("run.running_case", name = &case.meta.name).blue());
    }

    if ctx.options.dry_run {
        print_dry_run(case, ctx);
        return ScoreAggregator::dry_run(case, start_time.elapsed().as_secs_f64());
    }

    let mut aggregator = ScoreAggregator::new(case);

    if let Err(e) = reset_build_dir(&case.build_dir()) {
        let message = format!("{e:#}");
        if ctx.announce() {
            eprintln!("{}", t!("run.build_dir_reset_failed", error = &message).red());
        }
        let mut result = aggregator.finish(start_time.elapsed().as_secs_f64());
        result.success = false;
        result.score = 0.0;
        result.message = message;
        return result;
    }

    let step_resolver = ResolveContext::for_case(case, &ctx.paths, &case.path);
    let display_resolver = ResolveContext::for_case(case, &ctx.paths, &ctx.invocation_dir);
    let total = case.steps.len();

    for (i, step) in case.steps.iter().enumerate() {
        let index = i + 1;
        if ctx.options.verbose && ctx.announce() {
            println!(
                "{}",
                t!("run.running_step", name = &case.meta.name, index = index, total = total, step = step.label())
                    .cyan()
            );
        }
        let outcome = execute_step(case, step, index, ctx, &step_resolver, &display_resolver).await;
        if aggregator.record(outcome) == Flow::Halt {
            break;
        }
    }

    let result = aggregator.finish(start_time.elapsed().as_secs_f64());
    if ctx.announce() {
        let line = t!(
            "run.case_finished",
            name = &case.meta.name,
            status = result.status(),
            score = format!("{:.1}", result.score),
            max = format!("{:.1}", result.max_score)
        );
        if result.success {
            println!("{}", line.green());
        } else {
            println!("{}", line.red());
        }
    }
    result
}

/// Executes one step and verifies its output.
async fn execute_step(
    case: &TestCase,
    step: &Step,
    index: usize,
    ctx: &RunContext,
    resolver: &ResolveContext,
    display_resolver: &ResolveContext,
) -> StepOutcome {
    let step_start = Instant::now();
    let fail = |failure: StepFailure| {
        failure.into_outcome(step, index, command_line(step, display_resolver), step_start)
    };

    let (program, args) = match resolve_command(step, resolver) {
        Ok(resolved) => resolved,
        Err(e) => return fail(StepFailure::new(FailureKind::Runner, step, index, e.to_string())),
    };

    let stdin = match &step.stdin {
        Some(file) => match std::fs::read(case.path.join(file)) {
            Ok(data) => Some(data),
            Err(_) => {
                let reason = t!("run.stdin_missing", file = file).to_string();
                return fail(StepFailure::new(FailureKind::Runner, step, index, reason));
            }
        },
        None => None,
    };

    let mut cmd = Command::new(&program);
    cmd.args(&args).current_dir(&case.path);

    let Some(timeout) = config::timeout_duration(step.timeout) else {
        let reason = t!("run.invalid_timeout", timeout = step.timeout).to_string();
        return fail(StepFailure::new(FailureKind::Runner, step, index, reason));
    };
    let output = match command::run_with_timeout(cmd, stdin, timeout).await {
        Ok(output) => output,
        Err(ExecError::Timeout(_)) => return fail(StepFailure::timeout(step, index)),
        Err(e) => return fail(StepFailure::new(FailureKind::Runner, step, index, e.to_string())),
    };

    if ctx.options.verbose && ctx.announce() {
        print_step_output(index, &program, &args, &output);
    }

    if ctx.options.no_check {
        let awarded = if output.return_code == 0 {
            step.score.unwrap_or(case.meta.score)
        } else {
            0.0
        };
        return passed_outcome(step, index, awarded, step_start);
    }

    let Some(spec) = &step.check else {
        return passed_outcome(step, index, step.cap(), step_start);
    };

    let checker = match CompositeChecker::from_spec(spec, &case.path) {
        Ok(checker) => checker,
        Err(e) => {
            let failure = StepFailure::new(FailureKind::Runner, step, index, e.to_string());
            return fail(failure.with_output(&output));
        }
    };
    if checker.checks().is_empty() {
        return passed_outcome(step, index, step.cap(), step_start);
    }
    let check_ctx = CheckContext {
        case_dir: &case.path,
        resolver,
        cap: step.cap(),
    };
    match checker.check(&output, check_ctx).await {
        CheckOutcome::Pass { score_override } => {
            passed_outcome(step, index, score_override.unwrap_or(step.cap()), step_start)
        }
        CheckOutcome::Fail(f) => {
            let mut failure = StepFailure::new(f.kind, step, index, f.message).with_output(&output);
            failure.expected_output = f.expected_output;
            fail(failure)
        }
    }
}

fn resolve_command(step: &Step, resolver: &ResolveContext) -> std::io::Result<(String, Vec<String>)> {
    let program = resolver.resolve(&step.command)?;
    let args = resolver.resolve_all(&step.args)?;
    Ok((program, args))
}

/// The step's command line as it could be pasted into a shell from the
/// directory the grader was started in.
fn command_line(step: &Step, display_resolver: &ResolveContext) -> String {
    match resolve_command(step, display_resolver) {
        Ok((program, args)) => command::display_command(&program, &args),
        Err(_) => command::display_command(&step.command, &step.args),
    }
}

fn passed_outcome(step: &Step, index: usize, awarded: f64, started: Instant) -> StepOutcome {
    StepOutcome {
        index,
        label: step.label().to_string(),
        success: true,
        must_pass: step.must_pass,
        awarded,
        cap: step.score,
        message: "Step completed successfully".to_string(),
        time: started.elapsed().as_secs_f64(),
        detail: None,
    }
}

/// A failed step before it is turned into a [`StepOutcome`].
struct StepFailure {
    kind: FailureKind,
    /// Goes into the failure record.
    reason: String,
    /// Becomes the case message when the step halts the case.
    summary: String,
    output: Option<CapturedOutput>,
    expected_output: Option<String>,
}

impl StepFailure {
    fn new(kind: FailureKind, step: &Step, index: usize, reason: String) -> Self {
        let summary = t!("step.failed", index = index, label = step.label(), reason = &reason).to_string();
        Self {
            kind,
            reason,
            summary,
            output: None,
            expected_output: None,
        }
    }

    fn timeout(step: &Step, index: usize) -> Self {
        let message =
            t!("step.timed_out", index = index, label = step.label(), timeout = step.timeout).to_string();
        Self {
            kind: FailureKind::Timeout,
            reason: message.clone(),
            summary: message,
            output: None,
            expected_output: None,
        }
    }

    fn with_output(mut self, output: &CapturedOutput) -> Self {
        self.output = Some(output.clone());
        self
    }

    fn into_outcome(self, step: &Step, index: usize, command: String, started: Instant) -> StepOutcome {
        let non_empty = |text: &str| (!text.is_empty()).then(|| text.to_string());
        let output = self.output.as_ref();
        let detail = ErrorDetail {
            step: index,
            step_name: step.label().to_string(),
            kind: self.kind,
            error_message: self.reason,
            command,
            stdout: output.and_then(|o| non_empty(&o.stdout)),
            stderr: output.and_then(|o| non_empty(&o.stderr)),
            return_code: output.map(|o| o.return_code),
            expected_output: self.expected_output,
        };
        StepOutcome {
            index,
            label: step.label().to_string(),
            success: false,
            must_pass: step.must_pass,
            awarded: 0.0,
            cap: step.score,
            message: self.summary,
            time: started.elapsed().as_secs_f64(),
            detail: Some(detail),
        }
    }
}

fn print_step_output(index: usize, program: &str, args: &[String], output: &CapturedOutput) {
    println!("{}", t!("verbose.step_output", index = index).cyan().bold());
    println!("{} {}", t!("verbose.command").bold(), command::display_command(program, args));
    if !output.stdout.is_empty() {
        println!("{}", t!("verbose.stdout").bold());
        println!("{}", output.stdout);
    }
    if !output.stderr.is_empty() {
        println!("{}", t!("verbose.stderr").bold());
        println!("{}", output.stderr);
    }
    println!("{} {}\n", t!("verbose.return_code").bold(), output.return_code);
}

/// Prints every step of `case` as it would run, without running it.
fn print_dry_run(case: &TestCase, ctx: &RunContext) {
    if !ctx.announce() {
        return;
    }
    let resolver = ResolveContext::for_case(case, &ctx.paths, &ctx.invocation_dir);
    for (i, step) in case.steps.iter().enumerate() {
        println!("\n{}", t!("dry_run.step", index = i + 1).cyan().bold());
        if let Some(name) = &step.name {
            println!("{} {}", t!("dry_run.name").bold(), name);
        }
        println!("{} {}", t!("dry_run.command").bold(), command_line(step, &resolver));
        if let Some(stdin) = &step.stdin {
            println!("{} {}", t!("dry_run.input_file").bold(), stdin);
        }
        if ctx.options.no_check {
            continue;
        }
        if let Some(spec) = &step.check {
            println!("{}", t!("dry_run.checks").bold());
            for (name, value) in describe_checks(spec, &resolver) {
                println!("  - {name}: {value}");
            }
        }
    }
}

/// Human readable list of the checks declared in `spec`, in chain order.
pub fn describe_checks(spec: &CheckSpec, resolver: &ResolveContext) -> Vec<(&'static str, String)> {
    let mut lines = Vec::new();
    if let Some(code) = spec.return_code {
        lines.push(("return_code", code.to_string()));
    }
    if !spec.files.is_empty() {
        let files: Vec<String> = spec
            .files
            .iter()
            .map(|f| resolver.resolve(f).unwrap_or_else(|_| f.clone()))
            .collect();
        lines.push(("files", files.join(", ")));
    }
    if let Some(stdout) = &spec.stdout {
        lines.push(("stdout", stdout.clone()));
    }
    if let Some(stderr) = &spec.stderr {
        lines.push(("stderr", stderr.clone()));
    }
    if spec.ignore_whitespace {
        lines.push(("ignore_whitespace", "true".to_string()));
    }
    if let Some(judge) = &spec.special_judge {
        lines.push(("special_judge", judge.clone()));
    }
    if let Some(pattern) = &spec.stdout_pattern {
        lines.push(("stdout_pattern", pattern.clone()));
    }
    if let Some(pattern) = &spec.stderr_pattern {
        lines.push(("stderr_pattern", pattern.clone()));
    }
    lines
}

/// Runs the global setup steps in order from the project root.
///
/// Every step must exit with status zero; the first one that does not stops
/// the run before any case is executed.
///
/// 在项目根目录按顺序执行全局准备步骤。每个步骤都必须以状态码 0 退出，
/// 否则在执行任何用例之前中止。
pub async fn run_setup_steps(setup: &SetupConfig, root: &Path, quiet: bool) -> Result<(), SetupError> {
    let total = setup.steps.len();
    for (i, step) in setup.steps.iter().enumerate() {
        if step.step_type != "command" {
            return Err(SetupError::UnknownStepType(step.step_type.clone()));
        }
        let display = command::display_command(&step.command, &step.args);
        if !quiet {
            let message = step
                .message
                .clone()
                .unwrap_or_else(|| t!("setup.default_message").to_string());
            println!(
                "{}",
                t!("setup.running", index = i + 1, total = total, message = message).blue()
            );
        }

        let mut cmd = Command::new(&step.command);
        cmd.args(&step.args).current_dir(root);
        let Some(timeout) = config::timeout_duration(step.timeout) else {
            return Err(SetupError::InvalidTimeout {
                command: display,
                timeout: step.timeout,
            });
        };
        let output = match command::run_with_timeout(cmd, None, timeout).await {
            Ok(output) => output,
            Err(ExecError::Timeout(_)) => {
                return Err(SetupError::Timeout {
                    command: display,
                    timeout: step.timeout,
                });
            }
            Err(ExecError::Spawn(source)) | Err(ExecError::Wait(source)) => {
                return Err(SetupError::Spawn {
                    command: display,
                    source,
                });
            }
        };
        if output.return_code != 0 {
            return Err(SetupError::Failed {
                command: display,
                code: output.return_code,
                stderr: output.stderr,
            });
        }
    }
    Ok(())
}
