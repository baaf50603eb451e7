//! # Run Command Module / 运行命令模块
//!
//! This module implements the `run` command of the Lab Grader CLI: it runs
//! the setup steps, selects and loads the cases, grades them, reports the
//! results and records the run in the history.
//!
//! 此模块实现 Lab Grader CLI 的 `run` 命令：执行准备步骤，选择并加载用例，
//! 评测用例，报告结果，并将本次运行记录到历史中。

use anyhow::{Context, Result};
use colored::*;
use futures::{StreamExt, stream};
use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
    sync::Arc,
};

use crate::{
    core::{
        config::{GraderConfig, ProjectPaths, Step, TestCase, load_case},
        error::HistoryError,
        execution::{RunContext, RunOptions, run_setup_steps, run_test_case},
        history::{HistoryEntry, HistoryStore},
        models::{TestResult, percentage},
        planner::{self, Selection},
    },
    infra::{
        fs::{absolute_path, is_directory},
        shell::{Shell, detect_shell},
        t,
    },
    reporting::{
        console::{print_debug_instructions, print_failure_details, print_results_table, print_test_build_hint, print_totals},
        json::JsonReport,
        vscode::VsCodeEmitter,
    },
};

/// File the percentage is written to with `--write-result`.
pub const RESULT_FILE: &str = ".autograder_result";

/// Everything the `run` command was asked to do.
/// `run` 命令的全部参数。
#[derive(Debug, Clone, Default)]
pub struct RunArgs {
    pub test: Option<String>,
    pub json: bool,
    pub write_result: bool,
    pub prefix: bool,
    pub group: Option<String>,
    pub verbose: bool,
    pub get_last_failed: bool,
    pub rerun_failed: bool,
    pub shell: Option<Shell>,
    pub dry_run: bool,
    pub no_check: bool,
    pub vscode: bool,
    pub vscode_no_merge: bool,
    pub jobs: Option<usize>,
    pub project_dir: PathBuf,
    /// Whether `--lang` was given; otherwise the configured language applies.
    pub lang_explicit: bool,
}

/// Executes the run command with the provided arguments.
///
/// # Returns
/// The process exit code: success when the aggregate percentage is above
/// zero, failure otherwise
pub async fn execute(args: RunArgs) -> Result<ExitCode> {
    let project_root = absolute_path(&args.project_dir)
        .with_context(|| t!("run.project_dir_not_found", path = args.project_dir.display()))?;
    let config = GraderConfig::load(&project_root).with_context(|| t!("run.config_load_failed"))?;
    if !args.lang_explicit {
        if let Some(language) = &config.language {
            rust_i18n::set_locale(language);
        }
    }

    let paths = ProjectPaths::new(&project_root, &config);
    let history = HistoryStore::in_project(&project_root);

    if args.get_last_failed {
        let failed = history.last_failed_case()?;
        let shell = detect_shell(args.shell);
        println!("{}", shell.export("TEST_BUILD", &failed.build_path.to_string_lossy()));
        return Ok(ExitCode::SUCCESS);
    }

    if args.dry_run && args.test.is_none() {
        anyhow::bail!("{}", t!("run.dry_run_requires_test"));
    }

    let selection = if args.rerun_failed {
        match history.last_failed_cases() {
            Ok(failed) => Selection::Paths(failed.into_iter().map(|c| c.path).collect()),
            Err(HistoryError::NoFailures) => {
                eprintln!("{}", t!("run.no_failed_cases").green());
                return Ok(ExitCode::SUCCESS);
            }
            Err(e) => return Err(e.into()),
        }
    } else {
        let explicit: Vec<PathBuf> = args
            .test
            .as_deref()
            .filter(|test| looks_like_path(test))
            .map(|test| vec![PathBuf::from(test)])
            .unwrap_or_default();
        let query = if explicit.is_empty() { args.test.clone() } else { None };
        Selection::from_inputs(explicit, args.group.clone(), query, args.prefix)
    };

    let quiet = args.json;
    run_setup_steps(&config.setup, &project_root, quiet).await?;

    let case_dirs = planner::resolve_selection(&selection, &paths.cases_dir, &config.groups)?;
    let cases = case_dirs
        .iter()
        .map(|dir| {
            load_case(dir).with_context(|| t!("run.case_load_failed", path = dir.display()))
        })
        .collect::<Result<Vec<TestCase>>>()?;

    if !quiet {
        announce(&args, &selection, &config, cases.len());
    }

    let options = RunOptions {
        verbose: args.verbose,
        dry_run: args.dry_run,
        no_check: args.no_check,
        quiet,
    };
    let jobs = match args.jobs {
        Some(0) => num_cpus::get(),
        Some(n) => n,
        None => 1,
    };
    let ctx = Arc::new(RunContext::new(paths.clone(), options));
    let results = run_cases(&cases, ctx, jobs).await;

    if args.dry_run {
        return Ok(ExitCode::SUCCESS);
    }

    let total_score: f64 = results.iter().map(|r| r.score).sum();
    let max_score: f64 = results.iter().map(|r| r.max_score).sum();
    let pct = percentage(total_score, max_score);

    if args.json {
        let names: Vec<&str> = cases.iter().map(|c| c.meta.name.as_str()).collect();
        println!("{}", JsonReport::new(&names, &results).to_json()?);
    } else {
        print_results_table(&cases, &results);
        print_totals(total_score, max_score);
        print_failure_details(&cases, &results);
    }

    if let Err(e) = history.append(HistoryEntry::from_run(&cases, &results)) {
        if !quiet {
            eprintln!("{}", t!("run.history_save_failed", error = e).yellow());
        }
    }

    if args.vscode {
        generate_debug_profiles(&cases, &results, &paths, &config, !args.vscode_no_merge, quiet);
    }

    if args.write_result {
        let result_path = project_root.join(RESULT_FILE);
        fs::write(&result_path, format!("{:.2}", pct))
            .with_context(|| t!("run.result_write_failed", path = result_path.display()))?;
    }

    if total_score < max_score && !quiet {
        let shell = detect_shell(args.shell);
        print_test_build_hint(&last_failed_command(shell));
    }

    Ok(if pct > 0.0 {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// A test argument naming an existing case directory is taken as a path.
fn looks_like_path(test: &str) -> bool {
    (test.contains(std::path::MAIN_SEPARATOR) || test.contains('/')) && is_directory(Path::new(test))
}

fn announce(args: &RunArgs, selection: &Selection, config: &GraderConfig, count: usize) {
    if args.dry_run {
        println!("\n{}\n", t!("run.dry_run_banner").bold());
        return;
    }
    if let Selection::Group(query) = selection {
        if let Ok((name, _)) = planner::find_group(&config.groups, query) {
            println!("\n{}\n", t!("run.running_group", count = count, group = name).bold());
            return;
        }
    }
    println!("\n{}\n", t!("run.running_cases", count = count).bold());
}

/// Grades `cases` with up to `jobs` running at once. Results come back in
/// the order of `cases`.
async fn run_cases(cases: &[TestCase], ctx: Arc<RunContext>, jobs: usize) -> Vec<TestResult> {
    let handles = cases.iter().cloned().map(|case| {
        let ctx = Arc::clone(&ctx);
        let max_score = case.max_score();
        let handle = tokio::spawn(async move { run_test_case(&case, &ctx).await });
        async move {
            match handle.await {
                Ok(result) => result,
                Err(e) => TestResult {
                    success: false,
                    message: t!("run.case_task_failed", error = e).to_string(),
                    time: 0.0,
                    score: 0.0,
                    max_score,
                    step_scores: Vec::new(),
                    error_details: Vec::new(),
                },
            }
        }
    });

    stream::iter(handles).buffered(jobs.max(1)).collect().await
}

/// Writes VS Code profiles for every failed step. Problems are reported as
/// warnings and never change the grade.
fn generate_debug_profiles(
    cases: &[TestCase],
    results: &[TestResult],
    paths: &ProjectPaths,
    config: &GraderConfig,
    merge: bool,
    quiet: bool,
) {
    let failed: Vec<(&TestCase, &Step)> = cases
        .iter()
        .zip(results)
        .filter(|(_, result)| !result.success)
        .flat_map(|(case, result)| {
            result
                .error_details
                .iter()
                .filter_map(move |detail| case.steps.get(detail.step.checked_sub(1)?).map(|step| (case, step)))
        })
        .collect();
    if failed.is_empty() {
        return;
    }

    let emitter = VsCodeEmitter::new(paths, &config.debug.default_type);
    match emitter.emit(&failed, merge) {
        Ok(summary) if !quiet => {
            let extension = summary.first_type.map(|t| t.extension()).unwrap_or_default();
            print_debug_instructions(extension, summary.profiles);
        }
        Ok(_) => {}
        Err(e) => {
            if !quiet {
                eprintln!("{}", t!("debug.generation_failed", error = e).red());
            }
        }
    }
}

/// The command that exports `TEST_BUILD` for the first failed case.
fn last_failed_command(shell: Shell) -> String {
    let program = env!("CARGO_PKG_NAME");
    match shell {
        Shell::Fish => format!("{program} run -l | source"),
        Shell::Bash | Shell::Zsh => format!("eval \"$({program} run -l)\""),
    }
}
