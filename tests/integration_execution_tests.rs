//! # Execution Integration Tests / 执行集成测试
//!
//! Runs real cases end to end through the execution engine: timeouts,
//! must-pass halting, input files, build directory resets, special judges,
//! no-check mode and setup steps.
//!
//! 通过执行引擎端到端运行真实用例：超时、必过步骤中止、输入文件、构建目录重置、
//! 特判、免检查模式以及准备步骤。
#![cfg(unix)]

mod common;

use common::{TestProject, case_toml, shell_step};
use lab_grader::core::config::{SetupConfig, SetupStep, load_case};
use lab_grader::core::error::SetupError;
use lab_grader::core::execution::{RunContext, RunOptions, run_setup_steps, run_test_case};
use lab_grader::core::models::{FailureKind, Status, TestResult};

fn quiet() -> RunOptions {
    RunOptions {
        quiet: true,
        ..Default::default()
    }
}

async fn run_case(project: &TestProject, dir_name: &str, options: RunOptions) -> TestResult {
    let case = load_case(&project.cases_dir().join(dir_name)).unwrap();
    let ctx = RunContext::new(project.paths(), options);
    run_test_case(&case, &ctx).await
}

#[tokio::test]
async fn test_timeout_after_passing_step_keeps_partial_score() {
    let project = TestProject::new();
    let steps = r#"
[[run]]
name = "greet"
command = "sh"
args = ["-c", "echo hello"]
score = 5.0

[run.check]
return_code = 0
stdout_pattern = "^hello$"

[[run]]
name = "hang"
command = "sleep"
args = ["5"]
timeout = 0.3
score = 5.0
"#;
    project.add_case("1-timeout", &case_toml("Timeout", 10.0, steps));

    let result = run_case(&project, "1-timeout", quiet()).await;
    assert!(!result.success);
    assert_eq!(result.score, 5.0);
    assert_eq!(result.max_score, 10.0);
    assert_eq!(result.error_details.len(), 1);
    assert_eq!(result.error_details[0].kind, FailureKind::Timeout);
    assert_eq!(result.error_details[0].step, 2);
    assert_eq!(result.message, "Step 2 'hang' timed out after 0.3s");
    assert!(result.time < 5.0, "the hung step must be killed");
}

#[tokio::test]
async fn test_timeout_when_background_process_holds_output() {
    let project = TestProject::new();
    let steps = r#"
[[run]]
name = "spawn"
command = "sh"
args = ["-c", "sleep 6 & echo started"]
timeout = 1.0
"#;
    project.add_case("1-lingering", &case_toml("Lingering", 10.0, steps));

    let started = std::time::Instant::now();
    let result = run_case(&project, "1-lingering", quiet()).await;
    assert!(started.elapsed().as_secs_f64() < 3.0);
    assert!(!result.success);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.error_details.len(), 1);
    assert_eq!(result.error_details[0].kind, FailureKind::Timeout);
}

#[tokio::test]
async fn test_out_of_range_timeout_is_a_runner_failure() {
    let project = TestProject::new();
    let dir = project.add_case("1-huge", &case_toml("Huge", 10.0, &shell_step("echo ok", 0)));
    let mut case = load_case(&dir).unwrap();
    case.steps[0].timeout = 1e20;

    let ctx = RunContext::new(project.paths(), quiet());
    let result = run_test_case(&case, &ctx).await;
    assert!(!result.success);
    assert_eq!(result.error_details[0].kind, FailureKind::Runner);
}

#[tokio::test]
async fn test_must_pass_failure_skips_remaining_steps() {
    let project = TestProject::new();
    let steps = format!(
        "{}\n{}",
        shell_step("echo bad >&2; exit 1", 0),
        shell_step("touch ${build_dir}/second-ran", 0)
    );
    let dir = project.add_case("1-halt", &case_toml("Halt", 10.0, &steps));

    let result = run_case(&project, "1-halt", quiet()).await;
    assert!(!result.success);
    assert_eq!(result.score, 0.0);
    assert_eq!(result.status(), Status::Fail);
    let detail = &result.error_details[0];
    assert_eq!(detail.kind, FailureKind::ReturnCodeMismatch);
    assert_eq!(detail.error_message, "Expected return code 0, got 1");
    assert_eq!(detail.return_code, Some(1));
    assert_eq!(detail.stderr.as_deref(), Some("bad\n"));
    assert!(detail.command.starts_with("sh -c"));
    assert!(!dir.join("build/second-ran").exists());
}

#[tokio::test]
async fn test_optional_step_failure_continues() {
    let project = TestProject::new();
    let steps = r#"
[[run]]
command = "sh"
args = ["-c", "exit 2"]
must_pass = false
score = 4.0

[run.check]
return_code = 0

[[run]]
command = "sh"
args = ["-c", "exit 0"]
score = 6.0

[run.check]
return_code = 0
"#;
    project.add_case("1-optional", &case_toml("Optional", 10.0, steps));

    let result = run_case(&project, "1-optional", quiet()).await;
    assert!(result.success);
    assert_eq!(result.score, 6.0);
    assert_eq!(result.status(), Status::Partial);
    assert_eq!(result.error_details.len(), 1);
    assert_eq!(result.step_scores.len(), 2);
}

#[tokio::test]
async fn test_stdin_and_expected_output() {
    let project = TestProject::new();
    let steps = r#"
[[run]]
command = "cat"
stdin = "input.txt"

[run.check]
stdout = "expected.txt"
ignore_whitespace = true
"#;
    project.add_case("1-echo", &case_toml("Echo", 10.0, steps));
    project.add_case_file("1-echo", "input.txt", "1  2\n3\n");
    project.add_case_file("1-echo", "expected.txt", "1 2 3");

    let result = run_case(&project, "1-echo", quiet()).await;
    assert!(result.success, "{:?}", result.error_details);
    assert_eq!(result.score, 10.0);
    assert_eq!(result.status(), Status::Pass);
}

#[tokio::test]
async fn test_missing_stdin_file_fails_the_step() {
    let project = TestProject::new();
    let steps = "[[run]]\ncommand = \"cat\"\nstdin = \"nope.txt\"\n";
    project.add_case("1-stdin", &case_toml("Stdin", 10.0, steps));

    let result = run_case(&project, "1-stdin", quiet()).await;
    assert!(!result.success);
    assert_eq!(result.error_details[0].kind, FailureKind::Runner);
    assert!(result.error_details[0].error_message.contains("nope.txt"));
}

#[tokio::test]
async fn test_build_dir_is_reset_before_first_step() {
    let project = TestProject::new();
    let steps = format!(
        "{}\n[run.check]\nfiles = [\"${{build_dir}}/fresh\"]\n",
        "[[run]]\ncommand = \"sh\"\nargs = [\"-c\", \"test ! -e build/stale && touch build/fresh\"]\n"
    );
    let dir = project.add_case("1-reset", &case_toml("Reset", 10.0, &steps));
    project.add_case_file("1-reset", "build/stale", "old artifact");
    project.add_case_file("1-reset", "build/keep/nested.txt", "subdirectories stay");

    let result = run_case(&project, "1-reset", quiet()).await;
    assert!(result.success, "{:?}", result.error_details);
    assert!(!dir.join("build/stale").exists());
    assert!(dir.join("build/keep/nested.txt").exists());
}

#[tokio::test]
async fn test_variables_are_expanded_in_arguments() {
    let project = TestProject::new();
    project.write_file("tests/common/shared.txt", "shared\n");
    let steps = r#"
[[run]]
command = "cat"
args = ["${common_dir}/shared.txt"]

[run.check]
stdout_pattern = "^shared$"
"#;
    project.add_case("1-vars", &case_toml("Vars", 10.0, steps));

    let result = run_case(&project, "1-vars", quiet()).await;
    assert!(result.success, "{:?}", result.error_details);
}

#[tokio::test]
async fn test_special_judge_score_is_clamped() {
    let project = TestProject::new();
    let steps = r#"
[[run]]
command = "sh"
args = ["-c", "echo 42"]
score = 5.0

[run.check]
special_judge = "judge.sh"
"#;
    project.add_case("1-judge", &case_toml("Judge", 10.0, steps));
    let judge = project.add_case_file(
        "1-judge",
        "judge.sh",
        "#!/bin/sh\ncat > /dev/null\necho '{\"success\": true, \"score\": 7}'\n",
    );
    common::make_executable(&judge);

    let result = run_case(&project, "1-judge", quiet()).await;
    assert!(result.success, "{:?}", result.error_details);
    assert_eq!(result.score, 5.0);
    assert_eq!(result.step_scores[0].awarded, 5.0);
}

#[tokio::test]
async fn test_no_check_awards_on_zero_exit() {
    let project = TestProject::new();
    let steps = format!("{}\n{}", shell_step("echo wrong", 99), shell_step("exit 3", 0));
    project.add_case("1-nocheck", &case_toml("NoCheck", 10.0, &steps));

    let options = RunOptions {
        no_check: true,
        ..quiet()
    };
    let result = run_case(&project, "1-nocheck", options).await;
    assert!(result.success);
    assert!(result.error_details.is_empty());
    assert_eq!(result.score, 10.0);
}

#[tokio::test]
async fn test_dry_run_executes_nothing() {
    let project = TestProject::new();
    let steps = shell_step("touch ${build_dir}/ran", 0);
    let dir = project.add_case("1-dry", &case_toml("Dry", 10.0, &steps));

    let options = RunOptions {
        dry_run: true,
        ..quiet()
    };
    let result = run_case(&project, "1-dry", options).await;
    assert!(result.success);
    assert_eq!(result.score, 0.0);
    assert!(!dir.join("build/ran").exists());
}

#[tokio::test]
async fn test_unknown_command_is_a_runner_failure() {
    let project = TestProject::new();
    let steps = "[[run]]\ncommand = \"this_command_definitely_does_not_exist_12345\"\n";
    project.add_case("1-missing", &case_toml("Missing", 10.0, steps));

    let result = run_case(&project, "1-missing", quiet()).await;
    assert!(!result.success);
    assert_eq!(result.error_details[0].kind, FailureKind::Runner);
}

#[tokio::test]
async fn test_setup_steps() {
    let project = TestProject::new();
    let ok = SetupConfig {
        steps: vec![SetupStep {
            step_type: "command".to_string(),
            command: "sh".to_string(),
            args: vec!["-c".to_string(), "touch setup-ran".to_string()],
            message: Some("Preparing".to_string()),
            timeout: 5.0,
        }],
    };
    run_setup_steps(&ok, &project.root(), true).await.unwrap();
    assert!(project.root().join("setup-ran").exists());

    let mut failing = ok.clone();
    failing.steps[0].args = vec!["-c".to_string(), "echo broken >&2; exit 4".to_string()];
    match run_setup_steps(&failing, &project.root(), true).await.unwrap_err() {
        SetupError::Failed { code, stderr, .. } => {
            assert_eq!(code, 4);
            assert_eq!(stderr, "broken\n");
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut unbounded = ok.clone();
    unbounded.steps[0].timeout = f64::INFINITY;
    assert!(matches!(
        run_setup_steps(&unbounded, &project.root(), true).await.unwrap_err(),
        SetupError::InvalidTimeout { .. }
    ));

    let mut unknown = ok.clone();
    unknown.steps[0].step_type = "docker".to_string();
    assert!(matches!(
        run_setup_steps(&unknown, &project.root(), true).await.unwrap_err(),
        SetupError::UnknownStepType(t) if t == "docker"
    ));
}
