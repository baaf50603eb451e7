// src/cli.rs
use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use std::{env, path::PathBuf, process::ExitCode};

use crate::infra::shell::Shell;
use crate::t;

pub mod commands {
    pub mod init;
    pub mod run;
}

/// Pre-parses the command line arguments to find the language setting.
/// This allows i18n to be initialized before the full CLI is built.
/// It looks for a `--lang <VALUE>` or `--lang=<VALUE>` argument.
fn pre_parse_language() -> Option<String> {
    let args: Vec<String> = env::args().collect();
    if let Some(pos) = args.iter().position(|arg| arg == "--lang") {
        return args.get(pos + 1).cloned();
    }
    args.iter()
        .find_map(|arg| arg.strip_prefix("--lang=").map(str::to_string))
}

fn build_cli() -> Command {
    Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(t!("cli.about").to_string())
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("lang")
                .long("lang")
                .help(t!("cli.lang").to_string())
                .value_name("LANGUAGE")
                .global(true)
                .action(ArgAction::Set),
        )
        .subcommand(
            Command::new("run")
                .about(t!("cli.run_about").to_string())
                .arg(
                    Arg::new("test")
                        .help(t!("cli.arg_test").to_string())
                        .value_name("TEST")
                        .action(ArgAction::Set),
                )
                .arg(flag("json", 'j', t!("cli.arg_json")))
                .arg(flag("write-result", 'w', t!("cli.arg_write_result")))
                .arg(flag("prefix", 'p', t!("cli.arg_prefix")))
                .arg(
                    Arg::new("group")
                        .short('g')
                        .long("group")
                        .help(t!("cli.arg_group").to_string())
                        .value_name("GROUP")
                        .action(ArgAction::Set),
                )
                .arg(flag("verbose", 'v', t!("cli.arg_verbose")))
                .arg(flag("get-last-failed", 'l', t!("cli.arg_get_last_failed")))
                .arg(flag("rerun-failed", 'f', t!("cli.arg_rerun_failed")))
                .arg(
                    Arg::new("shell")
                        .long("shell")
                        .help(t!("cli.arg_shell").to_string())
                        .value_name("SHELL")
                        .value_parser(["bash", "zsh", "fish"])
                        .action(ArgAction::Set),
                )
                .arg(flag("dry-run", 'd', t!("cli.arg_dry_run")))
                .arg(flag("no-check", 'n', t!("cli.arg_no_check")))
                .arg(
                    Arg::new("vscode")
                        .long("vscode")
                        .help(t!("cli.arg_vscode").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("vscode-no-merge")
                        .long("vscode-no-merge")
                        .help(t!("cli.arg_vscode_no_merge").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("jobs")
                        .long("jobs")
                        .help(t!("cli.arg_jobs").to_string())
                        .value_name("JOBS")
                        .value_parser(clap::value_parser!(usize))
                        .action(ArgAction::Set),
                )
                .arg(project_dir_arg()),
        )
        .subcommand(
            Command::new("init")
                .about(t!("cli.init_about").to_string())
                .arg(
                    Arg::new("force")
                        .long("force")
                        .help(t!("cli.arg_force").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("non-interactive")
                        .long("non-interactive")
                        .help(t!("cli.arg_non_interactive").to_string())
                        .action(ArgAction::SetTrue),
                )
                .arg(project_dir_arg()),
        )
}

fn flag(name: &'static str, short: char, help: impl Into<String>) -> Arg {
    let help: String = help.into();
    Arg::new(name)
        .short(short)
        .long(name)
        .help(help)
        .action(ArgAction::SetTrue)
}

fn project_dir_arg() -> Arg {
    Arg::new("project-dir")
        .long("project-dir")
        .help(t!("cli.arg_project_dir").to_string())
        .value_name("PROJECT_DIR")
        .default_value(".")
        .value_parser(clap::value_parser!(PathBuf))
        .action(ArgAction::Set)
}

fn project_dir(matches: &ArgMatches) -> PathBuf {
    matches
        .get_one::<PathBuf>("project-dir")
        .cloned()
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn run() -> Result<ExitCode> {
    // Pre-parse language and initialize i18n first.
    let language = pre_parse_language();
    match &language {
        Some(lang) => rust_i18n::set_locale(lang),
        None => crate::init(),
    }

    let matches = build_cli().get_matches();

    match matches.subcommand() {
        Some(("run", run_matches)) => {
            let args = commands::run::RunArgs {
                test: run_matches.get_one::<String>("test").cloned(),
                json: run_matches.get_flag("json"),
                write_result: run_matches.get_flag("write-result"),
                prefix: run_matches.get_flag("prefix"),
                group: run_matches.get_one::<String>("group").cloned(),
                verbose: run_matches.get_flag("verbose"),
                get_last_failed: run_matches.get_flag("get-last-failed"),
                rerun_failed: run_matches.get_flag("rerun-failed"),
                shell: run_matches
                    .get_one::<String>("shell")
                    .and_then(|s| s.parse::<Shell>().ok()),
                dry_run: run_matches.get_flag("dry-run"),
                no_check: run_matches.get_flag("no-check"),
                vscode: run_matches.get_flag("vscode"),
                vscode_no_merge: run_matches.get_flag("vscode-no-merge"),
                jobs: run_matches.get_one::<usize>("jobs").copied(),
                project_dir: project_dir(run_matches),
                lang_explicit: language.is_some(),
            };
            commands::run::execute(args).await
        }
        Some(("init", init_matches)) => {
            commands::init::execute(
                &project_dir(init_matches),
                init_matches.get_flag("force"),
                init_matches.get_flag("non-interactive"),
            )?;
            Ok(ExitCode::SUCCESS)
        }
        _ => Ok(ExitCode::SUCCESS),
    }
}
