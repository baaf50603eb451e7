//! # Init Command Module / 初始化命令模块
//!
//! This module implements the `init` command of the Lab Grader CLI, which
//! writes a commented default `grader_config.toml` into the project root.
//!
//! 此模块实现 Lab Grader CLI 的 `init` 命令，
//! 在项目根目录写入带注释的默认 `grader_config.toml`。

use anyhow::{Context, Result};
use colored::*;
use dialoguer::{Confirm, theme::ColorfulTheme};
use std::{fs, path::Path};

use crate::core::config::GLOBAL_CONFIG_FILE;
use crate::infra::t;

/// The configuration written by `init`. Parses to the built-in defaults.
pub const DEFAULT_CONFIG: &str = r#"# Lab Grader Configuration / 评测配置

# Language for console messages ("en" or "zh-CN") / 控制台消息语言
# language = "en"

[paths]
tests_dir = "tests"             # Test root / 测试根目录
cases_dir = "tests/cases"       # One sub-directory per case / 每个用例一个子目录
common_dir = "tests/common"     # Shared assets, ${common_dir} / 公共资源

# Commands run from the project root before any case; each must exit 0.
# 在任何用例之前于项目根目录执行的命令，必须以 0 退出。
# [[setup.steps]]
# type = "command"
# command = "make"
# args = ["-j4"]
# message = "Building submission"
# timeout = 60.0

# Named, ordered lists of case identifiers / 命名的有序用例列表
[groups]
# basics = ["1", "2", "3"]

[debug]
# Debugger for generated VS Code profiles: gdb, lldb or python
# 生成 VS Code 调试配置时使用的调试器：gdb、lldb 或 python
default_type = "gdb"
"#;

/// Executes the init command.
///
/// An existing configuration is only replaced with `force`, or after the
/// user confirms it interactively.
///
/// # Arguments
/// * `project_dir` - Directory the configuration is written to
/// * `force` - Overwrite an existing file without asking
/// * `non_interactive` - Never prompt; keep an existing file unless `force`
pub fn execute(project_dir: &Path, force: bool, non_interactive: bool) -> Result<()> {
    let output = project_dir.join(GLOBAL_CONFIG_FILE);

    if output.exists() && !force {
        let overwrite = if non_interactive {
            false
        } else {
            Confirm::with_theme(&ColorfulTheme::default())
                .with_prompt(t!("init.confirm_overwrite", path = output.display()).to_string())
                .default(false)
                .interact()
                .with_context(|| t!("init.confirmation_failed"))?
        };
        if !overwrite {
            println!("{}", t!("init.file_exists", path = output.display()).red());
            println!("{}", t!("init.use_force").yellow());
            return Ok(());
        }
    }

    if !project_dir.exists() {
        fs::create_dir_all(project_dir)
            .with_context(|| t!("init.create_parent_dir_failed", path = project_dir.display()))?;
    }

    fs::write(&output, DEFAULT_CONFIG).with_context(|| t!("init.write_failed", path = output.display()))?;

    println!("{}", t!("init.success", path = output.display()).green());
    println!("{}", t!("init.next_steps"));

    Ok(())
}
