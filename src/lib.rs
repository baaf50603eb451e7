//! # Lab Grader Library / Lab Grader 库
//!
//! This library provides the core functionality of Lab Grader, an automated
//! grading engine for programming-lab submissions. It discovers case
//! definitions, runs each case as an ordered sequence of subprocess steps,
//! verifies their output and aggregates partial scores into a grade.
//!
//! 此库为 Lab Grader 提供核心功能，这是一个面向编程实验提交的自动评测引擎。
//! 它发现用例定义，将每个用例作为有序的子进程步骤序列执行，校验输出，
//! 并将部分得分汇总为最终成绩。
//!
//! ## Modules / 模块
//!
//! - `core` - Configuration models and the grading engine
//! - `infra` - Infrastructure services like subprocess execution and shell detection
//! - `reporting` - Console, JSON and VS Code output
//! - `cli` - Command-line interface and commands
//!
//! - `core` - 配置模型和评测引擎
//! - `infra` - 基础设施服务，如子进程执行和 shell 检测
//! - `reporting` - 控制台、JSON 和 VS Code 输出
//! - `cli` - 命令行接口和命令

pub mod cli;
pub mod core;
pub mod infra;
pub mod reporting;

// Re-export commonly used items
pub use core::config;
pub use core::execution;
pub use core::models;
pub use infra::t;

/// Initializes the application's internationalization (i18n) based on the system locale.
///
/// This function detects the user's system locale and sets the appropriate
/// language for the application's user interface. It attempts to match the full
/// locale (e.g., "zh-CN"), then just the language code (e.g., "en"), and
/// finally falls back to the default language ("en").
pub fn init() {
    let locale = sys_locale::get_locale().unwrap_or_else(|| "en".to_string());
    let available_locales = rust_i18n::available_locales!();

    let lang = if available_locales.contains(&locale.as_str()) {
        locale.as_str()
    } else {
        locale
            .split('-')
            .next()
            .filter(|lang_code| available_locales.contains(lang_code))
            .or_else(|| {
                // "zh-Hans-CN", "zh_CN" and friends all mean Chinese here.
                locale
                    .to_lowercase()
                    .starts_with("zh")
                    .then_some("zh-CN")
            })
            .unwrap_or("en")
    };

    rust_i18n::set_locale(lang);
}

// Initialize i18n
rust_i18n::i18n!("locales", fallback = "en");
