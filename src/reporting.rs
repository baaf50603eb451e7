//! # Reporting Module / 报告模块
//!
//! This module presents grading results: a colorful console table with a
//! totals panel, a single JSON object for machines, and VS Code debug
//! profiles for failed steps.
//!
//! 此模块负责展示评测结果：带总分面板的彩色控制台表格、面向机器的单个 JSON 对象，
//! 以及针对失败步骤的 VS Code 调试配置。

pub mod console;
pub mod json;
pub mod vscode;

// Re-export common reporting functions
pub use console::{print_failure_details, print_results_table, print_totals};
pub use json::JsonReport;
