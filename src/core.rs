//! # Core Module / 核心模块
//!
//! This module contains the grading engine of Lab Grader: configuration
//! models, variable resolution, step execution, output checking, scoring,
//! case selection and run history.
//!
//! 此模块包含 Lab Grader 的评测引擎：配置模型、变量解析、步骤执行、
//! 输出检查、计分、用例选择与运行历史。

pub mod checker;
pub mod config;
pub mod error;
pub mod execution;
pub mod history;
pub mod models;
pub mod planner;
pub mod resolver;
pub mod scoring;

// Re-exports
pub use config::{GraderConfig, TestCase, load_case};
pub use execution::run_test_case;
pub use models::TestResult;
