//! # Infrastructure Module / 基础设施模块
//!
//! This module provides infrastructure services for Lab Grader,
//! including subprocess execution, build-directory housekeeping, shell
//! detection and i18n support.
//!
//! 此模块为 Lab Grader 提供基础设施服务，
//! 包括子进程执行、构建目录维护、shell 检测和国际化支持。

pub mod command;
pub mod fs;
pub mod shell;

// Re-export i18n functions for easier access
pub use rust_i18n::t;
