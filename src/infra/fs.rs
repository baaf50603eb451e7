//! # File System Operations Module / 文件系统操作模块
//!
//! Build-directory housekeeping and small path helpers used by the engine.
//!
//! 引擎使用的构建目录维护与路径辅助函数。

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Resets a case's build directory before its first step: every regular file
/// directly inside it is removed and the directory is (re)created.
/// Subdirectories are left alone.
///
/// 在用例第一个步骤前重置其构建目录：删除其中的普通文件并（重新）创建目录，
/// 子目录保持不变。
pub fn reset_build_dir(build_dir: &Path) -> Result<()> {
    if build_dir.is_dir() {
        let entries = fs::read_dir(build_dir)
            .with_context(|| format!("Failed to read build directory: {}", build_dir.display()))?;
        for entry in entries {
            let entry = entry?;
            if entry.file_type()?.is_file() {
                fs::remove_file(entry.path()).with_context(|| {
                    format!("Failed to remove stale artifact: {}", entry.path().display())
                })?;
            }
        }
    }
    fs::create_dir_all(build_dir)
        .with_context(|| format!("Failed to create build directory: {}", build_dir.display()))?;
    Ok(())
}

/// Checks if a path exists and is a directory.
pub fn is_directory(path: &Path) -> bool {
    path.exists() && path.is_dir()
}

/// Gets the absolute path from a potentially relative path.
///
/// # Returns
/// Canonicalized absolute path, or an error if the path doesn't exist
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    fs::canonicalize(path).with_context(|| format!("Failed to resolve path: {}", path.display()))
}

/// Joins `path` onto `base` unless it is already absolute.
pub fn anchor(base: &Path, path: &str) -> PathBuf {
    let candidate = Path::new(path);
    if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        base.join(candidate)
    }
}
