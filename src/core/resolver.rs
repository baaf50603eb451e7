//! # Variable Resolver Module / 变量解析模块
//!
//! Expands `${test_dir}`, `${build_dir}`, `${common_dir}` and `${root_dir}`
//! in step commands, arguments and check paths. Each placeholder becomes the
//! shorter of the path relative to the working directory and the absolute
//! path; on a tie the relative form wins.
//!
//! 展开步骤命令、参数和检查路径中的占位符。每个占位符被替换为相对于工作目录的路径
//! 与绝对路径中较短的一个；长度相同时使用相对路径。

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use crate::core::config::{BUILD_DIR_NAME, ProjectPaths, TestCase};

/// Directories a placeholder can refer to, plus the directory the resulting
/// paths are made relative to.
#[derive(Debug, Clone)]
pub struct ResolveContext {
    test_dir: PathBuf,
    build_dir: PathBuf,
    common_dir: PathBuf,
    root_dir: PathBuf,
    cwd: PathBuf,
}

impl ResolveContext {
    pub fn new(test_dir: &Path, common_dir: &Path, root_dir: &Path, cwd: &Path) -> Self {
        Self {
            test_dir: test_dir.to_path_buf(),
            build_dir: test_dir.join(BUILD_DIR_NAME),
            common_dir: common_dir.to_path_buf(),
            root_dir: root_dir.to_path_buf(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Context for a case, with paths made relative to `cwd`.
    pub fn for_case(case: &TestCase, paths: &ProjectPaths, cwd: &Path) -> Self {
        Self::new(&case.path, &paths.common_dir, &paths.root, cwd)
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Substitutes every known placeholder in `raw`.
    ///
    /// Makes sure the build directory exists first, since steps expect it.
    /// Unknown `$name` references are left as they are.
    pub fn resolve(&self, raw: &str) -> io::Result<String> {
        fs::create_dir_all(&self.build_dir)?;
        if !raw.contains('$') {
            return Ok(raw.to_string());
        }

        let expanded = shellexpand::env_with_context_no_errors(raw, |name| {
            let dir = match name {
                "test_dir" => &self.test_dir,
                "build_dir" => &self.build_dir,
                "common_dir" => &self.common_dir,
                "root_dir" => &self.root_dir,
                _ => return None,
            };
            Some(shortest_display(dir, &self.cwd))
        });
        Ok(expanded.into_owned())
    }

    /// Resolves every string of `items` in order.
    pub fn resolve_all(&self, items: &[String]) -> io::Result<Vec<String>> {
        items.iter().map(|item| self.resolve(item)).collect()
    }
}

/// Returns `path` relative to `cwd` when that is not longer than the absolute
/// form, the absolute form otherwise.
pub fn shortest_display(path: &Path, cwd: &Path) -> String {
    let absolute = path.to_string_lossy().into_owned();
    match relative_path(path, cwd) {
        Some(relative) => {
            let relative = relative.to_string_lossy().into_owned();
            if relative.len() <= absolute.len() {
                relative
            } else {
                absolute
            }
        }
        None => absolute,
    }
}

/// Lexical relative path from `base` to `path`, walking up with `..` where
/// needed. Both must be absolute; `None` otherwise or when they live on
/// different prefixes (drives).
pub fn relative_path(path: &Path, base: &Path) -> Option<PathBuf> {
    if !path.is_absolute() || !base.is_absolute() {
        return None;
    }
    let path: Vec<Component<'_>> = normalize(path);
    let base: Vec<Component<'_>> = normalize(base);
    if path.first() != base.first() {
        return None;
    }

    let common = path
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &path[common..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}

fn normalize(path: &Path) -> Vec<Component<'_>> {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}
