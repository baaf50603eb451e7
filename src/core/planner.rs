//! # Test Selection Planner Module / 测试选择计划模块
//!
//! This module turns what the user asked for (explicit case paths, a group
//! name, a single case identifier, or nothing at all) into the ordered list
//! of case directories to grade.
//!
//! 此模块将用户的选择（显式用例路径、组名、单个用例标识或未指定）
//! 转换为待评测的有序用例目录列表。

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::config::{CASE_CONFIG_FILE, peek_case_name};
use crate::core::error::SelectionError;

static NUMERIC_PREFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\d+)").expect("valid regex"));

/// What to grade, in priority order: explicit paths win over a group, a
/// group wins over a single case, and nothing selected means every case.
/// 评测对象，按优先级排列：显式路径 > 组 > 单个用例 > 全部用例。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    Paths(Vec<PathBuf>),
    Group(String),
    Case {
        query: String,
        /// Match an all-digit query against the leading number of the
        /// directory name instead of as a name prefix.
        numeric_prefix: bool,
    },
    All,
}

impl Selection {
    /// Picks the selection with the highest priority among the given inputs.
    pub fn from_inputs(
        paths: Vec<PathBuf>,
        group: Option<String>,
        test: Option<String>,
        numeric_prefix: bool,
    ) -> Self {
        if !paths.is_empty() {
            Selection::Paths(paths)
        } else if let Some(group) = group {
            Selection::Group(group)
        } else if let Some(query) = test {
            Selection::Case {
                query,
                numeric_prefix,
            }
        } else {
            Selection::All
        }
    }
}

/// Resolves `selection` into ordered case directories.
///
/// # Arguments
/// * `selection` - What the user asked for
/// * `cases_dir` - Directory holding one sub-directory per case
/// * `groups` - Named groups from the global configuration
pub fn resolve_selection(
    selection: &Selection,
    cases_dir: &Path,
    groups: &BTreeMap<String, Vec<String>>,
) -> Result<Vec<PathBuf>, SelectionError> {
    match selection {
        Selection::Paths(paths) => {
            let valid: Vec<PathBuf> = paths.iter().filter(|p| is_case_dir(p)).cloned().collect();
            if valid.is_empty() {
                return Err(SelectionError::NoValidPaths);
            }
            Ok(valid)
        }
        Selection::Group(query) => {
            let (name, members) = find_group(groups, query)?;
            let mut selected = Vec::with_capacity(members.len());
            for member in members {
                selected.push(find_case(cases_dir, member, true)?);
            }
            if selected.is_empty() {
                return Err(SelectionError::EmptyGroup(name.to_string()));
            }
            Ok(selected)
        }
        Selection::Case {
            query,
            numeric_prefix,
        } => Ok(vec![find_case(cases_dir, query, *numeric_prefix)?]),
        Selection::All => {
            let cases = discover_cases(cases_dir)?;
            if cases.is_empty() {
                return Err(SelectionError::NoCases(cases_dir.to_path_buf()));
            }
            Ok(cases)
        }
    }
}

/// Finds the single group whose name starts with `query`, ignoring case.
pub fn find_group<'a>(
    groups: &'a BTreeMap<String, Vec<String>>,
    query: &str,
) -> Result<(&'a str, &'a [String]), SelectionError> {
    let needle = query.to_lowercase();
    let matches: Vec<(&String, &Vec<String>)> = groups
        .iter()
        .filter(|(name, _)| name.to_lowercase().starts_with(&needle))
        .collect();

    match matches.as_slice() {
        [] => Err(SelectionError::NoGroup(query.to_string())),
        [(name, members)] => Ok((name.as_str(), members.as_slice())),
        many => Err(SelectionError::AmbiguousGroup {
            query: query.to_string(),
            candidates: many.iter().map(|(name, _)| name.to_string()).collect(),
        }),
    }
}

/// Finds the single case directory matching `query`.
///
/// By default the query is a case-insensitive prefix of the directory name.
/// With `numeric_prefix` and an all-digit query, the directory's leading
/// number must equal the query exactly, so "2" does not select "22-foo".
///
/// 默认按目录名前缀（不区分大小写）匹配。启用数字前缀模式且查询全为数字时，
/// 目录名开头的数字必须与查询完全相同。
pub fn find_case(cases_dir: &Path, query: &str, numeric_prefix: bool) -> Result<PathBuf, SelectionError> {
    let by_number = numeric_prefix && !query.is_empty() && query.chars().all(|c| c.is_ascii_digit());
    let needle = query.to_lowercase();

    let mut matches: Vec<PathBuf> = discover_cases(cases_dir)?
        .into_iter()
        .filter(|dir| {
            let name = dir_name(dir);
            if by_number {
                leading_number(&name).is_some_and(|digits| digits == query)
            } else {
                name.to_lowercase().starts_with(&needle)
            }
        })
        .collect();

    match matches.len() {
        0 if by_number => Err(SelectionError::NoCaseWithNumber(query.to_string())),
        0 => Err(SelectionError::NoCase(query.to_string())),
        1 => Ok(matches.remove(0)),
        _ => Err(SelectionError::AmbiguousCase {
            query: query.to_string(),
            candidates: matches
                .iter()
                .map(|dir| {
                    let name = peek_case_name(dir).unwrap_or_default();
                    format!("{}: {}", dir_name(dir), name)
                })
                .collect(),
        }),
    }
}

/// Every case directory under `cases_dir`, in grading order.
pub fn discover_cases(cases_dir: &Path) -> Result<Vec<PathBuf>, SelectionError> {
    if !cases_dir.is_dir() {
        return Err(SelectionError::CasesDirMissing(cases_dir.to_path_buf()));
    }
    let entries =
        fs::read_dir(cases_dir).map_err(|_| SelectionError::CasesDirMissing(cases_dir.to_path_buf()))?;

    let mut cases: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| is_case_dir(path))
        .collect();
    cases.sort_by_cached_key(|path| sort_key(&dir_name(path)));
    Ok(cases)
}

/// Ordering key: names with a leading number first, by that number and then
/// by name; everything else afterwards, by name.
pub fn sort_key(name: &str) -> (u8, u128, String) {
    match leading_number(name).and_then(|digits| digits.parse::<u128>().ok()) {
        Some(number) => (0, number, name.to_string()),
        None => (1, 0, name.to_string()),
    }
}

fn leading_number(name: &str) -> Option<&str> {
    NUMERIC_PREFIX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn is_case_dir(path: &Path) -> bool {
    path.is_dir() && path.join(CASE_CONFIG_FILE).is_file()
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
