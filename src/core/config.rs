//! # Configuration Module / 配置模块
//!
//! Serde models for the global `grader_config.toml` and for each case's
//! `config.toml`, plus the loaders that turn them into validated,
//! immutable [`TestCase`] values.
//!
//! 全局 `grader_config.toml` 与各用例 `config.toml` 的 serde 模型，
//! 以及将其转换为经过校验的不可变 [`TestCase`] 的加载函数。

use crate::core::error::ConfigError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the global configuration, looked up in the project root.
pub const GLOBAL_CONFIG_FILE: &str = "grader_config.toml";
/// File name of a case definition inside its case directory.
pub const CASE_CONFIG_FILE: &str = "config.toml";
/// Subdirectory of each case reserved for build artifacts.
pub const BUILD_DIR_NAME: &str = "build";

const DEFAULT_STEP_TIMEOUT: f64 = 5.0;

/// An optional debugger selection that can be attached to a case or a step.
/// 可附加在用例或步骤上的调试器类型覆盖。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct DebugOverride {
    /// Free-form debugger type, validated when debug profiles are generated.
    /// 调试器类型字符串，在生成调试配置时校验。
    #[serde(rename = "type", default)]
    pub debug_type: Option<String>,
}

/// The `[meta]` section of a case definition.
/// 用例定义中的 `[meta]` 部分。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseMeta {
    /// Display name of the case / 用例显示名称
    pub name: String,
    /// Maximum score of the case / 用例满分
    pub score: f64,
    /// Optional human readable description / 可选描述
    pub description: Option<String>,
    /// Optional debugger override for every step of the case / 用例级调试器覆盖
    pub debug: Option<DebugOverride>,
}

/// Verification spec of a single step. Every sub-check is optional and they
/// can be freely combined.
/// 单个步骤的校验规格。所有子检查均为可选，可自由组合。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct CheckSpec {
    /// Expected process exit code / 期望的退出码
    #[serde(default)]
    pub return_code: Option<i32>,
    /// Files that must exist after the step ran / 步骤结束后必须存在的文件
    #[serde(default)]
    pub files: Vec<String>,
    /// File holding the expected stdout, relative to the case directory.
    /// 期望标准输出文件（相对用例目录）。
    #[serde(default)]
    pub stdout: Option<String>,
    /// File holding the expected stderr, relative to the case directory.
    /// 期望标准错误文件（相对用例目录）。
    #[serde(default)]
    pub stderr: Option<String>,
    /// Collapse whitespace runs before comparing expected output.
    /// 比较前折叠空白字符。
    #[serde(default)]
    pub ignore_whitespace: bool,
    #[serde(default)]
    pub stdout_pattern: Option<String>,
    #[serde(default)]
    pub stderr_pattern: Option<String>,
    /// Judge script, relative to the case directory / 特判脚本（相对用例目录）
    #[serde(default)]
    pub special_judge: Option<String>,
}

/// One subprocess invocation within a case.
/// 用例中的一次子进程调用。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Step {
    /// Optional label; the command is shown when absent.
    /// 可选标签，缺省时显示命令本身。
    #[serde(default)]
    pub name: Option<String>,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Input file fed to the process, relative to the case directory.
    /// 作为进程标准输入的文件（相对用例目录）。
    #[serde(default)]
    pub stdin: Option<String>,
    /// Wall-clock limit in seconds / 墙钟时间上限（秒）
    #[serde(default = "default_timeout")]
    pub timeout: f64,
    /// Step weight. When any step of a case declares one, the case is scored
    /// by summing awarded step scores.
    /// 步骤分值。只要有一个步骤声明分值，用例即按步骤累加计分。
    #[serde(default)]
    pub score: Option<f64>,
    /// A failing must-pass step halts the remaining steps of the case.
    /// 必过步骤失败会中止该用例的后续步骤。
    #[serde(default = "default_must_pass")]
    pub must_pass: bool,
    #[serde(default)]
    pub check: Option<CheckSpec>,
    #[serde(default)]
    pub debug: Option<DebugOverride>,
}

impl Step {
    /// Label used in messages, step scores and debug profiles.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.command)
    }

    /// The weight of the step, zero when it declares none.
    pub fn cap(&self) -> f64 {
        self.score.unwrap_or(0.0)
    }
}

fn default_timeout() -> f64 {
    DEFAULT_STEP_TIMEOUT
}

/// Converts a timeout in seconds into a [`Duration`].
///
/// Returns `None` for zero, negative, NaN, infinite and out-of-range values.
pub fn timeout_duration(secs: f64) -> Option<Duration> {
    if secs > 0.0 {
        Duration::try_from_secs_f64(secs).ok()
    } else {
        None
    }
}

fn default_must_pass() -> bool {
    true
}

/// A fully loaded case. Never mutated after [`load_case`] returns it.
/// 完整加载的测试用例，`load_case` 返回后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestCase {
    /// Absolute path of the case directory / 用例目录绝对路径
    pub path: PathBuf,
    /// Directory name, the identity of the case / 目录名，即用例标识
    pub id: String,
    pub meta: CaseMeta,
    pub steps: Vec<Step>,
}

impl TestCase {
    /// The build directory owned by this case.
    pub fn build_dir(&self) -> PathBuf {
        self.path.join(BUILD_DIR_NAME)
    }

    /// Whether any step declares its own score.
    pub fn is_weighted(&self) -> bool {
        self.steps.iter().any(|step| step.score.is_some())
    }

    /// Maximum reportable score: the sum of step caps for weighted cases,
    /// `meta.score` otherwise.
    pub fn max_score(&self) -> f64 {
        if self.is_weighted() {
            self.steps.iter().map(Step::cap).sum()
        } else {
            self.meta.score
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMeta {
    name: Option<String>,
    score: Option<f64>,
    description: Option<String>,
    debug: Option<DebugOverride>,
}

#[derive(Debug, Deserialize)]
struct RawCaseConfig {
    meta: Option<RawMeta>,
    run: Option<Vec<Step>>,
}

/// Loads and validates the case definition stored in `case_dir`.
///
/// A missing `meta` section, `meta.name`, `meta.score` or `run` section is
/// reported as its own error; no defaults are substituted for them.
///
/// 加载并校验 `case_dir` 中的用例定义。缺少 `meta`、`meta.name`、
/// `meta.score` 或 `run` 均会报告各自的错误，不使用默认值。
pub fn load_case(case_dir: &Path) -> Result<TestCase, ConfigError> {
    let config_path = case_dir.join(CASE_CONFIG_FILE);
    let content = fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
        path: config_path.clone(),
        source,
    })?;
    let raw: RawCaseConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
        path: config_path.clone(),
        source,
    })?;

    let meta = raw.meta.ok_or_else(|| ConfigError::MissingSection {
        path: config_path.clone(),
        section: "meta",
    })?;
    let name = meta.name.ok_or_else(|| ConfigError::MissingField {
        path: config_path.clone(),
        field: "meta.name",
    })?;
    let score = meta.score.ok_or_else(|| ConfigError::MissingField {
        path: config_path.clone(),
        field: "meta.score",
    })?;
    let steps = raw.run.ok_or_else(|| ConfigError::MissingSection {
        path: config_path.clone(),
        section: "run",
    })?;

    let invalid = |field: String, reason: String| ConfigError::InvalidField {
        path: config_path.clone(),
        field,
        reason,
    };

    if score < 0.0 {
        return Err(invalid("meta.score".into(), "must not be negative".into()));
    }
    if steps.is_empty() {
        return Err(invalid("run".into(), "at least one step is required".into()));
    }
    for (i, step) in steps.iter().enumerate() {
        let n = i + 1;
        if step.command.trim().is_empty() {
            return Err(invalid(format!("run[{n}].command"), "must not be empty".into()));
        }
        if timeout_duration(step.timeout).is_none() {
            return Err(invalid(
                format!("run[{n}].timeout"),
                "must be a positive number of seconds within range".into(),
            ));
        }
        if step.score.is_some_and(|s| s < 0.0) {
            return Err(invalid(format!("run[{n}].score"), "must not be negative".into()));
        }
        if let Some(check) = &step.check {
            for (field, pattern) in [
                ("stdout_pattern", &check.stdout_pattern),
                ("stderr_pattern", &check.stderr_pattern),
            ] {
                if let Some(pattern) = pattern {
                    Regex::new(pattern)
                        .map_err(|e| invalid(format!("run[{n}].check.{field}"), e.to_string()))?;
                }
            }
        }
    }

    let path = std::path::absolute(case_dir).map_err(|source| ConfigError::Read {
        path: case_dir.to_path_buf(),
        source,
    })?;
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(TestCase {
        path,
        id,
        meta: CaseMeta {
            name,
            score,
            description: meta.description,
            debug: meta.debug,
        },
        steps,
    })
}

/// Reads only `meta.name` of a case, used when listing ambiguous candidates.
pub fn peek_case_name(case_dir: &Path) -> Option<String> {
    let content = fs::read_to_string(case_dir.join(CASE_CONFIG_FILE)).ok()?;
    let raw: RawCaseConfig = toml::from_str(&content).ok()?;
    raw.meta.and_then(|meta| meta.name)
}

/// Location of tests, cases and shared assets, relative to the project root.
/// 测试、用例和公共资源的位置（相对项目根目录）。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PathsConfig {
    #[serde(default = "default_tests_dir")]
    pub tests_dir: PathBuf,
    #[serde(default = "default_cases_dir")]
    pub cases_dir: PathBuf,
    #[serde(default = "default_common_dir")]
    pub common_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            tests_dir: default_tests_dir(),
            cases_dir: default_cases_dir(),
            common_dir: default_common_dir(),
        }
    }
}

fn default_tests_dir() -> PathBuf {
    PathBuf::from("tests")
}

fn default_cases_dir() -> PathBuf {
    PathBuf::from("tests/cases")
}

fn default_common_dir() -> PathBuf {
    PathBuf::from("tests/common")
}

/// A pre-run command. Only `type = "command"` is understood.
/// 评测前执行的命令，目前仅支持 `type = "command"`。
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SetupStep {
    #[serde(rename = "type", default = "default_setup_type")]
    pub step_type: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Progress message shown while the step runs / 运行时显示的进度信息
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "default_timeout")]
    pub timeout: f64,
}

fn default_setup_type() -> String {
    "command".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SetupConfig {
    #[serde(default)]
    pub steps: Vec<SetupStep>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DebugConfig {
    /// Debugger used when neither the step nor the case override it.
    /// 步骤和用例均未指定时使用的调试器类型。
    #[serde(default = "default_debug_type")]
    pub default_type: String,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            default_type: default_debug_type(),
        }
    }
}

fn default_debug_type() -> String {
    "gdb".to_string()
}

/// The global grader configuration, loaded from `grader_config.toml`.
/// 从 `grader_config.toml` 加载的全局评测配置。
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct GraderConfig {
    /// The language for console messages (e.g., "en", "zh-CN").
    /// 控制台消息语言（例如 "en"、"zh-CN"）。
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub setup: SetupConfig,
    /// Named, ordered lists of case identifiers / 命名的有序用例标识列表
    #[serde(default)]
    pub groups: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    pub debug: DebugConfig,
}

impl GraderConfig {
    /// Loads `grader_config.toml` from `project_root`, falling back to the
    /// defaults when the file does not exist.
    pub fn load(project_root: &Path) -> Result<Self, ConfigError> {
        let path = project_root.join(GLOBAL_CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        for (i, step) in config.setup.steps.iter().enumerate() {
            if timeout_duration(step.timeout).is_none() {
                return Err(ConfigError::InvalidField {
                    path,
                    field: format!("setup.steps[{}].timeout", i + 1),
                    reason: "must be a positive number of seconds within range".into(),
                });
            }
        }
        Ok(config)
    }
}

/// Absolute locations derived from a [`GraderConfig`] and the project root.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectPaths {
    pub root: PathBuf,
    pub tests_dir: PathBuf,
    pub cases_dir: PathBuf,
    pub common_dir: PathBuf,
}

impl ProjectPaths {
    pub fn new(root: &Path, config: &GraderConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            tests_dir: root.join(&config.paths.tests_dir),
            cases_dir: root.join(&config.paths.cases_dir),
            common_dir: root.join(&config.paths.common_dir),
        }
    }
}
