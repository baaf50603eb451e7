//! # VS Code Debug Profile Module / VS Code 调试配置模块
//!
//! Writes `.vscode/launch.json` and `.vscode/tasks.json` entries that let a
//! student debug the step that failed. Generated entries carry an
//! `[Auto-generated]` suffix; in merge mode they replace earlier generated
//! entries with the same name and leave everything else in the files alone.
//!
//! 生成 `.vscode/launch.json` 与 `.vscode/tasks.json` 条目，便于调试失败的步骤。
//! 生成的条目带有 `[Auto-generated]` 后缀；合并模式下会替换同名的旧条目，
//! 文件中的其它内容保持不变。

use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::core::config::{ProjectPaths, Step, TestCase};
use crate::core::error::DebugConfigError;
use crate::core::resolver::ResolveContext;

/// Suffix marking entries owned by the grader.
pub const AUTO_GENERATED: &str = " [Auto-generated]";

/// Debuggers a profile can be generated for.
/// 可生成调试配置的调试器类型。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugType {
    /// `gdb`, also accepted as `cpp`
    Gdb,
    Lldb,
    Python,
}

impl FromStr for DebugType {
    type Err = DebugConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gdb" | "cpp" => Ok(DebugType::Gdb),
            "lldb" => Ok(DebugType::Lldb),
            "python" => Ok(DebugType::Python),
            _ => Err(DebugConfigError::UnsupportedDebugType(s.to_string())),
        }
    }
}

impl DebugType {
    /// The editor extension needed for this debugger.
    pub fn extension(&self) -> &'static str {
        match self {
            DebugType::Gdb => "C/C++ (ms-vscode.cpptools)",
            DebugType::Lldb => "CodeLLDB (vadimcn.vscode-lldb)",
            DebugType::Python => "Python (ms-python.python)",
        }
    }
}

/// Picks the debugger for a step: the step's override, then the case's,
/// then the configured default.
pub fn select_debug_type(case: &TestCase, step: &Step, default_type: &str) -> Result<DebugType, DebugConfigError> {
    let chosen = step
        .debug
        .as_ref()
        .and_then(|d| d.debug_type.as_deref())
        .or_else(|| case.meta.debug.as_ref().and_then(|d| d.debug_type.as_deref()))
        .unwrap_or(default_type);
    chosen.parse()
}

/// What [`VsCodeEmitter::emit`] wrote.
#[derive(Debug, Clone, PartialEq)]
pub struct EmitSummary {
    pub profiles: usize,
    /// Debugger of the first profile, used for the printed instructions.
    pub first_type: Option<DebugType>,
}

/// Generates launch and task profiles for failed steps.
/// 为失败的步骤生成启动与任务配置。
#[derive(Debug, Clone)]
pub struct VsCodeEmitter<'a> {
    paths: &'a ProjectPaths,
    default_type: &'a str,
}

impl<'a> VsCodeEmitter<'a> {
    pub fn new(paths: &'a ProjectPaths, default_type: &'a str) -> Self {
        Self { paths, default_type }
    }

    pub fn vscode_dir(&self) -> PathBuf {
        self.paths.root.join(".vscode")
    }

    /// Writes profiles for every `(case, failed step)` pair, in order.
    ///
    /// With `merge`, existing files are updated in place; otherwise (or when
    /// an existing file cannot be parsed) they are replaced.
    pub fn emit(&self, failed: &[(&TestCase, &Step)], merge: bool) -> Result<EmitSummary, DebugConfigError> {
        let mut configurations = Vec::new();
        let mut tasks = Vec::new();
        let mut first_type = None;

        for (case, step) in failed {
            let debug_type = select_debug_type(case, step, self.default_type)?;
            first_type.get_or_insert(debug_type);
            configurations.push(self.launch_profile(case, step, debug_type)?);
            let task = build_task(case);
            if !tasks.iter().any(|t: &Value| t["label"] == task["label"]) {
                tasks.push(task);
            }
        }

        let dir = self.vscode_dir();
        fs::create_dir_all(&dir)?;
        write_or_merge(&dir.join("launch.json"), "0.2.0", "configurations", "name", &configurations, merge)?;
        write_or_merge(&dir.join("tasks.json"), "2.0.0", "tasks", "label", &tasks, merge)?;

        Ok(EmitSummary {
            profiles: configurations.len(),
            first_type,
        })
    }

    fn launch_profile(&self, case: &TestCase, step: &Step, debug_type: DebugType) -> Result<Value, DebugConfigError> {
        let resolver = ResolveContext::for_case(case, self.paths, &self.paths.root);
        let program = resolver.resolve(&step.command)?;
        let args = resolver.resolve_all(&step.args)?;
        let cwd = self.paths.root.to_string_lossy().into_owned();
        let name = format!("Debug {} - Step {}{AUTO_GENERATED}", case.meta.name, step.label());
        let pre_launch = format!("{}{AUTO_GENERATED}", task_label(case));

        let profile = match debug_type {
            DebugType::Gdb => json!({
                "name": name,
                "type": "cppdbg",
                "request": "launch",
                "program": program,
                "args": args,
                "stopAtEntry": true,
                "cwd": cwd,
                "environment": [],
                "internalConsoleOptions": "neverOpen",
                "MIMode": "gdb",
                "setupCommands": [{
                    "description": "Enable pretty-printing for gdb",
                    "text": "-enable-pretty-printing",
                    "ignoreFailures": true
                }],
                "preLaunchTask": pre_launch
            }),
            DebugType::Lldb => json!({
                "name": name,
                "type": "lldb",
                "request": "launch",
                "program": program,
                "args": args,
                "cwd": cwd,
                "internalConsoleOptions": "neverOpen",
                "preLaunchTask": pre_launch
            }),
            DebugType::Python => json!({
                "name": name,
                "type": "python",
                "request": "launch",
                "program": program,
                "args": args,
                "cwd": cwd,
                "env": {},
                "console": "integratedTerminal",
                "justMyCode": false,
                "preLaunchTask": pre_launch
            }),
        };
        Ok(profile)
    }
}

fn task_label(case: &TestCase) -> String {
    format!("build-{}", case.id)
}

/// The task that rebuilds a case by rerunning it without checks.
fn build_task(case: &TestCase) -> Value {
    json!({
        "label": format!("{}{AUTO_GENERATED}", task_label(case)),
        "type": "shell",
        "command": env!("CARGO_PKG_NAME"),
        "args": ["run", "--no-check", case.path.to_string_lossy()],
        "group": { "kind": "build", "isDefault": true },
        "presentation": { "panel": "shared" },
        "options": { "env": { "DEBUG": "1" } }
    })
}

fn strip_marker(key: &str) -> &str {
    key.strip_suffix(AUTO_GENERATED).unwrap_or(key)
}

fn item_key<'v>(item: &'v Value, key_field: &str) -> Option<&'v str> {
    item.get(key_field).and_then(Value::as_str).map(strip_marker)
}

/// Merges `items` into the array `list_field` of the JSON document at
/// `path`. Items sharing a key (suffix ignored) are replaced in place, new
/// ones are appended.
fn write_or_merge(
    path: &Path,
    version: &str,
    list_field: &str,
    key_field: &str,
    items: &[Value],
    merge: bool,
) -> Result<(), DebugConfigError> {
    let existing = if merge && path.exists() {
        fs::read_to_string(path)
            .ok()
            .and_then(|content| serde_json::from_str::<Value>(&content).ok())
            .filter(Value::is_object)
    } else {
        None
    };

    let document = match existing {
        Some(mut doc) => {
            merge_items(&mut doc, list_field, key_field, items);
            doc
        }
        None => {
            let mut doc = Map::new();
            doc.insert("version".to_string(), json!(version));
            doc.insert(list_field.to_string(), Value::Array(items.to_vec()));
            Value::Object(doc)
        }
    };

    fs::write(path, serde_json::to_string_pretty(&document)?)?;
    Ok(())
}

fn merge_items(doc: &mut Value, list_field: &str, key_field: &str, items: &[Value]) {
    let Some(object) = doc.as_object_mut() else {
        return;
    };
    let list = object
        .entry(list_field.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !list.is_array() {
        *list = Value::Array(Vec::new());
    }
    let Some(list) = list.as_array_mut() else {
        return;
    };

    for item in items {
        let key = item_key(item, key_field);
        let position = list.iter().position(|existing| key.is_some() && item_key(existing, key_field) == key);
        match position {
            Some(i) => list[i] = item.clone(),
            None => list.push(item.clone()),
        }
    }
}
