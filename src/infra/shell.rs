//! # Shell Detection Module / Shell 检测模块
//!
//! Works out which shell the user is typing into, so that the printed
//! `TEST_BUILD` command can be pasted as is.
//!
//! 检测用户当前使用的 shell，使输出的 `TEST_BUILD` 命令可以直接粘贴执行。

use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Shells whose variable syntax is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
}

impl FromStr for Shell {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            other => Err(format!("unsupported shell: {other}")),
        }
    }
}

impl fmt::Display for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shell::Bash => "bash",
            Shell::Zsh => "zsh",
            Shell::Fish => "fish",
        })
    }
}

impl Shell {
    /// Command that sets `name` to `value` in the current session.
    pub fn export(&self, name: &str, value: &str) -> String {
        let quoted = shlex::try_quote(value)
            .map(|q| q.into_owned())
            .unwrap_or_else(|_| value.to_string());
        match self {
            Shell::Fish => format!("set -x {name} {quoted}"),
            Shell::Bash | Shell::Zsh => format!("export {name}={quoted}"),
        }
    }
}

/// The shell to format commands for: `explicit` when given, else the parent
/// process, else `$SHELL`, else bash.
pub fn detect_shell(explicit: Option<Shell>) -> Shell {
    explicit
        .or_else(parent_shell)
        .or_else(|| std::env::var("SHELL").ok().and_then(|path| shell_from_path(&path)))
        .unwrap_or(Shell::Bash)
}

#[cfg(unix)]
fn parent_shell() -> Option<Shell> {
    let ppid = std::os::unix::process::parent_id();
    let comm = std::fs::read_to_string(format!("/proc/{ppid}/comm")).ok()?;
    comm.trim().parse().ok()
}

#[cfg(not(unix))]
fn parent_shell() -> Option<Shell> {
    None
}

fn shell_from_path(path: &str) -> Option<Shell> {
    Path::new(path).file_name()?.to_str()?.parse().ok()
}
