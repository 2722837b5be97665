//! Command interpreter invocation and launch pre-flight.
//!
//! Commands are never parsed beyond what is needed to find the program a
//! simple command line starts with. Anything the shell would expand or
//! rewrite is left to the shell.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::process::Command;

#[cfg(unix)]
const BUILTINS: &[&str] = &[
    "!", ".", ":", "[", "[[", "{", "alias", "bg", "break", "case", "cd", "command", "continue",
    "echo", "eval", "exec", "exit", "export", "false", "fg", "for", "function", "getopts",
    "hash", "if", "jobs", "kill", "local", "printf", "pwd", "read", "readonly", "return", "select",
    "set", "shift", "source", "test", "time", "times", "trap", "true", "type", "ulimit", "umask",
    "unalias", "unset", "until", "wait", "while",
];

#[cfg(windows)]
const BUILTINS: &[&str] = &[
    "assoc", "break", "call", "cd", "chdir", "cls", "color", "copy", "date", "del", "dir",
    "echo", "endlocal", "erase", "exit", "for", "ftype", "goto", "if", "md", "mkdir", "mklink",
    "move", "path", "pause", "popd", "prompt", "pushd", "rd", "ren", "rename", "rmdir", "set",
    "setlocal", "shift", "start", "time", "title", "type", "ver", "verify", "vol",
];

#[cfg(not(any(unix, windows)))]
const BUILTINS: &[&str] = &[];

/// Characters that make the leading word something other than a plain
/// program name.
const SHELL_SPECIAL: &[char] = &[
    '$', '`', '(', ')', '{', '}', ';', '&', '|', '<', '>', '*', '?', '[', ']', '~', '!', '%',
];

/// Why a command was rejected before spawning.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreflightError {
    #[error("program `{0}` not found")]
    NotFound(String),

    #[error("`{0}` is not executable")]
    NotExecutable(String),
}

/// The interpreter used to run command strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shell {
    program: PathBuf,
    flag: String,
}

impl Default for Shell {
    fn default() -> Self {
        Self::system()
    }
}

impl Shell {
    /// `sh -c` on Unix, `cmd /C` on Windows.
    pub fn system() -> Self {
        if cfg!(windows) {
            Self::new("cmd", "/C")
        } else {
            Self::new("sh", "-c")
        }
    }

    pub fn new(program: impl Into<PathBuf>, flag: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            flag: flag.into(),
        }
    }

    /// Build a shell from a program path, picking the flag from its name.
    pub fn from_program(program: impl Into<PathBuf>) -> Self {
        let program = program.into();
        let flag = match program_stem(&program).as_str() {
            "cmd" => "/C",
            "powershell" | "pwsh" => "-Command",
            _ => "-c",
        };
        Self::new(program, flag)
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn flag(&self) -> &str {
        &self.flag
    }

    /// Pre-flight `command` for this shell.
    ///
    /// Only `sh`, `dash` and `cmd` are checked. Other interpreters (bash,
    /// zsh, PowerShell) resolve builtins and cmdlets that are not on `PATH`,
    /// so their commands always pass and failures surface as exit codes.
    pub fn preflight(&self, command: &str, cwd: Option<&Path>) -> Result<(), PreflightError> {
        if matches!(program_stem(&self.program).as_str(), "sh" | "dash" | "cmd") {
            preflight(command, cwd)
        } else {
            Ok(())
        }
    }

    /// A `Command` that runs `script` through this shell.
    pub fn command(&self, script: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(&self.flag).arg(script);
        cmd
    }
}

/// The program a simple command line starts with, if it can be determined
/// without interpreting shell syntax.
///
/// Leading `NAME=value` assignments are skipped. Returns `None` for builtins,
/// keywords, and anything containing expansion or redirection syntax.
pub fn leading_program(command: &str) -> Option<String> {
    let words = shell_words::split(command).ok()?;
    let word = words.into_iter().find(|w| !is_assignment(w))?;
    if word.is_empty() || word.contains(SHELL_SPECIAL) || BUILTINS.contains(&word.as_str()) {
        return None;
    }
    Some(word)
}

/// Check that the leading program of `command` can be executed.
///
/// Relative paths are resolved against `cwd` when given. Commands whose
/// leading program cannot be determined always pass.
pub fn preflight(command: &str, cwd: Option<&Path>) -> Result<(), PreflightError> {
    let Some(program) = leading_program(command) else {
        return Ok(());
    };

    if program.contains(std::path::is_separator) {
        let path = Path::new(&program);
        let resolved = match cwd {
            Some(dir) if path.is_relative() => dir.join(path),
            _ => path.to_path_buf(),
        };
        return check_executable(&resolved, &program);
    }

    which::which(&program)
        .map(|_| ())
        .map_err(|_| PreflightError::NotFound(program))
}

fn program_stem(program: &Path) -> String {
    program
        .file_stem()
        .map(|s| s.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_assignment(word: &str) -> bool {
    let Some((name, _)) = word.split_once('=') else {
        return false;
    };
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn check_executable(path: &Path, program: &str) -> Result<(), PreflightError> {
    let metadata =
        std::fs::metadata(path).map_err(|_| PreflightError::NotFound(program.to_string()))?;
    if metadata.is_dir() {
        return Err(PreflightError::NotExecutable(program.to_string()));
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(PreflightError::NotExecutable(program.to_string()));
        }
    }
    Ok(())
}
