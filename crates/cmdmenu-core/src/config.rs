//! Configuration resolution for cmdmenu.
//!
//! The menu file is YAML. Resolution:
//! 1. Built-in defaults
//! 2. Menu file (explicit path, `./menu_config.yaml`, or the global config dir)
//! 3. Environment variables
//! 4. CLI arguments (applied by the front end, highest priority)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name looked up in the working directory and the global config dir.
pub const CONFIG_FILE_NAME: &str = "menu_config.yaml";

/// Complete cmdmenu configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_menu_title")]
    pub menu_title: String,
    #[serde(default)]
    pub menu_items: Vec<MenuItem>,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub ui: UiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            menu_title: default_menu_title(),
            menu_items: Vec::new(),
            session: SessionConfig::default(),
            ui: UiConfig::default(),
        }
    }
}

fn default_menu_title() -> String {
    "Menu Application".to_string()
}

/// One entry of the menu.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawMenuItem", into = "RawMenuItem")]
pub enum MenuItem {
    Separator,
    Action {
        label: String,
        /// Choosing an action without a command does nothing.
        command: Option<String>,
    },
}

impl MenuItem {
    pub fn action(label: impl Into<String>, command: impl Into<String>) -> Self {
        Self::Action {
            label: label.into(),
            command: Some(command.into()),
        }
    }

    pub const fn is_separator(&self) -> bool {
        matches!(self, Self::Separator)
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            Self::Separator => None,
            Self::Action { label, .. } => Some(label),
        }
    }

    /// The command to run, if this is an action with a non-empty command.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Action {
                command: Some(command),
                ..
            } if !command.trim().is_empty() => Some(command),
            _ => None,
        }
    }
}

/// On-disk shape of a menu entry: `type: separator` or `label` + `command`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawMenuItem {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    command: Option<String>,
}

impl TryFrom<RawMenuItem> for MenuItem {
    type Error = String;

    fn try_from(raw: RawMenuItem) -> std::result::Result<Self, Self::Error> {
        match raw.kind.as_deref() {
            Some("separator") => Ok(Self::Separator),
            None | Some("action" | "command") => Ok(Self::Action {
                label: raw.label.unwrap_or_default(),
                command: raw.command,
            }),
            Some(other) => Err(format!("unknown menu item type `{other}`")),
        }
    }
}

impl From<MenuItem> for RawMenuItem {
    fn from(item: MenuItem) -> Self {
        match item {
            MenuItem::Separator => Self {
                kind: Some("separator".to_string()),
                ..Self::default()
            },
            MenuItem::Action { label, command } => Self {
                kind: None,
                label: Some(label),
                command,
            },
        }
    }
}

/// Process session policies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Interpreter override. Defaults to `sh -c` / `cmd /C`.
    pub shell: Option<PathBuf>,
    /// Seconds to wait for a terminated process before killing it. 0 waits forever.
    pub terminate_timeout_secs: u64,
    /// Upper bound for a single stdin write. Unbounded when unset.
    pub input_timeout_ms: Option<u64>,
    pub working_directory: Option<PathBuf>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            shell: None,
            terminate_timeout_secs: 5,
            input_timeout_ms: None,
            working_directory: None,
        }
    }
}

impl SessionConfig {
    pub const fn terminate_timeout(&self) -> Option<Duration> {
        match self.terminate_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    pub fn input_timeout(&self) -> Option<Duration> {
        self.input_timeout_ms.map(Duration::from_millis)
    }
}

/// Presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// How often the front end drains the output relay.
    pub poll_interval_ms: u64,
    /// Lines kept in the output pane before the oldest are dropped.
    pub scrollback_lines: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 100,
            scrollback_lines: 10_000,
        }
    }
}

impl UiConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

/// Find the menu file to load.
///
/// An explicit path is returned as-is even if it does not exist, so the
/// caller reports the missing file instead of silently falling back.
pub fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }
    global_config_path().filter(|p| p.exists())
}

/// `<config dir>/cmdmenu/menu_config.yaml`.
pub fn global_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cmdmenu").join(CONFIG_FILE_NAME))
}

/// Load configuration with hierarchical resolution.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = resolve_config_path(explicit).ok_or_else(|| {
        Error::Config(format!(
            "No {CONFIG_FILE_NAME} found in the current directory or {}",
            global_config_path().map_or_else(|| "the config directory".to_string(), |p| {
                p.display().to_string()
            })
        ))
    })?;
    let mut config = load_config_file(&path)?;
    apply_env_overrides(&mut config);
    Ok(config)
}

/// Parse a single menu file without environment overrides.
pub fn load_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
    })?;
    parse_config(&content).map_err(|e| {
        Error::Config(format!("Failed to parse config file {}: {}", path.display(), e))
    })
}

/// Parse menu YAML. An empty document yields the defaults.
pub fn parse_config(content: &str) -> Result<Config> {
    if content.trim().is_empty() {
        return Ok(Config::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

pub fn apply_env_overrides(config: &mut Config) {
    apply_overrides(config, |key| std::env::var(key).ok());
}

fn apply_overrides(config: &mut Config, var: impl Fn(&str) -> Option<String>) {
    if let Some(val) = var("CMDMENU_SHELL") {
        config.session.shell = Some(PathBuf::from(val));
    }
    if let Some(n) = var("CMDMENU_TERMINATE_TIMEOUT").and_then(|v| v.parse().ok()) {
        config.session.terminate_timeout_secs = n;
    }
    if let Some(n) = var("CMDMENU_INPUT_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
        config.session.input_timeout_ms = Some(n);
    }
    if let Some(n) = var("CMDMENU_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
        config.ui.poll_interval_ms = n;
    }
}
