//! cmdmenu CLI
//!
//! Terminal menu that launches configured shell commands and streams their
//! output. Provides both TUI (ratatui) and headless modes.

use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::info;

use cmdmenu_cli::{headless, tui};
use cmdmenu_core::config::{self, Config};
use cmdmenu_core::SessionOptions;
use cmdmenu_core::tracing_init::{LogTarget, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "cmdmenu")]
#[command(version, about = "Run configured shell commands from a terminal menu", long_about = None)]
struct Cli {
    /// Menu file (default: ./menu_config.yaml, then the user config directory)
    #[arg(short, long, env = "CMDMENU_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Interpreter used to run commands (default: sh, or cmd on Windows)
    #[arg(long, global = true)]
    shell: Option<PathBuf>,

    /// Seconds to wait after asking a process to stop before killing it (0 = wait forever)
    #[arg(long, global = true)]
    terminate_timeout: Option<u64>,

    /// Log level used when RUST_LOG is not set
    #[arg(long, env = "CMDMENU_LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "CMDMENU_LOG_JSON", global = true)]
    log_json: bool,

    /// Append logs to this file (the TUI discards logs otherwise)
    #[arg(long, env = "CMDMENU_LOG_FILE", global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the menu entries
    List {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Run one menu entry without the TUI, by label or 1-based number
    Run {
        /// Entry label, or its number as shown by `list`
        entry: String,
    },
    /// Run an arbitrary command without the TUI
    Exec {
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        command: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so its logs go to a file or nowhere.
    let target = match (&cli.log_file, &cli.command) {
        (Some(path), _) => LogTarget::File(path.clone()),
        (None, None) => LogTarget::Discard,
        (None, Some(_)) => LogTarget::Stderr,
    };
    let level = &cli.log_level;
    init_tracing(
        &format!("cmdmenu={level},cmdmenu_cli={level},cmdmenu_core={level}"),
        cli.log_json,
        &target,
    )?;
    info!(version = env!("CARGO_PKG_VERSION"), "Starting cmdmenu");

    let config = load(&cli)?;
    let options = SessionOptions::from(&config.session);

    match cli.command {
        None => tui::run(&config, options).await,
        Some(Commands::List { json }) => {
            let mut out = io::stdout().lock();
            headless::write_menu(&mut out, &config.menu_title, &config.menu_items, json)?;
            Ok(())
        }
        Some(Commands::Run { entry }) => {
            let item = headless::find_entry(&config.menu_items, &entry)
                .with_context(|| format!("No menu entry `{entry}`"))?;
            let command = item
                .command()
                .with_context(|| format!("Menu entry `{entry}` has no command"))?
                .to_string();
            exit_with(headless::run(options, &command).await?)
        }
        Some(Commands::Exec { command }) => {
            exit_with(headless::run(options, &headless::command_line(&command)).await?)
        }
    }
}

/// Resolve the menu file and apply environment and flag overrides.
///
/// `exec` does not need a menu, so a missing file falls back to defaults there.
fn load(cli: &Cli) -> anyhow::Result<Config> {
    let needs_menu = !matches!(cli.command, Some(Commands::Exec { .. }));
    let explicit = cli.config.as_deref();
    let mut config = if needs_menu || config::resolve_config_path(explicit).is_some() {
        config::load_config(explicit)?
    } else {
        let mut config = Config::default();
        config::apply_env_overrides(&mut config);
        config
    };

    if let Some(shell) = &cli.shell {
        config.session.shell = Some(shell.clone());
    }
    if let Some(secs) = cli.terminate_timeout {
        config.session.terminate_timeout_secs = secs;
    }
    Ok(config)
}

fn exit_with(exit_code: i32) -> ! {
    info!(exit_code, "Exiting with process status");
    std::process::exit(headless::process_exit_code(exit_code))
}
