//! Top-level CLI definition and dispatch.

use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use chat_alerts::alerts::controller::Visibility;
use chat_alerts::alerts::driver::Transition;
use chat_alerts::alerts::scenario::{ReplayReport, Scenario, replay};
use chat_alerts::core::config::Config;
use chat_alerts::core::errors::AlertError;
use chat_alerts::logger::jsonl::{JournalConfig, JournalWriter};

/// Alert popover controller tools: scenario replay and configuration.
#[derive(Debug, Parser)]
#[command(
    name = "chat-alerts",
    author,
    version,
    about = "Alert popover visibility controller",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Replay a TOML scenario on a virtual clock.
    Replay(ReplayArgs),
    /// View configuration state.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ReplayArgs {
    /// Scenario file.
    #[arg(value_name = "SCENARIO")]
    scenario: PathBuf,
    /// Append transitions to this journal file (overrides config).
    #[arg(long, value_name = "PATH")]
    journal: Option<PathBuf>,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the config file path.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration and print its hash.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completion script for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input (bad scenario, bad config).
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Replay ran but some expectations did not hold.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<AlertError> for CliError {
    fn from(err: AlertError) -> Self {
        match err {
            AlertError::InvalidConfig { .. }
            | AlertError::MissingConfig { .. }
            | AlertError::ConfigParse { .. }
            | AlertError::Scenario { .. } => Self::User(err.to_string()),
            AlertError::Serialization { .. } => Self::Internal(err.to_string()),
            AlertError::Io { .. } | AlertError::ChannelClosed { .. } | AlertError::Runtime { .. } => {
                Self::Runtime(err.to_string())
            }
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::Replay(args) => run_replay(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── replay ────────────────────

fn run_replay(cli: &Cli, args: &ReplayArgs) -> Result<(), CliError> {
    let config = Config::load(cli.config.as_deref())?;
    let scenario = Scenario::load(&args.scenario)?;

    let journal = match &args.journal {
        Some(path) => Some(JournalConfig {
            path: path.clone(),
            fallback_path: None,
            ..JournalConfig::default()
        }),
        None => config.journal_config(),
    }
    .map(JournalWriter::open);

    let report = replay(&scenario, config.alert_timings(), journal)?;

    match output_mode(cli) {
        OutputMode::Human => print_report(&report),
        OutputMode::Json => {
            let payload = json!({
                "command": "replay",
                "passed": report.passed(),
                "report": serde_json::to_value(&report)?,
            });
            write_json_line(&payload)?;
        }
    }

    if report.passed() {
        Ok(())
    } else {
        Err(CliError::Partial(format!(
            "{} of {} expectations failed in scenario {}",
            report.expectations_failed,
            report.expectations_checked,
            report.name
        )))
    }
}

fn print_report(report: &ReplayReport) {
    println!(
        "{} {} (auto_close={}ms, hover_exit_close={}ms)",
        "scenario".bold(),
        report.name,
        report.auto_close_ms,
        report.hover_exit_close_ms
    );
    for t in &report.transitions {
        println!("  {}", transition_line(t));
    }
    for action in &report.actions {
        println!("  t={:>7}ms  action {:?} invoked", action.at_ms, action.label);
    }
    for f in &report.failures {
        println!(
            "  {} t={}ms {}: expected {}, got {}",
            "FAIL".red().bold(),
            f.at_ms,
            f.field,
            f.expected,
            f.actual
        );
    }

    let verdict = if report.passed() {
        "PASS".green().bold()
    } else {
        "FAIL".red().bold()
    };
    println!(
        "{verdict} {}/{} expectations, max timers armed: {}, final t={}ms",
        report.expectations_checked - report.expectations_failed,
        report.expectations_checked,
        report.max_outstanding_timers,
        report.final_at_ms
    );
    println!("  digest: {}", report.digest.dimmed());
}

fn transition_line(t: &Transition) -> String {
    let state = match t.to {
        Visibility::Closed => t.to.label().dimmed().to_string(),
        Visibility::OpenAuto | Visibility::OpenManual => t.to.label().to_string(),
    };
    let icon = t.icon.map_or_else(
        || "none".to_string(),
        |icon| match icon.color() {
            "danger" => icon.label().red().to_string(),
            _ => icon.label().yellow().to_string(),
        },
    );
    format!(
        "t={:>7}ms  {state:<13}  icon={icon}  alerts={}  <- {}",
        t.at_ms, t.alert_count, t.trigger
    )
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
        Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        None | Some(ConfigCommand::Show) => {
            let config = Config::load(cli.config.as_deref())?;
            let hash = config.stable_hash()?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Internal(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                    println!("# hash: {hash}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                        "hash": hash,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => {
            let config = Config::load(cli.config.as_deref())?;
            let hash = config.stable_hash()?;

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", "Configuration is valid.".green());
                    println!("  Source: {}", config.paths.config_file.display());
                    println!("  Hash: {hash}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config validate",
                        "valid": true,
                        "path": config.paths.config_file.to_string_lossy(),
                        "hash": hash,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("CHAT_ALERTS_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
