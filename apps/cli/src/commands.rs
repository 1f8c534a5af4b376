//! CLI command definitions, routing, and tracing setup.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::Result;
use igniter_core::{CtrlC, LogObserver, ProcessWorkerFactory, RunMode, RunSummary, launch};
use igniter_credentials::CredentialResolver;
use igniter_shared::{
    AppConfig, HostConfig, IgniterError, StartupConfig, WorkerProcessConfig, init_config,
    load_config,
};
use tracing::{info, warn};

/// Exit status for a run ended by SIGINT.
const EXIT_INTERRUPTED: i32 = 130;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// igniter: run the publisher worker against the product API.
#[derive(Parser)]
#[command(
    name = "igniter",
    version,
    about = "Start the publisher worker and service its file writes and model dumps.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Start the worker and send it `ignite`.
    Ignite(RunArgs),

    /// Start the worker and ask it for a model dump.
    Dump(RunArgs),

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Options shared by the run commands. Each overrides the config file.
#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Worker executable.
    #[arg(long)]
    pub worker_cmd: Option<String>,

    /// Worker argument placed before the passthrough arguments (repeatable).
    #[arg(long = "worker-arg", allow_hyphen_values = true)]
    pub worker_args: Vec<String>,

    /// Known-publishers state file.
    #[arg(long)]
    pub state: Option<PathBuf>,

    /// Directory that written files land in.
    #[arg(long)]
    pub out_dir: Option<PathBuf>,

    /// Give up if the worker stays silent this many seconds.
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Arguments passed through to the worker verbatim.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub argv: Vec<String>,
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// model dumps.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "igniter=info",
        1 => "igniter=debug",
        _ => "igniter=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Ignite(args) => cmd_run(args, RunMode::Ignite).await,
        Command::Dump(args) => cmd_run(args, RunMode::DumpModel).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(args: RunArgs, mode: RunMode) -> Result<()> {
    let config = load_config()?;

    let state_path = args
        .state
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.run.state_file));
    let startup = StartupConfig::from_env(state_path, args.argv.clone())?;

    let resolver = CredentialResolver::new(&config.credentials.profile)
        .with_fallback_associate_tag(config.credentials.associate_tag.clone());
    let host = host_config(&config, &args);
    let factory = ProcessWorkerFactory::from(&worker_config(&config, &args));

    info!(
        profile = resolver.profile(),
        state = %startup.state_path.display(),
        out_dir = %host.output_dir.display(),
        "starting run"
    );

    let run = launch(
        &startup,
        &resolver,
        host,
        &factory,
        mode,
        Arc::new(LogObserver),
    )
    .await?;

    match run.run_until_complete(CtrlC::install()?).await {
        Ok(summary) => {
            print_summary(&summary);
            Ok(())
        }
        Err(IgniterError::Interrupted) => {
            warn!("interrupted");
            std::process::exit(EXIT_INTERRUPTED);
        }
        Err(e) => Err(e.into()),
    }
}

/// Merge the `[run]` section with CLI overrides.
fn host_config(config: &AppConfig, args: &RunArgs) -> HostConfig {
    let mut host = HostConfig::from(config);
    if let Some(dir) = &args.out_dir {
        host.output_dir = dir.clone();
    }
    if let Some(secs) = args.timeout {
        host.response_timeout = Some(Duration::from_secs(secs));
    }
    host
}

/// Merge the `[worker]` section with CLI overrides.
fn worker_config(config: &AppConfig, args: &RunArgs) -> WorkerProcessConfig {
    let mut worker = config.worker.clone();
    if let Some(cmd) = &args.worker_cmd {
        worker.command = cmd.clone();
    }
    if !args.worker_args.is_empty() {
        worker.args = args.worker_args.clone();
    }
    worker
}

fn print_summary(summary: &RunSummary) {
    let elapsed = summary.finished_at - summary.started_at;
    println!();
    println!("Run complete: {}", summary.run_id);
    println!("  Files written: {}", summary.files_written);
    println!("  Model dumps:   {}", summary.model_dumps);
    println!("  Elapsed:       {:.1}s", elapsed.num_milliseconds() as f64 / 1000.0);
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_arguments_pass_through_verbatim() {
        let cli = Cli::try_parse_from([
            "igniter",
            "ignite",
            "--state",
            "/tmp/pubs",
            "--",
            "--dry-run",
            "first",
        ])
        .unwrap();

        let Command::Ignite(args) = cli.command else {
            panic!("expected ignite");
        };
        assert_eq!(args.state, Some(PathBuf::from("/tmp/pubs")));
        assert_eq!(args.argv, vec!["--dry-run", "first"]);
    }

    #[test]
    fn flags_override_config_file() {
        let cli = Cli::try_parse_from([
            "igniter",
            "dump",
            "--worker-cmd",
            "sh",
            "--worker-arg",
            "-c",
            "--worker-arg",
            "run-worker",
            "--out-dir",
            "out",
            "--timeout",
            "30",
        ])
        .unwrap();
        let Command::Dump(args) = cli.command else {
            panic!("expected dump");
        };

        let config = AppConfig::default();
        let worker = worker_config(&config, &args);
        assert_eq!(worker.command, "sh");
        assert_eq!(worker.args, vec!["-c", "run-worker"]);

        let host = host_config(&config, &args);
        assert_eq!(host.output_dir, PathBuf::from("out"));
        assert_eq!(host.response_timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn config_defaults_apply_without_flags() {
        let cli = Cli::try_parse_from(["igniter", "ignite"]).unwrap();
        let Command::Ignite(args) = cli.command else {
            panic!("expected ignite");
        };

        let config = AppConfig::default();
        assert_eq!(worker_config(&config, &args).command, config.worker.command);
        assert_eq!(host_config(&config, &args).response_timeout, None);
        assert!(args.argv.is_empty());
    }
}
