//! pipedash CLI - pipeline dashboard

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use clap::{Parser, Subcommand};
use colored::Colorize;
use tracing_subscriber::EnvFilter;

use pipedash::error::{DashError, FixSuggestion};
use pipedash::tui::widgets::utils::format_duration;
use pipedash::{DashboardConfig, InputMode};

#[derive(Parser)]
#[command(name = "pipedash")]
#[command(about = "pipedash - terminal dashboard for data, training and prediction runs")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the dashboard (simulated operation services)
    Run {
        /// Config file (default: <config dir>/pipedash/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Read keys line by line instead of raw mode
        #[arg(long)]
        line_input: bool,

        /// Start with auto-training disabled
        #[arg(long)]
        no_auto_train: bool,

        /// Probability (0-1) that a simulated run fails
        #[arg(long, default_value_t = 0.0)]
        fail_rate: f64,
    },

    /// Print the effective configuration as TOML
    Config {
        /// Config file (default: <config dir>/pipedash/config.toml)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // The dashboard owns the terminal, so its logs go to a file
    init_tracing(matches!(cli.command, Commands::Run { .. }));

    let result = match cli.command {
        Commands::Run {
            config,
            line_input,
            no_auto_train,
            fail_rate,
        } => run_dashboard(config.as_deref(), line_input, no_auto_train, fail_rate).await,
        Commands::Config { config } => show_config(config.as_deref()),
    };

    if let Err(e) = result {
        tracing::error!(code = e.code(), "{}", e);
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

fn init_tracing(to_file: bool) {
    let filter =
        EnvFilter::try_from_env("PIPEDASH_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if !to_file {
        builder.with_writer(std::io::stderr).init();
        return;
    }
    match open_log_file() {
        Some(file) => builder.with_ansi(false).with_writer(Mutex::new(file)).init(),
        None => builder.with_writer(std::io::sink).init(),
    }
}

fn open_log_file() -> Option<File> {
    let dir = dirs::data_local_dir()?.join("pipedash");
    fs::create_dir_all(&dir).ok()?;
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(dir.join("pipedash.log"))
        .ok()
}

fn load_config(path: Option<&Path>) -> Result<DashboardConfig, DashError> {
    let config = match path {
        Some(path) => DashboardConfig::load_from(path)?,
        None => DashboardConfig::load()?,
    };
    config.with_env()
}

async fn run_dashboard(
    config_path: Option<&Path>,
    line_input: bool,
    no_auto_train: bool,
    fail_rate: f64,
) -> Result<(), DashError> {
    if !(0.0..=1.0).contains(&fail_rate) {
        return Err(DashError::ConfigError {
            reason: format!("--fail-rate must be between 0 and 1 (got {})", fail_rate),
        });
    }

    // CLI flags win over the environment, which wins over the file
    let mut config = load_config(config_path)?;
    if line_input {
        config.input.mode = InputMode::Line;
    }
    if no_auto_train {
        config.auto_train.enabled = false;
    }

    let state = pipedash::tui::run(config, fail_rate).await?;

    println!(
        "{} Session ended after {} ({} events)",
        "✓".green(),
        format_duration(state.uptime.as_secs()),
        state.events.total_appended()
    );
    Ok(())
}

fn show_config(config_path: Option<&Path>) -> Result<(), DashError> {
    let config = load_config(config_path)?;
    let source = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(DashboardConfig::config_path);

    println!("{} {}", "#".dimmed(), source.display().to_string().dimmed());
    print!("{}", config.to_toml()?);
    Ok(())
}
