//! gazetrack - Eye-Tracker Session Recorder
//!
//! Entry point for the recorder binary.

use std::io::Write as _;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gazetrack::config::Config;
use gazetrack::tracker::{Session, SessionOptions};
use gazetrack::utils;

/// Command-line arguments for gazetrack
#[derive(Parser, Debug)]
#[command(name = "gazetrack")]
#[command(version, about = "Eye-tracker session recorder", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose logging (can be specified multiple times)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Log format (json|pretty|compact)
    #[arg(long, default_value = "compact")]
    log_format: String,

    /// Write logs to file (in addition to stderr)
    #[arg(long)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calibrate, record, and retrieve a data file
    Track {
        /// Directory the data file is saved into
        #[arg(default_value = ".")]
        dir: PathBuf,

        /// Base name of the data file, up to 8 alphanumeric characters
        /// (defaults to the current HHMMSS time)
        name: Option<String>,

        /// 0-indexed screen for the calibration display
        #[arg(long)]
        screen: Option<i32>,

        /// Tracker host address (overrides the config file)
        #[arg(long, env = "GAZETRACK_HOST")]
        host: Option<String>,

        /// Display resolution as WIDTHxHEIGHT
        #[arg(long)]
        resolution: Option<String>,

        /// Use the simulated device even when a host is configured
        #[arg(long)]
        dummy: bool,
    },

    /// Print system diagnostics
    SysInfo {
        /// Include build and configuration details
        #[arg(long)]
        developer: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let result = match args.command {
        Command::Track {
            ref dir,
            ref name,
            screen,
            ref host,
            ref resolution,
            dummy,
        } => run_track(
            &args,
            dir.clone(),
            name.clone(),
            screen,
            host.clone(),
            resolution.as_deref(),
            dummy,
        ),
        Command::SysInfo { developer } => {
            utils::SystemInfo::gather().print(developer);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}", utils::format_user_error(&e));
        return Err(e);
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_track(
    args: &Args,
    dir: PathBuf,
    name: Option<String>,
    screen: Option<i32>,
    host: Option<String>,
    resolution: Option<&str>,
    dummy: bool,
) -> Result<()> {
    info!("gazetrack v{}", env!("CARGO_PKG_VERSION"));
    utils::log_startup_diagnostics();

    let config = load_config(args)?.with_overrides(host, screen);

    let name = name.unwrap_or_else(|| chrono::Local::now().format("%H%M%S").to_string());
    let (width, height) = match resolution {
        Some(spec) => parse_resolution(spec)?,
        None => config.display.resolution,
    };

    let mut options = SessionOptions::new(dir, name)
        .with_screen(config.display.screen)
        .with_resolution(width, height)
        .with_colors(config.calibration.foreground, config.calibration.background);
    if !dummy {
        if let Some(host) = config.device.host.clone() {
            options = options.with_host(host);
        }
    }

    let mut session = Session::open(options)?;
    session.calibrate()?;
    session.start()?;

    print!(">>> Press ENTER to stop the recording. ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;

    let path = session.stop()?;
    println!("Recording saved to {}", path.display());
    Ok(())
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => {
            Config::load(path).with_context(|| format!("config file {}", path.display()))
        }
        None => {
            let path = Config::default_path();
            if path.exists() {
                Config::load(&path)
            } else {
                debug!("No config file at {}, using defaults", path.display());
                Ok(Config::default_config())
            }
        }
    }
}

/// Parse a `WIDTHxHEIGHT` resolution argument
fn parse_resolution(spec: &str) -> Result<(i32, i32)> {
    let parts: Vec<&str> = spec.split(['x', 'X']).collect();
    if parts.len() != 2 {
        bail!("resolution must be WIDTHxHEIGHT, got '{}'", spec);
    }
    let width: i32 = parts[0]
        .trim()
        .parse()
        .with_context(|| format!("invalid width '{}'", parts[0]))?;
    let height: i32 = parts[1]
        .trim()
        .parse()
        .with_context(|| format!("invalid height '{}'", parts[1]))?;
    Ok((width, height))
}

fn init_logging(args: &Args) -> Result<()> {
    use std::fs::File;

    let log_level = match args.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("gazetrack={level},warn", level = log_level))
    });

    // The terminal is the operator's UI during recording; logs go to stderr.
    if let Some(log_file_path) = &args.log_file {
        let file = File::create(log_file_path)?;

        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            "pretty" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(file)
                            .with_ansi(false),
                    )
                    .init();
            }
        }
        info!("Logging to file: {}", log_file_path.display());
    } else {
        match args.log_format.as_str() {
            "json" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            "pretty" => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .pretty()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
            _ => {
                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(
                        tracing_subscriber::fmt::layer()
                            .compact()
                            .with_writer(std::io::stderr),
                    )
                    .init();
            }
        }
    }

    Ok(())
}
