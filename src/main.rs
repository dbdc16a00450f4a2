use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use call_attendant::modem::link::candidate_ports;
use call_attendant::{Config, Daemon};

/// Exit code for an unusable command line or configuration
const EXIT_USAGE: u8 = 2;

/// Call Attendant - screens calls on an analog line through a voice modem
#[derive(Parser)]
#[command(name = "callattendant", version, about)]
struct Cli {
    /// Configuration file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Data folder for the call log, messages and prompts
    #[arg(short, long, env = "CALLATTENDANT_DATA")]
    data_path: Option<PathBuf>,

    /// Create the data folders if they are missing
    #[arg(long)]
    create_folder: bool,

    /// Serial device to use instead of the configured list
    #[arg(long)]
    device: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// List serial ports that could hold a modem
    Ports,
    /// Validate the configuration and exit
    Check,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.verbose, false);
            tracing::error!("configuration error: {e:#}");
            return ExitCode::from(EXIT_USAGE);
        }
    };

    init_logging(cli.verbose, config.debug);

    match cli.command {
        Some(Command::Ports) => {
            cmd_ports(&config);
            return ExitCode::SUCCESS;
        }
        Some(Command::Check) => return cmd_check(&config),
        None => {}
    }

    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        return ExitCode::from(EXIT_USAGE);
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e:#}");
            ExitCode::FAILURE
        }
    }
}

/// Set up logging based on verbosity; the config `debug` flag counts as `-v`
fn init_logging(verbose: u8, debug: bool) {
    let level = if debug { verbose.max(1) } else { verbose };
    let filter = match level {
        0 => "info,call_attendant=info",
        1 => "info,call_attendant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = Config::load(cli.config.as_deref(), cli.data_path.clone())?;
    if let Some(device) = &cli.device {
        config.modem.devices = vec![device.clone()];
    }
    if cli.create_folder {
        config.create_folders()?;
    }
    Ok(config)
}

async fn run(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        data_dir = %config.data_dir.display(),
        devices = ?config.modem.devices,
        "starting call attendant"
    );
    tracing::debug!(?config, "loaded configuration");

    Daemon::new(config).run().await?;
    Ok(())
}

/// List candidate serial ports
fn cmd_ports(config: &Config) {
    let ports = candidate_ports(&config.modem.devices);
    if ports.is_empty() {
        println!("No serial ports found");
    }
    for port in ports {
        println!("{port}");
    }
}

/// Validate configuration
fn cmd_check(config: &Config) -> ExitCode {
    if let Err(e) = config.validate() {
        println!("{e}");
        return ExitCode::from(EXIT_USAGE);
    }
    println!("Configuration OK");
    println!("  data folder:    {}", config.data_dir.display());
    println!("  messages:       {}", config.voice_mail.message_folder.display());
    println!("  patterns file:  {}", config.screening.patterns_file.display());
    ExitCode::SUCCESS
}
