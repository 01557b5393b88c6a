//! `netvault` command-line entry point.
//!
//! ```bash
//! netvault run -c netvault.yaml -p master-password
//! netvault encrypt -p master-password 'device-password'
//! netvault decrypt -p master-password 'R3k1...=='
//! ```

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use env_logger::{Env, Target};
use log::{error, info, warn};
use tokio::time::Instant;

use netvault::{
    Collector, Config, NetworkConnector, PlatformRegistry, Report, Scheduler, SecretCipher,
};

#[derive(Parser, Debug)]
#[command(name = "netvault", version, about = "Back up network device configurations")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Back up every enabled device in the configuration file
    Run {
        /// Configuration file
        #[arg(short, long, default_value = "netvault.yaml")]
        config: PathBuf,

        /// Master password for encrypted device passwords
        #[arg(short, long, env = "NETVAULT_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Log every step sent to and received from devices
        #[arg(short, long)]
        verbose: bool,
    },

    /// Encrypt a password for the configuration file
    Encrypt {
        /// Master password
        #[arg(short, long, env = "NETVAULT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Value to encrypt
        plaintext: String,
    },

    /// Decrypt a password from the configuration file
    Decrypt {
        /// Master password
        #[arg(short, long, env = "NETVAULT_PASSWORD", hide_env_values = true)]
        password: String,

        /// Value to decrypt
        ciphertext: String,
    },
}

fn init_logger(verbose: bool, file: Option<&Path>) -> Result<()> {
    let level = if verbose { "debug" } else { "info" };
    let mut builder = env_logger::Builder::from_env(Env::default().default_filter_or(level));
    if let Some(path) = file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        builder.target(Target::Pipe(Box::new(file)));
    }
    builder.init();
    Ok(())
}

async fn run(config: PathBuf, password: Option<String>, verbose: bool) -> Result<ExitCode> {
    let config = Config::load(&config, password.as_deref())
        .with_context(|| format!("cannot load {}", config.display()))?;
    init_logger(verbose, config.log_file.as_deref())?;

    let started = Local::now();
    let clock = Instant::now();

    let store = config.artifact_store();
    store
        .prepare(config.devices.iter().filter(|d| d.enabled).map(|d| d.name.as_str()))
        .await
        .context("cannot prepare staging directory")?;

    let connector = Arc::new(NetworkConnector::new(config.connect_settings()));
    let scheduler_config = config.scheduler_config();
    let repository = config.repository.clone();
    let log_file = config.log_file.clone();
    let (ctx, devices) = config.into_run(verbose);
    let collector = Arc::new(Collector::new());

    info!("backing up {} devices with {} workers", devices.len(), scheduler_config.workers);
    let mut scheduler = Scheduler::start(
        scheduler_config,
        ctx,
        Arc::new(PlatformRegistry::builtin()),
        connector,
        collector.clone(),
    );

    let handle = scheduler.handle();
    let signals = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_err() {
            return;
        }
        warn!("interrupted: finishing running devices, press Ctrl-C again to abort them");
        handle.stop();
        if tokio::signal::ctrl_c().await.is_ok() {
            handle.abort();
        }
    });

    scheduler.run_all(devices).await;
    signals.abort();

    match store.publish(&repository).await {
        Ok(moved) => info!("{moved} files stored in {}", repository.display()),
        Err(e) => error!("cannot publish artifacts: {e}"),
    }

    let report = Report::new(started, clock.elapsed(), &collector);
    print!("{report}");
    if let Some(path) = &log_file {
        report.append_to(path)?;
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    match args.command {
        Command::Run {
            config,
            password,
            verbose,
        } => run(config, password, verbose).await,
        Command::Encrypt {
            password,
            plaintext,
        } => {
            println!("{}", SecretCipher::new(&password)?.encrypt(&plaintext));
            Ok(ExitCode::SUCCESS)
        }
        Command::Decrypt {
            password,
            ciphertext,
        } => {
            println!("{}", SecretCipher::new(&password)?.decrypt(&ciphertext)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
