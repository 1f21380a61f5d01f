//! gatrack-replay — replays recorded tracker transport events through the
//! connector and prints the resulting script insertions and vendor calls.

mod script;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use gatrack_core::config::SendMode;
use gatrack_core::ConnectorSettings;
use tracing::{info, warn};

use crate::script::{run, Replay};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SendModeArg {
    Always,
    Production,
    Never,
}

impl From<SendModeArg> for SendMode {
    fn from(arg: SendModeArg) -> Self {
        match arg {
            SendModeArg::Always => SendMode::Always,
            SendModeArg::Production => SendMode::Production,
            SendModeArg::Never => SendMode::Never,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "gatrack-replay")]
#[command(about = "Replay tracker transport events and print the resulting vendor calls")]
#[command(version)]
struct Cli {
    /// JSON-lines replay script (reads stdin when omitted)
    #[arg(long)]
    script: Option<PathBuf>,

    /// Treat the hosting page as running in production mode (overrides config)
    #[arg(long, env = "GATRACK__PRODUCTION_MODE")]
    production: Option<bool>,

    /// When tracked hits are handed to the vendor (overrides config)
    #[arg(long, value_enum)]
    send_mode: Option<SendModeArg>,

    /// Simulate a page served over https (default)
    #[arg(long, overrides_with = "insecure")]
    secure: bool,

    /// Simulate a page served over plain http
    #[arg(long, overrides_with = "secure")]
    insecure: bool,
}

impl Cli {
    /// The last of `--secure` / `--insecure` wins; https when neither is given.
    fn is_secure(&self) -> bool {
        self.secure || !self.insecure
    }
}

fn main() -> anyhow::Result<()> {
    // stdout carries the replay output
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gatrack_replay=info,gatrack_web_sdk=info".into()),
        )
        .json()
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = ConnectorSettings::load().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load settings, using defaults");
        ConnectorSettings::default()
    });

    if let Some(production) = cli.production {
        settings.production_mode = production;
    }
    if let Some(send_mode) = cli.send_mode {
        settings.send_mode = send_mode.into();
    }

    info!(
        production_mode = settings.production_mode,
        send_mode = ?settings.send_mode,
        log_level = ?settings.log_level(),
        secure = cli.is_secure(),
        "Settings loaded"
    );

    let mut replay = Replay::new(settings, cli.is_secure());
    let stdout = io::stdout().lock();

    match cli.script {
        Some(path) => {
            let file = File::open(&path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            run(&mut replay, BufReader::new(file), stdout)?;
        }
        None => {
            run(&mut replay, io::stdin().lock(), stdout)?;
        }
    }

    Ok(())
}
