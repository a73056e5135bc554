use std::fs::File;
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::puzzle::Role;

/// Quantum heist: crack locks and read attack circuits in your terminal.
#[derive(Parser, Debug, Clone)]
#[command(name = "q-heist")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Shots per circuit run
    #[arg(long, env = "QHEIST_SHOTS", default_value_t = 1000)]
    pub shots: usize,

    /// Seed for measurement sampling
    #[arg(long, env = "QHEIST_SEED", default_value_t = 0x5eed)]
    pub seed: u64,

    /// Start directly as this role
    #[arg(long, value_enum)]
    pub role: Option<Role>,

    /// Where Ctrl+S writes the circuit snapshot (JSON)
    #[arg(long, env = "QHEIST_SAVE_PATH", default_value = "circuit.json")]
    pub save_path: PathBuf,

    /// Write diagnostics to this file (the terminal is taken by the UI)
    #[arg(long, env = "QHEIST_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            shots: 1000,
            seed: 0x5eed,
            role: None,
            save_path: PathBuf::from("circuit.json"),
            log_file: None,
            verbose: 0,
        }
    }
}

impl Config {
    fn filter_directive(&self) -> &'static str {
        match self.verbose {
            0 => "q_heist=info",
            1 => "q_heist=debug",
            _ => "q_heist=trace",
        }
    }

    /// Installs the file logger. Without `--log-file` nothing is installed.
    pub fn init_logging(&self) -> anyhow::Result<()> {
        let Some(path) = &self.log_file else {
            return Ok(());
        };
        let file = File::create(path)
            .with_context(|| format!("cannot open log file {}", path.display()))?;
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.filter_directive()));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .init();
        Ok(())
    }
}
