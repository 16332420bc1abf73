use anyhow::{anyhow, Result};
use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Log to stderr. Used by the one-shot subcommands.
pub fn init_stderr() {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(std::io::stderr)
        .init();
}

/// Log to a file so output does not corrupt the terminal UI.
pub fn init_file() -> Result<PathBuf> {
    let log_dir = dirs::cache_dir()
        .ok_or_else(|| anyhow!("Could not determine cache directory"))?
        .join("sitechat");
    fs::create_dir_all(&log_dir)?;

    let log_path = log_dir.join("sitechat.log");
    let file = OpenOptions::new().create(true).append(true).open(&log_path)?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();

    Ok(log_path)
}
