use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const LOG_FILE: &str = "kochr.log";

pub fn parse_level(log_level: Option<&str>) -> Level {
    log_level
        .and_then(|s| s.parse::<Level>().ok())
        .unwrap_or(Level::INFO)
}

/// Log to `<dir>/kochr.log`; the terminal itself belongs to the UI.
/// Falls back to INFO if the level is missing or invalid.
pub fn init_logging(log_level: Option<&str>, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(LOG_FILE);
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    FmtSubscriber::builder()
        .with_target(false)
        .with_ansi(false)
        .with_max_level(parse_level(log_level))
        .with_writer(Mutex::new(file))
        .init();
    Ok(path)
}
