use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, info, warn};

use crate::store::schema::ProgressData;

const PROGRESS_FILE: &str = "progress.json";

pub struct JsonStore {
    base_dir: PathBuf,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        Self::with_base_dir(Self::default_dir())
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)?;
        Ok(Self { base_dir })
    }

    pub fn default_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kochr")
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if !path.exists() {
            return T::default();
        }
        match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                warn!("Could not parse {}: {e}; starting fresh", path.display());
                self.back_up(&path);
                T::default()
            }),
            Err(e) => {
                warn!("Could not read {}: {e}; starting fresh", path.display());
                T::default()
            }
        }
    }

    /// Move an unreadable file aside so the next save does not destroy it.
    fn back_up(&self, path: &Path) {
        let mut backup = path.as_os_str().to_owned();
        backup.push(".bak");
        match fs::rename(path, &backup) {
            Ok(()) => warn!("Kept unreadable file as {}", Path::new(&backup).display()),
            Err(e) => warn!("Could not back up {}: {e}", path.display()),
        }
    }

    /// Write to a sibling `.tmp` file, fsync, then rename over the target so a
    /// crash never leaves a half-written file behind.
    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        debug!("Saved {}", path.display());
        Ok(())
    }

    /// Never fails: unreadable or partial files fall back to defaults and
    /// missing windows are backfilled.
    pub fn load_progress(&self) -> ProgressData {
        let mut data: ProgressData = self.load(PROGRESS_FILE);
        data.backfill();
        info!(
            "Loaded progress: {} characters unlocked",
            data.unlocked_count
        );
        data
    }

    pub fn save_progress(&self, data: &ProgressData) -> Result<()> {
        self.save(PROGRESS_FILE, data)
    }
}
