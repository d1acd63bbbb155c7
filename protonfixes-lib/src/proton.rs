//! Proton installation paths and version introspection

use crate::error::{ProtonfixesError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Paths into the Proton installation the fixes run against
#[derive(Debug, Clone)]
pub struct Proton {
    /// Proton installation directory
    pub dir: PathBuf,

    /// Wine prefix used by this launch ($STEAM_COMPAT_DATA_PATH/pfx)
    pub prefix: PathBuf,

    /// Path to Proton's wine binary
    pub wine_bin: PathBuf,

    /// Path to Proton's wineserver binary
    pub wineserver_bin: PathBuf,

    /// Path to the winetricks script bundled next to protonfixes
    pub winetricks_bin: PathBuf,
}

impl Proton {
    /// Detect the Proton installation from the running binary's location
    /// and the Steam compat environment.
    pub fn detect() -> Result<Self> {
        let exe = std::env::current_exe()?;
        let dir = exe
            .parent()
            .ok_or_else(|| ProtonfixesError::Proton("launcher has no parent directory".into()))?
            .to_path_buf();

        let compat_data = std::env::var("STEAM_COMPAT_DATA_PATH").map_err(|_| {
            ProtonfixesError::Proton("STEAM_COMPAT_DATA_PATH is not set".into())
        })?;
        let prefix = PathBuf::from(compat_data).join("pfx");

        Ok(Self::from_dir(dir, prefix))
    }

    /// Build a Proton description from explicit paths.
    pub fn from_dir(dir: PathBuf, prefix: PathBuf) -> Self {
        let wine_bin = dir.join("files/bin/wine");
        let wineserver_bin = dir.join("files/bin/wineserver");
        let winetricks_bin = dir.join("winetricks");

        Self {
            dir,
            prefix,
            wine_bin,
            wineserver_bin,
            winetricks_bin,
        }
    }

    /// Proton version parsed from the installation path, e.g. "9.0"
    /// from ".../Proton 9.0/...". None when the path carries no version.
    pub fn name_version(&self) -> Option<String> {
        let re = Regex::new(r"Proton ([0-9]+\.[0-9]+)").ok()?;
        let dir = self.dir.to_string_lossy();
        match re.captures(&dir) {
            Some(caps) => Some(caps[1].to_string()),
            None => {
                warn!("Proton version not parsed from path: {}", dir);
                None
            }
        }
    }

    /// Version timestamp from the `version` file in the Proton directory.
    /// Returns 0 when the file is missing or malformed.
    pub fn time_version(&self) -> i64 {
        let path = self.dir.join("version");
        match std::fs::read_to_string(&path) {
            Ok(content) => {
                for line in content.lines() {
                    if let Ok(stamp) = line.trim().parse::<i64>() {
                        return stamp;
                    }
                }
                warn!("Proton version not parsed from file: {:?}", path);
                0
            }
            Err(_) => {
                warn!("Proton version file not found in: {:?}", path);
                0
            }
        }
    }

    /// Directory holding the run-once markers for this prefix.
    pub(crate) fn run_marker_dir(prefix: &Path) -> PathBuf {
        prefix.join("drive_c/protonfixes/run")
    }
}
