//! Steam app installation helper
//!
//! Used by fixes that need a Steam-distributed runtime (Easy
//! AntiCheat, BattlEye) present before the game starts.

use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;
use tracing::{info, warn};

/// Proton EasyAntiCheat Runtime app id
const EAC_RUNTIME_APPID: &str = "1826330";

/// Proton BattlEye Runtime app id
const BATTLEYE_RUNTIME_APPID: &str = "1161040";

const INSTALL_WAIT: Duration = Duration::from_secs(60);
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Ask Steam to install an app and wait for its manifest to report a
/// finished install. Best effort: a timeout only logs a warning.
pub fn install_app(appid: &str) {
    if is_app_installed(appid) {
        info!("Steam app {} already installed", appid);
        return;
    }

    let steam = match which::which("steam") {
        Ok(path) => path,
        Err(_) => {
            warn!("steam not found in $PATH, cannot install app {}", appid);
            return;
        }
    };

    info!("Requesting install of Steam app {}", appid);
    if let Err(err) = Command::new(&steam)
        .arg(format!("steam://install/{appid}"))
        .spawn()
    {
        warn!("Could not launch steam: {}", err);
        return;
    }

    let deadline = std::time::Instant::now() + INSTALL_WAIT;
    while std::time::Instant::now() < deadline {
        if is_app_installed(appid) {
            info!("Steam app {} installed", appid);
            return;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
    warn!("Timed out waiting for Steam app {} to install", appid);
}

/// Install the Proton EasyAntiCheat Runtime
pub fn install_eac_runtime() {
    install_app(EAC_RUNTIME_APPID);
}

/// Install the Proton BattlEye Runtime
pub fn install_battleye_runtime() {
    install_app(BATTLEYE_RUNTIME_APPID);
}

fn is_app_installed(appid: &str) -> bool {
    for steamapps in library_dirs() {
        let manifest = steamapps.join(format!("appmanifest_{appid}.acf"));
        if let Ok(content) = std::fs::read_to_string(&manifest) {
            if manifest_fully_installed(&content) {
                return true;
            }
        }
    }
    false
}

fn library_dirs() -> Vec<PathBuf> {
    let mut dirs_found = Vec::new();
    if let Some(home) = dirs::home_dir() {
        dirs_found.push(home.join(".steam/steam/steamapps"));
        dirs_found.push(home.join(".local/share/Steam/steamapps"));
    }
    dirs_found
}

/// StateFlags 4 marks a fully installed app in the appmanifest.
fn manifest_fully_installed(content: &str) -> bool {
    for line in content.lines() {
        let trimmed = line.trim();
        if trimmed.starts_with("\"StateFlags\"") {
            return trimmed.ends_with("\"4\"");
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_installed_manifest_is_recognized() {
        let manifest = "\
\"AppState\"
{
\t\"appid\"\t\t\"1826330\"
\t\"StateFlags\"\t\t\"4\"
\t\"installdir\"\t\t\"Proton EasyAntiCheat Runtime\"
}
";
        assert!(manifest_fully_installed(manifest));
    }

    #[test]
    fn updating_manifest_is_not_installed() {
        let manifest = "\"AppState\"\n{\n\t\"StateFlags\"\t\t\"1026\"\n}\n";
        assert!(!manifest_fully_installed(manifest));
        assert!(!manifest_fully_installed(""));
    }
}
