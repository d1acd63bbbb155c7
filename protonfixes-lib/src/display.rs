//! Desktop interaction: screen resolution detection and user notification

use std::path::PathBuf;
use std::process::Command;
use tracing::warn;

/// Show a desktop notification through notify-send, best effort.
pub fn notify(summary: &str, body: &str) {
    let Ok(notify_send) = which::which("notify-send") else {
        warn!("notify-send not found, dropping notification: {}", summary);
        return;
    };
    if let Err(err) = Command::new(notify_send).args([summary, body]).status() {
        warn!("Could not run notify-send: {}", err);
    }
}

/// Returns the primary screen resolution as (width, height).
///
/// Prefers the xrandr bundled next to the running binary, falling back
/// to one in $PATH. (0, 0) when no resolution could be detected.
pub fn get_resolution() -> (u32, u32) {
    let Some(xrandr) = find_xrandr() else {
        warn!("xrandr not found");
        return (0, 0);
    };

    let output = match Command::new(&xrandr).arg("--current").output() {
        Ok(output) if output.status.success() => output,
        Ok(output) => {
            warn!("xrandr exited with {:?}", output.status.code());
            return (0, 0);
        }
        Err(err) => {
            warn!("Could not run xrandr: {}", err);
            return (0, 0);
        }
    };

    parse_resolution(&String::from_utf8_lossy(&output.stdout)).unwrap_or((0, 0))
}

fn find_xrandr() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let bundled = parent.join("xrandr");
            if bundled.exists() {
                return Some(bundled);
            }
        }
    }
    which::which("xrandr").ok()
}

/// Extract width and height from the primary output line, e.g.
/// "eDP-1 connected primary 2560x1440+0+0 ..." -> (2560, 1440).
fn parse_resolution(output: &str) -> Option<(u32, u32)> {
    for line in output.lines() {
        if !line.contains("primary") {
            continue;
        }
        let geometry = line.split_whitespace().nth(3)?;
        let (width, rest) = geometry.split_once('x')?;
        let height = rest.split('+').next()?;
        return Some((width.parse().ok()?, height.parse().ok()?));
    }
    None
}
