//! Per-title game fixes
//!
//! Each fix is a short procedural function over the session, dispatched
//! by Steam app id. A failing fix is logged and never aborts the launch.

use crate::error::Result;
use crate::session::Session;
use tracing::{info, warn};

pub mod cafe_stella;
pub mod ceville;
pub mod chantelise;
pub mod dcs_world;
pub mod elden_ring;
pub mod endless_legend;
pub mod rainbow_six_siege;
pub mod revolt;
pub mod sanoba_witch;
pub mod trails_in_the_sky;

/// A game fix entry point
pub type Fix = fn(&mut Session) -> Result<()>;

/// Look up the fix for a Steam app id.
pub fn find(appid: &str) -> Option<(&'static str, Fix)> {
    let entry: (&'static str, Fix) = match appid {
        "1245620" => ("Elden Ring", elden_ring::apply),
        "1829980" => ("Café Stella and the Reaper's Butterflies", cafe_stella::apply),
        "223750" => ("DCS World Steam Edition", dcs_world::apply),
        "23460" => ("Ceville", ceville::apply),
        "2458530" => ("Sanoba Witch FHD Edition", sanoba_witch::apply),
        "251150" => ("The Legend of Heroes: Trails in the Sky", trails_in_the_sky::apply),
        "287310" => ("Re-Volt", revolt::apply),
        "289130" => ("Endless Legend", endless_legend::apply),
        "359550" => ("Rainbow Six Siege", rainbow_six_siege::apply),
        "70420" => ("Chantelise - A Tale of Two Sisters", chantelise::apply),
        _ => return None,
    };
    Some(entry)
}

/// Apply the fix for an app id, if one exists. Fix failures are logged
/// and swallowed so a broken fix cannot keep a game from launching.
pub fn apply(session: &mut Session, appid: &str) {
    match find(appid) {
        Some((title, fix)) => {
            info!("Applying fix for {} ({})", title, appid);
            if let Err(err) = fix(session) {
                warn!("Fix for {} failed: {}", appid, err);
            }
        }
        None => {
            info!("No fix found for app id {}", appid);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_appid_dispatches() {
        for appid in [
            "1245620", "1829980", "223750", "23460", "2458530", "251150", "287310", "289130",
            "359550", "70420",
        ] {
            assert!(find(appid).is_some(), "no fix for {appid}");
        }
    }

    #[test]
    fn unknown_appid_has_no_fix() {
        assert!(find("440").is_none());
    }
}
