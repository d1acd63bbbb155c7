//! Ceville
//!
//! Works with dotnet35sp1 only. Videos still don't work: they play with
//! audio but the screen stays black, so the video directory is moved
//! aside.

use crate::error::Result;
use crate::session::{DllOverride, Session};
use crate::tricks::protontricks;
use tracing::info;

pub fn apply(session: &mut Session) -> Result<()> {
    protontricks(session, "dotnet35sp1");

    let videos = session.game_install_path().join("data/shared/videos");
    if videos.is_dir() {
        let hidden = session.game_install_path().join("data/shared/_videos");
        std::fs::rename(&videos, &hidden)?;
        info!("Moved broken video directory aside: {:?}", hidden);
    }

    session.winedll_override("libvkd3d-1", DllOverride::Native);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proton::Proton;
    use std::path::PathBuf;

    #[test]
    fn video_directory_is_moved_aside() {
        let game_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(game_dir.path().join("data/shared/videos")).unwrap();

        // Verb already recorded, so the winetricks call short-circuits.
        let prefix = tempfile::tempdir().unwrap();
        std::fs::write(prefix.path().join("winetricks.log"), "dotnet35sp1\n").unwrap();
        let proton = Proton::from_dir(PathBuf::from("/nonexistent"), prefix.path().to_path_buf());
        let mut session = Session::new(proton, vec![]);
        session.set_env(
            "STEAM_COMPAT_INSTALL_PATH",
            game_dir.path().to_str().unwrap(),
        );

        apply(&mut session).unwrap();
        assert!(!game_dir.path().join("data/shared/videos").exists());
        assert!(game_dir.path().join("data/shared/_videos").is_dir());
    }
}
