//! Elden Ring: create the DLC.bdt placeholder to work around the
//! "Inappropriate activity detected" error for players without the DLC.

use crate::error::Result;
use crate::session::Session;
use std::fs::File;
use tracing::info;

pub fn apply(session: &mut Session) -> Result<()> {
    let dlc = session.game_install_path().join("Game/DLC.bdt");
    if !dlc.exists() {
        // A blank file is enough to get Easy AntiCheat multiplayer working
        // for players that don't own the DLC.
        File::create(&dlc)?;
        info!("Created DLC placeholder at {:?}", dlc);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proton::Proton;
    use std::path::PathBuf;

    #[test]
    fn creates_placeholder_when_missing() {
        let game_dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(game_dir.path().join("Game")).unwrap();

        let proton = Proton::from_dir(PathBuf::from("/opt/proton"), PathBuf::from("/tmp/pfx"));
        let mut session = Session::new(proton, vec![]);
        session.set_env(
            "STEAM_COMPAT_INSTALL_PATH",
            game_dir.path().to_str().unwrap(),
        );

        apply(&mut session).unwrap();
        let dlc = game_dir.path().join("Game/DLC.bdt");
        assert!(dlc.is_file());
        assert_eq!(std::fs::metadata(&dlc).unwrap().len(), 0);

        // Existing file is left alone
        std::fs::write(&dlc, b"real dlc").unwrap();
        apply(&mut session).unwrap();
        assert_eq!(std::fs::read(&dlc).unwrap(), b"real dlc");
    }
}
