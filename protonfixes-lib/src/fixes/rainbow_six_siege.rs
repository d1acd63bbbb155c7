//! Rainbow Six Siege: needs vk_x11_override_min_image_count=2 for AMD,
//! and the UPlay overlay disabled for Vulkan.

use crate::config_patch::disable_uplay_overlay;
use crate::error::Result;
use crate::session::Session;

pub fn apply(session: &mut Session) -> Result<()> {
    disable_uplay_overlay(session);
    session.set_env("vk_x11_override_min_image_count", "2");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proton::Proton;
    use std::path::PathBuf;

    #[test]
    fn overlay_settings_and_image_count_applied() {
        let prefix = tempfile::tempdir().unwrap();
        let proton = Proton::from_dir(PathBuf::from("/opt/proton"), prefix.path().to_path_buf());
        let mut session = Session::new(proton, vec![]);

        apply(&mut session).unwrap();
        assert_eq!(
            session.get_env("vk_x11_override_min_image_count"),
            Some("2")
        );
        let settings = prefix.path().join(
            "drive_c/users/steamuser/Local Settings/Application Data/Ubisoft Game Launcher/settings.yml",
        );
        assert!(settings.is_file());
    }
}
