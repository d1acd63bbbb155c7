//! Sanoba Witch FHD Edition: install quartz, wmp11, qasf to fix
//! in-game video playback for the intro and ending.

use crate::error::Result;
use crate::session::Session;
use crate::tricks::protontricks;

pub fn apply(session: &mut Session) -> Result<()> {
    protontricks(session, "quartz");
    protontricks(session, "wmp11");
    protontricks(session, "qasf");
    Ok(())
}
