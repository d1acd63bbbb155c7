//! The Legend of Heroes: Trails in the Sky

use crate::error::Result;
use crate::session::{DllOverride, Session};
use crate::tricks::protontricks;

pub fn apply(session: &mut Session) -> Result<()> {
    protontricks(session, "quartz"); // Cutscene fixes
    protontricks(session, "amstream");
    protontricks(session, "lavfilters");
    // Set for the SoraVoice mod
    session.winedll_override("dinput8", DllOverride::NativeThenBuiltin);
    Ok(())
}
