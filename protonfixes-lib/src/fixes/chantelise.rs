//! Chantelise - A Tale of Two Sisters: install the directsound
//! libraries and work around audio stutter/desync.

use crate::error::Result;
use crate::session::{DllOverride, Session};
use crate::tricks::protontricks;

pub fn apply(session: &mut Session) -> Result<()> {
    protontricks(session, "dmime");
    protontricks(session, "dmloader");
    protontricks(session, "dmsynth");
    protontricks(session, "dmusic");
    protontricks(session, "dsound");
    protontricks(session, "dswave");
    session.winedll_override("streamci", DllOverride::Native);
    protontricks(session, "sound=alsa");

    // Fix for audio stutter/desync
    session.set_env("PULSE_LATENCY_MSEC", "60");
    Ok(())
}
