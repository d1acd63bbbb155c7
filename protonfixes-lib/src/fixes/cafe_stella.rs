//! Café Stella and the Reaper's Butterflies: fix in-game video playback
//! for the intro and ending.

use crate::error::Result;
use crate::session::Session;

pub fn apply(session: &mut Session) -> Result<()> {
    session.disable_media_converter();
    Ok(())
}
