//! DCS World Steam Edition

use crate::error::Result;
use crate::session::{DllOverride, Session};
use crate::tricks::protontricks;

pub fn apply(session: &mut Session) -> Result<()> {
    // Based on https://www.digitalcombatsimulator.com/en/support/faq/SteamDeck/
    protontricks(session, "d3dx11_43");
    protontricks(session, "d3dcompiler_43");
    protontricks(session, "d3dcompiler_47");
    session.winedll_override("wbemprox", DllOverride::Native); // doesn't seem to be strictly needed
    Ok(())
}
