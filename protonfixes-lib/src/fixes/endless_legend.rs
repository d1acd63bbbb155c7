//! Endless Legend: enable -useembedded to get past a loading hang.

use crate::error::Result;
use crate::session::Session;

pub fn apply(session: &mut Session) -> Result<()> {
    session.append_argument("-useembedded");
    Ok(())
}
