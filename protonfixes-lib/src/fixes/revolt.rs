//! Re-Volt: set the dll overrides for the wrappers shipped with the game.

use crate::error::Result;
use crate::session::{DllOverride, Session};

pub fn apply(session: &mut Session) -> Result<()> {
    session.winedll_override("ddraw", DllOverride::Native);
    session.winedll_override("dinput", DllOverride::Native);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proton::Proton;
    use std::path::PathBuf;

    #[test]
    fn shipped_wrappers_are_overridden() {
        let proton = Proton::from_dir(PathBuf::from("/opt/proton"), PathBuf::from("/tmp/pfx"));
        let mut session = Session::new(proton, vec![]);
        session.del_env("WINEDLLOVERRIDES");

        apply(&mut session).unwrap();
        assert_eq!(
            session.get_env("WINEDLLOVERRIDES"),
            Some("ddraw=n;dinput=n")
        );
    }
}
