//! Wine registry helpers

use crate::session::Session;
use std::collections::HashMap;
use std::process::Command;
use tracing::{info, warn};

/// A named registry value for [`regedit_add`]
#[derive(Debug, Clone, Copy)]
pub struct RegValue<'a> {
    /// Value name (/v)
    pub name: &'a str,
    /// Value type (/t), e.g. "REG_DWORD"
    pub typ: &'a str,
    /// Value data (/d)
    pub data: &'a str,
}

/// Add a registry key, optionally with a named value.
///
/// `force64` writes to the 64-bit registry sector (/reg:64). Failures are
/// logged and swallowed; a broken registry write never aborts a launch.
pub fn regedit_add(session: &Session, folder: &str, value: Option<RegValue<'_>>, force64: bool) {
    let mut env: HashMap<String, String> = session.env().clone();
    let wine_bin = session.proton.wine_bin.to_string_lossy().into_owned();
    env.insert(
        "WINEPREFIX".into(),
        session.prefix().to_string_lossy().into_owned(),
    );
    env.insert("WINE".into(), wine_bin.clone());
    env.insert("WINELOADER".into(), wine_bin);
    env.insert(
        "WINESERVER".into(),
        session.proton.wineserver_bin.to_string_lossy().into_owned(),
    );

    let mut cmd = Command::new(&session.proton.wine_bin);
    cmd.args(["reg", "add", folder, "/f"]);
    if let Some(value) = value {
        cmd.args(["/v", value.name, "/t", value.typ, "/d", value.data]);
    }
    if force64 {
        cmd.arg("/reg:64");
    }

    info!("Adding key: {}", folder);
    match cmd.env_clear().envs(&env).status() {
        Ok(status) if !status.success() => {
            warn!("wine reg add {} exited with {:?}", folder, status.code());
        }
        Ok(_) => {}
        Err(err) => warn!("Could not run wine reg add: {}", err),
    }
}
