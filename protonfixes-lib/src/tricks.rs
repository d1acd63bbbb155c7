//! Winetricks installation wrapper
//!
//! Installs winetricks verbs into the prefix idempotently: the winetricks
//! logs are the source of truth for "is this verb installed", with a
//! secondary forced log for verbs the wrapper decided to treat as
//! installed despite winetricks' own bookkeeping disagreeing.

use crate::error::Result;
use crate::session::Session;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::net::{SocketAddr, TcpStream};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fixed external address probed for network reachability
const DEFAULT_PROBE: &str = "1.1.1.1:53";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Helper executables known to hang after a winetricks run
const HUNG_EXES: &[&str] = &["mscorsvw.exe"];

/// Returns whether a verb is recorded in the given winetricks log.
///
/// `key=value` verbs match by key and require exact value equality on the
/// most recent line for that key; bare verbs match anywhere in the log.
fn log_contains_verb(log_path: &Path, verb: &str) -> bool {
    let Ok(content) = std::fs::read_to_string(log_path) else {
        return false;
    };

    if let Some((key, _)) = verb.split_once('=') {
        let key_prefix = format!("{key}=");
        let mut is_set = false;
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.starts_with(&key_prefix) {
                is_set = trimmed == verb;
            }
        }
        return is_set;
    }

    content.lines().any(|line| line.trim() == verb)
}

/// Returns whether the verb is found in the winetricks log or the forced log.
pub fn check_installed(prefix: &Path, verb: &str) -> bool {
    if verb == "gui" {
        return false;
    }

    info!("Checking if winetricks {} is installed", verb);
    log_contains_verb(&prefix.join("winetricks.log.forced"), verb)
        || log_contains_verb(&prefix.join("winetricks.log"), verb)
}

/// Records a verb into the winetricks.log.forced file
fn force_installed(prefix: &Path, verb: &str) -> Result<()> {
    let forced_log = prefix.join("winetricks.log.forced");
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&forced_log)?;
    writeln!(file, "{verb}")?;
    Ok(())
}

/// Path to a custom winetricks verb file, if one exists.
///
/// A user-local override directory is checked before the verbs bundled
/// next to the running binary.
pub fn is_custom_verb(verb: &str) -> Option<PathBuf> {
    if verb == "gui" {
        return None;
    }

    let mut search = Vec::new();
    if let Some(config) = dirs::config_dir() {
        search.push(config.join("protonfixes/localfixes/verbs"));
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            search.push(parent.join("verbs"));
        }
    }
    custom_verb_in(verb, &search)
}

fn custom_verb_in(verb: &str, search: &[PathBuf]) -> Option<PathBuf> {
    let verb_name = format!("{verb}.verb");
    for dir in search {
        let verb_file = dir.join(&verb_name);
        if verb_file.is_file() {
            debug!("Using custom winetricks verb from: {:?}", dir);
            return Some(verb_file);
        }
    }
    None
}

/// Checks for an internet connection.
pub fn check_internet() -> bool {
    probe_internet(DEFAULT_PROBE)
}

fn probe_internet(addr: &str) -> bool {
    let Ok(addr) = addr.parse::<SocketAddr>() else {
        return false;
    };
    TcpStream::connect_timeout(&addr, PROBE_TIMEOUT).is_ok()
}

/// Kills processes that hang when installing winetricks verbs.
///
/// Best-effort sweep over /proc by executable name; a missed process is
/// not an error.
pub(crate) fn kill_hanging() {
    debug!("Killing hanging wine processes");
    let Ok(entries) = std::fs::read_dir("/proc") else {
        return;
    };
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(pid) = name.to_str().and_then(|s| s.parse::<i32>().ok()) else {
            continue;
        };
        let Ok(cmdline) = std::fs::read(entry.path().join("cmdline")) else {
            continue;
        };
        let cmdline = String::from_utf8_lossy(&cmdline);
        if HUNG_EXES.iter().any(|exe| cmdline.contains(exe)) {
            let _ = kill(Pid::from_raw(pid), Signal::SIGKILL);
        }
    }
}

/// Installs a winetricks verb into the session prefix, idempotently.
///
/// Reports a plain boolean: any launch error, non-zero exit or missing
/// winetricks binary is a failure, distinguished only by log messages.
pub fn protontricks(session: &mut Session, verb: &str) -> bool {
    install_verb(session, verb, DEFAULT_PROBE)
}

fn install_verb(session: &mut Session, verb: &str, probe: &str) -> bool {
    if check_installed(session.prefix(), verb) {
        return true;
    }

    if !probe_internet(probe) {
        info!("No internet connection. Winetricks will be skipped.");
        return false;
    }

    info!("Installing winetricks {}", verb);
    let prefix = session.prefix().to_string_lossy().into_owned();
    let wine_bin = session.proton.wine_bin.to_string_lossy().into_owned();
    let wineserver_bin = session.proton.wineserver_bin.to_string_lossy().into_owned();

    let mut env: HashMap<String, String> = session.env().clone();
    env.insert("WINEPREFIX".into(), prefix);
    env.insert("WINE".into(), wine_bin.clone());
    env.insert("WINELOADER".into(), wine_bin);
    env.insert("WINESERVER".into(), wineserver_bin.clone());
    env.insert("WINETRICKS_LATEST_VERSION_CHECK".into(), "disabled".into());
    env.insert("LD_PRELOAD".into(), String::new());

    let winetricks_bin = session.proton.winetricks_bin.clone();
    if !winetricks_bin.exists() {
        warn!("No winetricks found at {:?}", winetricks_bin);
        return false;
    }

    let mut cmd_args: Vec<String> = vec!["--unattended".into()];
    if verb != "gui" {
        if let Some(custom) = is_custom_verb(verb) {
            cmd_args.push(custom.to_string_lossy().into_owned());
        } else {
            cmd_args.extend(verb.split_whitespace().map(String::from));
        }
    }
    debug!("Using winetricks command: {:?} {:?}", winetricks_bin, cmd_args);

    // make sure proton waits for winetricks to finish
    session.wait_for_exit_and_run();

    info!("Using winetricks verb {}", verb);
    if let Err(err) = Command::new(&wineserver_bin)
        .arg("-w")
        .env_clear()
        .envs(&env)
        .status()
    {
        warn!("Could not flush wineserver before winetricks: {}", err);
    }

    let status = match Command::new(&winetricks_bin)
        .args(&cmd_args)
        .env_clear()
        .envs(&env)
        .status()
    {
        Ok(status) => status,
        Err(err) => {
            warn!("Could not run winetricks: {}", err);
            return false;
        }
    };

    kill_hanging();

    // Check if the verb failed (eg. access denied)
    if !status.success() {
        warn!(
            "Winetricks failed running verb \"{}\" with status {:?}.",
            verb,
            status.code()
        );
        return false;
    }

    // Check if verb recorded to winetricks log
    if !check_installed(session.prefix(), verb) {
        warn!("Not recorded as installed: winetricks {}, forcing!", verb);
        if let Err(err) = force_installed(session.prefix(), verb) {
            warn!("Could not write forced log: {}", err);
            return false;
        }
    }

    info!("Winetricks complete");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proton::Proton;
    use std::net::TcpListener;
    use std::os::unix::fs::PermissionsExt;

    fn write_script(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
        let mut perms = std::fs::metadata(path).unwrap().permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).unwrap();
    }

    /// Session with a stub proton dir: wineserver exits 0, winetricks runs
    /// the given script body.
    fn stub_session(proton_dir: &Path, prefix: &Path, winetricks_body: &str) -> Session {
        write_script(&proton_dir.join("files/bin/wineserver"), "exit 0");
        write_script(&proton_dir.join("winetricks"), winetricks_body);
        let proton = Proton::from_dir(proton_dir.to_path_buf(), prefix.to_path_buf());
        Session::new(proton, vec!["proton".into(), "waitforexitandrun".into()])
    }

    fn reachable_probe() -> (TcpListener, String) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        (listener, addr)
    }

    // No listener on the discard port, connection is refused immediately.
    const UNREACHABLE_PROBE: &str = "127.0.0.1:9";

    #[test]
    fn key_value_verb_matches_latest_line_only() {
        let prefix = tempfile::tempdir().unwrap();
        std::fs::write(
            prefix.path().join("winetricks.log"),
            "sound=oss\nquartz\nsound=alsa\n",
        )
        .unwrap();

        assert!(check_installed(prefix.path(), "sound=alsa"));
        assert!(!check_installed(prefix.path(), "sound=oss"));
    }

    #[test]
    fn bare_verb_matches_anywhere() {
        let prefix = tempfile::tempdir().unwrap();
        std::fs::write(prefix.path().join("winetricks.log"), "quartz\namstream\n").unwrap();

        assert!(check_installed(prefix.path(), "quartz"));
        assert!(check_installed(prefix.path(), "amstream"));
        assert!(!check_installed(prefix.path(), "quart"));
        assert!(!check_installed(prefix.path(), "wmp11"));
    }

    #[test]
    fn forced_log_always_counts_as_installed() {
        let prefix = tempfile::tempdir().unwrap();
        std::fs::write(prefix.path().join("winetricks.log.forced"), "d3dx11_43\n").unwrap();

        assert!(check_installed(prefix.path(), "d3dx11_43"));
    }

    #[test]
    fn gui_is_never_considered_installed() {
        let prefix = tempfile::tempdir().unwrap();
        std::fs::write(prefix.path().join("winetricks.log"), "gui\n").unwrap();

        assert!(!check_installed(prefix.path(), "gui"));
    }

    #[test]
    fn missing_logs_mean_not_installed() {
        let prefix = tempfile::tempdir().unwrap();
        assert!(!check_installed(prefix.path(), "quartz"));
    }

    #[test]
    fn local_custom_verb_wins_over_bundled() {
        let local = tempfile::tempdir().unwrap();
        let bundled = tempfile::tempdir().unwrap();
        std::fs::write(local.path().join("lavfilters.verb"), "").unwrap();
        std::fs::write(bundled.path().join("lavfilters.verb"), "").unwrap();

        let found = custom_verb_in(
            "lavfilters",
            &[local.path().to_path_buf(), bundled.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(found, local.path().join("lavfilters.verb"));

        std::fs::remove_file(local.path().join("lavfilters.verb")).unwrap();
        let found = custom_verb_in(
            "lavfilters",
            &[local.path().to_path_buf(), bundled.path().to_path_buf()],
        )
        .unwrap();
        assert_eq!(found, bundled.path().join("lavfilters.verb"));
    }

    #[test]
    fn probe_reports_reachability() {
        let (_listener, addr) = reachable_probe();
        assert!(probe_internet(&addr));
        assert!(!probe_internet(UNREACHABLE_PROBE));
    }

    #[test]
    fn unreachable_network_skips_the_installer() {
        let proton_dir = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let invoked = proton_dir.path().join("invoked");
        let mut session = stub_session(
            proton_dir.path(),
            prefix.path(),
            &format!("touch {}", invoked.display()),
        );

        assert!(!install_verb(&mut session, "d3dx11_43", UNREACHABLE_PROBE));
        assert!(!invoked.exists());
        assert!(!prefix.path().join("winetricks.log").exists());
        assert!(!prefix.path().join("winetricks.log.forced").exists());
    }

    #[test]
    fn recorded_verb_is_plain_success() {
        let proton_dir = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let (_listener, addr) = reachable_probe();
        let mut session = stub_session(
            proton_dir.path(),
            prefix.path(),
            "echo d3dx11_43 >> \"$WINEPREFIX/winetricks.log\"\nexit 0",
        );

        assert!(install_verb(&mut session, "d3dx11_43", &addr));
        assert!(check_installed(prefix.path(), "d3dx11_43"));
        assert!(!prefix.path().join("winetricks.log.forced").exists());
    }

    #[test]
    fn unrecorded_verb_is_forced_on_success() {
        let proton_dir = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let (_listener, addr) = reachable_probe();
        let mut session = stub_session(proton_dir.path(), prefix.path(), "exit 0");

        assert!(install_verb(&mut session, "d3dx11_43", &addr));
        let forced =
            std::fs::read_to_string(prefix.path().join("winetricks.log.forced")).unwrap();
        assert_eq!(forced, "d3dx11_43\n");
    }

    #[test]
    fn nonzero_exit_reports_failure() {
        let proton_dir = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let (_listener, addr) = reachable_probe();
        let mut session = stub_session(proton_dir.path(), prefix.path(), "exit 1");

        assert!(!install_verb(&mut session, "d3dx11_43", &addr));
        assert!(!prefix.path().join("winetricks.log.forced").exists());
    }

    #[test]
    fn already_installed_verb_short_circuits() {
        let proton_dir = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        std::fs::write(prefix.path().join("winetricks.log"), "quartz\n").unwrap();
        let invoked = proton_dir.path().join("invoked");
        let mut session = stub_session(
            proton_dir.path(),
            prefix.path(),
            &format!("touch {}", invoked.display()),
        );

        // Probe is unreachable on purpose: an installed verb must not
        // even reach the network check.
        assert!(install_verb(&mut session, "quartz", UNREACHABLE_PROBE));
        assert!(!invoked.exists());
    }

    #[test]
    fn missing_winetricks_binary_is_a_failure() {
        let proton_dir = tempfile::tempdir().unwrap();
        let prefix = tempfile::tempdir().unwrap();
        let (_listener, addr) = reachable_probe();
        let proton = Proton::from_dir(proton_dir.path().to_path_buf(), prefix.path().to_path_buf());
        let mut session = Session::new(proton, vec![]);

        assert!(!install_verb(&mut session, "d3dx11_43", &addr));
    }
}
