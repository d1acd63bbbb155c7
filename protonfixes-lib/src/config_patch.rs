//! Game configuration file patching
//!
//! Fixes patch INI and XML config files inside the prefix or the game
//! directory, create DOSBox and DXVK configuration files, and disable the
//! UPlay overlay. A one-time backup copy is kept next to every patched
//! file.

use crate::error::Result;
use crate::once::{run_once, OncePolicy};
use crate::session::Session;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Where a config file path is anchored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigBase {
    /// Relative to the prefix user documents directory
    User,
    /// Relative to the game installation directory
    Game,
    /// Already a full path
    Absolute,
}

/// Minimal ordered INI document.
///
/// No INI crate is carried for this: the files protonfixes touches are
/// flat `key = value` lists with optional sections, and the patcher only
/// needs ordered set/get plus round-tripping.
#[derive(Debug, Default)]
pub(crate) struct IniDoc {
    /// (section name, entries); the unnamed leading section is "".
    sections: Vec<(String, Vec<(String, Option<String>)>)>,
}

impl IniDoc {
    pub(crate) fn parse(content: &str) -> Self {
        let mut doc = IniDoc::default();
        let mut current = String::new();
        for line in content.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with(';') || trimmed.starts_with('#') {
                continue;
            }
            if trimmed.starts_with('[') && trimmed.ends_with(']') {
                current = trimmed[1..trimmed.len() - 1].trim().to_string();
                doc.section_mut(&current);
                continue;
            }
            match trimmed.split_once('=') {
                Some((key, value)) => {
                    doc.set(&current, key.trim(), Some(value.trim()));
                }
                None => {
                    doc.set(&current, trimmed, None);
                }
            }
        }
        doc
    }

    fn section_mut(&mut self, name: &str) -> &mut Vec<(String, Option<String>)> {
        if let Some(idx) = self.sections.iter().position(|(n, _)| n == name) {
            &mut self.sections[idx].1
        } else {
            self.sections.push((name.to_string(), Vec::new()));
            &mut self.sections.last_mut().unwrap().1
        }
    }

    pub(crate) fn set(&mut self, section: &str, key: &str, value: Option<&str>) {
        let entries = self.section_mut(section);
        if let Some(entry) = entries.iter_mut().find(|(k, _)| k == key) {
            entry.1 = value.map(str::to_string);
        } else {
            entries.push((key.to_string(), value.map(str::to_string)));
        }
    }

    pub(crate) fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections
            .iter()
            .find(|(n, _)| n == section)?
            .1
            .iter()
            .find(|(k, _)| k == key)?
            .1
            .as_deref()
    }

    /// Apply every entry of `other` on top of this document.
    pub(crate) fn merge(&mut self, other: &IniDoc) {
        for (section, entries) in &other.sections {
            for (key, value) in entries {
                self.set(section, key, value.as_deref());
            }
        }
    }

    pub(crate) fn render(&self) -> String {
        let mut out = String::new();
        for (section, entries) in &self.sections {
            if !section.is_empty() {
                out.push_str(&format!("[{section}]\n"));
            }
            for (key, value) in entries {
                match value {
                    Some(value) => out.push_str(&format!("{key} = {value}\n")),
                    None => out.push_str(&format!("{key}\n")),
                }
            }
            out.push('\n');
        }
        out
    }
}

/// Find a potentially differently-cased location, e.g.
/// `system/gothic.ini` -> `System/GOTHIC.INI`.
pub fn case_insensitive_path(path: &Path) -> PathBuf {
    if path.exists() {
        return path.to_path_buf();
    }

    // Find the deepest existing ancestor, then match the remaining
    // components against directory listings, case folded.
    let mut root = path.to_path_buf();
    let mut missing = Vec::new();
    while !root.exists() {
        match (root.parent(), root.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                root = parent.to_path_buf();
            }
            _ => return path.to_path_buf(),
        }
    }

    for component in missing.iter().rev() {
        let wanted = component.to_string_lossy().to_lowercase();
        let mut matched = None;
        if let Ok(entries) = std::fs::read_dir(&root) {
            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().to_lowercase() == wanted {
                    matched = Some(entry.file_name());
                    break;
                }
            }
        }
        root.push(matched.unwrap_or_else(|| component.clone()));
    }
    root
}

/// Resolve a game config file path, case insensitively.
pub fn config_full_path(session: &Session, cfile: &str, base: ConfigBase) -> Option<PathBuf> {
    let candidate = match base {
        ConfigBase::User => session
            .prefix()
            .join("drive_c/users/steamuser/My Documents")
            .join(cfile),
        ConfigBase::Game => session.game_install_path().join(cfile),
        ConfigBase::Absolute => PathBuf::from(cfile),
    };
    let resolved = case_insensitive_path(&candidate);

    if resolved.exists() {
        debug!("Found config file: {:?}", resolved);
        Some(resolved)
    } else {
        warn!("Config file not found: {:?}", resolved);
        None
    }
}

/// Create a one-time backup copy next to a config file.
pub fn create_backup_config(cfg_path: &Path) -> Result<()> {
    let bak = backup_path(cfg_path);
    if !bak.is_file() {
        info!("Creating backup for config file");
        std::fs::copy(cfg_path, &bak)?;
    }
    Ok(())
}

fn backup_path(cfg_path: &Path) -> PathBuf {
    PathBuf::from(format!("{}.protonfixes.bak", cfg_path.display()))
}

/// Merge INI options into a game config file.
pub fn set_ini_options(session: &Session, ini_opts: &str, cfile: &str, base: ConfigBase) -> bool {
    let Some(cfg_path) = config_full_path(session, cfile, base) else {
        return false;
    };
    if let Err(err) = create_backup_config(&cfg_path) {
        warn!("Could not back up {:?}: {}", cfg_path, err);
        return false;
    }

    let content = match std::fs::read_to_string(&cfg_path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Could not read {:?}: {}", cfg_path, err);
            return false;
        }
    };

    info!("Adding INI options into {}:\n{}", cfile, ini_opts);
    let mut doc = IniDoc::parse(&content);
    doc.merge(&IniDoc::parse(ini_opts));

    if let Err(err) = std::fs::write(&cfg_path, doc.render()) {
        warn!("Could not write {:?}: {}", cfg_path, err);
        return false;
    }
    true
}

/// Insert a line into an XML config file after every line carrying
/// `base_attribute`. Skips files that already contain the line.
pub fn set_xml_options(
    session: &Session,
    base_attribute: &str,
    xml_line: &str,
    cfile: &str,
    base: ConfigBase,
) -> bool {
    let Some(xml_path) = config_full_path(session, cfile, base) else {
        return false;
    };
    if let Err(err) = create_backup_config(&xml_path) {
        warn!("Could not back up {:?}: {}", xml_path, err);
        return false;
    }

    let content = match std::fs::read_to_string(&xml_path) {
        Ok(content) => content,
        Err(err) => {
            warn!("Could not read {:?}: {}", xml_path, err);
            return false;
        }
    };

    if content.lines().any(|line| line.trim() == xml_line.trim()) {
        debug!("XML config already patched: {:?}", xml_path);
        return true;
    }

    let mut out = Vec::new();
    for (i, line) in content.lines().enumerate() {
        out.push(line.to_string());
        if line.contains(base_attribute) {
            info!("Adding XML options into {}, line {}:\n{}", cfile, i + 1, xml_line);
            out.push(xml_line.to_string());
        }
    }

    if let Err(err) = std::fs::write(&xml_path, out.join("\n") + "\n") {
        warn!("Could not write {:?}: {}", xml_path, err);
        return false;
    }
    info!("XML config patch applied");
    true
}

/// Create a DOSBox configuration file. DOSBox accepts multiple -conf
/// files, each overriding the previous, so an existing file is left
/// untouched.
pub fn create_dosbox_conf(
    conf_file: &Path,
    sections: &[(&str, &[(&str, &str)])],
) -> Result<()> {
    if conf_file.exists() {
        return Ok(());
    }
    let mut doc = IniDoc::default();
    for (section, entries) in sections {
        for (key, value) in *entries {
            doc.set(section, key, Some(value));
        }
    }
    std::fs::write(conf_file, doc.render())?;
    Ok(())
}

/// Default path of the generated DXVK config file
const DXVK_CONF: &str = "/tmp/protonfixes_dxvk.conf";

/// Set an option in a generated DXVK config file.
///
/// The file is rebuilt once per launcher process (keyed by a `session`
/// entry holding the pid) and seeded from the game's own dxvk.conf.
pub fn set_dxvk_option(session: &mut Session, opt: &str, value: &str) {
    let game_conf = session.game_install_path().join("dxvk.conf");
    set_dxvk_option_in(
        session,
        opt,
        value,
        Path::new(DXVK_CONF),
        &game_conf,
        std::process::id(),
    );
}

fn set_dxvk_option_in(
    session: &mut Session,
    opt: &str,
    value: &str,
    cfile: &Path,
    game_conf: &Path,
    pid: u32,
) {
    let existing = std::fs::read_to_string(cfile).unwrap_or_default();
    let mut doc = IniDoc::parse(&existing);

    if doc.get("", "session") != Some(pid.to_string().as_str()) {
        info!("Creating new DXVK config");
        session.set_env("DXVK_CONFIG_FILE", &cfile.to_string_lossy());

        doc = IniDoc::default();
        doc.set("", "session", Some(&pid.to_string()));
        if let Ok(game_content) = std::fs::read_to_string(game_conf) {
            doc.merge(&IniDoc::parse(&game_content));
        }
    }

    info!("Adding DXVK option: {} = {}", opt, value);
    doc.set("", opt, Some(value));

    if let Err(err) = std::fs::write(cfile, doc.render()) {
        warn!("Could not write DXVK config {:?}: {}", cfile, err);
    }
}

#[derive(Serialize)]
struct UplayOverlay {
    enabled: bool,
    forceunhookgame: bool,
    fps_enabled: bool,
    warning_enabled: bool,
}

#[derive(Serialize)]
struct UplayUser {
    closebehavior: String,
}

#[derive(Serialize)]
struct UplaySettings {
    overlay: UplayOverlay,
    user: UplayUser,
}

/// Disables the UPlay in-game overlay, once per prefix.
///
/// Appends the overlay-off settings to the UPlay settings.yml; UPlay
/// rewrites the file on launch but keeps this setting.
pub fn disable_uplay_overlay(session: &Session) -> bool {
    let prefix = session.prefix().to_path_buf();
    let result = run_once(
        &prefix,
        "util.disable_uplay_overlay",
        OncePolicy::NoRetry,
        || {
            let config_dir = prefix.join(
                "drive_c/users/steamuser/Local Settings/Application Data/Ubisoft Game Launcher",
            );
            std::fs::create_dir_all(&config_dir)?;

            let settings = UplaySettings {
                overlay: UplayOverlay {
                    enabled: false,
                    forceunhookgame: false,
                    fps_enabled: false,
                    warning_enabled: false,
                },
                user: UplayUser {
                    closebehavior: "CloseBehavior_Close".to_string(),
                },
            };

            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(config_dir.join("settings.yml"))?;
            file.write_all(serde_yaml::to_string(&settings)?.as_bytes())?;
            info!("Disabled UPlay overlay");
            Ok(())
        },
    );

    match result {
        Ok(_) => true,
        Err(err) => {
            warn!("Could not disable UPlay overlay: {}", err);
            false
        }
    }
}
