//! Session context shared by all fixes
//!
//! Replaces the ambient launcher globals with one explicitly passed
//! structure: the environment the game will be launched with (mirrored
//! into the process environment on every mutation), the launch argument
//! vector, and the compat-config flag set.

use crate::error::Result;
use crate::proton::Proton;
use regex::RegexBuilder;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Wine DLL load order override
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DllOverride {
    Native,
    Builtin,
    NativeThenBuiltin,
    BuiltinThenNative,
    Disabled,
}

impl DllOverride {
    pub fn as_str(&self) -> &'static str {
        match self {
            DllOverride::Native => "n",
            DllOverride::Builtin => "b",
            DllOverride::NativeThenBuiltin => "n,b",
            DllOverride::BuiltinThenNative => "b,n",
            DllOverride::Disabled => "",
        }
    }
}

/// Per-launch session state
#[derive(Debug, Clone)]
pub struct Session {
    /// Proton installation this launch runs under
    pub proton: Proton,

    /// Game launch command, argv style
    pub args: Vec<String>,

    env: HashMap<String, String>,
    compat_config: HashSet<String>,
}

impl Session {
    /// Create a session seeded from the current process environment.
    pub fn new(proton: Proton, args: Vec<String>) -> Self {
        Self {
            proton,
            args,
            env: std::env::vars().collect(),
            compat_config: HashSet::new(),
        }
    }

    /// Wine prefix for this launch
    pub fn prefix(&self) -> &Path {
        &self.proton.prefix
    }

    /// Session view of the environment
    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    pub fn get_env(&self, var: &str) -> Option<&str> {
        self.env.get(var).map(String::as_str)
    }

    /// Add or override an environment value, in the session copy and the
    /// process environment.
    pub fn set_env(&mut self, var: &str, value: &str) {
        info!("Adding env: {}={}", var, value);
        std::env::set_var(var, value);
        self.env.insert(var.to_string(), value.to_string());
    }

    /// Remove an environment variable from both views.
    pub fn del_env(&mut self, var: &str) {
        info!("Removing env: {}", var);
        std::env::remove_var(var);
        self.env.remove(var);
    }

    /// Append `value` to a separator-joined environment string.
    pub fn append_to_env_str(&mut self, var: &str, value: &str, sep: &str) {
        let joined = match self.env.get(var) {
            Some(existing) if !existing.is_empty() => format!("{existing}{sep}{value}"),
            _ => value.to_string(),
        };
        std::env::set_var(var, &joined);
        self.env.insert(var.to_string(), joined);
    }

    /// Add a WINE dll override
    pub fn winedll_override(&mut self, dll: &str, mode: DllOverride) {
        info!("Overriding {}.dll = {}", dll, mode.as_str());
        let setting = format!("{}={}", dll, mode.as_str());
        self.append_to_env_str("WINEDLLOVERRIDES", &setting, ";");
    }

    /// Append an argument to the launch command
    pub fn append_argument(&mut self, argument: &str) {
        info!("Adding argument {}", argument);
        self.args.push(argument.to_string());
        debug!("New commandline: {:?}", self.args);
    }

    /// Make a regex replacement across the launch command.
    ///
    /// Case insensitive by default; returns whether anything matched.
    pub fn replace_command(&mut self, orig: &str, repl: &str) -> Result<bool> {
        self.replace_command_with(orig, repl, true)
    }

    pub fn replace_command_with(
        &mut self,
        orig: &str,
        repl: &str,
        case_insensitive: bool,
    ) -> Result<bool> {
        let re = RegexBuilder::new(orig)
            .case_insensitive(case_insensitive)
            .build()?;

        let mut found = false;
        for arg in &mut self.args {
            let replaced = re.replace_all(arg, repl);
            if replaced != *arg {
                *arg = replaced.into_owned();
                found = true;
            }
        }

        if found {
            info!("Changed \"{}\" to \"{}\"", orig, repl);
        } else {
            warn!("Can not change \"{}\" to \"{}\", command not found", orig, repl);
        }
        Ok(found)
    }

    /// Rewrite the launcher verb so Proton waits for spawned children.
    pub fn wait_for_exit_and_run(&mut self) {
        let mut changed = false;
        for arg in &mut self.args {
            if !arg.contains("waitforexitandrun") {
                let rewritten = arg.replace("run", "waitforexitandrun");
                if rewritten != *arg {
                    *arg = rewritten;
                    changed = true;
                }
            }
        }
        if changed {
            debug!("New commandline: {:?}", self.args);
        }
    }

    /// Enable or disable the game drive compat option.
    pub fn set_game_drive(&mut self, enabled: bool) {
        if enabled {
            self.compat_config.insert("gamedrive".to_string());
        } else {
            self.compat_config.remove("gamedrive");
        }
    }

    pub fn has_compat_config(&self, option: &str) -> bool {
        self.compat_config.contains(option)
    }

    /// Game installation path for the launched title.
    pub fn game_install_path(&self) -> PathBuf {
        let install_path = self
            .get_env("STEAM_COMPAT_INSTALL_PATH")
            .or_else(|| self.get_env("PWD"))
            .unwrap_or(".");
        debug!("Detected path to game: {}", install_path);
        PathBuf::from(install_path)
    }

    /// Disable WINE nv* dlls
    pub fn disable_nvapi(&mut self) {
        info!("Disabling NvAPI");
        self.winedll_override("nvapi", DllOverride::Disabled);
        self.winedll_override("nvapi64", DllOverride::Disabled);
        self.winedll_override("nvcuda", DllOverride::Disabled);
        self.winedll_override("nvcuvid", DllOverride::Disabled);
        self.winedll_override("nvencodeapi", DllOverride::Disabled);
        self.winedll_override("nvencodeapi64", DllOverride::Disabled);
    }

    pub fn disable_esync(&mut self) {
        info!("Disabling Esync");
        self.set_env("WINEESYNC", "");
    }

    pub fn disable_fsync(&mut self) {
        info!("Disabling FSync");
        self.set_env("WINEFSYNC", "");
    }

    /// Disable the Proton media converter
    pub fn disable_media_converter(&mut self) {
        info!("Disabling Proton Media Converter");
        self.set_env("PROTON_AUDIO_CONVERT", "0");
        self.set_env("PROTON_AUDIO_CONVERT_BIN", "0");
        self.set_env("PROTON_VIDEO_CONVERT", "0");
        self.set_env("PROTON_DEMUX", "0");
    }
}
