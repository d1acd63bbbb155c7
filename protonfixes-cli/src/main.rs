//! Protonfixes launcher shim
//!
//! Sits between Steam and Proton: applies the per-title fix for the
//! launched app id, then replaces itself with the real game command.

use anyhow::{bail, Context, Result};
use clap::Parser;
use protonfixes_lib::{fixes, Proton, Session};
use std::os::unix::process::CommandExt;
use std::process::Command;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "protonfixes")]
#[command(about = "Apply per-game Proton fixes, then launch the game")]
#[command(version)]
struct Cli {
    /// Steam app id to apply fixes for (detected from the Steam compat
    /// environment when omitted)
    #[arg(long)]
    appid: Option<String>,

    /// Echo all commands as they are executed
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Game command to exec after the fixes have run
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<String>,
}

/// App id from the flag or the Steam launch environment.
fn detect_appid(cli: &Cli) -> Option<String> {
    if let Some(appid) = &cli.appid {
        return Some(appid.clone());
    }
    std::env::var("STEAM_COMPAT_APP_ID")
        .or_else(|_| std::env::var("SteamAppId"))
        .ok()
        .filter(|id| !id.is_empty())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("protonfixes={log_level}"))
        .init();

    let Some(appid) = detect_appid(&cli) else {
        bail!("no app id given and none found in the environment");
    };
    info!("Running protonfixes for app id {}", appid);

    let proton = Proton::detect().context("failed to locate the Proton installation")?;
    debug!("Proton dir: {:?}, prefix: {:?}", proton.dir, proton.prefix);

    let mut session = Session::new(proton, cli.command);
    fixes::apply(&mut session, &appid);

    if session.args.is_empty() {
        info!("No game command given, exiting after fixes");
        return Ok(());
    }

    debug!("Launching: {:?}", session.args);
    let err = Command::new(&session.args[0])
        .args(&session.args[1..])
        .env_clear()
        .envs(session.env())
        .exec();

    // exec only returns on failure
    Err(err).with_context(|| format!("failed to exec {}", session.args[0]))
}
