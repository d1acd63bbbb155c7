//! Protonfixes Library
//!
//! Core library for applying per-title compatibility fixes before Proton
//! launches a game. Provides the session context fixes mutate, the
//! winetricks installation wrapper, and the shared prefix/config helpers.

pub mod config_patch;
pub mod cpu;
pub mod cuda;
pub mod display;
pub mod download;
pub mod error;
pub mod fixes;
pub mod once;
pub mod proton;
pub mod session;
pub mod steam;
pub mod tricks;
pub mod wine;

pub use error::{ProtonfixesError, Result};
pub use once::{run_once, OncePolicy};
pub use proton::Proton;
pub use session::{DllOverride, Session};
pub use tricks::protontricks;
