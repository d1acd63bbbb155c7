//! Run-once-per-prefix idempotency guard
//!
//! Tracks completion with a marker file per operation id under
//! `<prefix>/drive_c/protonfixes/run/`. The marker is removed only by an
//! external prefix reset.

use crate::error::Result;
use crate::proton::Proton;
use std::fs::File;
use std::path::Path;
use tracing::{debug, warn};

/// Failure policy for [`run_once`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OncePolicy {
    /// A failed run still writes the marker: the operation counts as
    /// attempted and is not retried on the next launch.
    #[default]
    NoRetry,
    /// A failed run leaves no marker, so the next launch retries until
    /// the operation succeeds.
    Retry,
}

/// Run `op` at most once per prefix, keyed by a stable operation id.
///
/// Ids must be namespaced (`module.function` style) so operations from
/// different fixes sharing a short name cannot collide. Returns whether
/// the operation actually ran this time; errors from `op` propagate to
/// the caller verbatim.
pub fn run_once<F>(prefix: &Path, id: &str, policy: OncePolicy, op: F) -> Result<bool>
where
    F: FnOnce() -> Result<()>,
{
    let dir = Proton::run_marker_dir(prefix);
    std::fs::create_dir_all(&dir)?;

    let marker = dir.join(id);
    if marker.exists() {
        debug!("Skipping {}, already ran in this prefix", id);
        return Ok(false);
    }

    match op() {
        Ok(()) => {
            File::create(&marker)?;
            Ok(true)
        }
        Err(err) => {
            if policy == OncePolicy::NoRetry {
                // Record the attempt anyway so the failure is not replayed
                // on every launch.
                if let Err(marker_err) = File::create(&marker) {
                    warn!("Could not write run marker {:?}: {}", marker, marker_err);
                }
            }
            Err(err)
        }
    }
}
