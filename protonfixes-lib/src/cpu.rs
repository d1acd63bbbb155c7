//! CPU topology helpers
//!
//! Some titles misbehave on high core counts or with SMT enabled; these
//! helpers pin WINE_CPU_TOPOLOGY accordingly. A topology set by the user
//! is respected unless explicitly overridden.

use crate::session::Session;
use tracing::{info, warn};

const SMT_ACTIVE: &str = "/sys/devices/system/cpu/smt/active";

/// Returns whether SMT is enabled; a failed probe counts as disabled.
pub fn is_smt_enabled() -> bool {
    match std::fs::read_to_string(SMT_ACTIVE) {
        Ok(content) => content.trim() == "1",
        Err(err) => {
            warn!("SMT status not readable: {}", err);
            false
        }
    }
}

/// Logical cpu core count as provided by the OS, 0 when unavailable.
pub fn cpu_count() -> usize {
    match std::thread::available_parallelism() {
        Ok(count) => count.get(),
        Err(_) => {
            warn!("Can not read count of logical cpu cores");
            0
        }
    }
}

/// Pin the cpu topology to a fixed core count.
///
/// A user-provided WINE_CPU_TOPOLOGY wins unless `ignore_user_setting`.
pub fn set_cpu_topology(session: &mut Session, core_count: usize, ignore_user_setting: bool) -> bool {
    if let Some(user_topo) = session.get_env("WINE_CPU_TOPOLOGY") {
        if !user_topo.is_empty() && !ignore_user_setting {
            info!("Using WINE_CPU_TOPOLOGY set by the user: {}", user_topo);
            return false;
        }
    }

    if core_count == 0 {
        warn!("Only positive core counts can be used to set cpu topology");
        return false;
    }

    // Format (example, 4 cores): 4:0,1,2,3
    let cores: Vec<String> = (0..core_count).map(|n| n.to_string()).collect();
    let topology = format!("{}:{}", core_count, cores.join(","));
    session.set_env("WINE_CPU_TOPOLOGY", &topology);
    info!("Using WINE_CPU_TOPOLOGY: {}", topology);
    true
}

/// Pin the cpu topology to the count of physical cores.
///
/// With SMT off this is a no-op. A positive `core_limit` additionally
/// caps the resulting count.
pub fn set_cpu_topology_nosmt(
    session: &mut Session,
    core_limit: usize,
    ignore_user_setting: bool,
    threads_per_core: usize,
) -> bool {
    if !is_smt_enabled() {
        info!("SMT is not active, skipping fix");
        return false;
    }

    let mut cores = cpu_count() / threads_per_core.max(1);
    if core_limit > 0 {
        cores = cores.min(core_limit);
    }
    set_cpu_topology(session, cores, ignore_user_setting)
}

/// Pin the cpu topology to a limited number of logical cores.
///
/// A limit at or above the available core count is ignored.
pub fn set_cpu_topology_limit(
    session: &mut Session,
    core_limit: usize,
    ignore_user_setting: bool,
) -> bool {
    let cores = cpu_count();
    if core_limit >= cores {
        info!(
            "The count of logical cores ({}) is lower than or equal to the set limit ({}), skipping fix",
            cores, core_limit
        );
        return false;
    }
    set_cpu_topology(session, core_limit, ignore_user_setting)
}
