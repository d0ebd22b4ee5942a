//! Thread placement helpers.

use core_affinity::CoreId;
use tracing::{info, warn};

/// Pin the current thread to a CPU core so the scheduler cannot migrate it
/// mid-session (migrations evict the cache and show up as latency spikes).
/// Best-effort: refusal is logged, never fatal.
pub fn pin_to_core(core: usize) {
    if core_affinity::set_for_current(CoreId { id: core }) {
        info!(core, "thread pinned");
    } else {
        warn!(core, "thread pinning unavailable on this host");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pin_to_core_never_panics() {
        // Core 0 exists everywhere; an absurd id must also be tolerated.
        pin_to_core(0);
        pin_to_core(10_000);
    }
}
