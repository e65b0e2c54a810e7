//! Best-effort application of runtime limits to the current process.
//!
//! The memory limit maps onto the soft address-space limit (`RLIMIT_AS`).
//! Nothing here is fatal: a limit that cannot be applied is logged and
//! reported back to the caller.

use nix::libc::RLIM_INFINITY;
use nix::sys::resource::{getrlimit, setrlimit, Resource};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::domain::models::MemoryLimit;

/// What happened when a limit was applied
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LimitOutcome {
    /// Nothing to apply
    Unchanged,
    /// Soft limit set to `bytes`
    Applied { bytes: u64 },
    /// The OS refused; the process keeps its previous limit
    Failed { reason: String },
}

/// Apply `limit` as the soft address-space limit of this process.
///
/// Requests above the hard limit are clamped to it.
pub fn apply_memory_limit(limit: MemoryLimit) -> LimitOutcome {
    let MemoryLimit::Bytes(requested) = limit else {
        debug!("memory limit unlimited, leaving address-space limit untouched");
        return LimitOutcome::Unchanged;
    };

    let (_, hard) = match getrlimit(Resource::RLIMIT_AS) {
        Ok(limits) => limits,
        Err(err) => return failed(requested, format!("getrlimit failed: {err}")),
    };

    let bytes = if hard != RLIM_INFINITY && requested > hard {
        warn!(requested, hard, "memory limit exceeds hard limit, clamping");
        hard
    } else {
        requested
    };

    match setrlimit(Resource::RLIMIT_AS, bytes, hard) {
        Ok(()) => {
            info!(bytes, limit = %limit, "memory limit applied");
            LimitOutcome::Applied { bytes }
        }
        Err(err) => failed(requested, format!("setrlimit failed: {err}")),
    }
}

fn failed(requested: u64, reason: String) -> LimitOutcome {
    warn!(requested, %reason, "could not apply memory limit");
    LimitOutcome::Failed { reason }
}
