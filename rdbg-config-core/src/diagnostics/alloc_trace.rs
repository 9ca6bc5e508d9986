use std::panic::Location;
use std::sync::atomic::{AtomicBool, Ordering};

static ALLOCATION_SITES_ENABLED: AtomicBool = AtomicBool::new(false);

/// Process-wide switch for recording where debuggee-visible objects were created.
pub trait AllocationTracer: Send + Sync {
    fn start(&self);
    fn stop(&self);
    fn is_active(&self) -> bool;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct AllocationSiteTracing;

impl AllocationTracer for AllocationSiteTracing {
    fn start(&self) {
        ALLOCATION_SITES_ENABLED.store(true, Ordering::SeqCst);
        tracing::info!("allocation site tracing started");
    }

    fn stop(&self) {
        ALLOCATION_SITES_ENABLED.store(false, Ordering::SeqCst);
        tracing::info!("allocation site tracing stopped");
    }

    fn is_active(&self) -> bool {
        ALLOCATION_SITES_ENABLED.load(Ordering::SeqCst)
    }
}

/// Caller location, recorded only while allocation site tracing is on.
#[track_caller]
pub fn record_site() -> Option<&'static Location<'static>> {
    if ALLOCATION_SITES_ENABLED.load(Ordering::Relaxed) {
        Some(Location::caller())
    } else {
        None
    }
}
