use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryCounters {
    current: AtomicI64,
    peak: AtomicI64,
}

/// Running total and high-water mark of bytes held by registers.
///
/// A tracker is a cheap handle; clones share the same counters. The default tracker is disabled
/// and every update is a no-op.
#[derive(Clone, Debug, Default)]
pub struct MemoryTracker {
    counters: Option<Arc<MemoryCounters>>,
}

impl MemoryTracker {
    /// A tracker which records changes.
    pub fn enabled() -> Self {
        Self {
            counters: Some(Arc::new(MemoryCounters::default())),
        }
    }

    /// A tracker which ignores changes.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether changes are recorded.
    pub fn is_enabled(&self) -> bool {
        self.counters.is_some()
    }

    /// Add `delta` bytes (negative to release) and return the new total.
    pub fn change(&self, delta: i64) -> i64 {
        match &self.counters {
            Some(counters) => {
                let current = counters.current.fetch_add(delta, Ordering::SeqCst) + delta;
                counters.peak.fetch_max(current, Ordering::SeqCst);
                current
            }
            None => 0,
        }
    }

    /// Bytes currently held.
    pub fn current(&self) -> i64 {
        self.counters
            .as_ref()
            .map(|c| c.current.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Largest total seen so far.
    pub fn peak(&self) -> i64 {
        self.counters
            .as_ref()
            .map(|c| c.peak.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Whether two handles share counters.
    pub fn same_as(&self, other: &Self) -> bool {
        match (&self.counters, &other.counters) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        }
    }
}
