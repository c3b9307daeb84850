use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts page runs currently in flight and remembers the highest count seen.
#[derive(Debug, Default)]
pub struct ActiveRunGauge {
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ActiveRunGauge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a run as started. The run ends when the guard is dropped.
    pub fn enter(&self) -> ActiveRunGuard<'_> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        ActiveRunGuard { gauge: self }
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous runs since creation or the last reset.
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub fn reset_peak(&self) {
        self.peak.store(self.active(), Ordering::SeqCst);
    }
}

pub struct ActiveRunGuard<'a> {
    gauge: &'a ActiveRunGauge,
}

impl Drop for ActiveRunGuard<'_> {
    fn drop(&mut self) {
        self.gauge.active.fetch_sub(1, Ordering::SeqCst);
    }
}
