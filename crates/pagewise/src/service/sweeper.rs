use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::tracker::JobStore;

/// Periodically removes expired jobs. Stops on [`RetentionSweeper::stop`]
/// or when dropped.
pub struct RetentionSweeper {
    task: JoinHandle<()>,
}

impl RetentionSweeper {
    pub(crate) fn spawn(store: Arc<JobStore>, max_age: chrono::Duration, every: Duration) -> Self {
        let every = every.max(Duration::from_millis(1));
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let report = store.cleanup_older_than(max_age);
                log::debug!(
                    "Retention sweep removed {} jobs, {} remaining",
                    report.removed,
                    report.remaining
                );
            }
        });
        log::info!("Retention sweeper started (every {:?})", every);
        Self { task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    pub fn stop(self) {
        self.task.abort();
        log::info!("Retention sweeper stopped");
    }
}

impl Drop for RetentionSweeper {
    fn drop(&mut self) {
        self.task.abort();
    }
}
