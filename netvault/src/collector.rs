//! Result collector: the one piece of state shared by all workers.

use std::sync::{Mutex, MutexGuard};

use crate::driver::Outcome;

/// Append-only, thread-safe sink of [`Outcome`]s.
#[derive(Debug, Default)]
pub struct Collector {
    outcomes: Mutex<Vec<Outcome>>,
}

impl Collector {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Outcome>> {
        // A panicking task cannot leave a half-pushed Vec behind.
        self.outcomes.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record one outcome.
    pub fn record(&self, outcome: Outcome) {
        self.lock().push(outcome);
    }

    /// Every outcome, in recording order.
    pub fn outcomes(&self) -> Vec<Outcome> {
        self.lock().clone()
    }

    /// Successful outcomes, in recording order.
    pub fn successes(&self) -> Vec<Outcome> {
        self.lock().iter().filter(|o| o.is_success()).cloned().collect()
    }

    /// Failed outcomes, in recording order.
    pub fn failures(&self) -> Vec<Outcome> {
        self.lock().iter().filter(|o| !o.is_success()).cloned().collect()
    }

    /// Number of outcomes recorded for `device`.
    pub fn recorded_for(&self, device: &str) -> usize {
        self.lock().iter().filter(|o| o.device == device).count()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_partitions() {
        let collector = Collector::new();
        collector.record(Outcome::success("sw1", "running-config"));
        collector.record(Outcome::failure("sw2", "running-config", "Transfer failed"));
        collector.record(Outcome::success("sw1", "startup-config"));

        assert_eq!(collector.len(), 3);
        assert_eq!(collector.successes().len(), 2);
        assert_eq!(collector.failures()[0].device, "sw2");
        assert_eq!(collector.recorded_for("sw1"), 2);
        assert_eq!(collector.recorded_for("fw1"), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_record() {
        let collector = Arc::new(Collector::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let collector = collector.clone();
                tokio::spawn(async move {
                    for action in ["running-config", "startup-config"] {
                        collector.record(Outcome::success(format!("sw{i}"), action));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(collector.len(), 32);
        assert!((0..16).all(|i| collector.recorded_for(&format!("sw{i}")) == 2));
    }
}
