//! One parallel execution of every registered probe.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::probe::{Probe, ProbeOutcome, ProbeStatus};

/// Runs all probes concurrently and waits for every one of them.
///
/// Each probe gets its own tokio task. A probe that errors or panics is
/// turned into a failed status; siblings keep running and the round
/// always returns exactly one status per probe, in registration order.
///
/// Dropping the future returned by [`ParallelRound::run`] aborts every probe
/// task that is still running.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelRound;

impl ParallelRound {
    pub async fn run(probes: &[Arc<dyn Probe>]) -> Vec<ProbeStatus> {
        let handles: Vec<_> = probes
            .iter()
            .map(|probe| {
                let probe = Arc::clone(probe);
                AbortOnDrop(tokio::spawn(async move { probe.run().await }))
            })
            .collect();

        let mut statuses = Vec::with_capacity(probes.len());
        for (probe, mut handle) in probes.iter().zip(handles) {
            let outcome = match (&mut handle.0).await {
                Ok(result) => ProbeOutcome::from_result(result),
                Err(e) => {
                    warn!(probe = probe.name(), error = %e, "probe task did not complete");
                    ProbeOutcome::Failed {
                        detail: if e.is_panic() {
                            "probe panicked".to_string()
                        } else {
                            format!("probe task failed: {e}")
                        },
                    }
                }
            };
            debug!(
                probe = probe.name(),
                succeeded = matches!(outcome, ProbeOutcome::Succeeded { .. }),
                "probe finished"
            );
            statuses.push(ProbeStatus {
                name: probe.name().to_string(),
                outcome,
            });
        }
        statuses
    }
}

/// Aborts the wrapped task when dropped; a no-op once it has completed.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::probe::FnProbe;

    fn ok(name: &str) -> Arc<dyn Probe> {
        let detail = format!("{name} ok");
        Arc::new(FnProbe::new(name, move || {
            let detail = detail.clone();
            async move { Ok(detail) }
        }))
    }

    #[tokio::test]
    async fn empty_round_returns_no_statuses() {
        assert!(ParallelRound::run(&[]).await.is_empty());
    }

    #[tokio::test]
    async fn failing_probe_is_isolated() {
        let probes = vec![
            ok("a"),
            Arc::new(FnProbe::new("b", || async {
                Err::<String, _>(anyhow::anyhow!("boom"))
            })) as Arc<dyn Probe>,
            ok("c"),
        ];

        let statuses = ParallelRound::run(&probes).await;
        assert_eq!(statuses.len(), 3);
        assert_eq!(statuses[0], ProbeStatus::succeeded("a", "a ok"));
        assert_eq!(statuses[1], ProbeStatus::failed("b", "boom"));
        assert_eq!(statuses[2], ProbeStatus::succeeded("c", "c ok"));
    }

    #[tokio::test]
    async fn panicking_probe_becomes_failed_status() {
        let probes = vec![
            Arc::new(FnProbe::new("explodes", || async {
                if true {
                    panic!("probe bug");
                }
                Ok::<_, anyhow::Error>(String::new())
            })) as Arc<dyn Probe>,
            ok("fine"),
        ];

        let statuses = ParallelRound::run(&probes).await;
        assert_eq!(statuses.len(), 2);
        assert!(!statuses[0].is_success());
        assert_eq!(statuses[0].detail(), "probe panicked");
        assert!(statuses[1].is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_round_aborts_running_probes() {
        let finished = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&finished);
        let probes = vec![Arc::new(FnProbe::new("slow", move || {
            let counter = Arc::clone(&counter);
            async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                counter.fetch_add(1, Ordering::SeqCst);
                Ok("done".to_string())
            }
        })) as Arc<dyn Probe>];

        let interrupted =
            tokio::time::timeout(Duration::from_secs(1), ParallelRound::run(&probes)).await;
        assert!(interrupted.is_err());

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }
}
