//! Playback time reconciliation
//!
//! A background job periodically folds every participant's last reported
//! position into one `time-correction` broadcast. A reporting host is
//! authoritative; without one, the unweighted median of all reports is used.
//!
//! Host reports are trusted regardless of age. A host that stays connected
//! but stops reporting keeps pinning corrections to its last position.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::messages::{CorrectionSource, TimeCorrection};
use super::session::SessionCoordinator;

/// Largest whole second a correction carries: 2^53 - 1, the last integer a
/// JSON number holds exactly on the client
pub const MAX_CORRECTION_SECS: i64 = 9_007_199_254_740_991;

/// Floor to whole seconds, clamped to `±MAX_CORRECTION_SECS`
fn whole_seconds(time: f64) -> i64 {
    let bound = MAX_CORRECTION_SECS as f64;
    time.floor().clamp(-bound, bound) as i64
}

/// Derive the correction for one cycle
///
/// `reported` holds every known position in seconds, `host_time` the host's
/// own report when a host is elected and has reported. Returns `None` when
/// nobody has reported anything.
pub fn compute_correction(reported: &[f64], host_time: Option<f64>) -> Option<TimeCorrection> {
    if reported.is_empty() {
        return None;
    }

    if let Some(time) = host_time {
        return Some(TimeCorrection {
            time: whole_seconds(time),
            source: CorrectionSource::Host,
        });
    }

    let mut values = reported.to_vec();
    values.sort_by(f64::total_cmp);

    let mid = values.len() / 2;
    let median = if values.len() % 2 == 1 {
        values[mid]
    } else {
        (values[mid - 1] + values[mid]) / 2.0
    };

    Some(TimeCorrection {
        time: whole_seconds(median),
        source: CorrectionSource::Median,
    })
}

/// Spawn the reconciliation job
///
/// The first cycle runs one full `period` after spawning. The job runs until
/// `shutdown` is cancelled.
pub fn spawn_reconciler(
    coordinator: SessionCoordinator,
    period: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(period_ms = period.as_millis() as u64, "Reconciler started");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("Reconciler stopped");
                    break;
                }
                _ = ticker.tick() => {
                    match coordinator.reconcile() {
                        Some(correction) => tracing::debug!(
                            time = correction.time,
                            source = %correction.source,
                            "Broadcast time correction"
                        ),
                        None => tracing::trace!("No reported times, skipping cycle"),
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::odd(&[10.0, 20.0, 30.0], 20)]
    #[case::even(&[10.0, 20.0], 15)]
    #[case::unsorted(&[30.0, 10.0, 20.0], 20)]
    #[case::single(&[42.9], 42)]
    #[case::even_fractional(&[10.0, 11.0], 10)]
    #[case::odd_fractional(&[1.0, 7.8, 9.0], 7)]
    #[case::negative(&[-2.5], -3)]
    #[case::huge(&[1e300], MAX_CORRECTION_SECS)]
    #[case::huge_negative(&[-1e300, -1e300], -MAX_CORRECTION_SECS)]
    fn test_median(#[case] reported: &[f64], #[case] expected: i64) {
        assert_eq!(
            compute_correction(reported, None),
            Some(TimeCorrection {
                time: expected,
                source: CorrectionSource::Median
            })
        );
    }

    #[test]
    fn test_huge_host_time_is_clamped() {
        assert_eq!(
            compute_correction(&[1e300], Some(1e300)),
            Some(TimeCorrection {
                time: MAX_CORRECTION_SECS,
                source: CorrectionSource::Host
            })
        );
    }

    #[test]
    fn test_no_reports_no_correction() {
        assert_eq!(compute_correction(&[], None), None);
    }

    #[test]
    fn test_host_time_overrides_median() {
        assert_eq!(
            compute_correction(&[50.7, 10.0, 12.0], Some(50.7)),
            Some(TimeCorrection {
                time: 50,
                source: CorrectionSource::Host
            })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconciler_stops_on_cancel() {
        let coordinator = SessionCoordinator::new();
        let shutdown = CancellationToken::new();
        let handle = spawn_reconciler(coordinator, Duration::from_secs(5), shutdown.clone());

        tokio::time::sleep(Duration::from_secs(12)).await;
        shutdown.cancel();

        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconciler_broadcasts_each_period() {
        use crate::websocket::messages::{ClientMessage, ServerMessage};
        use tokio::sync::mpsc;

        let coordinator = SessionCoordinator::new();
        let (tx, mut rx) = mpsc::unbounded_channel();
        let joined = coordinator.join(tx);
        coordinator.handle_message(
            joined.connection_id,
            ClientMessage::TimeUpdate {
                time: serde_json::json!(33.3),
            },
        );
        // welcome
        rx.recv().await.unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_reconciler(coordinator, Duration::from_secs(5), shutdown.clone());

        let msg = rx.recv().await.unwrap();
        assert_eq!(
            msg,
            ServerMessage::TimeCorrection(TimeCorrection {
                time: 33,
                source: CorrectionSource::Median
            })
        );

        let msg = rx.recv().await.unwrap();
        assert!(matches!(msg, ServerMessage::TimeCorrection(_)));

        shutdown.cancel();
        handle.await.unwrap();
    }
}
