//! Polling loop shared by the pullers' `tail` implementations.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::{PullError, PullerSettings};

/// Added to the poll interval every time X-Ray throttles us.
const THROTTLE_BACKOFF: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct TailState {
    latest_event_time: DateTime<Utc>,
    had_data: bool,
    poll_interval: Duration,
    throttled: bool,
}

/// Cursor and cancellation flag for one puller's tail loop.
#[derive(Debug)]
pub(crate) struct Tailer {
    state: Mutex<TailState>,
    cancelled: AtomicBool,
    max_retries: u32,
}

impl Tailer {
    pub(crate) fn new(settings: &PullerSettings) -> Self {
        Self {
            state: Mutex::new(TailState {
                latest_event_time: Utc::now(),
                had_data: false,
                poll_interval: settings.poll_interval,
                throttled: false,
            }),
            cancelled: AtomicBool::new(false),
            max_retries: settings.max_retries,
        }
    }

    /// Note that data arrived, moving the cursor forward to `time` if it is newer.
    pub(crate) fn record_event_time(&self, time: DateTime<Utc>) {
        let mut state = self.state.lock();
        if time > state.latest_event_time {
            state.latest_event_time = time;
        }
        state.had_data = true;
    }

    /// Note that data arrived without a usable timestamp.
    pub(crate) fn mark_data(&self) {
        self.state.lock().had_data = true;
    }

    pub(crate) fn stop(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn poll_interval(&self) -> Duration {
        self.state.lock().poll_interval
    }

    /// Run `poll(from, now)` until stopped or `max_retries` polls in a row
    /// returned nothing.
    ///
    /// Throttling is absorbed by stretching the poll interval; other errors end the loop.
    pub(crate) async fn run<F, Fut>(
        &self,
        start: Option<DateTime<Utc>>,
        mut poll: F,
    ) -> Result<(), PullError>
    where
        F: FnMut(DateTime<Utc>, DateTime<Utc>) -> Fut,
        Fut: Future<Output = Result<(), PullError>>,
    {
        self.state.lock().latest_event_time = start.unwrap_or_else(Utc::now);

        let mut remaining = self.max_retries;
        while remaining > 0 && !self.is_stopped() {
            remaining -= 1;

            let from = self.state.lock().latest_event_time;
            tracing::debug!(target: "puller", "tailing from {from}");

            match poll(from, Utc::now()).await {
                Ok(()) => {}
                Err(PullError::XRay(e)) if e.is_throttled() => self.back_off(),
                Err(e) => return Err(e),
            }

            let interval = {
                let mut state = self.state.lock();
                if state.had_data {
                    remaining = self.max_retries;
                    state.latest_event_time += TimeDelta::seconds(1);
                    state.had_data = false;
                }
                state.poll_interval
            };

            tokio::time::sleep(interval).await;
        }

        tracing::debug!(target: "puller", "tail finished");
        Ok(())
    }

    fn back_off(&self) {
        let mut state = self.state.lock();
        if !state.throttled {
            tracing::warn!(
                target: "puller",
                "Throttled by AWS X-Ray, increasing the poll interval. Avoid running more than one tail at a time."
            );
            state.throttled = true;
        }
        state.poll_interval += THROTTLE_BACKOFF;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xray::XRayError;
    use std::sync::atomic::AtomicU32;

    fn settings(max_retries: u32) -> PullerSettings {
        PullerSettings {
            poll_interval: Duration::ZERO,
            max_retries,
            ..PullerSettings::default()
        }
    }

    #[tokio::test]
    async fn test_gives_up_after_max_idle_polls() {
        let tailer = Tailer::new(&settings(3));
        let calls = AtomicU32::new(0);

        tailer
            .run(None, |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_data_resets_retries_and_advances_cursor() {
        let tailer = Tailer::new(&settings(2));
        let start = DateTime::from_timestamp(1_000, 0).unwrap();
        let seen = Mutex::new(Vec::new());

        tailer
            .run(Some(start), |from, _| {
                let first = {
                    let mut seen = seen.lock();
                    seen.push(from);
                    seen.len() == 1
                };
                if first {
                    tailer.record_event_time(DateTime::from_timestamp(1_005, 0).unwrap());
                }
                async { Ok(()) }
            })
            .await
            .unwrap();

        let seen = seen.into_inner();
        // One poll with data, then two idle polls.
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], start);
        assert_eq!(seen[1], DateTime::from_timestamp(1_006, 0).unwrap());
        assert_eq!(seen[2], DateTime::from_timestamp(1_006, 0).unwrap());
    }

    #[tokio::test]
    async fn test_throttling_stretches_interval() {
        let tailer = Tailer::new(&settings(1));

        tailer
            .run(None, |_, _| async {
                Err(PullError::XRay(XRayError::Throttled {
                    operation: "GetTraceSummaries",
                }))
            })
            .await
            .unwrap();

        assert_eq!(tailer.poll_interval(), THROTTLE_BACKOFF);
    }

    #[tokio::test]
    async fn test_other_errors_end_the_loop() {
        let tailer = Tailer::new(&settings(5));
        let result = tailer
            .run(None, |_, _| async {
                Err(PullError::XRay(XRayError::Service {
                    operation: "GetTraceSummaries",
                    message: "AccessDenied".to_string(),
                }))
            })
            .await;

        assert!(matches!(result, Err(PullError::XRay(XRayError::Service { .. }))));
    }

    #[tokio::test]
    async fn test_stopped_tailer_does_not_poll() {
        let tailer = Tailer::new(&settings(5));
        tailer.stop();

        let calls = AtomicU32::new(0);
        tailer
            .run(None, |_, _| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok(()) }
            })
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
