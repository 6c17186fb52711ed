//! Trace puller: summaries to ids, ids to full traces.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::tail::Tailer;
use super::{PullError, PullerSettings, TracePuller};
use crate::output::{EventConsumer, TraceEvent};
use crate::xray::XRayApi;

/// Bookkeeping for a trace id that reached the consumer.
#[derive(Debug, Clone, Copy)]
struct Delivery {
    revision: u32,
    event_time: DateTime<Utc>,
}

/// Pulls traces from X-Ray and forwards each one to a consumer.
pub struct XRayTracePuller<C> {
    client: Arc<C>,
    consumer: Arc<dyn EventConsumer<TraceEvent>>,
    max_trace_ids: usize,
    default_window: TimeDelta,
    /// Ids handed to the consumer. Time periods skip these; explicit fetches
    /// re-emit them with the next revision.
    delivered: Mutex<HashMap<String, Delivery>>,
    tailer: Tailer,
}

impl<C: XRayApi> XRayTracePuller<C> {
    pub fn new(
        client: Arc<C>,
        consumer: Arc<dyn EventConsumer<TraceEvent>>,
        settings: &PullerSettings,
    ) -> Self {
        Self {
            client,
            consumer,
            max_trace_ids: settings.max_trace_ids.max(1),
            default_window: settings.default_window,
            delivered: Mutex::new(HashMap::new()),
            tailer: Tailer::new(settings),
        }
    }

    /// Current tail poll interval, including any throttling backoff.
    pub fn poll_interval(&self) -> std::time::Duration {
        self.tailer.poll_interval()
    }

    fn next_revision(&self, id: &str) -> u32 {
        self.delivered
            .lock()
            .get(id)
            .map_or(0, |delivery| delivery.revision + 1)
    }

    fn record_delivery(&self, event: &TraceEvent) {
        let event_time = event.end_time.or(event.timestamp).unwrap_or_else(Utc::now);
        self.delivered.lock().insert(
            event.id().to_string(),
            Delivery {
                revision: event.revision,
                event_time,
            },
        );
    }

    /// Forget deliveries that ended before `horizon`.
    ///
    /// Summaries are selected by trace start time, so a trace that ended
    /// before the queried window cannot be returned again.
    fn prune_deliveries(&self, horizon: DateTime<Utc>) {
        let mut delivered = self.delivered.lock();
        let before = delivered.len();
        delivered.retain(|_, delivery| delivery.event_time >= horizon);
        let pruned = before - delivered.len();
        if pruned > 0 {
            tracing::debug!(target: "puller", "forgot {pruned} traces older than {horizon}");
        }
    }
}

#[async_trait]
impl<C: XRayApi> TracePuller for XRayTracePuller<C> {
    async fn load_events(&self, ids: &[String]) -> Result<(), PullError> {
        if ids.is_empty() {
            tracing::debug!(target: "puller", "no trace ids to fetch");
            return Ok(());
        }

        for chunk in ids.chunks(self.max_trace_ids) {
            let traces = self.client.batch_get_traces(chunk).await?;
            tracing::debug!(
                target: "puller",
                "BatchGetTraces returned {} of {} requested traces",
                traces.len(),
                chunk.len()
            );

            for trace in traces {
                let revision = self.next_revision(&trace.id);
                let event = TraceEvent::new(trace, revision);
                match event.end_time {
                    Some(end_time) => self.tailer.record_event_time(end_time),
                    None => self.tailer.mark_data(),
                }
                self.consumer.consume(&event)?;
                self.record_delivery(&event);
            }
        }

        Ok(())
    }

    async fn tail(&self, start: Option<DateTime<Utc>>) -> Result<(), PullError> {
        self.tailer
            .run(start, |from, to| self.load_time_period(Some(from), Some(to)))
            .await
    }

    async fn load_time_period(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), PullError> {
        let end = end.unwrap_or_else(Utc::now);
        let start = start.unwrap_or(end - self.default_window);

        self.prune_deliveries(start - self.default_window);

        let ids = self.client.trace_summaries(start, end).await?;
        let fresh: Vec<String> = {
            let delivered = self.delivered.lock();
            let mut unique = HashSet::new();
            ids.into_iter()
                .filter(|id| !delivered.contains_key(id) && unique.insert(id.clone()))
                .collect()
        };

        tracing::debug!(
            target: "puller",
            "{} new traces between {start} and {end}",
            fresh.len()
        );
        self.load_events(&fresh).await
    }

    fn stop(&self) {
        self.tailer.stop();
    }
}
