//! Pullers fetch X-Ray data and hand it to consumers.
//!
//! Three entry points, matching the `traces` command's modes:
//! - `load_events`: fetch specific trace ids
//! - `load_time_period`: fetch everything in a window
//! - `tail`: poll for new data until stopped or idle for `max_retries` polls
//!
//! [`generate_trace_puller`] assembles the combination the CLI uses: a trace
//! puller and a service-graph puller behind a single [`CombinedPuller`].

mod combined;
mod factory;
mod service_graph;
mod tail;
mod trace;

pub use combined::CombinedPuller;
pub use factory::generate_trace_puller;
pub use service_graph::XRayServiceGraphPuller;
pub use trace::XRayTracePuller;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use thiserror::Error;

use crate::config::PullerConfig;
use crate::output::OutputError;
use crate::xray::XRayError;

/// X-Ray's limit on trace ids per `BatchGetTraces` request.
pub const MAX_TRACE_IDS_PER_BATCH: usize = 5;

#[derive(Error, Debug)]
pub enum PullError {
    #[error(transparent)]
    XRay(#[from] XRayError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Puller task failed: {0}")]
    Task(String),
}

/// Common interface of all pullers.
///
/// Methods take `&self`; pullers keep their bookkeeping behind locks so a
/// running `tail` can be stopped from another task.
#[async_trait]
pub trait TracePuller: Send + Sync {
    /// Fetch exactly these trace ids.
    async fn load_events(&self, ids: &[String]) -> Result<(), PullError>;

    /// Poll for new data starting at `start` (now when `None`).
    async fn tail(&self, start: Option<DateTime<Utc>>) -> Result<(), PullError>;

    /// Fetch everything in `[start, end]`. Missing bounds fall back to
    /// now and a default look-back window.
    async fn load_time_period(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), PullError>;

    /// Ask a running `tail` to finish after its current poll.
    fn stop(&self);
}

/// Tuning for pullers.
#[derive(Debug, Clone, PartialEq)]
pub struct PullerSettings {
    /// Pause between polls while tailing.
    pub poll_interval: Duration,
    /// Consecutive polls without data before tailing gives up.
    pub max_retries: u32,
    /// Trace ids per `BatchGetTraces` call, capped at [`MAX_TRACE_IDS_PER_BATCH`].
    pub max_trace_ids: usize,
    /// Look-back used when no start time is given.
    pub default_window: TimeDelta,
}

impl Default for PullerSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            max_retries: 1000,
            max_trace_ids: MAX_TRACE_IDS_PER_BATCH,
            default_window: TimeDelta::minutes(10),
        }
    }
}

impl From<&PullerConfig> for PullerSettings {
    fn from(config: &PullerConfig) -> Self {
        Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_retries: config.max_retries,
            max_trace_ids: config.max_trace_ids.clamp(1, MAX_TRACE_IDS_PER_BATCH),
            default_window: TimeDelta::try_minutes(config.default_window_mins)
                .unwrap_or_else(|| TimeDelta::minutes(10)),
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory X-Ray double for puller tests.

    use std::collections::{HashMap, VecDeque};

    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;

    use crate::xray::{SegmentRecord, ServiceGraph, TraceRecord, XRayApi, XRayError};

    /// Scripted responses are consumed per call; once exhausted every call
    /// returns an empty result.
    #[derive(Default)]
    pub struct FakeXRay {
        pub summaries: Mutex<VecDeque<Result<Vec<String>, XRayError>>>,
        pub graphs: Mutex<VecDeque<Result<ServiceGraph, XRayError>>>,
        /// Per-call outcome of `batch_get_traces`: `Some` fails the call.
        pub batch_failures: Mutex<VecDeque<Option<XRayError>>>,
        pub traces: HashMap<String, TraceRecord>,
        pub summary_calls: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
        pub batch_calls: Mutex<Vec<Vec<String>>>,
        pub graph_calls: Mutex<Vec<(DateTime<Utc>, DateTime<Utc>)>>,
    }

    impl FakeXRay {
        pub fn with_traces(ids: &[&str]) -> Self {
            let traces = ids
                .iter()
                .enumerate()
                .map(|(i, id)| (id.to_string(), trace(id, 1_700_000_000.0 + i as f64)))
                .collect();
            Self {
                traces,
                ..Self::default()
            }
        }

        pub fn push_summaries(&self, result: Result<Vec<&str>, XRayError>) {
            self.summaries
                .lock()
                .push_back(result.map(|ids| ids.into_iter().map(str::to_string).collect()));
        }

        pub fn push_batch_outcome(&self, failure: Option<XRayError>) {
            self.batch_failures.lock().push_back(failure);
        }

        pub fn push_graph(&self, result: Result<ServiceGraph, XRayError>) {
            self.graphs.lock().push_back(result);
        }
    }

    /// A single-segment trace that ends one second after `start`.
    pub fn trace(id: &str, start: f64) -> TraceRecord {
        TraceRecord {
            id: id.to_string(),
            duration: Some(1.0),
            limit_exceeded: false,
            segments: vec![SegmentRecord {
                id: format!("{id}-root"),
                document: format!(
                    r#"{{"id":"{id}-root","name":"handler","start_time":{start},"end_time":{}}}"#,
                    start + 1.0
                ),
            }],
        }
    }

    #[async_trait]
    impl XRayApi for FakeXRay {
        async fn trace_summaries(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<Vec<String>, XRayError> {
            self.summary_calls.lock().push((start, end));
            self.summaries.lock().pop_front().unwrap_or(Ok(Vec::new()))
        }

        async fn batch_get_traces(&self, ids: &[String]) -> Result<Vec<TraceRecord>, XRayError> {
            self.batch_calls.lock().push(ids.to_vec());
            if let Some(Some(err)) = self.batch_failures.lock().pop_front() {
                return Err(err);
            }
            Ok(ids
                .iter()
                .filter_map(|id| self.traces.get(id).cloned())
                .collect())
        }

        async fn service_graph(
            &self,
            start: DateTime<Utc>,
            end: DateTime<Utc>,
        ) -> Result<ServiceGraph, XRayError> {
            self.graph_calls.lock().push((start, end));
            self.graphs
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(ServiceGraph::default()))
        }
    }
}
