//! The `traces` command's dispatcher.
//!
//! [`do_traces`] sanitizes the time options, builds a client and a puller
//! through a [`TraceToolkit`], and picks one of three fetch modes:
//!
//! 1. explicit trace ids, when any are given
//! 2. tailing, when `--tail` is set
//! 3. a time range otherwise
//!
//! Ids win over `--tail` and over the time options. Everything else is the
//! collaborators' job; errors are passed through untouched.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::TracesResult;
use crate::output::{SharedWriter, stdout_writer};
use crate::puller::{CombinedPuller, PullerSettings, TracePuller, generate_trace_puller};
use crate::time::{TimeParseError, parse_time};
use crate::xray::{ClientOptions, SdkXRayClient, XRayError};

/// Inputs of one `traces` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TracesRequest {
    pub trace_ids: Vec<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub tail: bool,
    pub unformatted: bool,
    pub client: ClientOptions,
}

/// Start and end after parsing. `end` is always present.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Parse raw option values, defaulting the end to `now`.
    ///
    /// Start and end are not checked against each other.
    pub fn sanitize(
        start_time: Option<&str>,
        end_time: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Self, TimeParseError> {
        let start = parse_time(start_time, "start-time", now)?;
        let end = parse_time(end_time, "end-time", now)?.unwrap_or(now);
        Ok(Self { start, end })
    }
}

/// Which puller entry point to call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchMode {
    TraceIds(Vec<String>),
    Tail,
    TimeRange,
}

impl FetchMode {
    pub fn select(trace_ids: Vec<String>, tail: bool) -> Self {
        if !trace_ids.is_empty() {
            FetchMode::TraceIds(trace_ids)
        } else if tail {
            FetchMode::Tail
        } else {
            FetchMode::TimeRange
        }
    }
}

/// Collaborators of the dispatcher.
#[async_trait]
pub trait TraceToolkit: Send + Sync {
    type Client: Send;
    type Puller: TracePuller;

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn xray_client(&self, options: &ClientOptions) -> Result<Self::Client, XRayError>;

    fn trace_puller(&self, client: Self::Client, unformatted: bool) -> Self::Puller;
}

/// Run one `traces` invocation.
pub async fn do_traces<T: TraceToolkit>(toolkit: &T, request: TracesRequest) -> TracesResult<()> {
    let TracesRequest {
        trace_ids,
        start_time,
        end_time,
        tail,
        unformatted,
        client: client_options,
    } = request;

    let window = TimeWindow::sanitize(start_time.as_deref(), end_time.as_deref(), toolkit.now())?;

    let client = toolkit.xray_client(&client_options).await?;
    let puller = toolkit.trace_puller(client, unformatted);

    match FetchMode::select(trace_ids, tail) {
        FetchMode::TraceIds(ids) => {
            tracing::debug!(target: "traces", "fetching {} traces by id", ids.len());
            puller.load_events(&ids).await?;
        }
        FetchMode::Tail => {
            tracing::debug!(target: "traces", "tailing traces from {:?}", window.start);
            puller.tail(window.start).await?;
        }
        FetchMode::TimeRange => {
            tracing::debug!(
                target: "traces",
                "fetching traces between {:?} and {}",
                window.start,
                window.end
            );
            puller.load_time_period(window.start, Some(window.end)).await?;
        }
    }

    Ok(())
}

/// Production toolkit: AWS SDK client, combined puller, stdout.
pub struct AwsToolkit {
    settings: PullerSettings,
    writer: SharedWriter,
}

impl AwsToolkit {
    pub fn new(settings: PullerSettings) -> Self {
        Self {
            settings,
            writer: stdout_writer(),
        }
    }
}

#[async_trait]
impl TraceToolkit for AwsToolkit {
    type Client = SdkXRayClient;
    type Puller = CombinedPuller;

    async fn xray_client(&self, options: &ClientOptions) -> Result<SdkXRayClient, XRayError> {
        SdkXRayClient::connect(options).await
    }

    fn trace_puller(&self, client: SdkXRayClient, unformatted: bool) -> CombinedPuller {
        generate_trace_puller(
            Arc::new(client),
            unformatted,
            &self.settings,
            Arc::clone(&self.writer),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_fetch_mode_precedence() {
        let ids = vec!["1-a".to_string()];
        assert_eq!(FetchMode::select(ids.clone(), true), FetchMode::TraceIds(ids.clone()));
        assert_eq!(FetchMode::select(ids.clone(), false), FetchMode::TraceIds(ids));
        assert_eq!(FetchMode::select(Vec::new(), true), FetchMode::Tail);
        assert_eq!(FetchMode::select(Vec::new(), false), FetchMode::TimeRange);
    }

    #[test]
    fn test_window_defaults_end_to_now() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap();
        let window = TimeWindow::sanitize(Some("2023-01-01T00:00:00"), None, now).unwrap();
        assert_eq!(window.start, Some(Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap()));
        assert_eq!(window.end, now);
    }

    #[test]
    fn test_window_does_not_order_bounds() {
        let now = Utc::now();
        let window =
            TimeWindow::sanitize(Some("2024-02-01"), Some("2024-01-01"), now).unwrap();
        assert!(window.start.unwrap() > window.end);
    }

    #[test]
    fn test_window_reports_bad_end_time() {
        let err = TimeWindow::sanitize(None, Some("soonish"), Utc::now()).unwrap_err();
        assert_eq!(err.to_string(), "Unable to parse the time provided by 'end-time'");
    }
}
