//! AWS SDK backed implementation of [`XRayApi`].

use async_trait::async_trait;
use aws_config::{AppName, BehaviorVersion, Region, SdkConfig};
use aws_sdk_xray::primitives::DateTime as SdkDateTime;
use aws_sdk_xray::types::{Service, Trace, TimeRangeType};
use chrono::{DateTime, Utc};

use super::model::{SegmentRecord, ServiceGraph, ServiceNode, ServiceSummary, TraceRecord};
use super::{XRayApi, XRayError};

/// Options for building an X-Ray client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// AWS region; falls back to the SDK's provider chain when unset.
    pub region: Option<String>,
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
    /// User-agent application tag.
    pub app_name: String,
}

impl ClientOptions {
    pub fn new(region: Option<String>) -> Self {
        Self {
            region,
            ..Self::default()
        }
    }

    pub fn with_profile(mut self, profile: Option<String>) -> Self {
        self.profile = profile;
        self
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            region: None,
            profile: None,
            app_name: default_app_name(),
        }
    }
}

pub fn default_app_name() -> String {
    format!("xray-traces-{}", env!("CARGO_PKG_VERSION"))
}

/// X-Ray client over `aws_sdk_xray`.
#[derive(Debug, Clone)]
pub struct SdkXRayClient {
    client: aws_sdk_xray::Client,
}

impl SdkXRayClient {
    /// Resolve AWS configuration and build the client.
    ///
    /// Credentials are resolved lazily on the first request.
    pub async fn connect(options: &ClientOptions) -> Result<Self, XRayError> {
        let app_name = AppName::new(options.app_name.clone()).map_err(|e| {
            XRayError::Config(format!("invalid user agent '{}': {e}", options.app_name))
        })?;

        let mut loader = aws_config::defaults(BehaviorVersion::latest()).app_name(app_name);
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &options.profile {
            loader = loader.profile_name(profile);
        }

        let sdk_config = loader.load().await;
        tracing::debug!(
            target: "xray",
            "loaded AWS configuration (region: {:?})",
            sdk_config.region()
        );

        Ok(Self::from_sdk_config(&sdk_config))
    }

    pub fn from_sdk_config(config: &SdkConfig) -> Self {
        Self {
            client: aws_sdk_xray::Client::new(config),
        }
    }

    /// Region the client sends requests to.
    pub fn region(&self) -> Option<&str> {
        self.client.config().region().map(|region| region.as_ref())
    }
}

#[async_trait]
impl XRayApi for SdkXRayClient {
    async fn trace_summaries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, XRayError> {
        let mut ids = Vec::new();
        let mut next_token = None;

        loop {
            let page = self
                .client
                .get_trace_summaries()
                .start_time(to_sdk_time(start))
                .end_time(to_sdk_time(end))
                .time_range_type(TimeRangeType::TraceId)
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| XRayError::classify("GetTraceSummaries", e))?;

            ids.extend(
                page.trace_summaries()
                    .iter()
                    .filter_map(|summary| summary.id().map(str::to_string)),
            );

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        tracing::debug!(target: "xray", "GetTraceSummaries returned {} ids", ids.len());
        Ok(ids)
    }

    async fn batch_get_traces(&self, ids: &[String]) -> Result<Vec<TraceRecord>, XRayError> {
        let mut traces = Vec::new();
        let mut next_token = None;

        loop {
            let page = self
                .client
                .batch_get_traces()
                .set_trace_ids(Some(ids.to_vec()))
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| XRayError::classify("BatchGetTraces", e))?;

            traces.extend(page.traces().iter().map(TraceRecord::from));

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(traces)
    }

    async fn service_graph(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ServiceGraph, XRayError> {
        let mut graph = ServiceGraph::default();
        let mut next_token = None;

        loop {
            let page = self
                .client
                .get_service_graph()
                .start_time(to_sdk_time(start))
                .end_time(to_sdk_time(end))
                .set_next_token(next_token)
                .send()
                .await
                .map_err(|e| XRayError::classify("GetServiceGraph", e))?;

            if graph.start_time.is_none() {
                graph.start_time = page.start_time().and_then(from_sdk_time);
            }
            if let Some(end_time) = page.end_time().and_then(from_sdk_time) {
                graph.end_time = Some(end_time);
            }
            graph
                .services
                .extend(page.services().iter().map(ServiceNode::from));

            next_token = page.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }

        Ok(graph)
    }
}

fn to_sdk_time(time: DateTime<Utc>) -> SdkDateTime {
    SdkDateTime::from_millis(time.timestamp_millis())
}

fn from_sdk_time(time: &SdkDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(time.secs(), time.subsec_nanos())
}

impl From<&Trace> for TraceRecord {
    fn from(trace: &Trace) -> Self {
        Self {
            id: trace.id().unwrap_or_default().to_string(),
            duration: trace.duration(),
            limit_exceeded: trace.limit_exceeded().unwrap_or(false),
            segments: trace
                .segments()
                .iter()
                .map(|segment| SegmentRecord {
                    id: segment.id().unwrap_or_default().to_string(),
                    document: segment.document().unwrap_or_default().to_string(),
                })
                .collect(),
        }
    }
}

impl From<&Service> for ServiceNode {
    fn from(service: &Service) -> Self {
        let summary = service.summary_statistics().map(|stats| {
            let errors = stats.error_statistics();
            ServiceSummary {
                total_count: stats.total_count().unwrap_or(0),
                ok_count: stats.ok_count().unwrap_or(0),
                error_count: errors.and_then(|e| e.total_count()).unwrap_or(0),
                fault_count: stats
                    .fault_statistics()
                    .and_then(|f| f.total_count())
                    .unwrap_or(0),
                throttle_count: errors.and_then(|e| e.throttle_count()).unwrap_or(0),
                total_response_time: stats.total_response_time().unwrap_or(0.0),
            }
        });

        Self {
            reference_id: service.reference_id(),
            name: service.name().map(str::to_string),
            names: service.names().to_vec(),
            root: service.root().unwrap_or(false),
            service_type: service.r#type().map(str::to_string),
            edge_ids: service
                .edges()
                .iter()
                .filter_map(|edge| edge.reference_id())
                .collect(),
            summary,
        }
    }
}
