//! AWS X-Ray access.
//!
//! [`XRayApi`] is the seam between the pullers and the service. The production
//! implementation is [`SdkXRayClient`]; tests substitute in-memory fakes.

mod client;
mod error;
pub mod model;

pub use client::{ClientOptions, SdkXRayClient, default_app_name};
pub use error::XRayError;
pub use model::{SegmentDocument, SegmentRecord, ServiceGraph, ServiceNode, ServiceSummary, TraceRecord};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Read operations the pullers need from X-Ray.
#[async_trait]
pub trait XRayApi: Send + Sync {
    /// Ids of all traces in `[start, end]`, following pagination to the end.
    async fn trace_summaries(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<String>, XRayError>;

    /// Full traces for `ids`. X-Ray accepts at most five ids per call.
    async fn batch_get_traces(&self, ids: &[String]) -> Result<Vec<TraceRecord>, XRayError>;

    /// Service graph for `[start, end]`.
    async fn service_graph(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<ServiceGraph, XRayError>;
}
