//! Human readable rendering of traces and service graphs.

use std::fmt::Write as _;

use chrono::{DateTime, SecondsFormat, Utc};

use super::{EventMapper, OutputError, TraceEvent};
use crate::xray::{SegmentDocument, ServiceGraph, ServiceNode};

/// Renders a trace header followed by its segment tree.
///
/// ```text
/// XRay Event [revision 0] at (2024-05-10T12:00:00.000Z) with id (1-abc) and duration (1.250s)
///  - 1.250s - api-gateway [HTTP: 200]
///    - 0.800s - orders-function
/// ```
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceConsoleMapper;

impl EventMapper<TraceEvent> for TraceConsoleMapper {
    fn map(&self, event: &TraceEvent) -> Result<String, OutputError> {
        let mut out = format!(
            "XRay Event [revision {}] at ({}) with id ({}) and duration ({:.3}s)",
            event.revision,
            format_time(event.timestamp),
            event.id(),
            event.duration()
        );
        format_segments(&mut out, &event.segments, 0);
        Ok(out)
    }
}

fn format_segments(out: &mut String, segments: &[SegmentDocument], level: usize) {
    for segment in segments {
        let _ = write!(
            out,
            "\n{} - {:.3}s - {}",
            "  ".repeat(level),
            segment.duration(),
            segment.name
        );
        if let Some(status) = segment.http_status() {
            let _ = write!(out, " [HTTP: {status}]");
        }
        format_segments(out, &segment.subsegments, level + 1);
    }
}

/// Renders a service graph with per-service request statistics.
#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceGraphConsoleMapper;

impl EventMapper<ServiceGraph> for ServiceGraphConsoleMapper {
    fn map(&self, graph: &ServiceGraph) -> Result<String, OutputError> {
        let mut out = String::from("\nNew XRay Service Graph");
        let _ = write!(out, "\n  Start time: {}", format_time(graph.start_time));
        let _ = write!(out, "\n  End time: {}", format_time(graph.end_time));
        for service in &graph.services {
            format_service(&mut out, service);
        }
        Ok(out)
    }
}

fn format_service(out: &mut String, service: &ServiceNode) {
    let reference = service
        .reference_id
        .map_or_else(|| "-".to_string(), |id| id.to_string());
    let root = if service.root { "(Root) " } else { "" };
    let edges = service
        .edge_ids
        .iter()
        .map(i32::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    let _ = write!(
        out,
        "\n  Reference Id: {reference} - {root}{} - {} - Edges: [{edges}]",
        service.service_type.as_deref().unwrap_or("-"),
        service.name.as_deref().unwrap_or("unknown"),
    );

    if let Some(summary) = &service.summary {
        out.push_str("\n    Summary_statistics:");
        let _ = write!(out, "\n      - total requests: {}", summary.total_count);
        let _ = write!(out, "\n      - ok count(2XX): {}", summary.ok_count);
        let _ = write!(out, "\n      - error count(4XX): {}", summary.error_count);
        let _ = write!(out, "\n      - fault count(5XX): {}", summary.fault_count);
        let _ = write!(out, "\n      - throttle count(429): {}", summary.throttle_count);
        let _ = write!(
            out,
            "\n      - average response time: {:.3}s",
            summary.average_response_time()
        );
    }
}

fn format_time(time: Option<DateTime<Utc>>) -> String {
    time.map_or_else(
        || "unknown".to_string(),
        |t| t.to_rfc3339_opts(SecondsFormat::Millis, true),
    )
}
