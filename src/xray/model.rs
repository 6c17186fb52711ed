//! Domain model for X-Ray traces and service graphs.
//!
//! These types decouple the pullers and formatters from the SDK's generated
//! shapes. They serialize with the same PascalCase keys the X-Ray API uses, so
//! `--unformatted` output looks like the raw service response.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// A trace as returned by `BatchGetTraces`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TraceRecord {
    pub id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    #[serde(default)]
    pub limit_exceeded: bool,

    #[serde(default)]
    pub segments: Vec<SegmentRecord>,
}

/// A segment with its raw JSON document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SegmentRecord {
    pub id: String,
    pub document: String,
}

/// Parsed segment document. Only the fields needed for display are kept.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SegmentDocument {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    /// Epoch seconds.
    #[serde(default)]
    pub start_time: f64,

    /// Absent while the segment is still in progress.
    #[serde(default)]
    pub end_time: Option<f64>,

    #[serde(default)]
    pub http: Option<HttpInfo>,

    #[serde(default)]
    pub subsegments: Vec<SegmentDocument>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpInfo {
    #[serde(default)]
    pub response: Option<HttpResponseInfo>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HttpResponseInfo {
    #[serde(default)]
    pub status: Option<u16>,
}

impl SegmentDocument {
    /// Elapsed seconds, zero for in-progress segments.
    pub fn duration(&self) -> f64 {
        match self.end_time {
            Some(end) if end >= self.start_time => end - self.start_time,
            _ => 0.0,
        }
    }

    pub fn http_status(&self) -> Option<u16> {
        self.http.as_ref()?.response.as_ref()?.status
    }

    /// Latest end time across this segment and its subsegments.
    pub fn latest_end_time(&self) -> Option<f64> {
        self.subsegments
            .iter()
            .filter_map(SegmentDocument::latest_end_time)
            .chain(self.end_time)
            .reduce(f64::max)
    }
}

impl TraceRecord {
    /// Parse segment documents, sorted by start time.
    ///
    /// Malformed documents are logged and skipped.
    pub fn segment_documents(&self) -> Vec<SegmentDocument> {
        let mut documents: Vec<SegmentDocument> = self
            .segments
            .iter()
            .filter_map(|segment| match serde_json::from_str(&segment.document) {
                Ok(document) => Some(document),
                Err(e) => {
                    tracing::warn!(
                        target: "xray",
                        "skipping malformed segment {} in trace {}: {e}",
                        segment.id,
                        self.id
                    );
                    None
                }
            })
            .collect();
        documents.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));
        documents
    }
}

/// Service graph for a time window, as returned by `GetServiceGraph`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceGraph {
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub services: Vec<ServiceNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceNode {
    pub reference_id: Option<i32>,
    pub name: Option<String>,
    #[serde(default)]
    pub names: Vec<String>,
    #[serde(default)]
    pub root: bool,
    #[serde(rename = "Type")]
    pub service_type: Option<String>,
    /// Reference ids of downstream services.
    #[serde(default)]
    pub edge_ids: Vec<i32>,
    pub summary: Option<ServiceSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceSummary {
    pub total_count: i64,
    pub ok_count: i64,
    pub error_count: i64,
    pub fault_count: i64,
    pub throttle_count: i64,
    /// Sum of response times in seconds.
    pub total_response_time: f64,
}

impl ServiceSummary {
    pub fn average_response_time(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.total_response_time / self.total_count as f64
        }
    }
}

impl ServiceGraph {
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// SHA-256 over the services, ignoring the window bounds.
    ///
    /// Two polls that observe the same topology and counts hash equal.
    pub fn content_hash(&self) -> String {
        let bytes = serde_json::to_vec(&self.services).unwrap_or_default();
        format!("{:x}", Sha256::digest(&bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, document: &str) -> SegmentRecord {
        SegmentRecord {
            id: id.to_string(),
            document: document.to_string(),
        }
    }

    #[test]
    fn test_segment_documents_sorted_and_malformed_skipped() {
        let trace = TraceRecord {
            id: "1-abc".to_string(),
            duration: Some(0.5),
            limit_exceeded: false,
            segments: vec![
                segment("b", r#"{"id":"b","name":"second","start_time":20.0,"end_time":21.0}"#),
                segment("x", "not json"),
                segment("a", r#"{"id":"a","name":"first","start_time":10.0,"end_time":12.5}"#),
            ],
        };

        let docs = trace.segment_documents();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].name, "first");
        assert_eq!(docs[1].name, "second");
        assert!((docs[0].duration() - 2.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_nested_document_fields() {
        let doc: SegmentDocument = serde_json::from_str(
            r#"{
                "id": "s1",
                "name": "api",
                "start_time": 100.0,
                "end_time": 101.0,
                "http": {"response": {"status": 502}},
                "aws": {"ignored": true},
                "subsegments": [
                    {"id": "s2", "name": "dynamodb", "start_time": 100.2, "end_time": 103.0},
                    {"id": "s3", "name": "pending", "start_time": 100.5}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(doc.http_status(), Some(502));
        assert_eq!(doc.subsegments.len(), 2);
        assert_eq!(doc.subsegments[1].duration(), 0.0);
        assert_eq!(doc.latest_end_time(), Some(103.0));
    }

    #[test]
    fn test_trace_json_uses_api_keys() {
        let trace = TraceRecord {
            id: "1-abc".to_string(),
            duration: None,
            limit_exceeded: true,
            segments: vec![segment("a", "{}")],
        };
        let json = serde_json::to_value(&trace).unwrap();
        assert_eq!(json["Id"], "1-abc");
        assert_eq!(json["LimitExceeded"], true);
        assert_eq!(json["Segments"][0]["Document"], "{}");
        assert!(json.get("Duration").is_none());
    }

    #[test]
    fn test_content_hash_ignores_window() {
        let services = vec![ServiceNode {
            reference_id: Some(0),
            name: Some("orders".to_string()),
            root: true,
            ..Default::default()
        }];
        let first = ServiceGraph {
            start_time: DateTime::from_timestamp(0, 0),
            end_time: DateTime::from_timestamp(60, 0),
            services: services.clone(),
        };
        let second = ServiceGraph {
            start_time: DateTime::from_timestamp(60, 0),
            end_time: DateTime::from_timestamp(120, 0),
            services,
        };
        assert_eq!(first.content_hash(), second.content_hash());
        assert_ne!(first.content_hash(), ServiceGraph::default().content_hash());
    }

    #[test]
    fn test_average_response_time() {
        let summary = ServiceSummary {
            total_count: 4,
            total_response_time: 2.0,
            ..Default::default()
        };
        assert_eq!(summary.average_response_time(), 0.5);
        assert_eq!(ServiceSummary::default().average_response_time(), 0.0);
    }
}
