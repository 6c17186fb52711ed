use chrono::{DateTime, Utc};

use crate::xray::{SegmentDocument, TraceRecord};

/// A trace ready for display.
#[derive(Debug, Clone, PartialEq)]
pub struct TraceEvent {
    pub trace: TraceRecord,
    /// Top-level segments sorted by start time.
    pub segments: Vec<SegmentDocument>,
    /// Earliest segment start.
    pub timestamp: Option<DateTime<Utc>>,
    /// Latest end time across all segments and subsegments.
    pub end_time: Option<DateTime<Utc>>,
    /// How many times this trace id was delivered before, by the same puller.
    pub revision: u32,
}

impl TraceEvent {
    pub fn new(trace: TraceRecord, revision: u32) -> Self {
        let segments = trace.segment_documents();
        let timestamp = segments
            .iter()
            .map(|segment| segment.start_time)
            .reduce(f64::min)
            .and_then(epoch_to_utc);
        let end_time = segments
            .iter()
            .filter_map(SegmentDocument::latest_end_time)
            .reduce(f64::max)
            .and_then(epoch_to_utc);

        Self {
            trace,
            segments,
            timestamp,
            end_time,
            revision,
        }
    }

    pub fn id(&self) -> &str {
        &self.trace.id
    }

    /// Duration reported by X-Ray, else the span covered by the segments.
    pub fn duration(&self) -> f64 {
        if let Some(duration) = self.trace.duration {
            return duration;
        }
        match (self.timestamp, self.end_time) {
            (Some(start), Some(end)) if end > start => {
                (end - start).num_microseconds().unwrap_or(0) as f64 / 1_000_000.0
            }
            _ => 0.0,
        }
    }
}

fn epoch_to_utc(secs: f64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_micros((secs * 1_000_000.0).round() as i64)
}
