//! Raw JSON rendering for `--unformatted`.

use super::{EventMapper, OutputError, TraceEvent};
use crate::xray::ServiceGraph;

/// One compact JSON object per trace, keyed like the `BatchGetTraces` response.
#[derive(Debug, Default, Clone, Copy)]
pub struct TraceJsonMapper;

impl EventMapper<TraceEvent> for TraceJsonMapper {
    fn map(&self, event: &TraceEvent) -> Result<String, OutputError> {
        Ok(serde_json::to_string(&event.trace)?)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ServiceGraphJsonMapper;

impl EventMapper<ServiceGraph> for ServiceGraphJsonMapper {
    fn map(&self, graph: &ServiceGraph) -> Result<String, OutputError> {
        Ok(serde_json::to_string(graph)?)
    }
}
