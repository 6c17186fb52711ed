use std::sync::Arc;

use super::{CombinedPuller, PullerSettings, TracePuller, XRayServiceGraphPuller, XRayTracePuller};
use crate::output::{
    EventConsumer, MappedConsumer, ServiceGraphConsoleMapper, ServiceGraphJsonMapper,
    SharedWriter, TraceConsoleMapper, TraceEvent, TraceJsonMapper,
};
use crate::xray::{ServiceGraph, XRayApi};

/// Build the puller used by the `traces` command.
///
/// Traces and service graphs are pulled from the same client and written to
/// the same writer, as raw JSON when `unformatted` is set and as console text
/// otherwise.
pub fn generate_trace_puller<C: XRayApi + 'static>(
    client: Arc<C>,
    unformatted: bool,
    settings: &PullerSettings,
    writer: SharedWriter,
) -> CombinedPuller {
    let (trace_consumer, graph_consumer): (
        Arc<dyn EventConsumer<TraceEvent>>,
        Arc<dyn EventConsumer<ServiceGraph>>,
    ) = if unformatted {
        (
            Arc::new(MappedConsumer::<TraceEvent, _>::new(TraceJsonMapper, writer.clone())),
            Arc::new(MappedConsumer::<ServiceGraph, _>::new(ServiceGraphJsonMapper, writer)),
        )
    } else {
        (
            Arc::new(MappedConsumer::<TraceEvent, _>::new(TraceConsoleMapper, writer.clone())),
            Arc::new(MappedConsumer::<ServiceGraph, _>::new(ServiceGraphConsoleMapper, writer)),
        )
    };

    let trace_puller: Arc<dyn TracePuller> = Arc::new(XRayTracePuller::new(
        Arc::clone(&client),
        trace_consumer,
        settings,
    ));
    let graph_puller: Arc<dyn TracePuller> =
        Arc::new(XRayServiceGraphPuller::new(client, graph_consumer, settings));

    CombinedPuller::new(vec![trace_puller, graph_puller])
}
