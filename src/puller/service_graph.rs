//! Service graph puller.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::Mutex;

use super::tail::Tailer;
use super::{PullError, PullerSettings, TracePuller};
use crate::output::EventConsumer;
use crate::xray::{ServiceGraph, XRayApi};

/// Pulls the service graph for a window and emits it when its content changed.
pub struct XRayServiceGraphPuller<C> {
    client: Arc<C>,
    consumer: Arc<dyn EventConsumer<ServiceGraph>>,
    default_window: TimeDelta,
    /// Content hashes of graphs already emitted.
    emitted: Mutex<HashSet<String>>,
    tailer: Tailer,
}

impl<C: XRayApi> XRayServiceGraphPuller<C> {
    pub fn new(
        client: Arc<C>,
        consumer: Arc<dyn EventConsumer<ServiceGraph>>,
        settings: &PullerSettings,
    ) -> Self {
        Self {
            client,
            consumer,
            default_window: settings.default_window,
            emitted: Mutex::new(HashSet::new()),
            tailer: Tailer::new(settings),
        }
    }
}

#[async_trait]
impl<C: XRayApi> TracePuller for XRayServiceGraphPuller<C> {
    async fn load_events(&self, _ids: &[String]) -> Result<(), PullError> {
        // X-Ray has no per-trace service graph lookup.
        tracing::debug!(target: "puller", "service graphs cannot be fetched by trace id, skipping");
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

        let graph = self.client.service_graph(start, end).await?;
        if graph.is_empty() {
            tracing::debug!(target: "puller", "no service graph between {start} and {end}");
            return Ok(());
        }

        match graph.end_time {
            Some(end_time) => self.tailer.record_event_time(end_time),
            None => self.tailer.mark_data(),
        }

        if self.emitted.lock().insert(graph.content_hash()) {
            self.consumer.consume(&graph)?;
        } else {
            tracing::debug!(target: "puller", "service graph unchanged since last poll");
        }

        Ok(())
    }

    fn stop(&self) {
        self.tailer.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{CollectingConsumer, ServiceGraphJsonMapper};
    use crate::puller::testing::FakeXRay;
    use crate::xray::ServiceNode;

    type Collector = CollectingConsumer<ServiceGraph, ServiceGraphJsonMapper>;

    fn graph(name: &str) -> ServiceGraph {
        ServiceGraph {
            start_time: DateTime::from_timestamp(1_700_000_000, 0),
            end_time: DateTime::from_timestamp(1_700_000_600, 0),
            services: vec![ServiceNode {
                reference_id: Some(0),
                name: Some(name.to_string()),
                root: true,
                ..Default::default()
            }],
        }
    }

    fn puller(fake: FakeXRay) -> (Arc<FakeXRay>, Arc<Collector>, XRayServiceGraphPuller<FakeXRay>) {
        let client = Arc::new(fake);
        let consumer = Arc::new(Collector::new(ServiceGraphJsonMapper));
        let puller = XRayServiceGraphPuller::new(
            Arc::clone(&client),
            consumer.clone(),
            &PullerSettings::default(),
        );
        (client, consumer, puller)
    }

    #[tokio::test]
    async fn test_unchanged_graph_emitted_once() {
        let fake = FakeXRay::default();
        fake.push_graph(Ok(graph("orders")));
        fake.push_graph(Ok(graph("orders")));
        fake.push_graph(Ok(graph("payments")));
        let (_client, consumer, puller) = puller(fake);

        for _ in 0..3 {
            puller.load_time_period(None, None).await.unwrap();
        }

        let lines = consumer.lines();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("orders"));
        assert!(lines[1].contains("payments"));
    }

    #[tokio::test]
    async fn test_empty_graph_is_skipped() {
        let (client, consumer, puller) = puller(FakeXRay::default());

        let end = DateTime::from_timestamp(1_700_000_600, 0).unwrap();
        puller.load_time_period(None, Some(end)).await.unwrap();

        assert!(consumer.lines().is_empty());
        assert_eq!(
            client.graph_calls.lock().clone(),
            vec![(end - TimeDelta::minutes(10), end)]
        );
    }

    #[tokio::test]
    async fn test_load_events_does_not_call_xray() {
        let (client, consumer, puller) = puller(FakeXRay::default());

        puller.load_events(&["1-a".to_string()]).await.unwrap();

        assert!(client.graph_calls.lock().is_empty());
        assert!(consumer.lines().is_empty());
    }
}
