use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use super::{PullError, TracePuller};

/// Fans each call out to several pullers.
///
/// `load_events` and `load_time_period` run the pullers one after another so
/// their output stays grouped. `tail` runs them concurrently.
pub struct CombinedPuller {
    pullers: Vec<Arc<dyn TracePuller>>,
}

impl CombinedPuller {
    pub fn new(pullers: Vec<Arc<dyn TracePuller>>) -> Self {
        Self { pullers }
    }
}

#[async_trait]
impl TracePuller for CombinedPuller {
    async fn load_events(&self, ids: &[String]) -> Result<(), PullError> {
        for puller in &self.pullers {
            puller.load_events(ids).await?;
        }
        Ok(())
    }

    async fn tail(&self, start: Option<DateTime<Utc>>) -> Result<(), PullError> {
        let mut tasks = JoinSet::new();
        for puller in &self.pullers {
            let puller = Arc::clone(puller);
            tasks.spawn(async move { puller.tail(start).await });
        }

        while let Some(joined) = tasks.join_next().await {
            let result = joined
                .map_err(|e| PullError::Task(e.to_string()))
                .and_then(|result| result);
            if let Err(e) = result {
                // One failing puller ends the whole tail.
                self.stop();
                tasks.abort_all();
                return Err(e);
            }
        }

        Ok(())
    }

    async fn load_time_period(
        &self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<(), PullError> {
        for puller in &self.pullers {
            puller.load_time_period(start, end).await?;
        }
        Ok(())
    }

    fn stop(&self) {
        for puller in &self.pullers {
            puller.stop();
        }
    }
}
