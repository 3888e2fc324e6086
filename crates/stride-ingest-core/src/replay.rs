use std::time::Duration;

use crate::{IngestError, LocationEvent, LocationSample, LocationSource, LocationTx};

/// Replays a recorded list of events, one every `spacing`.
#[derive(Debug, Clone)]
pub struct ReplaySource {
    events: Vec<LocationEvent>,
    spacing: Duration,
}

impl ReplaySource {
    pub fn new(events: Vec<LocationEvent>, spacing: Duration) -> Self {
        Self { events, spacing }
    }

    pub fn from_samples(samples: Vec<LocationSample>, spacing: Duration) -> Self {
        Self::new(samples.into_iter().map(LocationEvent::Fix).collect(), spacing)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait::async_trait]
impl LocationSource for ReplaySource {
    async fn run(&self, tx: LocationTx) -> Result<(), IngestError> {
        for ev in &self.events {
            tokio::time::sleep(self.spacing).await;
            if tx.send(ev.clone()).is_err() {
                log::debug!("replay receiver dropped, stopping");
                break;
            }
        }
        Ok(())
    }
}
