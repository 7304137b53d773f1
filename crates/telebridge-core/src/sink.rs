//! Message sink collaborator and the fact publisher built on it

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::models::Fact;

/// Publish/subscribe transport the gateway writes to.
///
/// Delivery guarantees are the implementation's concern.
#[async_trait]
pub trait MessageSink: Send + Sync {
    /// Publish `payload` on the absolute `topic`
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retained: bool,
        qos: u8,
    ) -> Result<(), SinkError>;
}

/// Publishes facts of one vehicle under its topic prefix
#[derive(Clone)]
pub struct FactPublisher {
    sink: Arc<dyn MessageSink>,
    prefix: String,
}

impl FactPublisher {
    pub fn new(sink: Arc<dyn MessageSink>, prefix: impl Into<String>) -> Self {
        Self {
            sink,
            prefix: prefix.into(),
        }
    }

    /// Vehicle topic prefix
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Absolute topic for a vehicle-relative one
    pub fn topic(&self, relative: &str) -> String {
        format!("{}/{}", self.prefix, relative)
    }

    pub async fn publish(&self, fact: &Fact) -> Result<(), SinkError> {
        let topic = self.topic(&fact.topic);
        tracing::trace!(topic = %topic, payload = %fact.payload, "Publishing fact");
        self.sink
            .publish(
                &topic,
                fact.payload.clone().into_bytes(),
                fact.retained,
                fact.qos,
            )
            .await
    }

    /// Publish a batch in order, stopping at the first failure
    pub async fn publish_all(&self, facts: &[Fact]) -> Result<(), SinkError> {
        for fact in facts {
            self.publish(fact).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingSink;

    #[tokio::test]
    async fn test_publish_all_prefixes_topics() {
        let sink = Arc::new(RecordingSink::new());
        let publisher = FactPublisher::new(sink.clone(), "acct/vehicles/VIN1");

        publisher
            .publish_all(&[
                Fact::new("doors/locked", true),
                Fact::ack("doors/locked/result", "Success"),
            ])
            .await
            .unwrap();

        let published = sink.published();
        assert_eq!(published.len(), 2);
        assert_eq!(published[0].topic, "acct/vehicles/VIN1/doors/locked");
        assert!(published[0].retained);
        assert_eq!(published[1].payload_str(), "Success");
        assert!(!published[1].retained);
    }

    #[tokio::test]
    async fn test_publish_all_stops_on_closed_sink() {
        let sink = Arc::new(RecordingSink::new());
        sink.close();
        let publisher = FactPublisher::new(sink.clone(), "p");

        let result = publisher.publish_all(&[Fact::new("a", 1)]).await;
        assert_eq!(result, Err(SinkError::Closed));
        assert!(sink.published().is_empty());
    }
}
