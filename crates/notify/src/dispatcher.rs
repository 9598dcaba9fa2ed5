//! Routes alert records to the publishers registered for their channel.
//!
//! Each channel may have its own publishers; channels without any fall back
//! to the default publishers. One publisher failing never blocks the others.

use std::collections::HashMap;

use chrono::Utc;

use crate::channels::{AlertRecord, ChannelMap};
use crate::traits::{DispatchResult, Publisher};

/// Dispatches alert records to publishers, organized per channel.
pub struct Dispatcher {
    /// Channel name → publishers for that channel.
    channel_publishers: HashMap<String, Vec<Box<dyn Publisher>>>,
    /// Fallback publishers used when no channel-specific ones exist.
    default_publishers: Vec<Box<dyn Publisher>>,
}

impl Dispatcher {
    /// Create an empty dispatcher.
    pub fn empty() -> Self {
        Self {
            channel_publishers: HashMap::new(),
            default_publishers: Vec::new(),
        }
    }

    /// Create a dispatcher whose publishers serve every channel.
    pub fn with_defaults(publishers: Vec<Box<dyn Publisher>>) -> Self {
        Self {
            channel_publishers: HashMap::new(),
            default_publishers: publishers,
        }
    }

    /// Replace the publishers for a specific channel.
    pub fn set_channel_publishers(&mut self, channel: String, publishers: Vec<Box<dyn Publisher>>) {
        self.channel_publishers.insert(channel, publishers);
    }

    fn publishers_for(&self, channel: &str) -> &[Box<dyn Publisher>] {
        self.channel_publishers
            .get(channel)
            .unwrap_or(&self.default_publishers)
    }

    /// Publish one record to every publisher of its channel.
    pub async fn dispatch_record(&self, record: &AlertRecord) -> Vec<DispatchResult> {
        let publishers = self.publishers_for(&record.channel);

        if publishers.is_empty() {
            tracing::debug!(channel = %record.channel, "No publishers configured");
            return Vec::new();
        }

        let mut results = Vec::with_capacity(publishers.len());

        for publisher in publishers {
            let start = std::time::Instant::now();
            let result = publisher.publish(record).await;
            let duration_ms = start.elapsed().as_millis() as u64;

            let (success, error) = match result {
                Ok(()) => {
                    tracing::debug!(
                        channel = %record.channel,
                        rule = %record.rule,
                        publisher = publisher.name(),
                        duration_ms,
                        "Alert published"
                    );
                    (true, None)
                }
                Err(e) => {
                    tracing::warn!(
                        channel = %record.channel,
                        rule = %record.rule,
                        publisher = publisher.name(),
                        error = %e,
                        duration_ms,
                        "Alert publish failed"
                    );
                    (false, Some(e.to_string()))
                }
            };

            results.push(DispatchResult {
                channel: record.channel.clone(),
                publisher: publisher.name().to_string(),
                rule: record.rule.clone(),
                subject_id: record.subject_id,
                success,
                error,
                duration_ms,
            });
        }

        results
    }

    /// Publish every alert in the map, channel by channel.
    pub async fn dispatch(&self, alerts: &ChannelMap) -> Vec<DispatchResult> {
        let mut results = Vec::new();
        for record in alerts.to_records(Utc::now()) {
            results.extend(self.dispatch_record(&record).await);
        }
        results
    }
}
