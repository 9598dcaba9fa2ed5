//! Grouping of matched alerts by publish channel.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use mops_core::{AlertCandidate, SubjectKind};

/// One matched candidate together with the rule that matched it.
#[derive(Debug, Clone)]
pub struct ChannelEntry {
    pub rule: String,
    pub candidate: AlertCandidate,
}

/// Alert record handed to publishers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub channel: String,
    pub rule: String,
    pub subject_id: i64,
    pub subject_kind: SubjectKind,
    pub dbname: String,
    pub subject: String,
    /// HTML fragment.
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Channel name to matched alerts, in first-seen channel order.
///
/// A candidate appears once per matching rule, so it may sit under several
/// channels or several times under one.
#[derive(Debug, Clone, Default)]
pub struct ChannelMap {
    channels: IndexMap<String, Vec<ChannelEntry>>,
}

impl ChannelMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a matched candidate under `channel`. The candidate is tagged with
    /// the channel it was filed under.
    pub fn push(&mut self, channel: &str, rule: &str, mut candidate: AlertCandidate) {
        candidate.channel = Some(channel.to_string());
        self.channels
            .entry(channel.to_string())
            .or_default()
            .push(ChannelEntry {
                rule: rule.to_string(),
                candidate,
            });
    }

    /// Entries filed under `channel`.
    pub fn get(&self, channel: &str) -> &[ChannelEntry] {
        self.channels.get(channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Channel names in first-seen order.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ChannelEntry])> {
        self.channels
            .iter()
            .map(|(name, entries)| (name.as_str(), entries.as_slice()))
    }

    /// Total number of alerts across all channels.
    pub fn len(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Alert count per channel.
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.channels
            .iter()
            .map(|(name, entries)| (name.clone(), entries.len()))
            .collect()
    }

    /// Flatten into publishable records stamped with `timestamp`.
    ///
    /// Entries lacking a message or subject line are skipped; the evaluator
    /// never files such entries.
    pub fn to_records(&self, timestamp: DateTime<Utc>) -> Vec<AlertRecord> {
        self.iter()
            .flat_map(|(channel, entries)| {
                entries.iter().filter_map(move |entry| {
                    let c = &entry.candidate;
                    Some(AlertRecord {
                        channel: channel.to_string(),
                        rule: entry.rule.clone(),
                        subject_id: c.id(),
                        subject_kind: c.kind(),
                        dbname: c.dbname.clone(),
                        subject: c.subject_line.clone()?,
                        message: c.message.clone()?,
                        timestamp,
                    })
                })
            })
            .collect()
    }
}
