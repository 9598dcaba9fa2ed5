//! Channel dispatch for classification alerts.
//!
//! This crate provides:
//! - `ChannelMap` grouping matched alerts by publish channel
//! - `Publisher` trait for pluggable downstream consumers
//! - Log and JSON-lines publisher implementations
//! - Minijinja rendering of HTML alert messages
//! - Dispatcher that routes records to per-channel publishers

pub mod channels;
pub mod dispatcher;
pub mod publishers;
pub mod templating;
pub mod traits;

pub use channels::{AlertRecord, ChannelEntry, ChannelMap};
pub use dispatcher::Dispatcher;
pub use publishers::{JsonLinesPublisher, LogPublisher};
pub use templating::{ElementsContext, MessageContext, MessageRenderer};
pub use traits::{DispatchResult, NotifyError, Publisher};
