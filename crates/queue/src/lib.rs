//! Alert queue: access to pending subjects and their NEW, READY, DONE lifecycle.
//!
//! This crate provides:
//! - `AlertStore` trait: candidate fetch, subject projections, status moves
//! - `MemoryAlertStore` for tests and dry runs
//! - `PgAlertStore` over PostgreSQL with advisory-locked intake

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::QueueError;
pub use memory::{Fixture, MemoryAlertStore};
pub use postgres::PgAlertStore;
pub use store::{check_transition, AlertStore, LockState, QueueRecord};
