//! pdr-core: PDR status tracking.
//!
//! Turns workflow messages into manifest records and commits them so that
//! delayed `running` reports never overwrite newer state.
//!
//! # Public API
//!
//! - [`Projector`] -- event to candidate record
//! - [`Reconciler`] -- conditional commit against a [`pdr_storage::ManifestStore`]
//! - [`build_success_ack`] / [`build_failure_ack`] -- PVL acknowledgment bodies
//! - [`RecordSchema`] -- JSON Schema check applied to every candidate

pub mod ack;
pub mod clock;
pub mod error;
pub mod projector;
pub mod reconciler;
pub mod schema;

pub use ack::{build_failure_ack, build_success_ack};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{MalformedRecordError, ReconcileError};
pub use projector::Projector;
pub use reconciler::{write_condition_for, EventOutcome, Reconciler, Reconciliation};
pub use schema::{RecordSchema, SchemaError};
