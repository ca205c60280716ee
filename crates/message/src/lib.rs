//! pdr-message: Accessors over workflow execution messages.
//!
//! Pipeline executions emit one JSON message per state change. Only some of
//! them carry a PDR. This crate defines the [`ManifestEvent`] accessor
//! contract the status projector reads from, and [`WorkflowMessage`], the
//! serde model of the JSON envelope that implements it.
//!
//! Every accessor returns an explicit `Option`: "this message has no PDR"
//! and "this PDR has no name" stay distinguishable all the way up.

pub mod event;
pub mod execution;
pub mod workflow;

pub use event::{ExecutionCounts, ManifestEvent, ManifestPayload};
pub use execution::{execution_arn, execution_url_from_arn};
pub use workflow::{MessageError, WorkflowMessage};
