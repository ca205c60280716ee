pub mod conformance;
mod condition;
mod error;
mod memory;
mod record;
mod traits;

pub use condition::WriteCondition;
pub use error::StorageError;
pub use memory::MemoryStore;
pub use record::{ManifestRecord, ManifestStats, ManifestStatus, ParseStatusError};
pub use traits::ManifestStore;
