use serde::{Deserialize, Serialize};

use crate::record::ManifestRecord;

/// Predicate a store evaluates against the currently stored record, atomically
/// with the write it guards.
///
/// The vocabulary is closed so backends can translate each variant into a
/// native conditional expression instead of running arbitrary closures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WriteCondition {
    /// Write regardless of what is stored.
    Always,
    /// Write when nothing is stored, the stored record came from a different
    /// execution, or the stored progress is strictly lower.
    NewExecutionOrProgress {
        execution_ref: String,
        percent_complete: f64,
    },
}

impl WriteCondition {
    /// Evaluate the condition against the stored record, `None` if absent.
    pub fn holds(&self, current: Option<&ManifestRecord>) -> bool {
        match (self, current) {
            (WriteCondition::Always, _) => true,
            (WriteCondition::NewExecutionOrProgress { .. }, None) => true,
            (
                WriteCondition::NewExecutionOrProgress {
                    execution_ref,
                    percent_complete,
                },
                Some(stored),
            ) => stored.execution_ref != *execution_ref || stored.percent_complete < *percent_complete,
        }
    }
}
