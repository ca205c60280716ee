/// The PDR carried by a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestPayload {
    /// PDR name. Absence is a contract violation the caller must report.
    pub name: Option<String>,
    /// Whether an acknowledgment was already sent to the provider.
    pub acknowledgment_sent: bool,
    pub acknowledgment_body: Option<String>,
}

/// Sub-executions the PDR has spawned, grouped by outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecutionCounts {
    pub running: u64,
    pub completed: u64,
    pub failed: u64,
}

/// Read-only view of one workflow event.
pub trait ManifestEvent {
    /// The PDR payload, `None` when the message does not describe one.
    fn manifest(&self) -> Option<ManifestPayload>;

    fn collection_id(&self) -> Option<String>;

    fn provider_id(&self) -> Option<String>;

    /// Raw workflow status string as reported by the execution.
    fn workflow_status(&self) -> Option<String>;

    fn execution_counts(&self) -> Option<ExecutionCounts>;

    /// Locator of the execution that emitted the message.
    fn execution_ref(&self) -> Option<String>;

    /// Workflow start time, Unix epoch milliseconds.
    fn workflow_start_time(&self) -> Option<i64>;
}

impl<T: ManifestEvent + ?Sized> ManifestEvent for &T {
    fn manifest(&self) -> Option<ManifestPayload> {
        (**self).manifest()
    }

    fn collection_id(&self) -> Option<String> {
        (**self).collection_id()
    }

    fn provider_id(&self) -> Option<String> {
        (**self).provider_id()
    }

    fn workflow_status(&self) -> Option<String> {
        (**self).workflow_status()
    }

    fn execution_counts(&self) -> Option<ExecutionCounts> {
        (**self).execution_counts()
    }

    fn execution_ref(&self) -> Option<String> {
        (**self).execution_ref()
    }

    fn workflow_start_time(&self) -> Option<i64> {
        (**self).workflow_start_time()
    }
}
