//! Execution ARN and console URL derivation.

const STATE_MACHINE_SEGMENT: &str = ":stateMachine:";
const EXECUTION_SEGMENT: &str = ":execution:";

/// Build an execution ARN from the state machine ARN and execution name.
///
/// `arn:aws:states:us-east-1:123:stateMachine:Ingest` + `abc` becomes
/// `arn:aws:states:us-east-1:123:execution:Ingest:abc`.
pub fn execution_arn(state_machine_arn: &str, execution_name: &str) -> String {
    format!(
        "{}:{}",
        state_machine_arn.replacen(STATE_MACHINE_SEGMENT, EXECUTION_SEGMENT, 1),
        execution_name
    )
}

/// Console URL for an execution ARN. The region is the fourth ARN field.
///
/// Returns `None` when the ARN has no region field.
pub fn execution_url_from_arn(arn: &str) -> Option<String> {
    let region = arn.split(':').nth(3).filter(|r| !r.is_empty())?;
    Some(format!(
        "https://console.aws.amazon.com/states/home?region={region}#/executions/details/{arn}"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arn_from_state_machine() {
        assert_eq!(
            execution_arn("arn:aws:states:us-east-1:123456789012:stateMachine:Ingest", "run-1"),
            "arn:aws:states:us-east-1:123456789012:execution:Ingest:run-1"
        );
    }

    #[test]
    fn url_uses_region_from_arn() {
        let arn = "arn:aws:states:us-west-2:123456789012:execution:Ingest:run-1";
        assert_eq!(
            execution_url_from_arn(arn).as_deref(),
            Some(
                "https://console.aws.amazon.com/states/home?region=us-west-2\
                 #/executions/details/arn:aws:states:us-west-2:123456789012:execution:Ingest:run-1"
            )
        );
    }

    #[test]
    fn url_requires_region() {
        assert_eq!(execution_url_from_arn("not-an-arn"), None);
        assert_eq!(execution_url_from_arn("arn:aws:states::123:execution:x:y"), None);
    }
}
