//! Acknowledgment payloads returned to the PDR provider.
//!
//! Both payloads are PVL documents: one `KEY = value;` statement per line.
//! The provider parses them by key, so the output must match byte for byte.
//!
//! ```text
//! MESSAGE_TYPE = "SHORTPAN";
//! DISPOSITION = "SUCCESSFUL";
//! TIME_STAMP = 2024-01-02T03:04:05.678Z;
//! ```

use time::{OffsetDateTime, UtcOffset};

/// Message type of a successful short acknowledgment.
pub const SHORT_PAN: &str = "SHORTPAN";
/// Message type of a short negative acknowledgment.
pub const SHORT_PDRD: &str = "SHORTPDRD";
pub const DISPOSITION_SUCCESSFUL: &str = "SUCCESSFUL";

#[derive(Debug, Clone, PartialEq)]
enum PvlValue {
    Text(String),
    DateTime(OffsetDateTime),
}

impl PvlValue {
    fn to_pvl(&self) -> String {
        match self {
            // PVL has no escape sequences; a value containing a double quote
            // is delimited with single quotes instead.
            PvlValue::Text(s) if s.contains('"') => format!("'{s}'"),
            PvlValue::Text(s) => format!("\"{s}\""),
            PvlValue::DateTime(t) => iso8601_millis(*t),
        }
    }
}

/// Ordered list of PVL statements.
#[derive(Debug, Default)]
struct PvlDocument {
    statements: Vec<(&'static str, PvlValue)>,
}

impl PvlDocument {
    fn add(mut self, key: &'static str, value: PvlValue) -> Self {
        self.statements.push((key, value));
        self
    }

    fn render(&self) -> String {
        self.statements
            .iter()
            .map(|(key, value)| format!("{key} = {};\n", value.to_pvl()))
            .collect()
    }
}

/// UTC, millisecond precision, `Z` suffix.
fn iso8601_millis(t: OffsetDateTime) -> String {
    let t = t.to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        t.year(),
        t.month() as u8,
        t.day(),
        t.hour(),
        t.minute(),
        t.second(),
        t.millisecond()
    )
}

/// Short positive acknowledgment stamped with `now`.
pub fn build_success_ack(now: OffsetDateTime) -> String {
    PvlDocument::default()
        .add("MESSAGE_TYPE", PvlValue::Text(SHORT_PAN.to_string()))
        .add(
            "DISPOSITION",
            PvlValue::Text(DISPOSITION_SUCCESSFUL.to_string()),
        )
        .add("TIME_STAMP", PvlValue::DateTime(now))
        .render()
}

/// Short negative acknowledgment whose disposition is `reason`, verbatim.
pub fn build_failure_ack(reason: &str) -> String {
    PvlDocument::default()
        .add("MESSAGE_TYPE", PvlValue::Text(SHORT_PDRD.to_string()))
        .add("DISPOSITION", PvlValue::Text(reason.to_string()))
        .render()
}
