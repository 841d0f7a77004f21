use std::collections::HashMap;

use common::homework::{verdict_for, ChangeEvent, TrackedRecord};
use serde_json::Value;
use tracing::debug;

use crate::error::PollError;

/// Compare a batch of records against the last seen statuses.
///
/// Records are visited in the order received and one event is produced
/// per status change, including the first sighting of a homework. The
/// pass is all-or-nothing: `last_seen` is only updated when every record
/// in the batch is well-formed and has a known status.
pub fn diff(
    records: &[Value],
    last_seen: &mut HashMap<String, String>,
) -> Result<Vec<ChangeEvent>, PollError> {
    let mut staged: HashMap<String, String> = HashMap::new();
    let mut events = Vec::new();

    for raw in records {
        let record = parse_record(raw)?;
        let verdict = verdict_for(&record.status).ok_or_else(|| PollError::UnknownStatus {
            status: record.status.clone(),
        })?;

        let previous = staged
            .get(&record.name)
            .or_else(|| last_seen.get(&record.name));
        if previous == Some(&record.status) {
            debug!(homework = %record.name, status = %record.status, "Status unchanged");
            continue;
        }

        debug!(
            homework = %record.name,
            from = ?previous,
            to = %record.status,
            "Status changed"
        );
        events.push(ChangeEvent {
            name: record.name.clone(),
            status: record.status.clone(),
            verdict,
        });
        staged.insert(record.name, record.status);
    }

    last_seen.extend(staged);
    Ok(events)
}

fn parse_record(raw: &Value) -> Result<TrackedRecord, PollError> {
    serde_json::from_value(raw.clone()).map_err(|e| PollError::malformed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn hw(name: &str, status: &str) -> Value {
        json!({"homework_name": name, "status": status})
    }

    #[test]
    fn test_first_sighting_is_a_change() {
        let mut seen = HashMap::new();
        let events = diff(&[hw("hw01", "reviewing")], &mut seen).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].verdict, verdict_for("reviewing").unwrap());
        assert_eq!(seen.get("hw01").map(String::as_str), Some("reviewing"));
    }

    #[test]
    fn test_unchanged_status_is_silent() {
        let mut seen = HashMap::new();
        diff(&[hw("hw01", "approved")], &mut seen).unwrap();
        let events = diff(&[hw("hw01", "approved")], &mut seen).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn test_events_follow_record_order() {
        let mut seen = HashMap::from([("hw02".to_string(), "reviewing".to_string())]);
        let events = diff(
            &[hw("hw03", "reviewing"), hw("hw02", "rejected"), hw("hw01", "approved")],
            &mut seen,
        )
        .unwrap();
        let names: Vec<_> = events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["hw03", "hw02", "hw01"]);
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_duplicate_in_batch_compares_against_staged() {
        let mut seen = HashMap::new();
        let events = diff(
            &[hw("hw01", "reviewing"), hw("hw01", "reviewing"), hw("hw01", "approved")],
            &mut seen,
        )
        .unwrap();
        let statuses: Vec<_> = events.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, ["reviewing", "approved"]);
        assert_eq!(seen["hw01"], "approved");
    }

    #[test]
    fn test_unknown_status_aborts_whole_batch() {
        let mut seen = HashMap::from([("hw01".to_string(), "reviewing".to_string())]);
        let err = diff(&[hw("hw01", "approved"), hw("hw02", "lost")], &mut seen).unwrap_err();
        match err {
            PollError::UnknownStatus { status } => assert_eq!(status, "lost"),
            other => panic!("expected unknown status, got {other:?}"),
        }
        assert_eq!(seen.len(), 1);
        assert_eq!(seen["hw01"], "reviewing");
    }

    #[test]
    fn test_malformed_records() {
        let mut seen = HashMap::new();
        for bad in [
            json!({"status": "approved"}),
            json!({"homework_name": "hw01"}),
            json!({"homework_name": 7, "status": "approved"}),
            json!("hw01"),
        ] {
            let err = diff(&[bad], &mut seen).unwrap_err();
            assert_eq!(err.kind(), "malformed_record");
        }
        assert!(seen.is_empty());
    }

    #[test]
    fn test_malformed_record_names_the_field() {
        let mut seen = HashMap::new();
        let err = diff(&[json!({"homework_name": "hw01"})], &mut seen).unwrap_err();
        assert!(err.to_string().contains("missing field `status`"), "{err}");

        let err = diff(&[json!({"homework_name": "hw01", "status": 3})], &mut seen).unwrap_err();
        assert!(err.to_string().contains("expected a string"), "{err}");
    }
}
