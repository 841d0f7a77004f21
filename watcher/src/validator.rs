use serde_json::Value;
use tracing::debug;

use crate::error::PollError;

pub const RECORDS_FIELD: &str = "homeworks";
pub const CURSOR_FIELD: &str = "current_date";

/// A validated response: the raw records plus the cursor for the next
/// request. Records are checked one by one by the differ.
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    pub records: Vec<Value>,
    pub next_cursor: i64,
}

/// Check the response shape and split it into records and cursor.
pub fn check_response(payload: Value) -> Result<Batch, PollError> {
    let Value::Object(mut body) = payload else {
        return Err(PollError::shape("response is not a JSON object"));
    };

    let missing: Vec<&str> = [RECORDS_FIELD, CURSOR_FIELD]
        .into_iter()
        .filter(|key| !body.contains_key(*key))
        .collect();
    if !missing.is_empty() {
        return Err(PollError::shape(format!(
            "missing key(s): {}",
            missing.join(", ")
        )));
    }

    let records = match body.remove(RECORDS_FIELD) {
        Some(Value::Array(records)) => records,
        Some(other) => {
            return Err(PollError::shape(format!(
                "`{RECORDS_FIELD}` is not a list (got {})",
                type_name(&other)
            )))
        }
        None => Vec::new(),
    };

    let next_cursor = body
        .get(CURSOR_FIELD)
        .and_then(Value::as_i64)
        .ok_or_else(|| PollError::shape(format!("`{CURSOR_FIELD}` is not an integer timestamp")))?;

    debug!(records = records.len(), next_cursor, "API response is well-formed");
    Ok(Batch {
        records,
        next_cursor,
    })
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_response() {
        let batch = check_response(json!({
            "homeworks": [{"homework_name": "hw01", "status": "approved"}],
            "current_date": 1_700_000_600,
        }))
        .unwrap();
        assert_eq!(batch.records.len(), 1);
        assert_eq!(batch.next_cursor, 1_700_000_600);
    }

    #[test]
    fn test_empty_records_are_valid() {
        let batch = check_response(json!({"homeworks": [], "current_date": 10})).unwrap();
        assert!(batch.records.is_empty());
        assert_eq!(batch.next_cursor, 10);
    }

    #[test]
    fn test_not_an_object() {
        let err = check_response(json!([1, 2, 3])).unwrap_err();
        assert!(matches!(err, PollError::Shape { .. }));
    }

    #[test]
    fn test_missing_keys_named() {
        let err = check_response(json!({})).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unexpected API response shape: missing key(s): homeworks, current_date"
        );

        let err = check_response(json!({"homeworks": []})).unwrap_err();
        assert!(err.to_string().contains("current_date"));
    }

    #[test]
    fn test_records_not_a_list() {
        let err = check_response(json!({"homeworks": {"a": 1}, "current_date": 1})).unwrap_err();
        assert!(err.to_string().contains("not a list (got object)"));
    }

    #[test]
    fn test_cursor_not_integer() {
        let err = check_response(json!({"homeworks": [], "current_date": "yesterday"})).unwrap_err();
        assert_eq!(err.kind(), "shape");
    }
}
