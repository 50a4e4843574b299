pub mod errors;
pub mod event;

use thiserror::Error;

use crate::model::Trace;

pub use errors::parse_span_errors;
pub use event::{parse_event, parse_span_array};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("event: {0}")]
    Event(#[from] event::EventParseError),
    #[error("errors: {0}")]
    Errors(#[from] errors::ErrorsParseError),
    #[error("unable to detect format")]
    UnknownFormat,
}

/// Auto-detect the trace format and parse it.
///
/// Detection strategy:
/// 1. A JSON object with a `spans` array plus `contexts`, or with
///    `"type": "transaction"`, is a transaction event.
/// 2. A top-level JSON array whose entries carry `span_id` is a bare span
///    list, wrapped in a synthetic root.
pub fn parse_auto(data: &[u8]) -> Result<Trace, ParseError> {
    let value = serde_json::from_slice::<serde_json::Value>(data)
        .map_err(event::EventParseError::from)?;

    if let Some(obj) = value.as_object() {
        let has_spans = obj.get("spans").is_some_and(serde_json::Value::is_array);
        let is_transaction = obj.get("type").and_then(|v| v.as_str()) == Some("transaction");
        if (has_spans && obj.contains_key("contexts")) || is_transaction {
            return Ok(event::parse_event(data)?);
        }
    }

    if let Some(arr) = value.as_array()
        && arr.iter().all(|v| v.get("span_id").is_some())
    {
        return Ok(event::parse_span_array(data)?);
    }

    Err(ParseError::UnknownFormat)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ViewWindow;
    use crate::views::{FlattenContext, bounds_generator, flatten_trace};

    #[test]
    fn detects_transaction_event() {
        let data = br#"{
            "type": "transaction",
            "start_timestamp": 10.0,
            "timestamp": 11.0,
            "contexts": {"trace": {"trace_id": "t1", "span_id": "r", "op": "http.server"}},
            "spans": []
        }"#;
        let trace = parse_auto(data).unwrap();
        assert_eq!(trace.root.span_id, "r");
    }

    #[test]
    fn detects_bare_span_array() {
        let data = br#"[{"span_id": "a", "start_timestamp": 1.0, "timestamp": 2.0}]"#;
        assert_eq!(parse_auto(data).unwrap().span_count(), 2);
    }

    #[test]
    fn empty_span_array_renders_only_the_root() {
        let trace = parse_auto(b"[]").unwrap();
        let bounds = bounds_generator(
            trace.start_timestamp,
            trace.end_timestamp,
            ViewWindow::full(),
            600.0,
        );
        let waterfall = flatten_trace(&trace, &FlattenContext::new(&bounds));
        assert_eq!(waterfall.items.len(), 1);
        assert!(waterfall.span_rows().all(|row| row.is_root && row.is_displayed()));
        assert!(waterfall.trailing.is_none());
    }

    #[test]
    fn rejects_unknown_shapes() {
        assert!(matches!(
            parse_auto(br#"{"traceEvents": []}"#),
            Err(ParseError::UnknownFormat)
        ));
        assert!(matches!(
            parse_auto(b"not json"),
            Err(ParseError::Event(event::EventParseError::Json(_)))
        ));
    }
}
