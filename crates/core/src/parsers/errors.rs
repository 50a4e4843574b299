use serde::Deserialize;
use thiserror::Error;
use waterfall_protocol::SharedStr;

use crate::model::{SpanErrors, SpanId, TraceError};

#[derive(Debug, Error)]
pub enum ErrorsParseError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct RawError {
    span_id: SpanId,
    event_id: SharedStr,
    #[serde(default)]
    title: Option<SharedStr>,
    #[serde(default)]
    level: Option<SharedStr>,
}

/// Parse `[{span_id, event_id, title, level}, ...]` into an error table.
pub fn parse_span_errors(data: &[u8]) -> Result<SpanErrors, ErrorsParseError> {
    let raw: Vec<RawError> = serde_json::from_slice(data)?;
    let mut errors = SpanErrors::new();
    for e in raw {
        errors.push(
            e.span_id,
            TraceError {
                title: e.title.unwrap_or_else(|| e.event_id.clone()),
                event_id: e.event_id,
                level: e.level,
            },
        );
    }
    tracing::debug!(count = errors.len(), "parsed span errors");
    Ok(errors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_errors_by_span() {
        let data = br#"[
            {"span_id": "a", "event_id": "e1", "title": "Timeout", "level": "error"},
            {"span_id": "a", "event_id": "e2"},
            {"span_id": "b", "event_id": "e3", "title": "KeyError"}
        ]"#;
        let errors = parse_span_errors(data).unwrap();
        assert_eq!(errors.len(), 3);
        assert_eq!(errors.for_span("a").len(), 2);
        assert_eq!(errors.for_span("a")[1].title, "e2");
        assert_eq!(errors.for_span("b")[0].level, None);
        assert!(!errors.has_errors("c"));
    }

    #[test]
    fn rejects_objects() {
        assert!(parse_span_errors(br#"{"span_id": "a"}"#).is_err());
    }
}
