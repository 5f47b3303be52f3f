//! Flattening of activity-record responses into plain text
//!
//! The consumer is a language model, so pagination state travels in the
//! trailing text: either an end-of-data marker or the continuation mark
//! with an instruction to pass it to `RetrieveNextActivityRecords`.

use std::fmt::Write as _;

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::error;

pub const NO_RECORDS: &str = "No activity records found.";
const RECORD_HEADER: &str = "----- Activity Record -----";
const NESTED_PROPERTIES: [&str; 3] = ["DetailList", "MonitoringPlan", "Item"];

#[derive(Debug, Error)]
enum FormatError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),

    #[error("The requested operation requires an element of type '{expected}', but the target element has type '{found}'.")]
    Shape {
        expected: &'static str,
        found: &'static str,
    },
}

/// Render a successful response body. Never fails: malformed bodies are
/// reported in the returned text together with the raw body.
pub fn flatten(body: &str) -> String {
    match try_flatten(body) {
        Ok(text) => text,
        Err(e) => {
            error!(error = %e, "Error formatting response");
            format!("Error formatting response: {e}\n\nRaw response:\n{body}")
        }
    }
}

fn try_flatten(body: &str) -> Result<String, FormatError> {
    let root: Value = serde_json::from_str(body)?;
    let root = as_object(&root)?;

    let continuation_mark = match root.get("ContinuationMark") {
        None | Some(Value::Null) => "",
        Some(Value::String(mark)) => mark.as_str(),
        Some(other) => {
            return Err(FormatError::Shape {
                expected: "String",
                found: kind(other),
            })
        }
    };

    let records = match root.get("ActivityRecordList") {
        Some(Value::Array(records)) if !records.is_empty() => records,
        _ => return Ok(NO_RECORDS.to_string()),
    };

    let mut out = String::new();
    let _ = writeln!(out, "Found {} activity records.", records.len());

    for record in records {
        let record = as_object(record)?;
        let _ = writeln!(out, "\n{RECORD_HEADER}");

        for (name, value) in record {
            if NESTED_PROPERTIES.contains(&name.as_str()) {
                continue;
            }
            let _ = writeln!(out, "{name}: {}", display_value(value));
        }

        if let Some(Value::Object(plan)) = record.get("MonitoringPlan") {
            let _ = writeln!(out, "\nMonitoring Plan:");
            write_properties(&mut out, plan, "  ");
        }

        if let Some(Value::Object(item)) = record.get("Item") {
            let _ = writeln!(out, "\nItem:");
            write_properties(&mut out, item, "  ");
        }

        if let Some(Value::Array(details)) = record.get("DetailList") {
            let _ = writeln!(out, "\nDetails:");
            for detail in details {
                let detail = as_object(detail)?;
                let _ = writeln!(out, "  Detail:");
                write_properties(&mut out, detail, "    ");
            }
        }
    }

    if continuation_mark.trim().is_empty() {
        let _ = writeln!(out, "\nNo more records available (end of data).");
    } else {
        let _ = writeln!(out, "\nContinuation Mark for next page: {continuation_mark}");
        let _ = writeln!(
            out,
            "Use this mark with RetrieveNextActivityRecords to get the next batch of records."
        );
    }

    Ok(out)
}

fn write_properties(out: &mut String, map: &Map<String, Value>, indent: &str) {
    for (name, value) in map {
        let _ = writeln!(out, "{indent}{name}: {}", display_value(value));
    }
}

/// Strings print raw, null prints empty, everything else as JSON text.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, FormatError> {
    value.as_object().ok_or(FormatError::Shape {
        expected: "Object",
        found: kind(value),
    })
}

fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "Null",
        Value::Bool(_) => "Boolean",
        Value::Number(_) => "Number",
        Value::String(_) => "String",
        Value::Array(_) => "Array",
        Value::Object(_) => "Object",
    }
}
