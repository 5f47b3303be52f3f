//! Tool surface: validated tool calls dispatched to the query pipeline

pub mod definitions;
pub mod registry;
pub mod schema;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::filter::ActivityRecordSearchFilter;
use crate::records::{QueryPipeline, DEFAULT_NEXT_COUNT, DEFAULT_RETRIEVE_COUNT, DEFAULT_SEARCH_COUNT};
use definitions::{RETRIEVE_ACTIVITY_RECORDS, RETRIEVE_NEXT_ACTIVITY_RECORDS, SEARCH_ACTIVITY_RECORDS};
use registry::{Registry, ToolDefinition};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("{0}")]
    InvalidArguments(String),
}

/// Text result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn text(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn error(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

pub struct ToolSurface {
    registry: Registry,
    pipeline: QueryPipeline,
}

impl ToolSurface {
    pub fn new(pipeline: QueryPipeline, internal_api: bool) -> Self {
        let mut registry = Registry::new();
        definitions::register_all(&mut registry, internal_api);
        Self { registry, pipeline }
    }

    pub fn list_tools(&self) -> Vec<&ToolDefinition> {
        self.registry.list_tools()
    }

    /// Validate `arguments` against the tool schema and run the tool.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .registry
            .get_tool(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        schema::validate_input(&arguments, &tool.input_schema)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        info!("=== {name} tool called ===");
        let text = match name {
            SEARCH_ACTIVITY_RECORDS => {
                let filter = arguments.get("filter").unwrap_or(&Value::Null);
                let filter = match ActivityRecordSearchFilter::from_value(filter) {
                    Ok(filter) => filter,
                    Err(e) => {
                        warn!(error = %e, "Rejected search filter");
                        return Ok(ToolOutput::error(format!("Error: Invalid filter. {e}")));
                    }
                };
                let mark = string_arg(&arguments, "continuationMark");
                let count = count_arg(&arguments, DEFAULT_SEARCH_COUNT);
                self.pipeline.search_activity_records(&filter, mark, count).await
            }
            RETRIEVE_ACTIVITY_RECORDS => {
                let count = count_arg(&arguments, DEFAULT_RETRIEVE_COUNT);
                self.pipeline.retrieve_activity_records(count).await
            }
            RETRIEVE_NEXT_ACTIVITY_RECORDS => {
                let mark = string_arg(&arguments, "continuationMark");
                let count = count_arg(&arguments, DEFAULT_NEXT_COUNT);
                self.pipeline.retrieve_next_activity_records(mark, count).await
            }
            other => return Err(ToolError::UnknownTool(other.to_string())),
        };
        Ok(ToolOutput::text(text))
    }
}

fn string_arg<'a>(arguments: &'a Value, key: &str) -> &'a str {
    arguments.get(key).and_then(Value::as_str).unwrap_or("")
}

/// Integer argument; a null or absent value takes the default.
fn count_arg(arguments: &Value, default: i64) -> i64 {
    match arguments.get("count") {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(default),
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::tests::RecordingTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn surface() -> (ToolSurface, Arc<RecordingTransport>) {
        let transport = Arc::new(RecordingTransport::new());
        let pipeline = QueryPipeline::new(transport.clone());
        (ToolSurface::new(pipeline, false), transport)
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let (s, _) = surface();
        assert!(matches!(
            s.call("DropTables", json!({})).await,
            Err(ToolError::UnknownTool(_))
        ));
    }

    #[tokio::test]
    async fn test_schema_rejects_bad_arguments() {
        let (s, t) = surface();
        let err = s
            .call(RETRIEVE_NEXT_ACTIVITY_RECORDS, json!({"count": 5}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert!(t.sent().is_empty());
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let (s, t) = surface();
        s.call(RETRIEVE_ACTIVITY_RECORDS, json!({})).await.unwrap();
        s.call(RETRIEVE_NEXT_ACTIVITY_RECORDS, json!({"continuationMark": "m"}))
            .await
            .unwrap();
        s.call(SEARCH_ACTIVITY_RECORDS, json!({"filter": {"FilterList": {}}}))
            .await
            .unwrap();

        let paths: Vec<String> = t.sent().into_iter().map(|r| r.path).collect();
        assert_eq!(
            paths,
            [
                "activity_records/enum?format=json&count=1",
                "activity_records/enum?format=json&count=100",
                "activity_records/search?format=json&count=100",
            ]
        );
    }

    #[tokio::test]
    async fn test_search_normalizes_filter() {
        let (s, t) = surface();
        let out = s
            .call(
                SEARCH_ACTIVITY_RECORDS,
                json!({"filter": {"who": "admin"}, "continuationMark": "xyz", "count": 10}),
            )
            .await
            .unwrap();
        assert!(!out.is_error);
        assert_eq!(
            t.sent()[0].body.as_deref(),
            Some(r#"{"ContinuationMark":"xyz","filterlist":{"Who":[{"Contains":"admin"}]}}"#)
        );
    }

    #[tokio::test]
    async fn test_invalid_filter_makes_no_request() {
        let (s, t) = surface();
        let out = s
            .call(
                SEARCH_ACTIVITY_RECORDS,
                json!({"filter": {"FilterList": {"Action": [{"Contains": "Mod"}]}}}),
            )
            .await
            .unwrap();
        assert!(out.text.starts_with("Error: Invalid filter. "));
        assert!(out.is_error);
        assert!(t.sent().is_empty());
    }

    #[test]
    fn test_list_tools() {
        let (s, _) = surface();
        let names: Vec<_> = s.list_tools().iter().map(|t| t.name.clone()).collect();
        assert_eq!(
            names,
            [
                "RetrieveActivityRecords",
                "RetrieveNextActivityRecords",
                "SearchActivityRecords"
            ]
        );
    }
}
