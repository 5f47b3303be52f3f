//! Activity-record queries against the audit API
//!
//! Three entry points with distinct upstream semantics: filtered search,
//! unfiltered enumeration, and enumeration continued from a mark. The
//! continuation only replays the original query's server-side cursor, so a
//! next-page call carries no filter. Every outcome, including failures, is
//! returned as text.

use std::sync::Arc;

use serde_json::json;
use tracing::{debug, error, info, warn};

use crate::client::{ApiRequest, ApiResponse, HttpTransport};
use crate::error::TransportError;
use crate::filter::ActivityRecordSearchFilter;
use crate::format::flatten;

pub const SEARCH_PATH: &str = "activity_records/search";
pub const ENUM_PATH: &str = "activity_records/enum";
const RESPONSE_FORMAT: &str = "json";

pub const MAX_SEARCH_COUNT: i64 = 1000;
pub const DEFAULT_SEARCH_COUNT: i64 = 100;
pub const DEFAULT_RETRIEVE_COUNT: i64 = 1;
pub const DEFAULT_NEXT_COUNT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QueryKind {
    Search,
    Retrieve,
    RetrieveNext,
}

impl QueryKind {
    fn failure_message(self, response: &ApiResponse) -> String {
        let status = format!("{} {}", response.status, response.reason);
        match self {
            QueryKind::Search => format!(
                "Error searching for activity records: {} (Status: {}). See server logs for details.",
                response.reason, response.status
            ),
            QueryKind::Retrieve => {
                format!("Error retrieving activity records: {}\n{}", status.trim_end(), response.body)
            }
            QueryKind::RetrieveNext => format!(
                "Error retrieving next activity records: {}\n{}",
                status.trim_end(),
                response.body
            ),
        }
    }

    fn transport_message(self, err: &TransportError) -> String {
        match self {
            QueryKind::Search => {
                format!("Network error while accessing Netwrix Auditor API: {err}")
            }
            QueryKind::Retrieve | QueryKind::RetrieveNext => format!("Error: {err}"),
        }
    }
}

/// Relative path with the query string every endpoint takes.
fn endpoint(path: &str, count: i64) -> String {
    format!("{path}?format={RESPONSE_FORMAT}&count={count}")
}

/// Runs queries over the shared transport. Holds no per-call state.
#[derive(Clone)]
pub struct QueryPipeline {
    transport: Arc<dyn HttpTransport>,
}

impl QueryPipeline {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }

    /// Search with a filter. A non-blank `continuation_mark` continues a
    /// previous search.
    pub async fn search_activity_records(
        &self,
        filter: &ActivityRecordSearchFilter,
        continuation_mark: &str,
        count: i64,
    ) -> String {
        info!(
            count,
            continuation_mark = display_mark(continuation_mark),
            "SearchActivityRecords called"
        );

        if count <= 0 {
            warn!("Incorrect parameter `count`: {count}. Should be greater than 0.");
            return "Error: Count should be greater than 0.".into();
        }
        if count > MAX_SEARCH_COUNT {
            warn!("Incorrect parameter `count`: {count}. Should be no greater than {MAX_SEARCH_COUNT}.");
            return format!("Error: Count should be no greater than {MAX_SEARCH_COUNT}.");
        }

        if filter.filter_list.is_empty() {
            debug!("Search called with an empty filter list");
        }

        // The continued form renames the list key to lower-case `filterlist`.
        let body = if continuation_mark.trim().is_empty() {
            serde_json::to_string(filter)
        } else {
            serde_json::to_string(&json!({
                "ContinuationMark": continuation_mark,
                "filterlist": filter.filter_list,
            }))
        };
        let body = match body {
            Ok(body) => body,
            Err(e) => {
                error!(error = %e, "JSON error while searching for activity records");
                return "Error processing filter data. Check filter format.".into();
            }
        };
        debug!("Serialized JSON request: {body}");

        self.execute(
            QueryKind::Search,
            ApiRequest::post(endpoint(SEARCH_PATH, count), body),
        )
        .await
    }

    /// Unfiltered batch; `count = 1` works as a connectivity probe.
    pub async fn retrieve_activity_records(&self, count: i64) -> String {
        info!(count, "RetrieveActivityRecords called");

        if count <= 0 {
            warn!("Invalid count parameter provided: {count}");
            return "Error: Count must be greater than 0.".into();
        }

        self.execute(QueryKind::Retrieve, ApiRequest::get(endpoint(ENUM_PATH, count)))
            .await
    }

    /// Next page for a mark returned by any of the three operations.
    pub async fn retrieve_next_activity_records(&self, continuation_mark: &str, count: i64) -> String {
        info!(
            count,
            continuation_mark = display_mark(continuation_mark),
            "RetrieveNextActivityRecords called"
        );

        if continuation_mark.trim().is_empty() {
            warn!("Missing continuation mark");
            return "Error: Continuation mark is required.".into();
        }
        if count <= 0 {
            warn!("Invalid count parameter provided: {count}");
            return "Error: Count must be greater than 0.".into();
        }

        // Body is the bare JSON string, not an object.
        let body = serde_json::Value::String(continuation_mark.to_string()).to_string();
        self.execute(
            QueryKind::RetrieveNext,
            ApiRequest::post(endpoint(ENUM_PATH, count), body),
        )
        .await
    }

    async fn execute(&self, kind: QueryKind, request: ApiRequest) -> String {
        let target = format!("{}{}", self.transport.base_url(), request.path);
        match self.transport.send(request).await {
            Ok(response) if response.is_success() => {
                info!(?kind, "Successfully retrieved activity records from {target}");
                flatten(&response.body)
            }
            Ok(response) => {
                error!(
                    ?kind,
                    status = response.status,
                    reason = %response.reason,
                    body = %response.body,
                    "Activity record request failed"
                );
                debug!(headers = ?response.headers, "Failure response headers");
                kind.failure_message(&response)
            }
            Err(e) => {
                error!(?kind, error = %e, "Error while calling {target}");
                kind.transport_message(&e)
            }
        }
    }
}

fn display_mark(mark: &str) -> &str {
    if mark.is_empty() {
        "<empty>"
    } else {
        mark
    }
}
