//! Activity-record tool definitions: names, descriptions and input schemas

use serde_json::{json, Value};
use tracing::info;

use super::registry::{make_tool, Registry};
use crate::filter::FilterField;
use crate::records::{DEFAULT_NEXT_COUNT, DEFAULT_RETRIEVE_COUNT, DEFAULT_SEARCH_COUNT, MAX_SEARCH_COUNT};

pub const SEARCH_ACTIVITY_RECORDS: &str = "SearchActivityRecords";
pub const RETRIEVE_ACTIVITY_RECORDS: &str = "RetrieveActivityRecords";
pub const RETRIEVE_NEXT_ACTIVITY_RECORDS: &str = "RetrieveNextActivityRecords";

const SEARCH_DESCRIPTION: &str = "Searches for specific activity audit records in Netwrix Auditor based on provided filter criteria. \
Use this tool when the user wants to find records matching some conditions, such as actions performed by a particular user ('Who'), \
changes to a specific object ('What'), actions on a specific location ('Where'), or events within a defined time range ('When'). \
You can combine multiple filters. The response may contain a continuation mark if older records exist beyond the initial batch. \
If there are 100 or more activity records present, the filter is considered too general and should be made more specific.";

const RETRIEVE_DESCRIPTION: &str = "Retrieves a batch of random activity audit records from Netwrix Auditor. \
Only use this tool as a sanity check to see if there are any audit records in the connected Netwrix Auditor instance. \
Use it with count = 1 in case other tools failed to retrieve any records or continuation mark.";

const RETRIEVE_NEXT_DESCRIPTION: &str = "Retrieves the subsequent batch of activity audit records for a query previously \
initiated by RetrieveActivityRecords, SearchActivityRecords or RetrieveNextActivityRecords. \
Only use this tool if the previous response from one of those tools contained a continuation mark. \
Provide that exact continuation mark to get the next page of results for the original query.";

/// Predefined `DataSource` values known to Netwrix Auditor.
pub const DATA_SOURCES: [&str; 21] = [
    "AD FS",
    "Active Directory",
    "Entra ID",
    "Event Log",
    "Exchange",
    "Exchange Online",
    "File Servers",
    "Group Policy",
    "Inactive Users",
    "Logon Activity",
    "Network Device",
    "Oracle Database",
    "Password Expiration",
    "SharePoint",
    "SharePoint Online",
    "SQL Server",
    "User Activity",
    "VMware",
    "Windows Server",
    "Entitlement reviews",
    "MS Teams",
];

/// Per-field documentation shown to the assistant.
fn field_summary(field: FilterField) -> (&'static str, &'static str) {
    match field {
        FilterField::Rid => ("Activity record ID", r#"{"Equals": "some-rid"}"#),
        FilterField::Who => (
            "User who made the change (e.g. ENTERPRISE\\Administrator, administrator@enterprise.onmicrosoft.com)",
            r#"{"NotInGroup": "Guests"}"#,
        ),
        FilterField::Where => (
            "Resource where the change was made: FQDN or NETBIOS server name, AD domain or container, SQL Server instance, SharePoint farm, VMware host",
            r#"{"StartsWith": "Server-"}"#,
        ),
        FilterField::ObjectType => ("Type of the changed object", r#"{"Equals": "User"}"#),
        FilterField::What => (
            "Specific object changed (policy name, file name, user name, OU name)",
            r#"{"Contains": "Policy"}"#,
        ),
        FilterField::DataSource => (
            "Data source for the activity",
            r#"{"Equals": "Active Directory"}"#,
        ),
        FilterField::MonitoringPlan => (
            "Monitoring plan that governs data collection",
            r#"{"Equals": "Default Plan"}"#,
        ),
        FilterField::Item => (
            "Monitored item with its type in brackets, e.g. corp.local (Domain)",
            r#"{"Contains": "Domain"}"#,
        ),
        FilterField::Workstation => (
            "Originating workstation (e.g. WKSwin12.enterprise.local)",
            r#"{"EndsWith": ".local"}"#,
        ),
        FilterField::Detail => (
            "Data-source specific detail: assigned permissions, before and after values, start and end dates",
            r#"{"Contains": "permission"}"#,
        ),
        FilterField::Before => ("Before value in Detail", r#"{"Contains": "100"}"#),
        FilterField::After => ("After value in Detail", r#"{"Contains": "200"}"#),
        FilterField::Action => (
            "Action type: Added, Removed, Modified, Read, Moved, Renamed, Successful Logon, Failed Logon, Logoff, Copied, Sent, Session start, Session end, Activated, or a '(Failed Attempt)' variant",
            r#"{"Equals": "Modified"}"#,
        ),
    }
}

/// Filter documentation, generated from the field table so the advertised
/// operators always match what validation accepts.
pub fn filter_description() -> String {
    let mut doc = String::from(
        "Search filter: {\"FilterList\": {<Field>: [{<Operator>: <value>}, ...]}}. \
Omit fields you do not filter on. Fields:\n",
    );
    for field in FilterField::ALL {
        let (about, example) = field_summary(field);
        let operators: Vec<String> = field
            .operators()
            .iter()
            .map(|op| {
                if *op == field.default_operator() {
                    format!("{op} (default)")
                } else {
                    op.to_string()
                }
            })
            .collect();
        doc.push_str(&format!("- {}: {about}. Operators: {}.", field, operators.join(", ")));
        if field == FilterField::DataSource {
            doc.push_str(&format!(" Predefined values: {}.", DATA_SOURCES.join(", ")));
        }
        if let Some(max) = field.max_length() {
            doc.push_str(&format!(" Max length: {max}."));
        }
        doc.push_str(&format!(" Example: {example}\n"));
    }
    doc.push_str(
        "- When: list of time filters, each either a period {\"Today\": \"\"}, {\"Yesterday\": \"\"}, \
{\"LastSevenDays\": \"\"}, {\"LastThirtyDays\": \"\"} or a range {\"From\": \"2025-04-18T09:16:33Z\", \"To\": \"2025-04-21T09:16:35Z\"}; \
timestamps are UTC (Z) or carry an offset (+HH:MM / -HH:MM).\n\
- WorkingHours: {\"From\": \"09:00:00+00:00\", \"To\": \"17:00:00+00:00\"}; both required.\n\
Examples: {\"FilterList\": {\"Action\": [{\"Equals\": \"Modified\"}], \"Who\": [{\"Contains\": \"Administrator\"}]}} finds modifications by Administrator; \
{\"FilterList\": {\"What\": [{\"Contains\": \"password\"}], \"When\": [{\"LastSevenDays\": \"\"}]}} finds password-related changes in the last 7 days.",
    );
    doc
}

pub fn search_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "filter": {
                "type": "object",
                "description": filter_description()
            },
            "continuationMark": {
                "type": "string",
                "description": "Optional continuation mark from a previous search",
                "default": ""
            },
            "count": {
                "type": "integer",
                "description": format!("Maximum number of records to retrieve (default: {DEFAULT_SEARCH_COUNT}, max: {MAX_SEARCH_COUNT})"),
                "default": DEFAULT_SEARCH_COUNT
            }
        },
        "required": ["filter"]
    })
}

pub fn retrieve_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "count": {
                "type": "integer",
                "description": format!("Maximum number of records to retrieve (default: {DEFAULT_RETRIEVE_COUNT})"),
                "default": DEFAULT_RETRIEVE_COUNT
            }
        }
    })
}

pub fn retrieve_next_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "continuationMark": {
                "type": "string",
                "description": "Continuation mark from the previous response. Required, and must be exactly as provided in the previous response."
            },
            "count": {
                "type": "integer",
                "description": format!("Maximum number of records to retrieve (default: {DEFAULT_NEXT_COUNT})"),
                "default": DEFAULT_NEXT_COUNT
            }
        },
        "required": ["continuationMark"]
    })
}

/// Register the activity-record tools.
pub fn register_tools(reg: &mut Registry) {
    reg.register_tool(make_tool(SEARCH_ACTIVITY_RECORDS, SEARCH_DESCRIPTION, search_schema()));
    reg.register_tool(make_tool(RETRIEVE_ACTIVITY_RECORDS, RETRIEVE_DESCRIPTION, retrieve_schema()));
    reg.register_tool(make_tool(
        RETRIEVE_NEXT_ACTIVITY_RECORDS,
        RETRIEVE_NEXT_DESCRIPTION,
        retrieve_next_schema(),
    ));
}

/// Register every tool for the configured API flavour.
pub fn register_all(reg: &mut Registry, internal_api: bool) {
    if internal_api {
        info!("Internal API mode: registering all tools");
    } else {
        info!("Registering activity record tools");
    }
    register_tools(reg);
    info!("Registered {} tools", reg.tool_count());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::schema::validate_input;

    #[test]
    fn test_register_all_both_modes() {
        for internal in [false, true] {
            let mut reg = Registry::new();
            register_all(&mut reg, internal);
            assert_eq!(reg.tool_count(), 3);
            assert!(reg.get_tool(SEARCH_ACTIVITY_RECORDS).is_some());
            assert!(reg.get_tool(RETRIEVE_ACTIVITY_RECORDS).is_some());
            assert!(reg.get_tool(RETRIEVE_NEXT_ACTIVITY_RECORDS).is_some());
        }
    }

    #[test]
    fn test_filter_description_lists_operators() {
        let doc = filter_description();
        assert!(doc.contains("- RID: Activity record ID. Operators: Contains (default), DoesNotContain"));
        assert!(doc.contains("Max length: 49."));
        assert!(doc.contains("- Action: "));
        assert!(doc.contains("Operators: Equals (default), NotEqualTo."));
        assert!(doc.contains("InGroup"));
    }

    #[test]
    fn test_filter_description_lists_every_data_source() {
        let doc = filter_description();
        let line = doc
            .lines()
            .find(|l| l.starts_with("- DataSource: "))
            .unwrap();
        for source in DATA_SOURCES {
            assert!(line.contains(source), "missing data source {source}");
        }
        assert!(line.contains("AD FS, Active Directory, Entra ID, Event Log"));
        assert!(line.contains("Entitlement reviews, MS Teams."));
    }

    #[test]
    fn test_schemas_accept_documented_arguments() {
        assert!(validate_input(
            &json!({"filter": {"FilterList": {"Who": [{"Equals": "admin"}]}}}),
            &search_schema()
        )
        .is_ok());
        assert!(validate_input(&json!({}), &search_schema()).is_err());
        assert!(validate_input(&json!({}), &retrieve_schema()).is_ok());
        assert!(validate_input(&json!({"count": 10}), &retrieve_next_schema()).is_err());
        assert!(validate_input(&json!({"continuationMark": "m"}), &retrieve_next_schema()).is_ok());
    }
}
