//! Activity-record search filter model
//!
//! The typed model serializes to the exact upstream shape: unset fields are
//! omitted, never sent as `null` or `[]`. [`ActivityRecordSearchFilter::from_value`]
//! accepts the loosely-typed payload an assistant actually produces and
//! normalizes it before typed parsing and validation.

pub mod condition;
pub mod field;
pub mod when;

pub use condition::{FilterCondition, FilterOperator};
pub use field::FilterField;
pub use when::{WhenFilter, WorkingHoursFilter};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use when::WHEN_KEYS;

const WHEN_NAME: &str = "When";
const WORKING_HOURS_NAME: &str = "WorkingHours";
const FILTER_LIST_NAME: &str = "FilterList";

#[derive(Debug, Error)]
pub enum FilterError {
    #[error("The 'FilterList' object is required.")]
    MissingFilterList,

    #[error("malformed filter: {0}")]
    Malformed(String),

    #[error("unknown filter field '{0}'")]
    UnknownField(String),

    #[error("operator name cannot be empty")]
    EmptyOperator,

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("operator '{operator}' is not supported for field '{field}' (supported: {supported})")]
    IllegalOperator {
        field: FilterField,
        operator: FilterOperator,
        supported: String,
    },

    #[error("a filter condition must have exactly one operator, found {0}")]
    OperatorCount(usize),

    #[error("value for field '{field}' is too long ({actual} characters, max {max})")]
    ValueTooLong {
        field: FilterField,
        max: usize,
        actual: usize,
    },

    #[error("invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    #[error("a When range needs at least one of 'From' or 'To'")]
    EmptyRange,

    #[error("a When entry must be a single predefined period or a From/To range")]
    AmbiguousWhen,

    #[error("invalid time of day '{0}', expected HH:MM:SSZ or HH:MM:SS+HH:MM")]
    InvalidTimeOfDay(String),

    #[error("The '{0}' field for WorkingHours is required.")]
    MissingWorkingHours(&'static str),
}

/// Filtering criteria. Every field is optional and omitted when unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterListDefinition {
    #[serde(rename = "RID", default, skip_serializing_if = "Option::is_none")]
    pub rid: Option<Vec<FilterCondition>>,
    #[serde(rename = "Who", default, skip_serializing_if = "Option::is_none")]
    pub who: Option<Vec<FilterCondition>>,
    #[serde(rename = "Where", default, skip_serializing_if = "Option::is_none")]
    pub where_: Option<Vec<FilterCondition>>,
    #[serde(rename = "ObjectType", default, skip_serializing_if = "Option::is_none")]
    pub object_type: Option<Vec<FilterCondition>>,
    #[serde(rename = "What", default, skip_serializing_if = "Option::is_none")]
    pub what: Option<Vec<FilterCondition>>,
    #[serde(rename = "DataSource", default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<Vec<FilterCondition>>,
    #[serde(rename = "MonitoringPlan", default, skip_serializing_if = "Option::is_none")]
    pub monitoring_plan: Option<Vec<FilterCondition>>,
    #[serde(rename = "Item", default, skip_serializing_if = "Option::is_none")]
    pub item: Option<Vec<FilterCondition>>,
    #[serde(rename = "Workstation", default, skip_serializing_if = "Option::is_none")]
    pub workstation: Option<Vec<FilterCondition>>,
    #[serde(rename = "Detail", default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<Vec<FilterCondition>>,
    #[serde(rename = "Before", default, skip_serializing_if = "Option::is_none")]
    pub before: Option<Vec<FilterCondition>>,
    #[serde(rename = "After", default, skip_serializing_if = "Option::is_none")]
    pub after: Option<Vec<FilterCondition>>,
    #[serde(rename = "Action", default, skip_serializing_if = "Option::is_none")]
    pub action: Option<Vec<FilterCondition>>,
    #[serde(rename = "When", default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Vec<WhenFilter>>,
    #[serde(rename = "WorkingHours", default, skip_serializing_if = "Option::is_none")]
    pub working_hours: Option<WorkingHoursFilter>,
}

impl FilterListDefinition {
    pub fn conditions_mut(&mut self, field: FilterField) -> &mut Option<Vec<FilterCondition>> {
        match field {
            FilterField::Rid => &mut self.rid,
            FilterField::Who => &mut self.who,
            FilterField::Where => &mut self.where_,
            FilterField::ObjectType => &mut self.object_type,
            FilterField::What => &mut self.what,
            FilterField::DataSource => &mut self.data_source,
            FilterField::MonitoringPlan => &mut self.monitoring_plan,
            FilterField::Item => &mut self.item,
            FilterField::Workstation => &mut self.workstation,
            FilterField::Detail => &mut self.detail,
            FilterField::Before => &mut self.before,
            FilterField::After => &mut self.after,
            FilterField::Action => &mut self.action,
        }
    }

    fn slot(&self, field: FilterField) -> &Option<Vec<FilterCondition>> {
        match field {
            FilterField::Rid => &self.rid,
            FilterField::Who => &self.who,
            FilterField::Where => &self.where_,
            FilterField::ObjectType => &self.object_type,
            FilterField::What => &self.what,
            FilterField::DataSource => &self.data_source,
            FilterField::MonitoringPlan => &self.monitoring_plan,
            FilterField::Item => &self.item,
            FilterField::Workstation => &self.workstation,
            FilterField::Detail => &self.detail,
            FilterField::Before => &self.before,
            FilterField::After => &self.after,
            FilterField::Action => &self.action,
        }
    }

    /// Append a condition to `field`.
    pub fn push(&mut self, field: FilterField, condition: FilterCondition) {
        self.conditions_mut(field)
            .get_or_insert_with(Vec::new)
            .push(condition);
    }

    pub fn is_empty(&self) -> bool {
        FilterField::ALL.into_iter().all(|f| self.slot(f).is_none())
            && self.when.is_none()
            && self.working_hours.is_none()
    }

    /// Check operators, lengths and time formats.
    pub fn validate(&self) -> Result<(), FilterError> {
        for field in FilterField::ALL {
            for condition in self.slot(field).iter().flatten() {
                if !field.supports(condition.operator) {
                    return Err(FilterError::IllegalOperator {
                        field,
                        operator: condition.operator,
                        supported: field
                            .operators()
                            .iter()
                            .map(|op| op.as_str())
                            .collect::<Vec<_>>()
                            .join(", "),
                    });
                }
                if let Some(max) = field.max_length() {
                    let actual = condition.value.chars().count();
                    if actual > max {
                        return Err(FilterError::ValueTooLong { field, max, actual });
                    }
                }
            }
        }
        for when in self.when.iter().flatten() {
            when.validate()?;
        }
        if let Some(hours) = &self.working_hours {
            hours.validate()?;
        }
        Ok(())
    }

    /// Build from a loosely-typed JSON object (field names in any case,
    /// bare values, single objects instead of lists).
    pub fn from_loose(map: &Map<String, Value>) -> Result<Self, FilterError> {
        let mut list = FilterListDefinition::default();

        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            if key.eq_ignore_ascii_case(WHEN_NAME) {
                let entries = list.when.get_or_insert_with(Vec::new);
                for item in as_items(value) {
                    entries.push(loose_when(item)?);
                }
            } else if key.eq_ignore_ascii_case(WORKING_HOURS_NAME) {
                list.working_hours = Some(loose_working_hours(value)?);
            } else {
                let field = FilterField::from_name(key)
                    .ok_or_else(|| FilterError::UnknownField(key.clone()))?;
                for item in as_items(value) {
                    list.push(field, loose_condition(field, item)?);
                }
            }
        }

        Ok(list)
    }
}

/// Root object of a search query: `{"FilterList": {...}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecordSearchFilter {
    #[serde(rename = "FilterList")]
    pub filter_list: FilterListDefinition,
}

impl ActivityRecordSearchFilter {
    pub fn new(filter_list: FilterListDefinition) -> Self {
        Self { filter_list }
    }

    /// Normalize and validate an assistant-supplied filter argument. Accepts
    /// the `FilterList` wrapper or a bare filter list.
    pub fn from_value(value: &Value) -> Result<Self, FilterError> {
        let root = match value {
            Value::Object(map) => map,
            Value::Null => return Err(FilterError::MissingFilterList),
            other => {
                return Err(FilterError::Malformed(format!(
                    "filter must be an object, found {other}"
                )))
            }
        };

        let wrapped = root
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(FILTER_LIST_NAME))
            .map(|(_, v)| v);
        let list = match wrapped {
            Some(Value::Object(inner)) if root.len() == 1 => FilterListDefinition::from_loose(inner)?,
            Some(Value::Null) if root.len() == 1 => FilterListDefinition::default(),
            Some(Value::Object(_)) | Some(Value::Null) => {
                return Err(FilterError::Malformed(
                    "unexpected keys next to 'FilterList'".into(),
                ))
            }
            Some(other) => {
                return Err(FilterError::Malformed(format!(
                    "'FilterList' must be an object, found {other}"
                )))
            }
            None => FilterListDefinition::from_loose(root)?,
        };

        list.validate()?;
        Ok(Self::new(list))
    }
}

/// A single value or a list of values.
fn as_items(value: &Value) -> Vec<&Value> {
    match value {
        Value::Array(items) => items.iter().collect(),
        other => vec![other],
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn loose_condition(field: FilterField, item: &Value) -> Result<FilterCondition, FilterError> {
    if let Some(text) = scalar_text(item) {
        return Ok(FilterCondition::with_operator(field.default_operator(), text));
    }
    match item {
        Value::Object(map) => FilterCondition::try_from(map.clone()),
        other => Err(FilterError::Malformed(format!(
            "condition for field '{field}' must be an object or a string, found {other}"
        ))),
    }
}

fn loose_when(item: &Value) -> Result<WhenFilter, FilterError> {
    let map = match item {
        // "LastSevenDays" as a bare string names the period.
        Value::String(name) => {
            let mut map = Map::new();
            map.insert(name.clone(), Value::String(String::new()));
            map
        }
        Value::Object(map) => map.clone(),
        other => {
            return Err(FilterError::Malformed(format!(
                "When entry must be an object, found {other}"
            )))
        }
    };

    let mut canonical = Map::new();
    for (key, value) in map {
        let name = WHEN_KEYS
            .iter()
            .find(|k| k.eq_ignore_ascii_case(&key))
            .ok_or_else(|| FilterError::Malformed(format!("unknown When key '{key}'")))?;
        let text = match &value {
            Value::Null if matches!(*name, "From" | "To") => continue,
            Value::Null => String::new(),
            other => scalar_text(other).ok_or_else(|| {
                FilterError::Malformed(format!("When '{name}' must be a string"))
            })?,
        };
        canonical.insert((*name).to_string(), Value::String(text));
    }
    serde_json::from_value(Value::Object(canonical))
        .map_err(|e| FilterError::Malformed(format!("invalid When entry: {e}")))
}

fn loose_working_hours(value: &Value) -> Result<WorkingHoursFilter, FilterError> {
    let map = value.as_object().ok_or_else(|| {
        FilterError::Malformed(format!("WorkingHours must be an object, found {value}"))
    })?;
    let get = |name: &'static str| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .and_then(|(_, v)| scalar_text(v))
            .ok_or(FilterError::MissingWorkingHours(name))
    };
    Ok(WorkingHoursFilter::new(get("From")?, get("To")?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unset_fields_are_omitted() {
        let mut list = FilterListDefinition::default();
        list.push(
            FilterField::Who,
            FilterCondition::with_operator(FilterOperator::Equals, "admin"),
        );
        list.when = Some(vec![WhenFilter::LastSevenDays]);
        let filter = ActivityRecordSearchFilter::new(list);

        let json = serde_json::to_string(&filter).unwrap();
        assert_eq!(
            json,
            r#"{"FilterList":{"Who":[{"Equals":"admin"}],"When":[{"LastSevenDays":""}]}}"#
        );

        let parsed: ActivityRecordSearchFilter = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, filter);
        assert!(parsed.filter_list.rid.is_none());
        assert!(parsed.filter_list.action.is_none());
        assert!(parsed.filter_list.working_hours.is_none());
    }

    #[test]
    fn test_empty_filter_serializes_empty_object() {
        let json = serde_json::to_string(&ActivityRecordSearchFilter::default()).unwrap();
        assert_eq!(json, r#"{"FilterList":{}}"#);
    }

    #[test]
    fn test_from_value_wrapped_and_bare() {
        let wrapped = ActivityRecordSearchFilter::from_value(&json!({
            "FilterList": {"Action": [{"Equals": "Modified"}]}
        }))
        .unwrap();
        let bare = ActivityRecordSearchFilter::from_value(&json!({
            "Action": [{"Equals": "Modified"}]
        }))
        .unwrap();
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_from_value_normalizes_loose_shapes() {
        let filter = ActivityRecordSearchFilter::from_value(&json!({
            "filterlist": {
                "who": "Administrator",
                "ACTION": ["Modified"],
                "what": {"contains": "password"},
                "RID": 12345,
                "when": ["LastSevenDays"]
            }
        }))
        .unwrap();
        let list = &filter.filter_list;
        let contains = |v: &str| FilterCondition::with_operator(FilterOperator::Contains, v);
        assert_eq!(list.who, Some(vec![contains("Administrator")]));
        assert_eq!(
            list.action,
            Some(vec![FilterCondition::with_operator(FilterOperator::Equals, "Modified")])
        );
        assert_eq!(list.what, Some(vec![contains("password")]));
        assert_eq!(list.rid, Some(vec![contains("12345")]));
        assert_eq!(list.when, Some(vec![WhenFilter::LastSevenDays]));
    }

    #[test]
    fn test_from_value_empty_condition_list_is_omitted() {
        let filter = ActivityRecordSearchFilter::from_value(&json!({"Who": [], "What": "x"})).unwrap();
        assert!(filter.filter_list.who.is_none());
        assert_eq!(
            serde_json::to_string(&filter).unwrap(),
            r#"{"FilterList":{"What":[{"Contains":"x"}]}}"#
        );
    }

    #[test]
    fn test_from_value_null_fields_are_unset() {
        let filter = ActivityRecordSearchFilter::from_value(&json!({
            "FilterList": {"Who": null, "When": null}
        }))
        .unwrap();
        assert!(filter.filter_list.is_empty());
    }

    #[test]
    fn test_from_value_rejects_unknown_field() {
        let err = ActivityRecordSearchFilter::from_value(&json!({"Whom": "x"})).unwrap_err();
        assert!(matches!(err, FilterError::UnknownField(ref f) if f == "Whom"));
    }

    #[test]
    fn test_from_value_rejects_illegal_operator() {
        let err = ActivityRecordSearchFilter::from_value(&json!({
            "FilterList": {"Action": [{"Contains": "Mod"}]}
        }))
        .unwrap_err();
        assert!(matches!(
            err,
            FilterError::IllegalOperator {
                field: FilterField::Action,
                operator: FilterOperator::Contains,
                ..
            }
        ));

        let err = ActivityRecordSearchFilter::from_value(&json!({
            "FilterList": {"Where": [{"InGroup": "Admins"}]}
        }))
        .unwrap_err();
        assert!(matches!(err, FilterError::IllegalOperator { .. }));
    }

    #[test]
    fn test_from_value_rejects_long_value() {
        let rid = "x".repeat(50);
        let err = ActivityRecordSearchFilter::from_value(&json!({"RID": rid})).unwrap_err();
        assert!(matches!(
            err,
            FilterError::ValueTooLong {
                max: 49,
                actual: 50,
                ..
            }
        ));
    }

    #[test]
    fn test_from_value_rejects_multiple_operators() {
        let err = ActivityRecordSearchFilter::from_value(&json!({
            "Who": [{"Equals": "a", "Contains": "b"}]
        }))
        .unwrap_err();
        assert!(matches!(err, FilterError::OperatorCount(2)));
    }

    #[test]
    fn test_from_value_time_filters() {
        let filter = ActivityRecordSearchFilter::from_value(&json!({
            "When": [{"from": "2025-04-18T09:16:33Z", "to": "2025-04-21T09:16:35Z"}],
            "workingHours": {"from": "09:00:00+00:00", "to": "17:00:00+00:00"}
        }))
        .unwrap();
        assert_eq!(
            serde_json::to_value(&filter.filter_list).unwrap(),
            json!({
                "When": [{"From": "2025-04-18T09:16:33Z", "To": "2025-04-21T09:16:35Z"}],
                "WorkingHours": {"From": "09:00:00+00:00", "To": "17:00:00+00:00"}
            })
        );

        assert!(ActivityRecordSearchFilter::from_value(&json!({
            "When": [{"From": "yesterday-ish"}]
        }))
        .is_err());

        let err = ActivityRecordSearchFilter::from_value(&json!({
            "WorkingHours": {"From": "09:00:00Z"}
        }))
        .unwrap_err();
        assert!(matches!(err, FilterError::MissingWorkingHours("To")));
    }

    #[test]
    fn test_from_value_rejects_non_objects() {
        assert!(matches!(
            ActivityRecordSearchFilter::from_value(&Value::Null),
            Err(FilterError::MissingFilterList)
        ));
        assert!(ActivityRecordSearchFilter::from_value(&json!("Who=admin")).is_err());
        assert!(ActivityRecordSearchFilter::from_value(&json!({"FilterList": []})).is_err());
    }

    #[test]
    fn test_strict_deserialize_rejects_unknown_fields() {
        let result: Result<FilterListDefinition, _> =
            serde_json::from_value(json!({"Whom": [{"Equals": "x"}]}));
        assert!(result.is_err());
    }
}
