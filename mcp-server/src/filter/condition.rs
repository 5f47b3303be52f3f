//! A single `{"Operator": "value"}` filter condition

use std::fmt;
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use super::FilterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOperator {
    Contains,
    DoesNotContain,
    Equals,
    NotEqualTo,
    StartsWith,
    EndsWith,
    InGroup,
    NotInGroup,
}

impl FilterOperator {
    pub const ALL: [FilterOperator; 8] = [
        FilterOperator::Contains,
        FilterOperator::DoesNotContain,
        FilterOperator::Equals,
        FilterOperator::NotEqualTo,
        FilterOperator::StartsWith,
        FilterOperator::EndsWith,
        FilterOperator::InGroup,
        FilterOperator::NotInGroup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterOperator::Contains => "Contains",
            FilterOperator::DoesNotContain => "DoesNotContain",
            FilterOperator::Equals => "Equals",
            FilterOperator::NotEqualTo => "NotEqualTo",
            FilterOperator::StartsWith => "StartsWith",
            FilterOperator::EndsWith => "EndsWith",
            FilterOperator::InGroup => "InGroup",
            FilterOperator::NotInGroup => "NotInGroup",
        }
    }
}

impl fmt::Display for FilterOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FilterOperator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        if name.is_empty() {
            return Err(FilterError::EmptyOperator);
        }
        Self::ALL
            .into_iter()
            .find(|op| op.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| FilterError::UnknownOperator(name.to_string()))
    }
}

/// Serialized as a one-key object, e.g. `{"Equals": "admin"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Map<String, Value>")]
pub struct FilterCondition {
    pub operator: FilterOperator,
    pub value: String,
}

impl FilterCondition {
    pub fn with_operator(operator: FilterOperator, value: impl Into<String>) -> Self {
        Self {
            operator,
            value: value.into(),
        }
    }

    /// Parse an operator by name. An empty name is rejected.
    pub fn named(operator: &str, value: impl Into<String>) -> Result<Self, FilterError> {
        Ok(Self::with_operator(operator.parse()?, value))
    }
}

impl Serialize for FilterCondition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.operator.as_str(), &self.value)?;
        map.end()
    }
}

impl TryFrom<Map<String, Value>> for FilterCondition {
    type Error = FilterError;

    fn try_from(map: Map<String, Value>) -> Result<Self, Self::Error> {
        if map.len() != 1 {
            return Err(FilterError::OperatorCount(map.len()));
        }
        let Some((name, value)) = map.into_iter().next() else {
            return Err(FilterError::OperatorCount(0));
        };
        let value = match value {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => String::new(),
            other => {
                return Err(FilterError::Malformed(format!(
                    "value for operator '{name}' must be a string, found {other}"
                )))
            }
        };
        Self::named(&name, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterField;
    use serde_json::json;

    #[test]
    fn test_default_operator_is_contains() {
        let c = FilterCondition::with_operator(FilterField::Who.default_operator(), "admin");
        assert_eq!(serde_json::to_value(&c).unwrap(), json!({"Contains": "admin"}));
    }

    #[test]
    fn test_parse_operator_ignores_case() {
        assert_eq!("notequalto".parse::<FilterOperator>().unwrap(), FilterOperator::NotEqualTo);
        assert!(matches!(
            "Like".parse::<FilterOperator>(),
            Err(FilterError::UnknownOperator(_))
        ));
        assert!(matches!(" ".parse::<FilterOperator>(), Err(FilterError::EmptyOperator)));
    }

    #[test]
    fn test_deserialize_exactly_one_key() {
        let c: FilterCondition = serde_json::from_value(json!({"StartsWith": "Server-"})).unwrap();
        assert_eq!(c, FilterCondition::with_operator(FilterOperator::StartsWith, "Server-"));

        assert!(serde_json::from_value::<FilterCondition>(json!({})).is_err());
        assert!(
            serde_json::from_value::<FilterCondition>(json!({"Equals": "a", "Contains": "b"}))
                .is_err()
        );
    }

    #[test]
    fn test_try_from_reports_key_count() {
        let mut map = Map::new();
        map.insert("Equals".into(), json!("a"));
        map.insert("Contains".into(), json!("b"));
        assert!(matches!(
            FilterCondition::try_from(map),
            Err(FilterError::OperatorCount(2))
        ));
    }

    #[test]
    fn test_scalar_values_are_stringified() {
        let c: FilterCondition = serde_json::from_value(json!({"Equals": 42})).unwrap();
        assert_eq!(c.value, "42");
    }
}
