//! List-valued filter fields and their per-field constraints

use std::fmt;

use super::condition::FilterOperator;
use super::condition::FilterOperator::*;

const TEXT_OPERATORS: &[FilterOperator] =
    &[Contains, DoesNotContain, Equals, NotEqualTo, StartsWith, EndsWith];
const WHO_OPERATORS: &[FilterOperator] = &[
    Contains,
    DoesNotContain,
    Equals,
    NotEqualTo,
    StartsWith,
    EndsWith,
    InGroup,
    NotInGroup,
];
const DETAIL_OPERATORS: &[FilterOperator] = &[Contains, Equals, NotEqualTo, StartsWith, EndsWith];
const ACTION_OPERATORS: &[FilterOperator] = &[Equals, NotEqualTo];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterField {
    Rid,
    Who,
    Where,
    ObjectType,
    What,
    DataSource,
    MonitoringPlan,
    Item,
    Workstation,
    Detail,
    Before,
    After,
    Action,
}

impl FilterField {
    /// Serialization order.
    pub const ALL: [FilterField; 13] = [
        FilterField::Rid,
        FilterField::Who,
        FilterField::Where,
        FilterField::ObjectType,
        FilterField::What,
        FilterField::DataSource,
        FilterField::MonitoringPlan,
        FilterField::Item,
        FilterField::Workstation,
        FilterField::Detail,
        FilterField::Before,
        FilterField::After,
        FilterField::Action,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            FilterField::Rid => "RID",
            FilterField::Who => "Who",
            FilterField::Where => "Where",
            FilterField::ObjectType => "ObjectType",
            FilterField::What => "What",
            FilterField::DataSource => "DataSource",
            FilterField::MonitoringPlan => "MonitoringPlan",
            FilterField::Item => "Item",
            FilterField::Workstation => "Workstation",
            FilterField::Detail => "Detail",
            FilterField::Before => "Before",
            FilterField::After => "After",
            FilterField::Action => "Action",
        }
    }

    /// Case-insensitive lookup by wire name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.wire_name().eq_ignore_ascii_case(name))
    }

    /// Maximum value length in characters; `None` when unbounded.
    pub fn max_length(self) -> Option<usize> {
        match self {
            FilterField::Rid => Some(49),
            FilterField::Who
            | FilterField::Where
            | FilterField::ObjectType
            | FilterField::MonitoringPlan => Some(255),
            FilterField::What
            | FilterField::DataSource
            | FilterField::Item
            | FilterField::Workstation
            | FilterField::Detail => Some(1_073_741_822),
            FilterField::Before | FilterField::After => Some(536_870_911),
            FilterField::Action => None,
        }
    }

    pub fn operators(self) -> &'static [FilterOperator] {
        match self {
            FilterField::Who => WHO_OPERATORS,
            FilterField::Detail => DETAIL_OPERATORS,
            FilterField::Action => ACTION_OPERATORS,
            _ => TEXT_OPERATORS,
        }
    }

    pub fn supports(self, op: FilterOperator) -> bool {
        self.operators().contains(&op)
    }

    /// Operator applied to a bare value.
    pub fn default_operator(self) -> FilterOperator {
        match self {
            FilterField::Action => Equals,
            _ => Contains,
        }
    }
}

impl fmt::Display for FilterField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}
