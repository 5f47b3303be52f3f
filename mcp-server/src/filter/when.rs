//! Time filters: `When` periods/ranges and the `WorkingHours` interval

use chrono::{DateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::FilterError;

/// Wire shape shared by every `When` variant.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawWhen {
    #[serde(rename = "Today", default, skip_serializing_if = "Option::is_none")]
    today: Option<String>,
    #[serde(rename = "Yesterday", default, skip_serializing_if = "Option::is_none")]
    yesterday: Option<String>,
    #[serde(rename = "LastSevenDays", default, skip_serializing_if = "Option::is_none")]
    last_seven_days: Option<String>,
    #[serde(rename = "LastThirtyDays", default, skip_serializing_if = "Option::is_none")]
    last_thirty_days: Option<String>,
    #[serde(rename = "From", default, skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(rename = "To", default, skip_serializing_if = "Option::is_none")]
    to: Option<String>,
}

/// Wire names recognized inside a `When` object.
pub const WHEN_KEYS: [&str; 6] = ["Today", "Yesterday", "LastSevenDays", "LastThirtyDays", "From", "To"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawWhen", into = "RawWhen")]
pub enum WhenFilter {
    Today,
    Yesterday,
    LastSevenDays,
    LastThirtyDays,
    /// Explicit range; at least one bound is set.
    Range {
        from: Option<String>,
        to: Option<String>,
    },
}

impl WhenFilter {
    pub fn range(from: Option<&str>, to: Option<&str>) -> Result<Self, FilterError> {
        let when = WhenFilter::Range {
            from: from.map(str::to_string),
            to: to.map(str::to_string),
        };
        when.validate()?;
        Ok(when)
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if let WhenFilter::Range { from, to } = self {
            if from.is_none() && to.is_none() {
                return Err(FilterError::EmptyRange);
            }
            for bound in [from, to].into_iter().flatten() {
                DateTime::parse_from_rfc3339(bound).map_err(|e| FilterError::InvalidTimestamp {
                    value: bound.clone(),
                    reason: e.to_string(),
                })?;
            }
        }
        Ok(())
    }
}

impl TryFrom<RawWhen> for WhenFilter {
    type Error = FilterError;

    fn try_from(raw: RawWhen) -> Result<Self, Self::Error> {
        let periods = [
            (raw.today.is_some(), WhenFilter::Today),
            (raw.yesterday.is_some(), WhenFilter::Yesterday),
            (raw.last_seven_days.is_some(), WhenFilter::LastSevenDays),
            (raw.last_thirty_days.is_some(), WhenFilter::LastThirtyDays),
        ];
        let mut set: Vec<WhenFilter> = periods
            .into_iter()
            .filter_map(|(present, when)| present.then_some(when))
            .collect();
        let has_range = raw.from.is_some() || raw.to.is_some();

        match (set.len(), has_range) {
            (0, true) => WhenFilter::range(raw.from.as_deref(), raw.to.as_deref()),
            (1, false) => Ok(set.remove(0)),
            (0, false) => Err(FilterError::EmptyRange),
            _ => Err(FilterError::AmbiguousWhen),
        }
    }
}

impl From<WhenFilter> for RawWhen {
    fn from(when: WhenFilter) -> Self {
        let marker = Some(String::new());
        match when {
            WhenFilter::Today => RawWhen {
                today: marker,
                ..Default::default()
            },
            WhenFilter::Yesterday => RawWhen {
                yesterday: marker,
                ..Default::default()
            },
            WhenFilter::LastSevenDays => RawWhen {
                last_seven_days: marker,
                ..Default::default()
            },
            WhenFilter::LastThirtyDays => RawWhen {
                last_thirty_days: marker,
                ..Default::default()
            },
            WhenFilter::Range { from, to } => RawWhen {
                from,
                to,
                ..Default::default()
            },
        }
    }
}

/// Time-of-day interval; both bounds required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkingHoursFilter {
    #[serde(rename = "From")]
    pub from: String,
    #[serde(rename = "To")]
    pub to: String,
}

impl WorkingHoursFilter {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FilterError> {
        if self.from.trim().is_empty() {
            return Err(FilterError::MissingWorkingHours("From"));
        }
        if self.to.trim().is_empty() {
            return Err(FilterError::MissingWorkingHours("To"));
        }
        check_time_of_day(&self.from)?;
        check_time_of_day(&self.to)
    }
}

/// `HH:MM:SS` followed by `Z` or a `+HH:MM`/`-HH:MM` offset.
fn check_time_of_day(value: &str) -> Result<(), FilterError> {
    let invalid = || FilterError::InvalidTimeOfDay(value.to_string());
    if !value.is_ascii() || value.len() < 9 {
        return Err(invalid());
    }
    let (time, zone) = value.split_at(8);
    NaiveTime::parse_from_str(time, "%H:%M:%S").map_err(|_| invalid())?;

    if zone == "Z" {
        return Ok(());
    }
    let (sign, offset) = zone.split_at(1);
    if !matches!(sign, "+" | "-") || offset.len() != 5 {
        return Err(invalid());
    }
    let (hours, minutes) = offset.split_once(':').ok_or_else(invalid)?;
    let hours: u32 = hours.parse().map_err(|_| invalid())?;
    let minutes: u32 = minutes.parse().map_err(|_| invalid())?;
    if hours > 14 || minutes > 59 {
        return Err(invalid());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_period_serializes_with_placeholder() {
        let v = serde_json::to_value(WhenFilter::LastSevenDays).unwrap();
        assert_eq!(v, json!({"LastSevenDays": ""}));
    }

    #[test]
    fn test_period_placeholder_is_ignored() {
        let w: WhenFilter = serde_json::from_value(json!({"Today": "whatever"})).unwrap();
        assert_eq!(w, WhenFilter::Today);
    }

    #[test]
    fn test_range_accepts_utc_and_offset() {
        let w: WhenFilter = serde_json::from_value(json!({
            "From": "2025-04-18T09:16:33Z",
            "To": "2025-04-21T09:16:35+03:00"
        }))
        .unwrap();
        assert!(matches!(w, WhenFilter::Range { .. }));

        let only_from = WhenFilter::range(Some("2025-04-18T09:16:33-05:00"), None).unwrap();
        assert_eq!(
            serde_json::to_value(only_from).unwrap(),
            json!({"From": "2025-04-18T09:16:33-05:00"})
        );
    }

    #[test]
    fn test_range_rejects_bad_timestamp() {
        assert!(matches!(
            WhenFilter::range(Some("2025-04-18 09:16"), None),
            Err(FilterError::InvalidTimestamp { .. })
        ));
        assert!(matches!(WhenFilter::range(None, None), Err(FilterError::EmptyRange)));
    }

    #[test]
    fn test_mixed_period_and_range_is_ambiguous() {
        let raw = RawWhen {
            today: Some(String::new()),
            from: Some("2025-04-18T09:16:33Z".into()),
            ..Default::default()
        };
        assert!(matches!(WhenFilter::try_from(raw), Err(FilterError::AmbiguousWhen)));
    }

    #[test]
    fn test_working_hours_formats() {
        assert!(WorkingHoursFilter::new("09:00:00Z", "17:00:00Z").validate().is_ok());
        assert!(WorkingHoursFilter::new("09:00:00+00:00", "17:30:00-05:00")
            .validate()
            .is_ok());
        assert!(matches!(
            WorkingHoursFilter::new("9:00", "17:00:00Z").validate(),
            Err(FilterError::InvalidTimeOfDay(_))
        ));
        assert!(matches!(
            WorkingHoursFilter::new("09:00:00", "17:00:00Z").validate(),
            Err(FilterError::InvalidTimeOfDay(_))
        ));
        assert!(matches!(
            WorkingHoursFilter::new("25:00:00Z", "17:00:00Z").validate(),
            Err(FilterError::InvalidTimeOfDay(_))
        ));
        assert!(matches!(
            WorkingHoursFilter::new("", "17:00:00Z").validate(),
            Err(FilterError::MissingWorkingHours("From"))
        ));
    }
}
