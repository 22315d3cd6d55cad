//! Timetable data model shared across crates.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::UnibellError;

/// One discipline taught during a lesson. A lesson can hold several periods
/// when a group is split into subgroups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(default)]
    pub discipline_name: String,
    #[serde(default)]
    pub discipline_full_name: String,
    /// Wall-clock start as printed by the upstream service (HH:MM).
    #[serde(default)]
    pub time_start: String,
    #[serde(default)]
    pub time_end: String,
    #[serde(default)]
    pub teachers_name: Vec<String>,
    #[serde(default)]
    pub classroom: Option<String>,
    #[serde(default)]
    pub type_name: Option<String>,
    #[serde(default)]
    pub has_extra_text: bool,
}

impl Period {
    /// Short name when present, full name otherwise.
    pub fn display_name(&self) -> &str {
        if self.discipline_name.is_empty() {
            &self.discipline_full_name
        } else {
            &self.discipline_name
        }
    }
}

/// A numbered lesson within a day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    /// 1-based period index, matches [`CallSlot::number`].
    pub number: u32,
    #[serde(default)]
    pub periods: Vec<Period>,
}

impl Lesson {
    pub fn primary_period(&self) -> Option<&Period> {
        self.periods.first()
    }
}

/// Lessons of one group on one calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleDay {
    pub group_id: i64,
    pub date: NaiveDate,
    pub lessons: Vec<Lesson>,
    pub updated_at: DateTime<Utc>,
}

impl ScheduleDay {
    /// A fetched day with no lessons. Distinguishes "free day" from "never fetched".
    pub fn empty(group_id: i64, date: NaiveDate, updated_at: DateTime<Utc>) -> Self {
        Self {
            group_id,
            date,
            lessons: Vec::new(),
            updated_at,
        }
    }
}

/// Wall-clock bounds of a numbered period, shared by all groups and days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSlot {
    pub number: u32,
    #[serde(with = "hhmm")]
    pub time_start: NaiveTime,
    #[serde(with = "hhmm")]
    pub time_end: NaiveTime,
}

impl CallSlot {
    pub fn start_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.time_start)
    }

    pub fn end_on(&self, date: NaiveDate) -> NaiveDateTime {
        date.and_time(self.time_end)
    }
}

/// Supported notification lead times.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum NotifyOffset {
    FifteenMinutes,
    OneMinute,
}

impl NotifyOffset {
    pub const ALL: [NotifyOffset; 2] = [NotifyOffset::FifteenMinutes, NotifyOffset::OneMinute];

    pub fn minutes(&self) -> i64 {
        match self {
            NotifyOffset::FifteenMinutes => 15,
            NotifyOffset::OneMinute => 1,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            NotifyOffset::FifteenMinutes => "15m",
            NotifyOffset::OneMinute => "1m",
        }
    }
}

impl fmt::Display for NotifyOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for NotifyOffset {
    type Err = UnibellError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "15m" => Ok(NotifyOffset::FifteenMinutes),
            "1m" => Ok(NotifyOffset::OneMinute),
            other => Err(UnibellError::Config(format!(
                "unsupported notification offset '{other}' (expected \"15m\" or \"1m\")"
            ))),
        }
    }
}

impl Serialize for NotifyOffset {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for NotifyOffset {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A chat subscribed to lesson notifications. Pulled fresh on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    pub chat_id: i64,
    pub group_id: i64,
    pub language_code: String,
    pub offset: NotifyOffset,
}

/// Serde adapter for `HH:MM` wall-clock times.
pub mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    const FORMAT: &str = "%H:%M";

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(serde::de::Error::custom)
    }

    /// Accepts `HH:MM` and `HH:MM:SS`.
    pub fn parse(raw: &str) -> Result<NaiveTime, chrono::ParseError> {
        NaiveTime::parse_from_str(raw.trim(), FORMAT)
            .or_else(|_| NaiveTime::parse_from_str(raw.trim(), "%H:%M:%S"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_parse() {
        assert_eq!("15m".parse::<NotifyOffset>().unwrap(), NotifyOffset::FifteenMinutes);
        assert_eq!(" 1m ".parse::<NotifyOffset>().unwrap(), NotifyOffset::OneMinute);
        let err = "5m".parse::<NotifyOffset>().unwrap_err();
        assert!(matches!(err, UnibellError::Config(_)));
    }

    #[test]
    fn test_offset_serde_uses_label() {
        let json = serde_json::to_string(&NotifyOffset::OneMinute).unwrap();
        assert_eq!(json, "\"1m\"");
        let back: NotifyOffset = serde_json::from_str("\"15m\"").unwrap();
        assert_eq!(back, NotifyOffset::FifteenMinutes);
        assert!(serde_json::from_str::<NotifyOffset>("\"2h\"").is_err());
    }

    #[test]
    fn test_call_slot_from_json() {
        let slot: CallSlot =
            serde_json::from_str(r#"{"number": 2, "timeStart": "10:00", "timeEnd": "11:20:00"}"#)
                .unwrap();
        assert_eq!(slot.number, 2);
        assert_eq!(slot.time_start, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
        assert_eq!(slot.time_end, NaiveTime::from_hms_opt(11, 20, 0).unwrap());
        let out = serde_json::to_value(slot).unwrap();
        assert_eq!(out["timeStart"], "10:00");
    }

    #[test]
    fn test_period_defaults() {
        let lesson: Lesson =
            serde_json::from_str(r#"{"number": 1, "periods": [{"disciplineFullName": "Physics"}]}"#)
                .unwrap();
        let period = lesson.primary_period().unwrap();
        assert_eq!(period.display_name(), "Physics");
        assert!(!period.has_extra_text);
        assert!(period.teachers_name.is_empty());
    }
}
