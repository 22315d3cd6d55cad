//! Calendar helpers for inclusive date ranges.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::BTreeMap;

use unibell_api::models::GroupScheduleDay;
use unibell_core::error::{Result, UnibellError};
use unibell_core::types::ScheduleDay;

/// Number of calendar days in `[start, end]`.
pub fn expected_days(start: NaiveDate, end: NaiveDate) -> Result<usize> {
    if end < start {
        return Err(UnibellError::InvalidInput(format!(
            "date range end {end} is before start {start}"
        )));
    }
    Ok((end - start).num_days() as usize + 1)
}

/// One row per day in `[start, end]`: days the service returned keep their
/// lessons, the rest become explicit empty days. Dates outside the range are dropped.
pub fn fill_missing_days(
    group_id: i64,
    start: NaiveDate,
    end: NaiveDate,
    fetched: Vec<GroupScheduleDay>,
    updated_at: DateTime<Utc>,
) -> Vec<ScheduleDay> {
    let mut by_date: BTreeMap<NaiveDate, GroupScheduleDay> = BTreeMap::new();
    for day in fetched {
        if day.date >= start && day.date <= end {
            by_date.insert(day.date, day);
        }
    }

    start
        .iter_days()
        .take_while(|date| *date <= end)
        .map(|date| match by_date.remove(&date) {
            Some(day) => ScheduleDay {
                group_id,
                date,
                lessons: day.lessons,
                updated_at,
            },
            None => ScheduleDay::empty(group_id, date, updated_at),
        })
        .collect()
}
