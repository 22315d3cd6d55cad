//! Schedule day store: one row per (group, calendar day).
//!
//! Range queries may return fewer rows than days requested; callers detect
//! gaps by counting. Batches are written inside a single transaction.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use std::sync::Arc;

use unibell_core::error::{Result, UnibellError};
use unibell_core::types::{Lesson, ScheduleDay};

use crate::database::{Database, parse_timestamp};

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone)]
pub struct ScheduleDayStore {
    db: Arc<Database>,
}

impl ScheduleDayStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Stored days for `group_id` within `[date_start, date_end]`, ordered by date.
    ///
    /// Rows that cannot be decoded are left out, so they show up as gaps.
    pub fn query_range(
        &self,
        group_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Result<Vec<ScheduleDay>> {
        let conn = self.db.lock()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, lessons, updated_at FROM schedule_days
                 WHERE group_id = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date",
            )
            .map_err(|e| UnibellError::Storage(format!("Prepare range query: {e}")))?;

        let rows = stmt
            .query_map(
                params![
                    group_id,
                    date_start.format(DATE_FORMAT).to_string(),
                    date_end.format(DATE_FORMAT).to_string(),
                ],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                },
            )
            .map_err(|e| UnibellError::Storage(format!("Range query: {e}")))?;

        let mut days = Vec::new();
        for row in rows {
            let (date, lessons, updated_at) =
                row.map_err(|e| UnibellError::Storage(format!("Read day row: {e}")))?;
            match decode_row(group_id, &date, &lessons, &updated_at) {
                Some(day) => days.push(day),
                None => tracing::warn!(group_id, date = %date, "⚠️ Skipping undecodable schedule row"),
            }
        }
        Ok(days)
    }

    /// Replace the given days atomically, stamping each with `updated_at`.
    pub fn upsert_many(
        &self,
        group_id: i64,
        days: &[ScheduleDay],
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let mut conn = self.db.lock()?;
        let tx = conn
            .transaction()
            .map_err(|e| UnibellError::Storage(format!("Begin transaction: {e}")))?;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR REPLACE INTO schedule_days (group_id, date, lessons, updated_at)
                     VALUES (?1, ?2, ?3, ?4)",
                )
                .map_err(|e| UnibellError::Storage(format!("Prepare upsert: {e}")))?;
            let stamp = updated_at.to_rfc3339();
            for day in days {
                let lessons = serde_json::to_string(&day.lessons)?;
                stmt.execute(params![
                    group_id,
                    day.date.format(DATE_FORMAT).to_string(),
                    lessons,
                    stamp,
                ])
                .map_err(|e| UnibellError::Storage(format!("Upsert day {}: {e}", day.date)))?;
            }
        }
        tx.commit()
            .map_err(|e| UnibellError::Storage(format!("Commit: {e}")))?;
        tracing::debug!(group_id, count = days.len(), "💾 Stored schedule days");
        Ok(())
    }
}

fn decode_row(group_id: i64, date: &str, lessons: &str, updated_at: &str) -> Option<ScheduleDay> {
    let date = NaiveDate::parse_from_str(date, DATE_FORMAT).ok()?;
    let lessons: Vec<Lesson> = serde_json::from_str(lessons).ok()?;
    let updated_at = parse_timestamp(updated_at)?;
    Some(ScheduleDay {
        group_id,
        date,
        lessons,
        updated_at,
    })
}
