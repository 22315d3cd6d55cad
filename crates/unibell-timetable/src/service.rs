//! Cached schedule service.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use std::sync::Arc;

use unibell_api::models::{
    Course, Faculty, Group, GroupScheduleDay, ScheduleExtraInfo, Student, Structure,
};
use unibell_api::{ApiRequest, ScheduleApi, decode};
use unibell_core::error::{Result, UnibellError};
use unibell_core::traits::ScheduleProvider;
use unibell_core::types::{CallSlot, ScheduleDay};
use unibell_storage::{Database, ResponseStore, ScheduleDayStore};

use crate::range::{expected_days, fill_missing_days};

/// Answers timetable questions from local storage, refreshing from the remote
/// service when data is missing or older than the TTL.
pub struct CachedScheduleService {
    api: Arc<dyn ScheduleApi>,
    days: ScheduleDayStore,
    responses: ResponseStore,
    ttl: chrono::Duration,
}

impl CachedScheduleService {
    pub fn new(api: Arc<dyn ScheduleApi>, db: Arc<Database>, ttl: std::time::Duration) -> Self {
        Self {
            api,
            days: ScheduleDayStore::new(db.clone()),
            responses: ResponseStore::new(db),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36500)),
        }
    }

    /// Schedule of `group_id` for every day in `[date_start, date_end]`.
    pub async fn get_schedule(
        &self,
        group_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Result<Vec<ScheduleDay>> {
        self.get_schedule_at(group_id, date_start, date_end, Utc::now())
            .await
    }

    /// [`Self::get_schedule`] evaluated at an explicit instant.
    pub async fn get_schedule_at(
        &self,
        group_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Vec<ScheduleDay>> {
        let expected = expected_days(date_start, date_end)?;
        let stored = self.days.query_range(group_id, date_start, date_end)?;

        let complete = stored.len() == expected;
        let stale = stored.iter().any(|day| now - day.updated_at > self.ttl);
        if complete && !stale {
            tracing::debug!(group_id, %date_start, %date_end, "Schedule cache hit");
            return Ok(stored);
        }

        tracing::debug!(
            group_id,
            %date_start,
            %date_end,
            stored = stored.len(),
            expected,
            stale,
            "Refreshing schedule range"
        );

        let request = ApiRequest::group_schedule(group_id, date_start, date_end);
        let fetched = match self.api.execute(&request).await {
            Ok(body) => decode::<Vec<GroupScheduleDay>>(&body),
            Err(e) => Err(e),
        };

        match fetched {
            Ok(fetched) => {
                let days = fill_missing_days(group_id, date_start, date_end, fetched, now);
                self.days.upsert_many(group_id, &days, now)?;
                Ok(days)
            }
            Err(e) if e.is_transient() && complete => {
                tracing::warn!(
                    group_id,
                    %date_start,
                    %date_end,
                    "⚠️ Timetable unreachable, serving stale schedule: {e}"
                );
                Ok(stored)
            }
            Err(e) => Err(e),
        }
    }

    /// Typed response for a generic endpoint through the response cache.
    pub async fn cached<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        self.cached_at(request, Utc::now()).await
    }

    /// [`Self::cached`] evaluated at an explicit instant.
    ///
    /// Only bodies that decode as `T` are stored. A 2xx body that does not
    /// decode is a protocol failure and never replaces a cached entry.
    pub async fn cached_at<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        now: DateTime<Utc>,
    ) -> Result<T> {
        let key = request.fingerprint();
        let expired = match self.responses.get(&key)? {
            Some(cached) if cached.age(now) <= self.ttl => match decode(&cached.body) {
                Ok(value) => {
                    tracing::debug!("Response cache hit: {request}");
                    return Ok(value);
                }
                Err(e) => {
                    tracing::warn!("Dropping undecodable cache entry for {request}: {e}");
                    self.responses.delete(&key)?;
                    None
                }
            },
            Some(cached) => {
                self.responses.delete(&key)?;
                Some(cached)
            }
            None => None,
        };

        let fetched = match self.api.execute(request).await {
            Ok(body) => decode::<T>(&body).map(|value| (body, value)),
            Err(e) => Err(e),
        };

        match fetched {
            Ok((body, value)) => {
                self.responses.put(&key, &body, now)?;
                Ok(value)
            }
            // The service rejected the request itself; an old answer would hide that
            Err(e @ UnibellError::RemoteRequest { .. }) => Err(e),
            Err(e) => match expired.map(|cached| decode::<T>(&cached.body)) {
                Some(Ok(value)) => {
                    tracing::warn!("⚠️ {request} failed, serving expired response: {e}");
                    Ok(value)
                }
                _ => Err(e),
            },
        }
    }

    /// The bell schedule, ordered by period number.
    pub async fn get_call_schedule(&self) -> Result<Vec<CallSlot>> {
        let mut slots: Vec<CallSlot> = self.cached(&ApiRequest::call_schedule()).await?;
        slots.sort_by_key(|slot| slot.number);
        Ok(slots)
    }

    pub async fn structures(&self) -> Result<Vec<Structure>> {
        self.cached(&ApiRequest::structures()).await
    }

    pub async fn faculties(&self, structure_id: i64) -> Result<Vec<Faculty>> {
        self.cached(&ApiRequest::faculties(structure_id)).await
    }

    pub async fn courses(&self, faculty_id: i64) -> Result<Vec<Course>> {
        self.cached(&ApiRequest::courses(faculty_id)).await
    }

    pub async fn groups(&self, faculty_id: i64, course: u32) -> Result<Vec<Group>> {
        self.cached(&ApiRequest::groups(faculty_id, course)).await
    }

    pub async fn students(&self, group_id: i64) -> Result<Vec<Student>> {
        self.cached(&ApiRequest::students(group_id)).await
    }

    pub async fn schedule_extra_info(
        &self,
        group_id: i64,
        date: NaiveDate,
        lesson_number: u32,
    ) -> Result<ScheduleExtraInfo> {
        self.cached(&ApiRequest::schedule_extra_info(group_id, date, lesson_number))
            .await
    }
}

#[async_trait]
impl ScheduleProvider for CachedScheduleService {
    async fn schedule_range(
        &self,
        group_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Result<Vec<ScheduleDay>> {
        self.get_schedule(group_id, date_start, date_end).await
    }
}
