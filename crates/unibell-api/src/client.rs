//! reqwest-backed implementation of [`ScheduleApi`].

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use std::time::Duration;

use unibell_core::config::ApiConfig;
use unibell_core::error::{Result, UnibellError};
use unibell_core::types::CallSlot;

use crate::models::{
    ApiErrorBody, Course, Faculty, Group, GroupScheduleDay, ScheduleExtraInfo, Student, Structure,
};
use crate::request::{ApiRequest, HttpMethod};
use crate::{ScheduleApi, decode};

/// HTTP client for the timetable service.
#[derive(Debug, Clone)]
pub struct HttpScheduleApi {
    client: reqwest::Client,
    base_url: String,
}

impl HttpScheduleApi {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UnibellError::Config(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        Self::new(&config.base_url, Duration::from_secs(config.timeout_secs))
    }

    async fn fetch<T: DeserializeOwned>(&self, request: &ApiRequest) -> Result<T> {
        let body = self.execute(request).await?;
        decode(&body)
    }

    pub async fn structures(&self) -> Result<Vec<Structure>> {
        self.fetch(&ApiRequest::structures()).await
    }

    pub async fn faculties(&self, structure_id: i64) -> Result<Vec<Faculty>> {
        self.fetch(&ApiRequest::faculties(structure_id)).await
    }

    pub async fn courses(&self, faculty_id: i64) -> Result<Vec<Course>> {
        self.fetch(&ApiRequest::courses(faculty_id)).await
    }

    pub async fn groups(&self, faculty_id: i64, course: u32) -> Result<Vec<Group>> {
        self.fetch(&ApiRequest::groups(faculty_id, course)).await
    }

    pub async fn students(&self, group_id: i64) -> Result<Vec<Student>> {
        self.fetch(&ApiRequest::students(group_id)).await
    }

    pub async fn call_schedule(&self) -> Result<Vec<CallSlot>> {
        self.fetch(&ApiRequest::call_schedule()).await
    }

    pub async fn group_schedule(
        &self,
        group_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Result<Vec<GroupScheduleDay>> {
        self.fetch(&ApiRequest::group_schedule(group_id, date_start, date_end))
            .await
    }

    pub async fn schedule_extra_info(
        &self,
        group_id: i64,
        date: NaiveDate,
        lesson_number: u32,
    ) -> Result<ScheduleExtraInfo> {
        self.fetch(&ApiRequest::schedule_extra_info(group_id, date, lesson_number))
            .await
    }
}

#[async_trait]
impl ScheduleApi for HttpScheduleApi {
    async fn execute(&self, request: &ApiRequest) -> Result<Vec<u8>> {
        let url = format!("{}{}", self.base_url, request.path);
        let mut req = match request.method {
            HttpMethod::Get => self.client.get(&url),
            HttpMethod::Post => self.client.post(&url),
        };
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if let Some(body) = &request.body {
            req = req
                .header("Content-Type", "application/json")
                .body(body.clone());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| UnibellError::Transient(format!("{request} failed: {e}")))?;

        let status = resp.status();
        let bytes = resp
            .bytes()
            .await
            .map_err(|e| UnibellError::Transient(format!("{request} body read failed: {e}")))?;
        tracing::debug!(status = %status, len = bytes.len(), "{request}");

        if status.is_success() {
            return Ok(bytes.to_vec());
        }
        Err(error_from_response(status, &bytes))
    }
}

/// Map a non-success status to the error taxonomy.
///
/// A JSON body means the service itself rejected the request. A 5xx without
/// one comes from a proxy in front of an unavailable service.
fn error_from_response(status: reqwest::StatusCode, body: &[u8]) -> UnibellError {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(parsed) => {
            if let Ok(ApiErrorBody { message: Some(message) }) =
                serde_json::from_value::<ApiErrorBody>(parsed.clone())
            {
                tracing::warn!(status = %status, "Timetable API rejected request: {message}");
            }
            UnibellError::RemoteRequest {
                status_code: status.as_u16(),
                body: parsed,
            }
        }
        Err(_) if status.is_server_error() => UnibellError::Transient(format!(
            "Timetable API unavailable ({status})"
        )),
        Err(_) => UnibellError::RemoteRequest {
            status_code: status.as_u16(),
            body: serde_json::Value::String(String::from_utf8_lossy(body).into_owned()),
        },
    }
}
