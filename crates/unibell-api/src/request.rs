//! Request descriptions for every upstream endpoint, plus the fingerprint
//! used as the response cache key.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
        }
    }
}

/// One upstream request, independent of the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiRequest {
    pub method: HttpMethod,
    /// Path relative to the API base URL, always starting with `/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

impl ApiRequest {
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn with_query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn structures() -> Self {
        Self::get("/structures")
    }

    pub fn faculties(structure_id: i64) -> Self {
        Self::get(format!("/structures/{structure_id}/faculties"))
    }

    pub fn courses(faculty_id: i64) -> Self {
        Self::get(format!("/faculties/{faculty_id}/courses"))
    }

    pub fn groups(faculty_id: i64, course: u32) -> Self {
        Self::get(format!("/faculties/{faculty_id}/courses/{course}/groups"))
    }

    pub fn students(group_id: i64) -> Self {
        Self::get(format!("/groups/{group_id}/students"))
    }

    pub fn call_schedule() -> Self {
        Self::get("/call-schedule")
    }

    pub fn group_schedule(group_id: i64, date_start: NaiveDate, date_end: NaiveDate) -> Self {
        Self::get(format!("/groups/{group_id}/schedule"))
            .with_query("dateStart", date_start.format("%Y-%m-%d"))
            .with_query("dateEnd", date_end.format("%Y-%m-%d"))
    }

    pub fn schedule_extra_info(group_id: i64, date: NaiveDate, lesson_number: u32) -> Self {
        Self::get(format!("/groups/{group_id}/schedule/extra-info"))
            .with_query("date", date.format("%Y-%m-%d"))
            .with_query("lessonNumber", lesson_number)
    }

    /// Stable, collision-resistant cache key.
    ///
    /// Every component is length-prefixed so that `/a` + `b` and `/ab` + ``
    /// never hash alike; query pairs are sorted so parameter order is irrelevant.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        let mut feed = |part: &[u8]| {
            hasher.update((part.len() as u64).to_le_bytes());
            hasher.update(part);
        };
        feed(self.method.to_string().as_bytes());
        feed(self.path.as_bytes());

        let mut query = self.query.clone();
        query.sort();
        for (key, value) in &query {
            feed(key.as_bytes());
            feed(value.as_bytes());
        }
        feed(self.body.as_deref().unwrap_or_default());

        format!("{:x}", hasher.finalize())
    }
}

impl fmt::Display for ApiRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)?;
        for (i, (key, value)) in self.query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{key}={value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_schedule_request() {
        let start = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 3, 8).unwrap();
        let req = ApiRequest::group_schedule(512, start, end);
        assert_eq!(req.path, "/groups/512/schedule");
        assert_eq!(
            req.to_string(),
            "GET /groups/512/schedule?dateStart=2026-03-02&dateEnd=2026-03-08"
        );
    }

    #[test]
    fn test_fingerprint_stable_and_order_independent() {
        let a = ApiRequest::get("/x").with_query("a", 1).with_query("b", 2);
        let b = ApiRequest::get("/x").with_query("b", 2).with_query("a", 1);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().len(), 64);
    }

    #[test]
    fn test_fingerprint_distinguishes_similar_requests() {
        // Naive concatenation of path and body would collide here
        let mut with_body = ApiRequest::get("/groups/1");
        with_body.body = Some(b"2".to_vec());
        let longer_path = ApiRequest::get("/groups/12");
        assert_ne!(with_body.fingerprint(), longer_path.fingerprint());

        assert_ne!(
            ApiRequest::faculties(1).fingerprint(),
            ApiRequest::courses(1).fingerprint()
        );
        let mut post = ApiRequest::structures();
        post.method = HttpMethod::Post;
        assert_ne!(post.fingerprint(), ApiRequest::structures().fingerprint());
    }
}
