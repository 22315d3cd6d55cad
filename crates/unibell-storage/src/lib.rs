//! # Unibell Storage
//!
//! SQLite-backed persistence that survives restarts:
//! - `response_cache`: request fingerprint → (body, created_at)
//! - `schedule_days`: (group_id, date) → lessons + updated_at
//! - `chats`: notification subscribers and their reachability flag

pub mod chats;
pub mod database;
pub mod days;
pub mod responses;

pub use chats::ChatStore;
pub use database::Database;
pub use days::ScheduleDayStore;
pub use responses::{CachedResponse, ResponseStore};
