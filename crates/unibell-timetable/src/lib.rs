//! # Unibell Timetable
//!
//! Cached gateway to the remote timetable. The only component that reads or
//! writes the schedule day store and the response cache.
//!
//! ## Freshness rules
//! ```text
//! day range  : stored rows complete and fresh → serve
//!              otherwise fetch → fill missing days → upsert all → serve
//!              fetch failed (transient) + complete rows → serve stale rows
//! generic    : cached body younger than TTL → serve
//!              otherwise fetch → decode → store → serve (undecodable: not stored)
//!              fetch failed + expired body → serve expired body
//! ```

pub mod range;
pub mod service;

pub use service::CachedScheduleService;
