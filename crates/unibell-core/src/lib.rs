//! # Unibell Core
//!
//! Shared data model, error taxonomy, configuration and the collaborator
//! traits that tie the timetable cache to the notification scheduler.

pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use config::UnibellConfig;
pub use error::{Result, UnibellError};
pub use traits::{Messenger, ScheduleProvider, SendOutcome, SubscriptionSource};
pub use types::{CallSlot, Lesson, NotifyOffset, Period, ScheduleDay, Subscription};
