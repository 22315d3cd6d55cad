//! Collaborator seams between the timetable cache, the notification
//! scheduler and the outside world.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::Result;
use crate::types::{NotifyOffset, ScheduleDay, Subscription};

/// Result of a single delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Delivered,
    /// Recipient blocked the bot or no longer exists. Never retried.
    Unreachable,
    /// Transport asked us to slow down. Tick-local, no backoff state kept.
    RateLimited { retry_after_secs: Option<u64> },
}

/// Outbound messaging transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    fn name(&self) -> &str;

    /// Send a text message to a chat.
    async fn send(&self, chat_id: i64, text: &str) -> Result<SendOutcome>;

    /// Forward a diagnostic to the operator channel, if one is configured.
    async fn notify_operator(&self, text: &str) -> Result<()>;
}

/// Source of notification subscribers.
#[async_trait]
pub trait SubscriptionSource: Send + Sync {
    /// Active, reachable subscriptions for one offset.
    async fn active_subscriptions(&self, offset: NotifyOffset) -> Result<Vec<Subscription>>;

    /// Durably flag a chat as unreachable so it is skipped from now on.
    async fn mark_inaccessible(&self, chat_id: i64) -> Result<()>;
}

/// Day-range schedule lookup.
#[async_trait]
pub trait ScheduleProvider: Send + Sync {
    /// Days for `group_id` over `[date_start, date_end]`, ordered by date.
    async fn schedule_range(
        &self,
        group_id: i64,
        date_start: NaiveDate,
        date_end: NaiveDate,
    ) -> Result<Vec<ScheduleDay>>;
}
