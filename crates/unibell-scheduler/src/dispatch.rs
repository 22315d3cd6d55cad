//! Notification dispatch: one tick for one offset across all subscribers.
//!
//! Every subscriber is handled in isolation. A failure for one chat is
//! logged (and forwarded to the operator when unexpected) and the loop moves on.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use unibell_core::config::NotifyConfig;
use unibell_core::error::{Result, UnibellError};
use unibell_core::traits::{Messenger, ScheduleProvider, SendOutcome, SubscriptionSource};
use unibell_core::types::{CallSlot, NotifyOffset, Subscription};

use crate::render::render_notification;
use crate::window::WindowClassifier;

/// Counters for one tick.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DispatchReport {
    pub sent: usize,
    /// Not due yet, no class today, or already notified.
    pub skipped: usize,
    pub unreachable: usize,
    pub rate_limited: usize,
    pub failed: usize,
}

enum Delivery {
    Sent,
    NotDue,
    Unreachable,
    RateLimited,
}

type DeliveryKey = (i64, NaiveDate, NotifyOffset);

pub struct Dispatcher {
    schedules: Arc<dyn ScheduleProvider>,
    subscriptions: Arc<dyn SubscriptionSource>,
    messenger: Arc<dyn Messenger>,
    classifier: WindowClassifier,
    notify: NotifyConfig,
    /// Chats already notified per day and offset. Several triggers can see
    /// the same class as imminent, each chat hears about it once.
    delivered: Mutex<HashSet<DeliveryKey>>,
}

impl Dispatcher {
    pub fn new(
        bell_schedule: &[CallSlot],
        schedules: Arc<dyn ScheduleProvider>,
        subscriptions: Arc<dyn SubscriptionSource>,
        messenger: Arc<dyn Messenger>,
        notify: NotifyConfig,
    ) -> Self {
        Self {
            classifier: WindowClassifier::new(bell_schedule, notify.hidden_lesson_marker.clone()),
            schedules,
            subscriptions,
            messenger,
            notify,
            delivered: Mutex::new(HashSet::new()),
        }
    }

    /// Notify every subscriber of `offset` whose first class is imminent at `now`.
    /// Fails only when the subscriber list itself cannot be read.
    pub async fn run_tick(&self, offset: NotifyOffset, now: NaiveDateTime) -> Result<DispatchReport> {
        let subscribers = self.subscriptions.active_subscriptions(offset).await?;
        // Triggers that wrapped past midnight look at tomorrow's lessons
        let date = (now + Duration::minutes(offset.minutes())).date();
        self.forget_before(date);

        let mut report = DispatchReport::default();
        for sub in &subscribers {
            match self.notify_one(sub, offset, date, now).await {
                Ok(Delivery::Sent) => report.sent += 1,
                Ok(Delivery::NotDue) => report.skipped += 1,
                Ok(Delivery::Unreachable) => report.unreachable += 1,
                Ok(Delivery::RateLimited) => report.rate_limited += 1,
                Err(e) if e.is_transient() => {
                    tracing::warn!(chat_id = sub.chat_id, "⚠️ Notification skipped: {e}");
                    report.failed += 1;
                }
                Err(e) => {
                    tracing::error!(chat_id = sub.chat_id, "❌ Notification failed: {e}");
                    report.failed += 1;
                    self.report_to_operator(sub, offset, &e).await;
                }
            }
        }

        tracing::info!(
            offset = %offset,
            subscribers = subscribers.len(),
            sent = report.sent,
            skipped = report.skipped,
            unreachable = report.unreachable,
            rate_limited = report.rate_limited,
            failed = report.failed,
            "📣 Notification tick finished"
        );
        Ok(report)
    }

    async fn notify_one(
        &self,
        sub: &Subscription,
        offset: NotifyOffset,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Result<Delivery> {
        let key = (sub.chat_id, date, offset);
        if self.was_delivered(&key) {
            return Ok(Delivery::NotDue);
        }

        let days = self.schedules.schedule_range(sub.group_id, date, date).await?;
        let Some(day) = days.into_iter().find(|d| d.date == date) else {
            return Ok(Delivery::NotDue);
        };
        if !self.classifier.is_class_imminent(&day, now) {
            return Ok(Delivery::NotDue);
        }

        let templates = self.notify.templates_for(&sub.language_code).ok_or_else(|| {
            UnibellError::Config(format!("no templates for language '{}'", sub.language_code))
        })?;
        let text = render_notification(templates, offset, &day, &self.classifier);

        match self.messenger.send(sub.chat_id, &text).await? {
            SendOutcome::Delivered => {
                self.mark_delivered(key);
                tracing::debug!(chat_id = sub.chat_id, group_id = sub.group_id, "✅ Notified");
                Ok(Delivery::Sent)
            }
            SendOutcome::Unreachable => {
                self.subscriptions.mark_inaccessible(sub.chat_id).await?;
                Ok(Delivery::Unreachable)
            }
            SendOutcome::RateLimited { retry_after_secs } => {
                tracing::warn!(
                    chat_id = sub.chat_id,
                    retry_after_secs = ?retry_after_secs,
                    "⏳ Rate limited by {}", self.messenger.name()
                );
                Ok(Delivery::RateLimited)
            }
        }
    }

    async fn report_to_operator(&self, sub: &Subscription, offset: NotifyOffset, error: &UnibellError) {
        let text = format!(
            "Notification ({offset}) for chat {} / group {} failed: {error}",
            sub.chat_id, sub.group_id
        );
        if let Err(e) = self.messenger.notify_operator(&text).await {
            tracing::error!("❌ Operator diagnostic failed: {e}");
        }
    }

    fn was_delivered(&self, key: &DeliveryKey) -> bool {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }

    fn mark_delivered(&self, key: DeliveryKey) {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key);
    }

    fn forget_before(&self, date: NaiveDate) {
        self.delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(_, d, _)| *d >= date);
    }
}
