//! Notifier: the worker that sleeps until the next trigger time and runs a
//! dispatch tick for every offset due at it. Ticks never overlap.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use unibell_core::config::NotifyConfig;
use unibell_core::error::Result;
use unibell_core::traits::{Messenger, ScheduleProvider, SubscriptionSource};
use unibell_core::types::CallSlot;

use crate::clock::WallClock;
use crate::dispatch::Dispatcher;
use crate::triggers::{TriggerPlan, derive_trigger_times};

/// Longest single sleep. Wall-clock jumps are picked up within this bound.
const MAX_SLEEP: Duration = Duration::from_secs(60);

/// Handle to a running notifier.
pub struct Notifier {
    plan: TriggerPlan,
    stop_tx: watch::Sender<bool>,
    worker: JoinHandle<()>,
}

impl Notifier {
    /// Derive trigger times from the bell schedule and spawn the worker.
    /// Must be called inside a tokio runtime.
    pub fn start(
        bell_schedule: Vec<CallSlot>,
        subscriptions: Arc<dyn SubscriptionSource>,
        messenger: Arc<dyn Messenger>,
        schedules: Arc<dyn ScheduleProvider>,
        config: &NotifyConfig,
    ) -> Result<Self> {
        let offsets = config.parsed_offsets()?;
        let plan = derive_trigger_times(&bell_schedule, &offsets)?;
        let clock = WallClock::from_config(config)?;
        let dispatcher = Dispatcher::new(
            &bell_schedule,
            schedules,
            subscriptions,
            messenger.clone(),
            config.clone(),
        );

        tracing::info!(
            "⏰ Notifier started via {} ({})",
            messenger.name(),
            plan.describe()
        );

        let (stop_tx, stop_rx) = watch::channel(false);
        let worker = tokio::spawn(run_loop(plan.clone(), dispatcher, clock, stop_rx));
        Ok(Self {
            plan,
            stop_tx,
            worker,
        })
    }

    pub fn plan(&self) -> &TriggerPlan {
        &self.plan
    }

    /// Signal the worker and wait for it. A tick in progress runs to completion.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(e) = self.worker.await {
            tracing::error!("Notifier worker ended abnormally: {e}");
        }
        tracing::info!("⏹️ Notifier stopped");
    }
}

async fn run_loop(
    plan: TriggerPlan,
    dispatcher: Dispatcher,
    clock: WallClock,
    mut stop_rx: watch::Receiver<bool>,
) {
    let mut cursor = clock.now();
    loop {
        if *stop_rx.borrow() {
            break;
        }
        let Some(trigger) = plan.next_after(cursor) else {
            tracing::warn!("No trigger times left, notifier idle");
            break;
        };

        let now = clock.now();
        if trigger.at > now {
            let remaining = (trigger.at - now).to_std().unwrap_or(Duration::ZERO);
            tokio::select! {
                _ = tokio::time::sleep(remaining.min(MAX_SLEEP)) => {}
                _ = stop_rx.changed() => break,
            }
            // Re-evaluate against the wall clock before firing
            continue;
        }

        for offset in &trigger.offsets {
            let tick_now = clock.now();
            tracing::debug!(offset = %offset, at = %trigger.at, "Trigger fired");
            if let Err(e) = dispatcher.run_tick(*offset, tick_now).await {
                tracing::error!(offset = %offset, "❌ Notification tick failed: {e}");
            }
        }
        cursor = trigger.at;
    }
}
