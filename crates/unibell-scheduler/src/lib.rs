//! # Unibell Scheduler
//!
//! Lesson notifications driven by the bell schedule.
//!
//! ## Architecture
//! ```text
//! Notifier (one tokio worker)
//!   ├── TriggerPlan: call start − 15m / − 1m, derived once at startup
//!   ├── sleep until next trigger → Dispatcher::run_tick(offset)
//!   │     ├── SubscriptionSource: chats subscribed to that offset
//!   │     ├── ScheduleProvider: today's lessons per group
//!   │     ├── WindowClassifier: is the first class imminent?
//!   │     └── Messenger: send, flag unreachable chats, report failures
//!   └── stop() → finish current tick, exit
//! ```

pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod render;
pub mod triggers;
pub mod window;

pub use clock::WallClock;
pub use dispatch::{DispatchReport, Dispatcher};
pub use engine::Notifier;
pub use triggers::{Trigger, TriggerPlan, derive_trigger_times};
pub use window::{NotificationWindow, WindowClassifier, WindowStatus};
