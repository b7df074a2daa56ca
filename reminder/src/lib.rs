//! Subscription reminders and unsolicited message delivery.

pub mod notifier;
pub mod scheduler;
pub mod sweep;

pub use notifier::{LogNotifier, Notifier, QueueNotifier, WebhookNotifier, outbound_queue};
pub use scheduler::spawn_scheduler;
pub use sweep::{SweepReport, display_offset, run_sweep};
