pub mod clock;
pub mod controller;
pub mod notifier;
pub mod state;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{RestTimer, RestTimerSnapshot, TimerEvent};
pub use notifier::{LogNotifier, NotificationRequest, NotificationScheduler};
pub use state::{RestTimerState, RestTimerStatus};
