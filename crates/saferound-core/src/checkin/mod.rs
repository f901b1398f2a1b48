//! Periodic check-in: the dead-man's switch and its LOCATE hand-off.

pub mod driver;
pub mod locate;
pub mod monitor;

pub use driver::{run_monitor, spawn_monitor, CheckInHandle};
pub use locate::{DeepLinkNotifier, LocateNotifier, SystemOpener, UrlOpener};
pub use monitor::{evaluate_level, CheckInLevel, CheckInMonitor, CheckInState, CheckInThresholds};
