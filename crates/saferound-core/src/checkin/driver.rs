//! Shared monitor handle and the recurring tick task.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use super::locate::LocateNotifier;
use super::monitor::{CheckInLevel, CheckInMonitor, CheckInState};
use crate::clock::Clock;
use crate::events::Event;

/// Cloneable handle to the process-wide monitor. The lock is never held
/// across an await point.
#[derive(Debug, Clone)]
pub struct CheckInHandle {
    inner: Arc<Mutex<CheckInMonitor>>,
}

impl CheckInHandle {
    pub fn new(monitor: CheckInMonitor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(monitor)),
        }
    }

    pub fn state(&self) -> CheckInState {
        self.lock().state()
    }

    pub fn tick(&self, now: DateTime<Utc>) -> Option<Event> {
        self.lock().tick(now)
    }

    pub fn check_in(&self, now: DateTime<Utc>) -> Event {
        self.lock().check_in(now)
    }

    fn lock(&self) -> MutexGuard<'_, CheckInMonitor> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Tick the monitor every `period` until the event receiver goes away.
///
/// The first tick fires immediately. Entering LOCATE triggers `notifier`
/// once; its failure is reported in the event and otherwise ignored.
pub async fn run_monitor<N: LocateNotifier>(
    handle: CheckInHandle,
    clock: Arc<dyn Clock>,
    notifier: N,
    period: Duration,
    events: mpsc::UnboundedSender<Event>,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let now = clock.now();
        let Some(event) = handle.tick(now) else {
            continue;
        };

        let entered_locate = matches!(
            event,
            Event::CheckInLevelChanged {
                to: CheckInLevel::Locate,
                ..
            }
        );
        if events.send(event).is_err() {
            break;
        }

        if entered_locate {
            let delivered = match notifier.notify() {
                Ok(()) => true,
                Err(err) => {
                    warn!(%err, "locate notification failed");
                    false
                }
            };
            if events.send(Event::LocateSignalled { delivered, at: now }).is_err() {
                break;
            }
        }
    }
    debug!("check-in monitor stopped");
}

/// Spawn [`run_monitor`] on the current runtime.
pub fn spawn_monitor<N: LocateNotifier + 'static>(
    handle: CheckInHandle,
    clock: Arc<dyn Clock>,
    notifier: N,
    period: Duration,
    events: mpsc::UnboundedSender<Event>,
) -> JoinHandle<()> {
    tokio::spawn(run_monitor(handle, clock, notifier, period, events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checkin::CheckInThresholds;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Default)]
    struct CountingNotifier {
        calls: Arc<AtomicUsize>,
        fail: bool,
    }

    impl LocateNotifier for CountingNotifier {
        fn notify(&self) -> crate::error::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(CoreError::Io(std::io::Error::other("no opener")));
            }
            Ok(())
        }
    }

    fn setup(notifier: CountingNotifier) -> (CheckInHandle, ManualClock, mpsc::UnboundedReceiver<Event>) {
        let clock = ManualClock::new(Utc::now());
        let handle = CheckInHandle::new(CheckInMonitor::new(clock.now(), CheckInThresholds::default()));
        let (tx, rx) = mpsc::unbounded_channel();
        spawn_monitor(
            handle.clone(),
            Arc::new(clock.clone()),
            notifier,
            Duration::from_secs(10),
            tx,
        );
        (handle, clock, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn silent_user_escalates_and_notifies_once() {
        let notifier = CountingNotifier::default();
        let calls = notifier.calls.clone();
        let (handle, clock, mut rx) = setup(notifier);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, Event::CheckInLevelChanged { to: CheckInLevel::Due, .. }));

        clock.advance(chrono::Duration::seconds(301));
        let escalated = rx.recv().await.unwrap();
        assert!(matches!(escalated, Event::CheckInLevelChanged { to: CheckInLevel::Locate, .. }));
        assert_eq!(
            rx.recv().await.unwrap(),
            Event::LocateSignalled {
                delivered: true,
                at: clock.now()
            }
        );
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.state().level, CheckInLevel::Locate);
    }

    #[tokio::test(start_paused = true)]
    async fn check_in_starts_a_new_cycle() {
        let notifier = CountingNotifier {
            fail: true,
            ..CountingNotifier::default()
        };
        let calls = notifier.calls.clone();
        let (handle, clock, mut rx) = setup(notifier);
        rx.recv().await.unwrap();

        handle.check_in(clock.now());
        assert_eq!(handle.state().level, CheckInLevel::Ok);

        clock.advance(chrono::Duration::seconds(181));
        let due = rx.recv().await.unwrap();
        assert!(matches!(
            due,
            Event::CheckInLevelChanged {
                from: CheckInLevel::Ok,
                to: CheckInLevel::Due,
                elapsed_secs: Some(181),
                ..
            }
        ));

        clock.advance(chrono::Duration::seconds(120));
        rx.recv().await.unwrap();
        assert!(matches!(
            rx.recv().await.unwrap(),
            Event::LocateSignalled { delivered: false, .. }
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
