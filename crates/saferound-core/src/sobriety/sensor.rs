//! Motion sensor seam and the scoped subscription guard.

use std::time::Duration;

use crate::error::HardwareError;

/// A live sensor feed. Closing it releases the hardware.
pub trait SensorSubscription: Send {
    fn close(&mut self);
}

/// Source of motion samples at a requested period.
pub trait MotionSensor {
    type Subscription: SensorSubscription + 'static;

    fn subscribe(&mut self, period: Duration) -> Result<Self::Subscription, HardwareError>;
}

/// Closes the wrapped subscription exactly once: on [`SubscriptionGuard::release`]
/// or when dropped, whichever comes first.
pub struct SubscriptionGuard {
    inner: Option<Box<dyn SensorSubscription>>,
}

impl SubscriptionGuard {
    pub fn new(subscription: impl SensorSubscription + 'static) -> Self {
        Self {
            inner: Some(Box::new(subscription)),
        }
    }

    pub fn release(&mut self) {
        if let Some(mut subscription) = self.inner.take() {
            subscription.close();
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for SubscriptionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionGuard")
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl SensorSubscription for Counting {
        fn close(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn closes_once_on_release_then_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        let mut guard = SubscriptionGuard::new(Counting(closes.clone()));
        guard.release();
        assert!(!guard.is_active());
        drop(guard);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn closes_on_drop() {
        let closes = Arc::new(AtomicUsize::new(0));
        drop(SubscriptionGuard::new(Counting(closes.clone())));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
