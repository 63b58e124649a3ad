//! Notifications sent after booking changes are committed.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use common::BookingId;
use scheduling::TimeWindow;
use serde::Serialize;
use thiserror::Error;

use crate::booking::{Booking, BookingCode, BookingStatus, CustomerIdentity};

/// What a notification hook is told about a booking change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingNotification {
    pub booking_id: BookingId,
    pub code: Option<BookingCode>,
    /// The journal event that triggered the notification.
    pub event_type: &'static str,
    pub status: BookingStatus,
    pub customer: Option<CustomerIdentity>,
    pub date: Option<NaiveDate>,
    pub window: Option<TimeWindow>,
}

impl BookingNotification {
    pub fn for_booking(booking_id: BookingId, booking: &Booking, event_type: &'static str) -> Self {
        Self {
            booking_id,
            code: booking.code().cloned(),
            event_type,
            status: booking.status(),
            customer: booking.customer().cloned(),
            date: booking.date(),
            window: booking.window(),
        }
    }
}

#[derive(Debug, Error)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Delivery channel for booking notifications (email, SMS, webhooks).
#[async_trait]
pub trait NotificationHook: Send + Sync {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotifyError>;
}

/// Writes notifications to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl NotificationHook for LogNotifier {
    async fn notify(&self, notification: &BookingNotification) -> Result<(), NotifyError> {
        tracing::info!(
            booking_id = %notification.booking_id,
            event = notification.event_type,
            status = %notification.status,
            "Booking notification"
        );
        Ok(())
    }
}

/// Attempts and backoff for delivering one notification.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for DeliveryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl DeliveryPolicy {
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// Delivers a notification in the background.
///
/// Failures are retried with exponential backoff, then counted and logged.
/// They are never reported to the caller.
pub fn dispatch(
    hook: Arc<dyn NotificationHook>,
    policy: DeliveryPolicy,
    notification: BookingNotification,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let attempts = policy.max_attempts.max(1);
        for attempt in 0..attempts {
            match hook.notify(&notification).await {
                Ok(()) => return,
                Err(e) => {
                    tracing::warn!(
                        booking_id = %notification.booking_id,
                        attempt = attempt + 1,
                        error = %e,
                        "Notification attempt failed"
                    );
                    if attempt + 1 < attempts {
                        tokio::time::sleep(policy.delay(attempt)).await;
                    }
                }
            }
        }

        metrics::counter!("notifications_failed_total").increment(1);
        tracing::error!(
            booking_id = %notification.booking_id,
            event = notification.event_type,
            "Giving up on notification"
        );
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Flaky {
        failures_left: AtomicU32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl NotificationHook for Flaky {
        async fn notify(&self, _: &BookingNotification) -> Result<(), NotifyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(NotifyError("smtp down".into()));
            }
            Ok(())
        }
    }

    fn notification() -> BookingNotification {
        BookingNotification::for_booking(BookingId::new(), &Booking::default(), "BookingConfirmed")
    }

    fn quick() -> DeliveryPolicy {
        DeliveryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn retries_until_delivered() {
        let hook = Arc::new(Flaky {
            failures_left: AtomicU32::new(2),
            calls: AtomicU32::new(0),
        });

        dispatch(hook.clone(), quick(), notification()).await.unwrap();

        assert_eq!(hook.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let hook = Arc::new(Flaky {
            failures_left: AtomicU32::new(10),
            calls: AtomicU32::new(0),
        });

        dispatch(hook.clone(), quick(), notification()).await.unwrap();

        assert_eq!(hook.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn backoff_doubles() {
        let policy = DeliveryPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(800));
    }
}
