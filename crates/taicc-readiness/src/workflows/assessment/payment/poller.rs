use chrono::{DateTime, Local};
use std::fmt::Debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use super::gateway::{OrderId, PaymentError, PaymentGateway, PaymentStatus};

/// Time source used for session timestamps and poll delays.
pub trait Clock: Debug + Send + Sync {
    fn now(&self) -> DateTime<Local>;
    fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Shared flag that stops an in-flight poll before its next attempt.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub attempts: u32,
    pub delay: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    Captured { attempts: u32 },
    NotCaptured { attempts: u32, last_status: PaymentStatus },
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    pub fn is_captured(&self) -> bool {
        matches!(self, Self::Captured { .. })
    }
}

/// Ask the gateway for the order status up to `settings.attempts` times, sleeping
/// `settings.delay` between attempts. Gateway errors abort the poll.
pub fn poll_until_captured(
    gateway: &dyn PaymentGateway,
    clock: &dyn Clock,
    order_id: &OrderId,
    settings: PollSettings,
    token: &CancellationToken,
) -> Result<PollOutcome, PaymentError> {
    let mut last_status = PaymentStatus::Created;

    for attempt in 1..=settings.attempts {
        if token.is_cancelled() {
            info!(%order_id, attempt, "payment poll cancelled");
            return Ok(PollOutcome::Cancelled {
                attempts: attempt - 1,
            });
        }

        last_status = gateway.payment_status(order_id)?;
        debug!(%order_id, attempt, status = last_status.label(), "payment status polled");
        if last_status == PaymentStatus::Captured {
            return Ok(PollOutcome::Captured { attempts: attempt });
        }

        if attempt < settings.attempts {
            clock.sleep(settings.delay);
        }
    }

    Ok(PollOutcome::NotCaptured {
        attempts: settings.attempts,
        last_status,
    })
}
