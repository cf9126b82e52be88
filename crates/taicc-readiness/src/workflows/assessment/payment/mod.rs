//! Checkout gating: order creation, status lookups, and the bounded capture poll.

mod gateway;
mod poller;

pub use gateway::{OrderId, PaymentError, PaymentGateway, PaymentStatus, RazorpayClient};
pub use poller::{
    poll_until_captured, CancellationToken, Clock, PollOutcome, PollSettings, SystemClock,
};
