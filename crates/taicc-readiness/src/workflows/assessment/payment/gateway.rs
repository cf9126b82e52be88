use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug};

use crate::config::RazorpayConfig;

const RAZORPAY_API: &str = "https://api.razorpay.com/v1";

/// Identifier issued by the payment provider for a pending order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Order exists but no payment attempt has been recorded.
    Created,
    Authorized,
    Captured,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Created => "awaiting payment",
            Self::Authorized => "authorized",
            Self::Captured => "captured",
            Self::Failed => "failed",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("payment provider unreachable: {0}")]
    Transport(String),
    #[error("payment provider returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected payment provider response: {0}")]
    Decode(String),
}

/// Outbound payment provider operations.
pub trait PaymentGateway: Debug + Send + Sync {
    /// Public key the browser checkout widget is initialised with.
    fn checkout_key(&self) -> &str;
    fn create_order(&self, amount_minor: u64, currency: &str) -> Result<OrderId, PaymentError>;
    fn payment_status(&self, order_id: &OrderId) -> Result<PaymentStatus, PaymentError>;
}

/// Razorpay Orders API over blocking HTTP with key/secret basic auth.
pub struct RazorpayClient {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayClient {
    pub fn new(config: &RazorpayConfig) -> Self {
        Self::with_base_url(config, RAZORPAY_API)
    }

    pub fn with_base_url(config: &RazorpayConfig, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        }
    }

    fn read_json<T: for<'de> Deserialize<'de>>(
        response: reqwest::blocking::Response,
    ) -> Result<T, PaymentError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(PaymentError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        response
            .json::<T>()
            .map_err(|err| PaymentError::Decode(err.to_string()))
    }
}

impl Debug for RazorpayClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayClient")
            .field("base_url", &self.base_url)
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: u64,
    currency: &'a str,
    receipt: String,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
}

#[derive(Deserialize)]
struct PaymentCollection {
    #[serde(default)]
    items: Vec<PaymentItem>,
}

#[derive(Deserialize)]
struct PaymentItem {
    status: String,
}

fn summarize_payments(items: &[PaymentItem]) -> PaymentStatus {
    if items.iter().any(|item| item.status == "captured") {
        return PaymentStatus::Captured;
    }
    if items.iter().any(|item| item.status == "authorized") {
        return PaymentStatus::Authorized;
    }
    if !items.is_empty() && items.iter().all(|item| item.status == "failed") {
        return PaymentStatus::Failed;
    }
    PaymentStatus::Created
}

impl PaymentGateway for RazorpayClient {
    fn checkout_key(&self) -> &str {
        &self.key_id
    }

    fn create_order(&self, amount_minor: u64, currency: &str) -> Result<OrderId, PaymentError> {
        let request = CreateOrderRequest {
            amount: amount_minor,
            currency,
            receipt: format!("taicc-{}", uuid::Uuid::new_v4().simple()),
        };

        let response = self
            .client
            .post(format!("{}/orders", self.base_url))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(&request)
            .send()
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        let order: OrderResponse = Self::read_json(response)?;
        if order.id.trim().is_empty() {
            return Err(PaymentError::Decode("order id missing".to_string()));
        }
        Ok(OrderId(order.id))
    }

    fn payment_status(&self, order_id: &OrderId) -> Result<PaymentStatus, PaymentError> {
        let response = self
            .client
            .get(format!("{}/orders/{}/payments", self.base_url, order_id.0))
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .send()
            .map_err(|err| PaymentError::Transport(err.to_string()))?;

        let collection: PaymentCollection = Self::read_json(response)?;
        Ok(summarize_payments(&collection.items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(status: &str) -> PaymentItem {
        PaymentItem {
            status: status.to_string(),
        }
    }

    #[test]
    fn captured_wins_over_other_attempts() {
        let items = [item("failed"), item("captured")];
        assert_eq!(summarize_payments(&items), PaymentStatus::Captured);
    }

    #[test]
    fn empty_collection_is_awaiting_payment() {
        assert_eq!(summarize_payments(&[]), PaymentStatus::Created);
    }

    #[test]
    fn only_failures_are_failed() {
        assert_eq!(
            summarize_payments(&[item("failed"), item("failed")]),
            PaymentStatus::Failed
        );
        assert_eq!(
            summarize_payments(&[item("failed"), item("created")]),
            PaymentStatus::Created
        );
        assert_eq!(
            summarize_payments(&[item("authorized")]),
            PaymentStatus::Authorized
        );
    }
}
