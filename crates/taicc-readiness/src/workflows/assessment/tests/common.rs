use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request};
use axum::response::Response;
use axum::Router;
use chrono::{DateTime, Local, TimeZone};
use serde_json::Value;

use crate::config::PaymentConfig;
use crate::workflows::assessment::catalog::QuestionCatalog;
use crate::workflows::assessment::narrative::{NarrativeError, TextGenerator};
use crate::workflows::assessment::payment::{
    Clock, OrderId, PaymentError, PaymentGateway, PaymentStatus,
};
use crate::workflows::assessment::router::{assessment_router, SESSION_COOKIE};
use crate::workflows::assessment::service::{AssessmentService, LoginSubmission};
use crate::workflows::assessment::spreadsheet::{ResultRow, SpreadsheetError, SpreadsheetSink};
use crate::workflows::assessment::store::SessionStore;

pub(super) const NARRATIVE: &str = "Executive Summary\nYour organisation is building momentum.";

pub(super) fn catalog() -> Arc<QuestionCatalog> {
    let healthcare: Vec<String> = (1..=10)
        .map(|n| format!("Healthcare readiness question {n}?"))
        .collect();
    let raw = serde_json::json!({
        "Healthcare": {
            "Tier 3": healthcare,
            "Tier 4": ["Do you keep patient records digitally?"],
        },
        "BFSI": {
            "Tier 3": ["Is fraud detection automated?", "Do you score credit with ML?"],
            "Tier 4": ["Do you use online banking tools?"],
        },
    });
    Arc::new(QuestionCatalog::from_json_str(&raw.to_string()).expect("fixture catalog is valid"))
}

pub(super) fn started_at() -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2024, 6, 3, 9, 30, 0)
        .single()
        .expect("valid local time")
}

pub(super) fn login(segment: &str, tier: &str) -> LoginSubmission {
    LoginSubmission {
        name: " Asha Rao ".to_string(),
        company: "Sunrise Clinics".to_string(),
        email: "asha@sunrise.example".to_string(),
        phone: "+91 98765 43210".to_string(),
        segment: segment.to_string(),
        tier: tier.to_string(),
    }
}

pub(super) fn payment_config() -> PaymentConfig {
    PaymentConfig {
        enabled: true,
        amount_minor: 49_900,
        currency: "INR".to_string(),
        poll_attempts: 3,
        poll_delay: Duration::from_secs(5),
    }
}

#[derive(Debug, Default)]
pub(super) struct StaticNarrator {
    prompts: Mutex<Vec<String>>,
}

impl StaticNarrator {
    pub(super) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("narrator mutex poisoned").clone()
    }
}

impl TextGenerator for StaticNarrator {
    fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        self.prompts
            .lock()
            .expect("narrator mutex poisoned")
            .push(prompt.to_string());
        Ok(NARRATIVE.to_string())
    }
}

#[derive(Debug)]
pub(super) struct FailingNarrator;

impl TextGenerator for FailingNarrator {
    fn generate(&self, _prompt: &str) -> Result<String, NarrativeError> {
        Err(NarrativeError::Rejected {
            status: 503,
            body: "model overloaded".to_string(),
        })
    }
}

#[derive(Debug, Default)]
pub(super) struct RecordingSpreadsheet {
    rows: Mutex<Vec<ResultRow>>,
}

impl RecordingSpreadsheet {
    pub(super) fn rows(&self) -> Vec<ResultRow> {
        self.rows.lock().expect("sheet mutex poisoned").clone()
    }
}

impl SpreadsheetSink for RecordingSpreadsheet {
    fn append_row(&self, row: &ResultRow) -> Result<(), SpreadsheetError> {
        self.rows
            .lock()
            .expect("sheet mutex poisoned")
            .push(row.clone());
        Ok(())
    }
}

#[derive(Debug)]
pub(super) struct FailingSpreadsheet;

impl SpreadsheetSink for FailingSpreadsheet {
    fn append_row(&self, _row: &ResultRow) -> Result<(), SpreadsheetError> {
        Err(SpreadsheetError::Backend("quota exceeded".to_string()))
    }
}

/// Returns queued statuses in order, repeating the last one once the script runs out.
#[derive(Debug)]
pub(super) struct ScriptedPayments {
    statuses: Mutex<VecDeque<PaymentStatus>>,
    orders: Mutex<Vec<(u64, String)>>,
}

impl ScriptedPayments {
    pub(super) fn new(statuses: impl IntoIterator<Item = PaymentStatus>) -> Self {
        Self {
            statuses: Mutex::new(statuses.into_iter().collect()),
            orders: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn orders(&self) -> Vec<(u64, String)> {
        self.orders.lock().expect("payments mutex poisoned").clone()
    }
}

impl PaymentGateway for ScriptedPayments {
    fn checkout_key(&self) -> &str {
        "rzp_test_key"
    }

    fn create_order(&self, amount_minor: u64, currency: &str) -> Result<OrderId, PaymentError> {
        let mut orders = self.orders.lock().expect("payments mutex poisoned");
        orders.push((amount_minor, currency.to_string()));
        Ok(OrderId(format!("order_{}", orders.len())))
    }

    fn payment_status(&self, _order_id: &OrderId) -> Result<PaymentStatus, PaymentError> {
        let mut statuses = self.statuses.lock().expect("payments mutex poisoned");
        if statuses.len() > 1 {
            Ok(statuses.pop_front().unwrap_or(PaymentStatus::Created))
        } else {
            Ok(statuses.front().copied().unwrap_or(PaymentStatus::Created))
        }
    }
}

/// Clock that only moves when slept on or advanced explicitly.
#[derive(Debug)]
pub(super) struct ManualClock {
    now: Mutex<DateTime<Local>>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub(super) fn starting_at(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn advance(&self, by: Duration) {
        let mut now = self.now.lock().expect("clock mutex poisoned");
        *now += chrono::Duration::from_std(by).expect("duration in range");
    }

    pub(super) fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().expect("clock mutex poisoned").clone()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Local> {
        *self.now.lock().expect("clock mutex poisoned")
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps
            .lock()
            .expect("clock mutex poisoned")
            .push(duration);
        self.advance(duration);
    }
}

pub(super) struct Harness {
    pub(super) service: Arc<AssessmentService>,
    pub(super) narrator: Arc<StaticNarrator>,
    pub(super) sheet: Arc<RecordingSpreadsheet>,
    pub(super) clock: Arc<ManualClock>,
}

pub(super) fn harness() -> Harness {
    let narrator = Arc::new(StaticNarrator::default());
    let sheet = Arc::new(RecordingSpreadsheet::default());
    let clock = Arc::new(ManualClock::starting_at(started_at()));
    let service = AssessmentService::new(
        catalog(),
        narrator.clone(),
        sheet.clone(),
        clock.clone(),
    );
    Harness {
        service: Arc::new(service),
        narrator,
        sheet,
        clock,
    }
}

pub(super) fn paid_harness(payments: Arc<ScriptedPayments>) -> Harness {
    let narrator = Arc::new(StaticNarrator::default());
    let sheet = Arc::new(RecordingSpreadsheet::default());
    let clock = Arc::new(ManualClock::starting_at(started_at()));
    let service = AssessmentService::new(
        catalog(),
        narrator.clone(),
        sheet.clone(),
        clock.clone(),
    )
    .with_payments(payments, payment_config());
    Harness {
        service: Arc::new(service),
        narrator,
        sheet,
        clock,
    }
}

pub(super) fn router(service: Arc<AssessmentService>) -> Router {
    assessment_router(service, Arc::new(SessionStore::new(Duration::from_secs(3600))))
}

pub(super) fn session_cookie(response: &Response) -> String {
    let raw = response
        .headers()
        .get(header::SET_COOKIE)
        .expect("session cookie issued")
        .to_str()
        .expect("ascii cookie");
    raw.split(';')
        .next()
        .expect("cookie pair")
        .trim_start_matches(&format!("{SESSION_COOKIE}="))
        .to_string()
}

pub(super) fn get(uri: &str, session: &str) -> Request<Body> {
    Request::get(uri)
        .header(header::COOKIE, format!("{SESSION_COOKIE}={session}"))
        .body(Body::empty())
        .expect("request builds")
}

pub(super) fn post_form(uri: &str, session: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::post(uri).header(
        header::CONTENT_TYPE,
        "application/x-www-form-urlencoded",
    );
    if let Some(session) = session {
        builder = builder.header(header::COOKIE, format!("{SESSION_COOKIE}={session}"));
    }
    builder.body(Body::from(body.to_string())).expect("request builds")
}

pub(super) async fn read_body(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body readable")
        .to_vec()
}

pub(super) async fn read_text(response: Response) -> String {
    String::from_utf8(read_body(response).await).expect("utf-8 body")
}

pub(super) async fn read_json(response: Response) -> Value {
    serde_json::from_slice(&read_body(response).await).expect("json body")
}
