use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

use super::domain::{AnswerSet, MaturityLevel, UserProfile};
use super::payment::OrderId;

pub const OVERALL_SCORE_KEY: &str = "Overall Score";

/// Screens of the assessment, in the only order they can be visited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Page {
    Login,
    Payment,
    Questions,
    Results,
}

impl Page {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Login => "Login",
            Self::Payment => "Payment",
            Self::Questions => "Questions",
            Self::Results => "Results",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PaymentState {
    pub order_id: Option<OrderId>,
    pub paid: bool,
}

/// Everything rendered on the results screen, computed once per session.
#[derive(Debug, Clone)]
pub struct ResultsSnapshot {
    pub average: f64,
    pub maturity: MaturityLevel,
    pub narrative: String,
    pub elapsed: Duration,
    pub report_pdf: Vec<u8>,
    pub spreadsheet_warning: Option<String>,
}

impl ResultsSnapshot {
    /// `X min Y sec`, whole seconds only.
    pub fn elapsed_label(&self) -> String {
        format_elapsed(self.elapsed)
    }
}

pub fn format_elapsed(elapsed: Duration) -> String {
    let seconds = elapsed.as_secs();
    format!("{} min {} sec", seconds / 60, seconds % 60)
}

/// Mutable state owned by a single respondent's session.
#[derive(Debug, Clone)]
pub struct SessionRecord {
    pub page: Page,
    pub answers: AnswerSet,
    pub section_scores: BTreeMap<String, f64>,
    pub profile: Option<UserProfile>,
    pub started_at: DateTime<Local>,
    pub last_seen: DateTime<Local>,
    pub payment: PaymentState,
    pub results: Option<ResultsSnapshot>,
}

impl SessionRecord {
    pub fn new(started_at: DateTime<Local>) -> Self {
        Self {
            page: Page::Login,
            answers: AnswerSet::default(),
            section_scores: BTreeMap::new(),
            profile: None,
            started_at,
            last_seen: started_at,
            payment: PaymentState::default(),
            results: None,
        }
    }

    pub fn overall_score(&self) -> Option<f64> {
        self.section_scores.get(OVERALL_SCORE_KEY).copied()
    }
}
