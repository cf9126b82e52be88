use axum::http::StatusCode;
use chrono::{DateTime, Local};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use super::catalog::{CatalogError, QuestionCatalog};
use super::domain::{QuestionKey, Rating, UserProfile};
use super::flow::{transition, FlowError, FlowEvent, FlowOptions};
use super::narrative::{build_prompt, NarrativeError, TextGenerator};
use super::payment::{
    poll_until_captured, CancellationToken, Clock, PaymentError, PaymentGateway, PollOutcome,
    PollSettings,
};
use super::report::{self, CheckoutView, ExportError, QuestionView, QuestionnaireView};
use super::scoring::{classify, progress, score, ScoreError};
use super::session::{Page, ResultsSnapshot, SessionRecord, OVERALL_SCORE_KEY};
use super::spreadsheet::{ResultRow, SpreadsheetSink};
use crate::config::PaymentConfig;

/// Login form fields as submitted by the browser.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginSubmission {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub segment: String,
    pub tier: String,
}

/// Error raised while driving a session through the assessment.
#[derive(Debug, thiserror::Error)]
pub enum AssessmentError {
    #[error(transparent)]
    Flow(#[from] FlowError),
    #[error("this step belongs to the {} page but the session is on the {} page", .expected.label(), .actual.label())]
    WrongPage { expected: Page, actual: Page },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error("question {index} does not exist for the selected tier")]
    UnknownQuestion { index: usize },
    #[error("'{0}' is not a recognised rating")]
    InvalidRating(String),
    #[error("no respondent profile has been captured for this session")]
    MissingProfile,
    #[error("payment is not configured for this deployment")]
    PaymentUnavailable,
    #[error("the report is not available until the assessment is complete")]
    ResultsUnavailable,
    #[error(transparent)]
    Score(#[from] ScoreError),
    #[error(transparent)]
    Narrative(#[from] NarrativeError),
    #[error(transparent)]
    Payment(#[from] PaymentError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

impl AssessmentError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Flow(_) | Self::WrongPage { .. } => StatusCode::CONFLICT,
            Self::Catalog(_) | Self::UnknownQuestion { .. } | Self::InvalidRating(_) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            Self::ResultsUnavailable => StatusCode::NOT_FOUND,
            Self::Narrative(_) | Self::Payment(_) => StatusCode::BAD_GATEWAY,
            Self::MissingProfile
            | Self::PaymentUnavailable
            | Self::Score(_)
            | Self::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

struct Checkout {
    gateway: Arc<dyn PaymentGateway>,
    config: PaymentConfig,
}

/// Drives a single session record through login, checkout, questions, and results.
/// The record is always passed in by the caller; the service holds no per-user state.
pub struct AssessmentService {
    catalog: Arc<QuestionCatalog>,
    narrator: Arc<dyn TextGenerator>,
    spreadsheet: Arc<dyn SpreadsheetSink>,
    clock: Arc<dyn Clock>,
    checkout: Option<Checkout>,
    logo: Option<Vec<u8>>,
}

impl AssessmentService {
    pub fn new(
        catalog: Arc<QuestionCatalog>,
        narrator: Arc<dyn TextGenerator>,
        spreadsheet: Arc<dyn SpreadsheetSink>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            catalog,
            narrator,
            spreadsheet,
            clock,
            checkout: None,
            logo: None,
        }
    }

    /// Gate the questionnaire behind a checkout.
    pub fn with_payments(mut self, gateway: Arc<dyn PaymentGateway>, config: PaymentConfig) -> Self {
        self.checkout = Some(Checkout { gateway, config });
        self
    }

    pub fn with_logo(mut self, logo: Vec<u8>) -> Self {
        self.logo = Some(logo);
        self
    }

    pub fn catalog(&self) -> &QuestionCatalog {
        &self.catalog
    }

    pub fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            payment_enabled: self.checkout.is_some(),
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    pub fn start_session(&self) -> SessionRecord {
        SessionRecord::new(self.clock.now())
    }

    pub fn touch(&self, session: &mut SessionRecord) {
        session.last_seen = self.clock.now();
    }

    pub fn submit_login(
        &self,
        session: &mut SessionRecord,
        submission: LoginSubmission,
    ) -> Result<Page, AssessmentError> {
        let next = transition(session.page, FlowEvent::LoginSubmitted, self.flow_options())?;

        let segment = submission.segment.trim().to_string();
        let tier = submission.tier.trim().to_string();
        self.catalog.questions(&segment, &tier)?;

        session.profile = Some(UserProfile {
            name: submission.name.trim().to_string(),
            company: submission.company.trim().to_string(),
            email: submission.email.trim().to_string(),
            phone: submission.phone.trim().to_string(),
            segment,
            tier,
        });
        session.page = next;
        info!(page = next.label(), "respondent profile captured");
        Ok(next)
    }

    /// Checkout details for the payment page, creating the order on first visit.
    pub fn checkout(&self, session: &mut SessionRecord) -> Result<CheckoutView, AssessmentError> {
        ensure_page(session, Page::Payment)?;
        let checkout = self
            .checkout
            .as_ref()
            .ok_or(AssessmentError::PaymentUnavailable)?;
        let order_id = self.ensure_order(session, checkout)?;
        let profile = session.profile.as_ref();

        Ok(CheckoutView {
            checkout_key: checkout.gateway.checkout_key().to_string(),
            order_id: order_id.0,
            amount_minor: checkout.config.amount_minor,
            currency: checkout.config.currency.clone(),
            paid: session.payment.paid,
            prefill_name: profile.map(|p| p.name.clone()).unwrap_or_default(),
            prefill_email: profile.map(|p| p.email.clone()).unwrap_or_default(),
            notice: None,
        })
    }

    /// Poll the gateway for a captured payment; blocks for up to attempts × delay.
    pub fn verify_payment(
        &self,
        session: &mut SessionRecord,
        token: &CancellationToken,
    ) -> Result<PollOutcome, AssessmentError> {
        ensure_page(session, Page::Payment)?;
        let checkout = self
            .checkout
            .as_ref()
            .ok_or(AssessmentError::PaymentUnavailable)?;

        if session.payment.paid {
            return Ok(PollOutcome::Captured { attempts: 0 });
        }

        let order_id = self.ensure_order(session, checkout)?;
        let settings = PollSettings {
            attempts: checkout.config.poll_attempts,
            delay: checkout.config.poll_delay,
        };
        let outcome = poll_until_captured(
            checkout.gateway.as_ref(),
            self.clock.as_ref(),
            &order_id,
            settings,
            token,
        )?;

        if outcome.is_captured() {
            session.payment.paid = true;
            info!(%order_id, "payment captured");
        } else {
            info!(%order_id, ?outcome, "payment not captured");
        }
        Ok(outcome)
    }

    pub fn confirm_payment(&self, session: &mut SessionRecord) -> Result<Page, AssessmentError> {
        let event = FlowEvent::PaymentConfirmed {
            captured: session.payment.paid,
        };
        let next = transition(session.page, event, self.flow_options())?;
        session.page = next;
        Ok(next)
    }

    /// Questions for the session's tier. Every rendered question is recorded straight
    /// away, keeping an earlier choice or defaulting to the first rating.
    pub fn questionnaire(
        &self,
        session: &mut SessionRecord,
    ) -> Result<QuestionnaireView, AssessmentError> {
        ensure_page(session, Page::Questions)?;
        let profile = session
            .profile
            .clone()
            .ok_or(AssessmentError::MissingProfile)?;
        let questions = self.catalog.questions(&profile.segment, &profile.tier)?;

        let mut views = Vec::with_capacity(questions.len());
        for (index, text) in questions.iter().enumerate() {
            let key = QuestionKey::new(index, text);
            let selected = session.answers.get(&key).unwrap_or(Rating::NotAtAll);
            session.answers.record(key, selected);
            views.push(QuestionView {
                index,
                text: text.clone(),
                selected,
            });
        }

        let answered = answered_count(session, questions);
        Ok(QuestionnaireView {
            segment: profile.segment,
            tier: profile.tier,
            questions: views,
            progress: progress(answered, questions.len()),
            notice: None,
        })
    }

    /// Record one answer; returns `(answered, total)` for the progress indicator.
    pub fn record_answer(
        &self,
        session: &mut SessionRecord,
        index: usize,
        rating: Rating,
    ) -> Result<(usize, usize), AssessmentError> {
        ensure_page(session, Page::Questions)?;
        let questions = self.session_questions(session)?;
        let text = questions
            .get(index)
            .ok_or(AssessmentError::UnknownQuestion { index })?;
        session.answers.record(QuestionKey::new(index, text), rating);
        Ok((answered_count(session, questions), questions.len()))
    }

    /// Record the submitted answers and move on to the results page.
    pub fn submit_answers(
        &self,
        session: &mut SessionRecord,
        answers: &[(usize, Rating)],
    ) -> Result<Page, AssessmentError> {
        ensure_page(session, Page::Questions)?;
        let questions = self.session_questions(session)?;
        for (index, rating) in answers {
            let text = questions
                .get(*index)
                .ok_or(AssessmentError::UnknownQuestion { index: *index })?;
            session.answers.record(QuestionKey::new(*index, text), *rating);
        }

        let event = FlowEvent::AnswersSubmitted {
            answered: answered_count(session, questions),
            total: questions.len(),
        };
        let next = transition(session.page, event, self.flow_options())?;
        session.page = next;
        Ok(next)
    }

    /// Score, classify, narrate, export, and record the session. Runs once; later calls
    /// return the cached snapshot. A spreadsheet failure becomes a warning on the
    /// snapshot rather than an error.
    pub fn results<'s>(
        &self,
        session: &'s mut SessionRecord,
    ) -> Result<&'s ResultsSnapshot, AssessmentError> {
        ensure_page(session, Page::Results)?;
        if session.results.is_none() {
            let snapshot = self.compute_results(session)?;
            session.results = Some(snapshot);
        }
        session
            .results
            .as_ref()
            .ok_or(AssessmentError::ResultsUnavailable)
    }

    pub fn report_pdf<'s>(&self, session: &'s SessionRecord) -> Result<&'s [u8], AssessmentError> {
        session
            .results
            .as_ref()
            .map(|results| results.report_pdf.as_slice())
            .ok_or(AssessmentError::ResultsUnavailable)
    }

    fn compute_results(
        &self,
        session: &mut SessionRecord,
    ) -> Result<ResultsSnapshot, AssessmentError> {
        let profile = session
            .profile
            .clone()
            .ok_or(AssessmentError::MissingProfile)?;

        let average = score(&session.answers)?;
        session
            .section_scores
            .insert(OVERALL_SCORE_KEY.to_string(), average);
        let maturity = classify(average);
        info!(
            segment = %profile.segment,
            tier = %profile.tier,
            average,
            maturity = maturity.label(),
            "assessment scored"
        );

        let prompt = build_prompt(&profile, average, maturity);
        let narrative = self.narrator.generate(&prompt)?;

        let completed_at = self.clock.now();
        let elapsed = (completed_at - session.started_at)
            .to_std()
            .unwrap_or_default();

        let report_pdf = report::export(&profile, maturity, &narrative, self.logo.as_deref())?;

        let row = ResultRow {
            completed_at,
            profile,
            score: average,
            maturity,
        };
        let spreadsheet_warning = match self.spreadsheet.append_row(&row) {
            Ok(()) => None,
            Err(err) => {
                warn!(error = %err, "failed to append assessment row");
                Some(err.to_string())
            }
        };

        Ok(ResultsSnapshot {
            average,
            maturity,
            narrative,
            elapsed,
            report_pdf,
            spreadsheet_warning,
        })
    }

    fn ensure_order(
        &self,
        session: &mut SessionRecord,
        checkout: &Checkout,
    ) -> Result<super::payment::OrderId, AssessmentError> {
        if let Some(order_id) = &session.payment.order_id {
            return Ok(order_id.clone());
        }
        let order_id = checkout
            .gateway
            .create_order(checkout.config.amount_minor, &checkout.config.currency)?;
        info!(%order_id, amount = checkout.config.amount_minor, "payment order created");
        session.payment.order_id = Some(order_id.clone());
        Ok(order_id)
    }

    fn session_questions(&self, session: &SessionRecord) -> Result<&[String], AssessmentError> {
        let profile = session
            .profile
            .as_ref()
            .ok_or(AssessmentError::MissingProfile)?;
        Ok(self.catalog.questions(&profile.segment, &profile.tier)?)
    }
}

impl std::fmt::Debug for AssessmentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssessmentService")
            .field("narrator", &self.narrator)
            .field("spreadsheet", &self.spreadsheet)
            .field("payment_enabled", &self.checkout.is_some())
            .finish_non_exhaustive()
    }
}

fn ensure_page(session: &SessionRecord, expected: Page) -> Result<(), AssessmentError> {
    if session.page == Page::Results && expected != Page::Results {
        return Err(FlowError::Terminal.into());
    }
    if session.page != expected {
        return Err(AssessmentError::WrongPage {
            expected,
            actual: session.page,
        });
    }
    Ok(())
}

fn answered_count(session: &SessionRecord, questions: &[String]) -> usize {
    questions
        .iter()
        .enumerate()
        .filter(|(index, text)| session.answers.get(&QuestionKey::new(*index, text)).is_some())
        .count()
}
