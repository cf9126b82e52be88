use std::sync::Arc;

use axum::{
    extract::{Form, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{Html, IntoResponse, Redirect, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, warn};

use super::domain::Rating;
use super::flow::FlowError;
use super::payment::{CancellationToken, PollOutcome};
use super::report::{pages, REPORT_FILE_NAME};
use super::service::{AssessmentError, AssessmentService, LoginSubmission};
use super::session::{Page, SessionRecord};
use super::store::{lock_session, SessionId, SessionStore, SharedSession};

pub const SESSION_COOKIE: &str = "taicc_session";

#[derive(Clone)]
pub struct AssessmentState {
    service: Arc<AssessmentService>,
    sessions: Arc<SessionStore>,
}

/// Router exposing the browser flow plus the catalog API.
pub fn assessment_router(service: Arc<AssessmentService>, sessions: Arc<SessionStore>) -> Router {
    Router::new()
        .route("/", get(current_page_handler))
        .route("/login", post(login_handler))
        .route("/payment/verify", post(verify_payment_handler))
        .route("/payment/confirm", post(confirm_payment_handler))
        .route("/questions", post(submit_answers_handler))
        .route("/questions/answer", post(record_answer_handler))
        .route("/report.pdf", get(report_handler))
        .route("/api/v1/catalog", get(catalog_handler))
        .with_state(AssessmentState { service, sessions })
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnswerSubmission {
    index: usize,
    rating: String,
}

struct SessionContext {
    id: SessionId,
    record: SharedSession,
    created: bool,
}

impl SessionContext {
    fn resolve(state: &AssessmentState, headers: &HeaderMap) -> Self {
        if let Some(id) = session_cookie(headers) {
            if let Some(record) = state.sessions.get(&id) {
                return Self {
                    id,
                    record,
                    created: false,
                };
            }
        }

        let purged = state.sessions.purge_idle(state.service.now());
        if purged > 0 {
            tracing::debug!(purged, "expired idle sessions");
        }
        let (id, record) = state.sessions.insert(state.service.start_session());
        Self {
            id,
            record,
            created: true,
        }
    }

    /// Attach the session cookie when the session was created by this request.
    fn finish(&self, response: impl IntoResponse) -> Response {
        let mut response = response.into_response();
        if self.created {
            let cookie = format!("{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax", self.id);
            if let Ok(value) = HeaderValue::from_str(&cookie) {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
        }
        response
    }
}

/// Cancels the payment poll if the request future is dropped mid-flight.
struct CancelOnDrop(CancellationToken);

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        self.0.cancel();
    }
}

fn session_cookie(headers: &HeaderMap) -> Option<SessionId> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().strip_prefix(SESSION_COOKIE)?.strip_prefix('='))
        .find_map(SessionId::parse)
}

/// Run a session step on the blocking pool. Collaborators make synchronous network
/// calls, so session work never runs on the async executor.
async fn with_session<T, F>(state: &AssessmentState, ctx: &SessionContext, step: F) -> Result<T, Response>
where
    T: Send + 'static,
    F: FnOnce(&AssessmentService, &mut SessionRecord) -> T + Send + 'static,
{
    let service = Arc::clone(&state.service);
    let record = Arc::clone(&ctx.record);
    tokio::task::spawn_blocking(move || {
        let mut session = lock_session(&record);
        service.touch(&mut session);
        step(&service, &mut session)
    })
    .await
    .map_err(|err| {
        error!(error = %err, "session step panicked or was cancelled");
        error_page(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Something went wrong",
            "The request could not be completed. Please try again.",
        )
    })
}

fn error_page(status: StatusCode, title: &str, message: &str) -> Response {
    (status, Html(pages::render_error(title, message))).into_response()
}

fn assessment_error_page(err: &AssessmentError) -> Response {
    let status = err.status_code();
    if status.is_server_error() {
        error!(error = %err, "assessment step failed");
    } else {
        warn!(error = %err, "assessment step rejected");
    }
    let title = match err {
        AssessmentError::Narrative(_) => "Report generation failed",
        AssessmentError::Payment(_) => "Payment service unavailable",
        _ => "Unable to continue",
    };
    error_page(status, title, &err.to_string())
}

/// Render whichever page the session is currently on.
fn render_current(
    service: &AssessmentService,
    session: &mut SessionRecord,
    notice: Option<String>,
) -> Response {
    match session.page {
        Page::Login => Html(pages::render_login(service.catalog(), notice.as_deref())).into_response(),
        Page::Payment => match service.checkout(session) {
            Ok(mut view) => {
                view.notice = notice;
                Html(pages::render_payment(&view)).into_response()
            }
            Err(err) => assessment_error_page(&err),
        },
        Page::Questions => match service.questionnaire(session) {
            Ok(mut view) => {
                view.notice = notice;
                Html(pages::render_questions(&view)).into_response()
            }
            Err(err) => assessment_error_page(&err),
        },
        Page::Results => {
            let profile = session.profile.clone();
            match (profile, service.results(session)) {
                (Some(profile), Ok(snapshot)) => {
                    Html(pages::render_results(&profile, snapshot)).into_response()
                }
                (None, _) => assessment_error_page(&AssessmentError::MissingProfile),
                (_, Err(err)) => assessment_error_page(&err),
            }
        }
    }
}

pub(crate) async fn current_page_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let response = with_session(&state, &ctx, |service, session| {
        render_current(service, session, None)
    })
    .await
    .unwrap_or_else(|failure| failure);
    ctx.finish(response)
}

pub(crate) async fn login_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
    Form(submission): Form<LoginSubmission>,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let response = with_session(&state, &ctx, move |service, session| {
        match service.submit_login(session, submission) {
            Ok(_) => Redirect::to("/").into_response(),
            Err(err @ AssessmentError::Catalog(_)) => {
                let page = pages::render_login(service.catalog(), Some(&err.to_string()));
                (StatusCode::UNPROCESSABLE_ENTITY, Html(page)).into_response()
            }
            Err(AssessmentError::Flow(_)) => Redirect::to("/").into_response(),
            Err(err) => assessment_error_page(&err),
        }
    })
    .await
    .unwrap_or_else(|failure| failure);
    ctx.finish(response)
}

pub(crate) async fn verify_payment_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let guard = CancelOnDrop(CancellationToken::new());
    let token = guard.0.clone();

    let response = with_session(&state, &ctx, move |service, session| {
        match service.verify_payment(session, &token) {
            Ok(outcome) => {
                let notice = match outcome {
                    PollOutcome::Captured { .. } => {
                        "Payment successful. You can continue to the assessment.".to_string()
                    }
                    PollOutcome::NotCaptured {
                        attempts,
                        last_status,
                    } => format!(
                        "Payment not captured yet after {attempts} checks (last status: {}). Please complete the payment and verify again.",
                        last_status.label()
                    ),
                    PollOutcome::Cancelled { .. } => "Payment verification was cancelled.".to_string(),
                };
                render_current(service, session, Some(notice))
            }
            Err(err) => assessment_error_page(&err),
        }
    })
    .await
    .unwrap_or_else(|failure| failure);
    drop(guard);
    ctx.finish(response)
}

pub(crate) async fn confirm_payment_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let response = with_session(&state, &ctx, |service, session| {
        match service.confirm_payment(session) {
            Ok(_) => Redirect::to("/").into_response(),
            Err(AssessmentError::Flow(FlowError::PaymentPending)) => {
                let notice = "Please complete the payment before continuing.".to_string();
                let mut response = render_current(service, session, Some(notice));
                *response.status_mut() = StatusCode::PAYMENT_REQUIRED;
                response
            }
            Err(AssessmentError::Flow(_)) => Redirect::to("/").into_response(),
            Err(err) => assessment_error_page(&err),
        }
    })
    .await
    .unwrap_or_else(|failure| failure);
    ctx.finish(response)
}

pub(crate) async fn record_answer_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
    Form(submission): Form<AnswerSubmission>,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let response = with_session(&state, &ctx, move |service, session| {
        let outcome = Rating::from_label(&submission.rating)
            .ok_or_else(|| AssessmentError::InvalidRating(submission.rating.clone()))
            .and_then(|rating| service.record_answer(session, submission.index, rating));
        match outcome {
            Ok((answered, total)) => Json(json!({
                "answered": answered,
                "total": total,
                "progress": super::scoring::progress(answered, total),
            }))
            .into_response(),
            Err(err) => {
                let payload = json!({ "error": err.to_string() });
                (err.status_code(), Json(payload)).into_response()
            }
        }
    })
    .await
    .unwrap_or_else(|failure| failure);
    ctx.finish(response)
}

pub(crate) async fn submit_answers_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let response = with_session(&state, &ctx, move |service, session| {
        let outcome = parse_answer_fields(&fields)
            .and_then(|answers| service.submit_answers(session, &answers));
        match outcome {
            Ok(_) => Redirect::to("/").into_response(),
            Err(AssessmentError::Flow(FlowError::IncompleteAnswers { answered, total })) => {
                let notice = format!("Please answer every question ({answered} of {total} answered).");
                let mut response = render_current(service, session, Some(notice));
                *response.status_mut() = StatusCode::UNPROCESSABLE_ENTITY;
                response
            }
            Err(err @ (AssessmentError::InvalidRating(_) | AssessmentError::UnknownQuestion { .. })) => {
                let mut response = render_current(service, session, Some(err.to_string()));
                *response.status_mut() = StatusCode::UNPROCESSABLE_ENTITY;
                response
            }
            Err(AssessmentError::Flow(_) | AssessmentError::WrongPage { .. }) => {
                Redirect::to("/").into_response()
            }
            Err(err) => assessment_error_page(&err),
        }
    })
    .await
    .unwrap_or_else(|failure| failure);
    ctx.finish(response)
}

/// Radio groups arrive as `q{index}=<rating label>`; anything else is ignored.
fn parse_answer_fields(fields: &[(String, String)]) -> Result<Vec<(usize, Rating)>, AssessmentError> {
    fields
        .iter()
        .filter_map(|(name, value)| {
            let index = name.strip_prefix('q')?.parse::<usize>().ok()?;
            Some((index, value))
        })
        .map(|(index, value)| {
            Rating::from_label(value)
                .map(|rating| (index, rating))
                .ok_or_else(|| AssessmentError::InvalidRating(value.clone()))
        })
        .collect()
}

pub(crate) async fn report_handler(
    State(state): State<AssessmentState>,
    headers: HeaderMap,
) -> Response {
    let ctx = SessionContext::resolve(&state, &headers);
    let response = with_session(&state, &ctx, |service, session| {
        match service.report_pdf(session) {
            Ok(bytes) => {
                let disposition = format!("attachment; filename=\"{REPORT_FILE_NAME}\"");
                (
                    [
                        (header::CONTENT_TYPE, mime::APPLICATION_PDF.to_string()),
                        (header::CONTENT_DISPOSITION, disposition),
                    ],
                    bytes.to_vec(),
                )
                    .into_response()
            }
            Err(err) => assessment_error_page(&err),
        }
    })
    .await
    .unwrap_or_else(|failure| failure);
    ctx.finish(response)
}

pub(crate) async fn catalog_handler(State(state): State<AssessmentState>) -> Response {
    (StatusCode::OK, Json(state.service.catalog().summary())).into_response()
}
