//! TAICC AI readiness assessment: a four-page flow (login, optional payment,
//! questionnaire, results) that scores answers, classifies maturity, and produces a
//! narrative report.

pub mod catalog;
pub mod domain;
pub mod flow;
pub mod narrative;
pub mod payment;
pub mod report;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod spreadsheet;
pub mod store;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CatalogSummary, QuestionCatalog};
pub use domain::{AnswerSet, MaturityLevel, QuestionKey, Rating, UserProfile, MATURITY_BANDS};
pub use flow::{transition, FlowError, FlowEvent, FlowOptions};
pub use narrative::{build_prompt, GeminiClient, NarrativeError, TextGenerator};
pub use payment::{
    CancellationToken, Clock, OrderId, PaymentError, PaymentGateway, PaymentStatus,
    RazorpayClient, SystemClock,
};
pub use router::{assessment_router, SESSION_COOKIE};
pub use scoring::{classify, progress, score, ScoreError};
pub use service::{AssessmentError, AssessmentService, LoginSubmission};
pub use session::{Page, ResultsSnapshot, SessionRecord, OVERALL_SCORE_KEY};
pub use spreadsheet::{CsvRowSink, GoogleSheetsClient, ResultRow, SpreadsheetError, SpreadsheetSink};
pub use store::{SessionId, SessionStore};
