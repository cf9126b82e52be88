pub mod document;
pub mod pages;

pub use document::{export, ExportError, ReportDocument, REPORT_FILE_NAME};
pub use pages::{CheckoutView, QuestionView, QuestionnaireView};
