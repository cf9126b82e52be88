use metrics_exporter_prometheus::PrometheusHandle;
use reqwest::blocking::Client;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use taicc_readiness::config::{AppConfig, IntegrationConfig};
use taicc_readiness::error::AppError;
use taicc_readiness::workflows::assessment::spreadsheet::HttpsConnector;
use taicc_readiness::workflows::assessment::{
    AssessmentService, Clock, CsvRowSink, GeminiClient, GoogleSheetsClient, NarrativeError,
    PaymentGateway, QuestionCatalog, RazorpayClient, SpreadsheetSink, SystemClock, TextGenerator,
};
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Stand-in text generator used when no Gemini key is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct OfflineNarrator;

impl TextGenerator for OfflineNarrator {
    fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        let standing = prompt
            .lines()
            .find(|line| line.contains("readiness score"))
            .unwrap_or("Your readiness score has been recorded.");

        Ok(format!(
            "Summary\n{standing}\n\n\
             Key Challenges\n\
             Data foundations, skills, and governance typically limit how quickly AI pilots reach production.\n\n\
             Recommendations\n\
             Prioritise two or three high-value use cases, assign an accountable owner, and measure outcomes every quarter.\n\n\
             Next Steps\n\
             Partner with TAICC to turn this assessment into a practical AI transformation roadmap."
        ))
    }
}

pub(crate) fn load_catalog(config: &AppConfig) -> Result<Arc<QuestionCatalog>, AppError> {
    let path = &config.assessment.questions_path;
    let catalog = QuestionCatalog::from_path(path)?;
    info!(
        path = %path.display(),
        segments = catalog.segments().count(),
        tiers = catalog.tiers().count(),
        "question catalog loaded"
    );
    Ok(Arc::new(catalog))
}

/// Google Sheets when credentials are configured, otherwise CSV rows on stdout.
/// Must run inside the tokio runtime.
pub(crate) async fn build_spreadsheet(
    integrations: &IntegrationConfig,
) -> Result<Arc<dyn SpreadsheetSink>, AppError> {
    match &integrations.sheets {
        Some(sheets) => {
            let client = GoogleSheetsClient::<HttpsConnector>::connect(sheets).await?;
            info!(spreadsheet_id = %sheets.spreadsheet_id, sheet = %sheets.sheet_name, "google sheets sink ready");
            Ok(Arc::new(client))
        }
        None => {
            warn!("spreadsheet credentials not configured; writing result rows to stdout");
            Ok(Arc::new(CsvRowSink::new(std::io::stdout())))
        }
    }
}

pub(crate) fn build_narrator(
    integrations: &IntegrationConfig,
) -> Result<Arc<dyn TextGenerator>, AppError> {
    match &integrations.gemini {
        Some(gemini) => {
            info!(model = %gemini.model, "gemini text generation enabled");
            Ok(Arc::new(GeminiClient::new(gemini)?))
        }
        None => {
            warn!("GEMINI_API_KEY not set; reports use the offline narrative");
            Ok(Arc::new(OfflineNarrator))
        }
    }
}

/// Builds the blocking HTTP collaborators. Call from the blocking pool, never from
/// an async task.
pub(crate) fn build_service(
    config: &AppConfig,
    catalog: Arc<QuestionCatalog>,
    spreadsheet: Arc<dyn SpreadsheetSink>,
) -> Result<AssessmentService, AppError> {
    let narrator = build_narrator(&config.integrations)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let mut service = AssessmentService::new(catalog, narrator, spreadsheet, clock);

    let payment = &config.assessment.payment;
    if payment.enabled {
        if let Some(razorpay) = &config.integrations.razorpay {
            let gateway: Arc<dyn PaymentGateway> = Arc::new(RazorpayClient::new(razorpay));
            info!(
                amount_minor = payment.amount_minor,
                currency = %payment.currency,
                "payment gate enabled"
            );
            service = service.with_payments(gateway, payment.clone());
        }
    }

    if let Some(url) = &config.integrations.logo_url {
        match fetch_logo(url) {
            Ok(bytes) => service = service.with_logo(bytes),
            Err(err) => warn!(%url, error = %err, "logo unavailable; reports render without it"),
        }
    }

    Ok(service)
}

pub(crate) fn fetch_logo(url: &str) -> Result<Vec<u8>, reqwest::Error> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    let bytes = client.get(url).send()?.error_for_status()?.bytes()?;
    Ok(bytes.to_vec())
}
