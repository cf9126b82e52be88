use chrono::{DateTime, Local};
use google_sheets4::api::{Scope, ValueRange};
use google_sheets4::{hyper_rustls, hyper_util, yup_oauth2, Sheets};
use serde::Serialize;
use std::fmt::Debug;
use std::io::Write;
use std::sync::Mutex;
use tokio::runtime::Handle;

use super::domain::{MaturityLevel, UserProfile};
use crate::config::SheetsConfig;

pub const ROW_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One cell of an appended row. Scores stay numeric so the sheet can chart them.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Text(String),
    Number(f64),
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            Self::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(value) => Some(value),
            Self::Number(_) => None,
        }
    }

    fn into_json(self) -> serde_json::Value {
        match self {
            Self::Text(value) => serde_json::Value::String(value),
            Self::Number(value) => serde_json::Number::from_f64(value)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
        }
    }

    fn into_field(self) -> String {
        match self {
            Self::Text(value) => value,
            Self::Number(value) => format!("{value:.2}"),
        }
    }
}

/// Summary row appended after every completed assessment.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub completed_at: DateTime<Local>,
    pub profile: UserProfile,
    pub score: f64,
    pub maturity: MaturityLevel,
}

impl ResultRow {
    /// `[timestamp, name, company, email, phone, segment, tier, score, maturity]`
    pub fn cells(&self) -> Vec<CellValue> {
        vec![
            CellValue::Text(self.completed_at.format(ROW_TIMESTAMP_FORMAT).to_string()),
            CellValue::Text(self.profile.name.clone()),
            CellValue::Text(self.profile.company.clone()),
            CellValue::Text(self.profile.email.clone()),
            CellValue::Text(self.profile.phone.clone()),
            CellValue::Text(self.profile.segment.clone()),
            CellValue::Text(self.profile.tier.clone()),
            CellValue::Number(self.score),
            CellValue::Text(self.maturity.label().to_string()),
        ]
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SpreadsheetError {
    #[error("spreadsheet append failed: {0}")]
    Backend(String),
    #[error("spreadsheet credentials unusable: {0}")]
    Credentials(String),
    #[error("failed to write CSV row: {0}")]
    Csv(#[from] csv::Error),
    #[error("failed to flush CSV row: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for completed assessment rows.
pub trait SpreadsheetSink: Debug + Send + Sync {
    fn append_row(&self, row: &ResultRow) -> Result<(), SpreadsheetError>;
}

pub type HttpsConnector =
    hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>;

/// Wrapper around the generated google-sheets4 hub. Calls are driven on the runtime
/// captured at construction so synchronous workflow code can append rows from the
/// blocking thread pool.
pub struct GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    hub: Sheets<C>,
    runtime: Handle,
    spreadsheet_id: String,
    range: String,
}

impl<C> GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    pub fn new(hub: Sheets<C>, runtime: Handle, config: &SheetsConfig) -> Self {
        Self {
            hub,
            runtime,
            spreadsheet_id: config.spreadsheet_id.clone(),
            range: sheet_range(&config.sheet_name),
        }
    }

    fn map_error<E: std::fmt::Display>(err: E) -> SpreadsheetError {
        SpreadsheetError::Backend(err.to_string())
    }
}

impl GoogleSheetsClient<HttpsConnector> {
    /// Authenticate with a service-account key file and build the hub. Must be called
    /// from within a tokio runtime.
    pub async fn connect(config: &SheetsConfig) -> Result<Self, SpreadsheetError> {
        let key = yup_oauth2::read_service_account_key(&config.credentials_path)
            .await
            .map_err(|err| SpreadsheetError::Credentials(err.to_string()))?;
        let auth = yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .map_err(|err| SpreadsheetError::Credentials(err.to_string()))?;

        let connector = hyper_rustls::HttpsConnectorBuilder::new()
            .with_native_roots()
            .map_err(|err| SpreadsheetError::Credentials(err.to_string()))?
            .https_or_http()
            .enable_http1()
            .build();
        let client =
            hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
                .build(connector);

        let hub = Sheets::new(client, auth);
        Ok(Self::new(hub, Handle::current(), config))
    }
}

impl<C> std::fmt::Debug for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleSheetsClient")
            .field("spreadsheet_id", &self.spreadsheet_id)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}

impl<C> SpreadsheetSink for GoogleSheetsClient<C>
where
    C: google_sheets4::common::Connector + Send + Sync + 'static,
{
    fn append_row(&self, row: &ResultRow) -> Result<(), SpreadsheetError> {
        let values = row.cells().into_iter().map(CellValue::into_json).collect();
        let request = ValueRange {
            values: Some(vec![values]),
            ..ValueRange::default()
        };

        let result = self.runtime.block_on(async {
            self.hub
                .spreadsheets()
                .values_append(request, &self.spreadsheet_id, &self.range)
                .value_input_option("USER_ENTERED")
                .insert_data_option("INSERT_ROWS")
                .add_scope(Scope::Spreadsheet)
                .doit()
                .await
        });

        result.map(|_| ()).map_err(GoogleSheetsClient::<C>::map_error)
    }
}

fn sheet_range(sheet_name: &str) -> String {
    format!("'{}'!A1", sheet_name.replace('\'', "''"))
}

/// Writes rows as CSV records, e.g. to stdout when no spreadsheet is configured.
pub struct CsvRowSink<W: Write + Send> {
    writer: Mutex<csv::Writer<W>>,
}

impl<W: Write + Send> CsvRowSink<W> {
    pub fn new(inner: W) -> Self {
        Self {
            writer: Mutex::new(csv::WriterBuilder::new().has_headers(false).from_writer(inner)),
        }
    }

    pub fn into_inner(self) -> Result<W, SpreadsheetError> {
        let writer = self
            .writer
            .into_inner()
            .map_err(|_| SpreadsheetError::Backend("csv writer lock poisoned".to_string()))?;
        writer
            .into_inner()
            .map_err(|err| SpreadsheetError::Io(err.into_error()))
    }
}

impl<W: Write + Send> Debug for CsvRowSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvRowSink").finish_non_exhaustive()
    }
}

impl<W: Write + Send> SpreadsheetSink for CsvRowSink<W> {
    fn append_row(&self, row: &ResultRow) -> Result<(), SpreadsheetError> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| SpreadsheetError::Backend("csv writer lock poisoned".to_string()))?;
        let fields: Vec<String> = row.cells().into_iter().map(CellValue::into_field).collect();
        writer.write_record(&fields)?;
        writer.flush()?;
        Ok(())
    }
}
