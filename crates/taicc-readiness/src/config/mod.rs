use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub assessment: AssessmentConfig,
    pub integrations: IntegrationConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let payment = PaymentConfig {
            enabled: parse_flag("PAYMENT_ENABLED", false)?,
            amount_minor: parse_number("PAYMENT_AMOUNT_MINOR", 49_900)?,
            currency: env::var("PAYMENT_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
            poll_attempts: parse_number("PAYMENT_POLL_ATTEMPTS", 12)?,
            poll_delay: Duration::from_secs(parse_number("PAYMENT_POLL_DELAY_SECS", 5)?),
        };
        if payment.poll_attempts == 0 {
            return Err(ConfigError::InvalidNumber {
                variable: "PAYMENT_POLL_ATTEMPTS",
            });
        }

        let assessment = AssessmentConfig {
            questions_path: env::var("QUESTIONS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("data/questions.json")),
            session_ttl: Duration::from_secs(parse_number::<u64>("SESSION_TTL_MINUTES", 60)? * 60),
            payment,
        };

        let integrations = IntegrationConfig {
            gemini: optional_var("GEMINI_API_KEY").map(|api_key| GeminiConfig {
                api_key,
                model: env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-flash".to_string()),
            }),
            razorpay: match (
                optional_var("RAZORPAY_KEY_ID"),
                optional_var("RAZORPAY_KEY_SECRET"),
            ) {
                (Some(key_id), Some(key_secret)) => Some(RazorpayConfig { key_id, key_secret }),
                _ => None,
            },
            sheets: match (
                optional_var("GOOGLE_SERVICE_ACCOUNT_PATH"),
                optional_var("SPREADSHEET_ID"),
            ) {
                (Some(credentials_path), Some(spreadsheet_id)) => Some(SheetsConfig {
                    credentials_path: PathBuf::from(credentials_path),
                    spreadsheet_id,
                    sheet_name: env::var("SHEET_NAME").unwrap_or_else(|_| "Sheet1".to_string()),
                }),
                _ => None,
            },
            logo_url: optional_var("LOGO_URL"),
        };

        if assessment.payment.enabled && integrations.razorpay.is_none() {
            return Err(ConfigError::MissingPaymentCredentials);
        }

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            assessment,
            integrations,
        })
    }
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_flag(variable: &'static str, default: bool) -> Result<bool, ConfigError> {
    match optional_var(variable) {
        None => Ok(default),
        Some(raw) => match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidFlag { variable }),
        },
    }
}

fn parse_number<T: std::str::FromStr>(variable: &'static str, default: T) -> Result<T, ConfigError> {
    match optional_var(variable) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { variable }),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Questionnaire, session, and checkout behavior.
#[derive(Debug, Clone)]
pub struct AssessmentConfig {
    pub questions_path: PathBuf,
    pub session_ttl: Duration,
    pub payment: PaymentConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentConfig {
    pub enabled: bool,
    pub amount_minor: u64,
    pub currency: String,
    pub poll_attempts: u32,
    pub poll_delay: Duration,
}

impl Default for PaymentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            amount_minor: 49_900,
            currency: "INR".to_string(),
            poll_attempts: 12,
            poll_delay: Duration::from_secs(5),
        }
    }
}

/// Credentials for the third-party collaborators. Absent entries fall back to offline stand-ins.
#[derive(Debug, Clone, Default)]
pub struct IntegrationConfig {
    pub gemini: Option<GeminiConfig>,
    pub razorpay: Option<RazorpayConfig>,
    pub sheets: Option<SheetsConfig>,
    pub logo_url: Option<String>,
}

#[derive(Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: String,
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
}

impl fmt::Debug for RazorpayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RazorpayConfig")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub struct SheetsConfig {
    pub credentials_path: PathBuf,
    pub spreadsheet_id: String,
    pub sheet_name: String,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidFlag { variable: &'static str },
    InvalidNumber { variable: &'static str },
    MissingPaymentCredentials,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidFlag { variable } => {
                write!(f, "{variable} must be one of true/false/1/0/yes/no/on/off")
            }
            ConfigError::InvalidNumber { variable } => {
                write!(f, "{variable} must be a positive whole number")
            }
            ConfigError::MissingPaymentCredentials => write!(
                f,
                "PAYMENT_ENABLED requires RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET"
            ),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
