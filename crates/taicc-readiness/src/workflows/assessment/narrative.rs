use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Write as _};
use std::time::Duration;

use super::domain::{MaturityLevel, UserProfile};
use crate::config::GeminiConfig;

const GEMINI_API: &str = "https://generativelanguage.googleapis.com/v1beta";

#[derive(Debug, thiserror::Error)]
pub enum NarrativeError {
    #[error("text generation service unreachable: {0}")]
    Transport(String),
    #[error("text generation service returned HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
    #[error("unexpected text generation response: {0}")]
    Decode(String),
    #[error("text generation service returned no text")]
    Empty,
}

/// Produces the free-text report shown on the results screen.
pub trait TextGenerator: Debug + Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, NarrativeError>;
}

/// Prompt for the consultant-style report: respondent context, score, and maturity label.
pub fn build_prompt(profile: &UserProfile, average: f64, maturity: MaturityLevel) -> String {
    let mut prompt = String::new();
    let company = if profile.company.trim().is_empty() {
        "the respondent's organization"
    } else {
        profile.company.trim()
    };

    let _ = writeln!(
        prompt,
        "You are an expert AI transformation consultant preparing a readiness report for {company}."
    );
    let _ = writeln!(
        prompt,
        "Industry segment: {}. Organizational cohort: {}.",
        profile.segment, profile.tier
    );
    if !profile.name.trim().is_empty() {
        let _ = writeln!(prompt, "The report is addressed to {}.", profile.name.trim());
    }
    let _ = writeln!(
        prompt,
        "Their average AI readiness score is {average:.2} on a 1 to 5 scale, which places them at the '{}' maturity level ({}).",
        maturity.label(),
        maturity.description()
    );
    prompt.push_str(
        "Write a professional report with these sections:\n\
         - Summary of the current maturity level\n\
         - Key weaknesses or challenges organizations at this level face\n\
         - Practical recommendations for improvement\n\
         - A closing call to action to partner with TAICC for AI transformation support\n\
         Use clear business language suitable for executives.",
    );
    prompt
}

/// Google Gemini `generateContent` over blocking HTTP.
pub struct GeminiClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(config: &GeminiConfig) -> Result<Self, NarrativeError> {
        Self::with_base_url(config, GEMINI_API)
    }

    pub fn with_base_url(
        config: &GeminiConfig,
        base_url: impl Into<String>,
    ) -> Result<Self, NarrativeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(90))
            .build()
            .map_err(|err| NarrativeError::Transport(err.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

impl Debug for GeminiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, NarrativeError> {
        let request = GenerateRequest {
            contents: [Content {
                parts: [Part { text: prompt }],
            }],
        };

        let response = self
            .client
            .post(format!(
                "{}/models/{}:generateContent",
                self.base_url, self.model
            ))
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .map_err(|err| NarrativeError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(NarrativeError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let payload: GenerateResponse = response
            .json()
            .map_err(|err| NarrativeError::Decode(err.to_string()))?;

        let text = payload
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(NarrativeError::Empty);
        }
        Ok(trimmed.to_string())
    }
}
