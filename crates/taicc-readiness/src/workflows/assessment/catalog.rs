use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Read-only questionnaire: segment → tier → ordered questions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCatalog {
    segments: Vec<SegmentQuestions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct SegmentQuestions {
    name: String,
    tiers: Vec<TierQuestions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TierQuestions {
    name: String,
    questions: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read question catalog {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("question catalog is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("question catalog must map segment -> tier -> [questions]: {0}")]
    Shape(String),
    #[error("question catalog contains no segments")]
    Empty,
    #[error("unknown segment '{0}'")]
    UnknownSegment(String),
    #[error("segment '{segment}' has no tier '{tier}'")]
    UnknownTier { segment: String, tier: String },
}

impl QuestionCatalog {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, CatalogError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CatalogError> {
        let document: Value = serde_json::from_reader(reader)?;
        Self::from_value(document)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, CatalogError> {
        let document: Value = serde_json::from_str(raw)?;
        Self::from_value(document)
    }

    fn from_value(document: Value) -> Result<Self, CatalogError> {
        let Value::Object(segment_map) = document else {
            return Err(CatalogError::Shape("top level is not an object".to_string()));
        };

        let mut segments = Vec::with_capacity(segment_map.len());
        for (segment, tiers_value) in segment_map {
            let Value::Object(tier_map) = tiers_value else {
                return Err(CatalogError::Shape(format!(
                    "segment '{segment}' is not an object of tiers"
                )));
            };
            if tier_map.is_empty() {
                return Err(CatalogError::Shape(format!("segment '{segment}' has no tiers")));
            }

            let mut tiers = Vec::with_capacity(tier_map.len());
            for (tier, questions_value) in tier_map {
                let Value::Array(items) = questions_value else {
                    return Err(CatalogError::Shape(format!(
                        "'{segment}' / '{tier}' is not a list of questions"
                    )));
                };

                let questions = items
                    .into_iter()
                    .map(|item| match item {
                        Value::String(text) if !text.trim().is_empty() => Ok(text),
                        _ => Err(CatalogError::Shape(format!(
                            "'{segment}' / '{tier}' contains a blank or non-text question"
                        ))),
                    })
                    .collect::<Result<Vec<_>, _>>()?;

                if questions.is_empty() {
                    return Err(CatalogError::Shape(format!(
                        "'{segment}' / '{tier}' has no questions"
                    )));
                }

                tiers.push(TierQuestions {
                    name: tier,
                    questions,
                });
            }

            segments.push(SegmentQuestions {
                name: segment,
                tiers,
            });
        }

        if segments.is_empty() {
            return Err(CatalogError::Empty);
        }

        Ok(Self { segments })
    }

    /// Segment names in document order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(|segment| segment.name.as_str())
    }

    /// Tier names offered on the login form. Every segment is expected to share the
    /// tiers of the first one.
    pub fn tiers(&self) -> impl Iterator<Item = &str> {
        self.segments
            .first()
            .into_iter()
            .flat_map(|segment| segment.tiers.iter().map(|tier| tier.name.as_str()))
    }

    pub fn contains(&self, segment: &str, tier: &str) -> bool {
        self.questions(segment, tier).is_ok()
    }

    pub fn questions(&self, segment: &str, tier: &str) -> Result<&[String], CatalogError> {
        let entry = self
            .segments
            .iter()
            .find(|candidate| candidate.name == segment)
            .ok_or_else(|| CatalogError::UnknownSegment(segment.to_string()))?;

        entry
            .tiers
            .iter()
            .find(|candidate| candidate.name == tier)
            .map(|tier| tier.questions.as_slice())
            .ok_or_else(|| CatalogError::UnknownTier {
                segment: segment.to_string(),
                tier: tier.to_string(),
            })
    }

    /// Serializable listing for the catalog endpoint and the CLI.
    pub fn summary(&self) -> CatalogSummary {
        CatalogSummary {
            segments: self
                .segments()
                .map(|name| CatalogEntry {
                    name: name.to_string(),
                    description: segment_explanation(name),
                })
                .collect(),
            tiers: self
                .tiers()
                .map(|name| CatalogEntry {
                    name: name.to_string(),
                    description: tier_explanation(name),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogSummary {
    pub segments: Vec<CatalogEntry>,
    pub tiers: Vec<CatalogEntry>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<&'static str>,
}

pub fn segment_explanation(segment: &str) -> Option<&'static str> {
    let text = match segment {
        "BFSI" => "Banking, Financial Services, and Insurance including NBFCs, Co-op Banks, Stock Broking, and more",
        "Manufacturing" => "Industries such as Automobiles, Textiles, and Machinery",
        "Healthcare" => "Hospitals, diagnostics, health-tech platforms, and telemedicine",
        "Hospitality" => "Hotels, resorts, restaurants, and travel accommodations",
        "Pharma" => "Pharmaceutical research, biotech, and medicine production",
        "Travel and Tourism" => "Tour operators, online travel platforms, airlines, etc.",
        "Construction" => "Infrastructure, civil engineering, and public works",
        "Real Estate" => "Residential and commercial property development and sales",
        "Education & EdTech" => "Schools, universities, online learning platforms",
        "Retail & E-commerce" => "Retail chains, marketplaces, and D2C brands",
        "Logistics & Supply Chain" => "Warehousing, distribution, and delivery services",
        "Agritech" => "Smart farming, agri-inputs, and precision agriculture",
        "IT & ITES" => "Software companies, IT services, and BPOs",
        "Legal & Compliance" => "Law firms, compliance tools, and contract automation",
        "Energy & Utilities" => "Power generation, oil & gas, renewables",
        "Telecommunications" => "Network providers, internet services, and 5G tech",
        "Media & Entertainment" => "Broadcasting, streaming platforms, and gaming",
        "PropTech" => "Real estate technology platforms",
        "FMCG & Consumer Goods" => "Packaged goods and fast-moving consumer brands",
        "Public Sector" => "Government departments, PSUs, and public welfare",
        "Automotive" => "OEMs, auto ancillaries, and connected vehicles",
        "Environmental & Sustainability" => "Climate tech, carbon tracking, and ESG",
        "Smart Cities" => "Urban tech, IoT infrastructure, and city planning",
        _ => return None,
    };
    Some(text)
}

pub fn tier_explanation(tier: &str) -> Option<&'static str> {
    let text = match tier {
        "Tier 1" => "Enterprise Leaders: large organizations with significant AI investments and robust strategies.",
        "Tier 2" => "Strategic Innovators: established companies actively experimenting and implementing AI.",
        "Tier 3" => "Growth Enablers: mid-sized firms beginning structured AI adoption efforts.",
        "Tier 4" => "Agile Starters: startups or small businesses with a high willingness to explore AI.",
        "Tier 5" => "Traditional Operators: individuals or firms with minimal or no current AI engagement.",
        _ => return None,
    };
    Some(text)
}
