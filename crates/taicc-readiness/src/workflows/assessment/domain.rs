use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Five-point rating vocabulary presented for every question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Rating {
    #[serde(rename = "Not at all")]
    NotAtAll,
    Slightly,
    Moderately,
    Very,
    Fully,
}

impl Rating {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::NotAtAll,
            Self::Slightly,
            Self::Moderately,
            Self::Very,
            Self::Fully,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::NotAtAll => "Not at all",
            Self::Slightly => "Slightly",
            Self::Moderately => "Moderately",
            Self::Very => "Very",
            Self::Fully => "Fully",
        }
    }

    pub const fn score(self) -> u8 {
        match self {
            Self::NotAtAll => 1,
            Self::Slightly => 2,
            Self::Moderately => 3,
            Self::Very => 4,
            Self::Fully => 5,
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        let trimmed = label.trim();
        Self::ordered()
            .into_iter()
            .find(|rating| rating.label().eq_ignore_ascii_case(trimmed))
    }

    pub fn from_score(score: u8) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|rating| rating.score() == score)
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Maturity classification derived from the overall average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaturityLevel {
    Beginner,
    Emerging,
    Established,
    Advanced,
    AiLeader,
    Undefined,
}

impl MaturityLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Emerging => "Emerging",
            Self::Established => "Established",
            Self::Advanced => "Advanced",
            Self::AiLeader => "AI Leader",
            Self::Undefined => "Undefined",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::Beginner => "Just starting AI journey, minimal awareness.",
            Self::Emerging => "Early experiments, limited AI integration.",
            Self::Established => "Defined AI strategy, some successful projects.",
            Self::Advanced => "Mature AI adoption, integrated into processes.",
            Self::AiLeader => "Industry-leading AI innovation and scale.",
            Self::Undefined => "Score outside the published maturity ranges.",
        }
    }
}

impl fmt::Display for MaturityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Inclusive score range mapped to a maturity level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaturityBand {
    pub lower: f64,
    pub upper: f64,
    pub level: MaturityLevel,
}

impl MaturityBand {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }

    pub fn range_label(&self) -> String {
        format!("{:.1} - {:.1}", self.lower, self.upper)
    }
}

/// Bands in evaluation order.
pub const MATURITY_BANDS: [MaturityBand; 5] = [
    MaturityBand {
        lower: 0.0,
        upper: 1.0,
        level: MaturityLevel::Beginner,
    },
    MaturityBand {
        lower: 1.1,
        upper: 2.0,
        level: MaturityLevel::Emerging,
    },
    MaturityBand {
        lower: 2.1,
        upper: 3.0,
        level: MaturityLevel::Established,
    },
    MaturityBand {
        lower: 3.1,
        upper: 4.0,
        level: MaturityLevel::Advanced,
    },
    MaturityBand {
        lower: 4.1,
        upper: 5.0,
        level: MaturityLevel::AiLeader,
    },
];

/// Respondent details captured on the login screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub company: String,
    pub email: String,
    pub phone: String,
    pub segment: String,
    pub tier: String,
}

impl UserProfile {
    /// Contact fields in display order, as rendered in reports.
    pub fn contact_fields(&self) -> [(&'static str, &str); 4] {
        [
            ("Name", self.name.as_str()),
            ("Company", self.company.as_str()),
            ("Email", self.email.as_str()),
            ("Phone", self.phone.as_str()),
        ]
    }
}

/// Stable identifier for a rendered question: `Q{index}-{text}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QuestionKey(pub String);

impl QuestionKey {
    pub fn new(index: usize, question: &str) -> Self {
        Self(format!("Q{index}-{question}"))
    }
}

impl fmt::Display for QuestionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Collected ratings keyed by question. Recording a key twice keeps the latest rating.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerSet {
    entries: BTreeMap<QuestionKey, Rating>,
}

impl AnswerSet {
    pub fn record(&mut self, key: QuestionKey, rating: Rating) -> Option<Rating> {
        self.entries.insert(key, rating)
    }

    pub fn get(&self, key: &QuestionKey) -> Option<Rating> {
        self.entries.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn scores(&self) -> impl Iterator<Item = u8> + '_ {
        self.entries.values().map(|rating| rating.score())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&QuestionKey, Rating)> {
        self.entries.iter().map(|(key, rating)| (key, *rating))
    }
}
