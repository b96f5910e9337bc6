use std::fmt;

use serde::{Deserialize, Serialize};

/// Categorical classifier output. Stored upper-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Verdict {
    Spam,
    Ham,
    /// Any label outside SPAM/HAM, kept upper-cased.
    Other(String),
}

impl Verdict {
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_uppercase();
        match normalized.as_str() {
            "SPAM" => Verdict::Spam,
            "HAM" => Verdict::Ham,
            _ => Verdict::Other(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Verdict::Spam => "SPAM",
            Verdict::Ham => "HAM",
            Verdict::Other(label) => label.as_str(),
        }
    }
}

impl From<String> for Verdict {
    fn from(value: String) -> Self {
        Verdict::parse(&value)
    }
}

impl From<Verdict> for String {
    fn from(value: Verdict) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScamCheckRecord {
    #[serde(rename = "Message")]
    pub message: String,
    #[serde(rename = "ML")]
    pub ml_verdict: Verdict,
    #[serde(rename = "Gemini")]
    pub secondary_verdict: Verdict,
    #[serde(rename = "Final")]
    pub final_verdict: Verdict,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScamPatterns {
    pub has_url: bool,
    pub has_shortened_url: bool,
    pub has_phone: bool,
    pub has_urgent_language: bool,
    pub has_financial_terms: bool,
    pub has_suspicious_chars: bool,
    pub is_very_short: bool,
    pub is_very_long: bool,
}

impl ScamPatterns {
    pub fn flagged_count(&self) -> usize {
        [
            self.has_url,
            self.has_shortened_url,
            self.has_phone,
            self.has_urgent_language,
            self.has_financial_terms,
            self.has_suspicious_chars,
            self.is_very_short,
            self.is_very_long,
        ]
        .iter()
        .filter(|flag| **flag)
        .count()
    }
}

/// `/scam/predict` response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScamPrediction {
    pub ml_prediction: String,
    pub gemini_prediction: String,
    pub final_prediction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patterns: Option<ScamPatterns>,
    /// 0-8.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risk_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamStats {
    pub spam_count: usize,
    pub ham_count: usize,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DistributionSlice {
    pub name: String,
    pub value: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScamStatsView {
    pub stats: ScamStats,
    pub distribution: Vec<DistributionSlice>,
    pub history: Vec<ScamCheckRecord>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QrCheckOutcome {
    pub decoded_message: String,
    pub prediction: ScamPrediction,
}
