use std::fmt;

use chrono::{DateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map as JsonMap, Value as JsonValue};

pub const DEFAULT_EMOTION: &str = "neutral";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyLanguageFindings {
    #[serde(deserialize_with = "score_or_zero")]
    pub score: i64,
    pub strengths: Vec<String>,
    pub problems_detected: Vec<String>,
    pub keys_to_improve: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeechMetrics {
    /// Seconds.
    pub duration: f64,
    pub speaking_rate: f64,
    /// Percent, 0-100.
    pub volume: f64,
    /// Hz.
    pub pitch: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmotionAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dominant_emotion: Option<String>,
    pub emotions: EmotionFractions,
}

impl EmotionAnalysis {
    pub fn fraction(&self, label: &str) -> f64 {
        self.emotions.get(label).unwrap_or(0.0)
    }
}

/// Label to fraction in `[0, 1]`, kept in the order the server sent them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EmotionFractions(Vec<(String, f64)>);

impl EmotionFractions {
    pub fn get(&self, label: &str) -> Option<f64> {
        self.0
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, fraction)| *fraction)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, fraction)| (name.as_str(), *fraction))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A repeated label keeps its first position and takes the latest value.
    fn insert(&mut self, label: String, fraction: f64) {
        match self.0.iter_mut().find(|(name, _)| *name == label) {
            Some(entry) => entry.1 = fraction,
            None => self.0.push((label, fraction)),
        }
    }
}

impl FromIterator<(String, f64)> for EmotionFractions {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut fractions = Self::default();
        for (label, fraction) in iter {
            fractions.insert(label, fraction);
        }
        fractions
    }
}

impl Serialize for EmotionFractions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(name, fraction)| (name, fraction)))
    }
}

impl<'de> Deserialize<'de> for EmotionFractions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct FractionsVisitor;

        impl<'de> Visitor<'de> for FractionsVisitor {
            type Value = EmotionFractions;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a map of emotion labels to fractions")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut fractions = EmotionFractions::default();
                while let Some((label, fraction)) = access.next_entry::<String, f64>()? {
                    fractions.insert(label, fraction);
                }
                Ok(fractions)
            }
        }

        deserializer.deserialize_map(FractionsVisitor)
    }
}

/// Successful `/analyze` payload. Unknown fields are kept in `extra` so the
/// caller sees the full server response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResponse {
    #[serde(default, deserialize_with = "optional_score")]
    pub overall_score: Option<i64>,
    #[serde(default, deserialize_with = "optional_score")]
    pub body_score: Option<i64>,
    #[serde(default, deserialize_with = "optional_score")]
    pub speech_score: Option<i64>,
    #[serde(default)]
    pub emotion: Option<String>,
    #[serde(default)]
    pub body_language: Option<BodyLanguageFindings>,
    #[serde(default)]
    pub speech_analysis: Option<SpeechMetrics>,
    #[serde(default)]
    pub emotion_analysis: Option<EmotionAnalysis>,
    #[serde(flatten)]
    pub extra: JsonMap<String, JsonValue>,
}

/// One stored video analysis. Field names match the JSON written by the web
/// client so existing history stays readable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub overall_score: i64,
    #[serde(default)]
    pub body_score: i64,
    #[serde(default)]
    pub speech_score: i64,
    #[serde(default = "default_emotion")]
    pub emotion: String,
    #[serde(default)]
    pub body_language: BodyLanguageFindings,
    #[serde(default)]
    pub speech_analysis: SpeechMetrics,
    #[serde(default)]
    pub emotion_analysis: EmotionAnalysis,
}

impl AnalysisRecord {
    pub fn from_response(
        response: &AnalysisResponse,
        id: impl Into<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            overall_score: response.overall_score.unwrap_or(0),
            body_score: response.body_score.unwrap_or(0),
            speech_score: response.speech_score.unwrap_or(0),
            emotion: response
                .emotion
                .as_deref()
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .unwrap_or(DEFAULT_EMOTION)
                .to_string(),
            body_language: response.body_language.clone().unwrap_or_default(),
            speech_analysis: response.speech_analysis.clone().unwrap_or_default(),
            emotion_analysis: response.emotion_analysis.clone().unwrap_or_default(),
        }
    }
}

/// Video submitted for analysis.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisOutcome {
    pub result: AnalysisResponse,
    /// Id of the stored history record, `None` when persisting failed.
    pub record_id: Option<String>,
}

fn default_emotion() -> String {
    DEFAULT_EMOTION.to_string()
}

fn optional_score<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<f64> = Option::deserialize(deserializer)?;
    Ok(value.map(|score| score.round() as i64))
}

fn score_or_zero<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(optional_score(deserializer)?.unwrap_or(0))
}
