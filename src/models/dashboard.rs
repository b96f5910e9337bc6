use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::analysis::AnalysisRecord;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardTotals {
    pub total: usize,
    pub average_score: i64,
    pub last_analysis_at: Option<DateTime<Utc>>,
    pub last_emotion: Option<String>,
    pub last_score: Option<i64>,
}

/// One point of the performance trend, keyed `YYYY-Www`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyBucket {
    pub name: String,
    pub presentations: usize,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillScore {
    pub skill: String,
    pub score: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmotionShare {
    pub name: String,
    /// Rounded percent.
    pub value: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardOverview {
    pub totals: DashboardTotals,
    pub weekly_trend: Vec<WeeklyBucket>,
    pub skills: Vec<SkillScore>,
    pub emotions: Vec<EmotionShare>,
    pub recent: Vec<AnalysisRecord>,
}
