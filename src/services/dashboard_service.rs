use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Datelike;
use chrono_tz::Tz;

use crate::error::AppResult;
use crate::models::analysis::AnalysisRecord;
use crate::models::dashboard::{
    DashboardOverview, DashboardTotals, EmotionShare, SkillScore, WeeklyBucket,
};
use crate::services::analysis_history::AnalysisHistoryStore;
use crate::services::settings_service::SettingsService;

const TREND_WEEKS: usize = 8;
const EMOTION_SLICES: usize = 6;
const RECENT_ANALYSES: usize = 6;
const ENGAGEMENT_EMOTION: &str = "happy";

pub struct DashboardService {
    history: AnalysisHistoryStore,
    settings: Arc<SettingsService>,
}

impl DashboardService {
    pub fn new(history: AnalysisHistoryStore, settings: Arc<SettingsService>) -> Self {
        Self { history, settings }
    }

    pub fn overview(&self) -> AppResult<DashboardOverview> {
        let records = self.history.read_all();
        let timezone = self.settings.timezone()?;
        Ok(build_overview(&records, timezone))
    }
}

pub fn build_overview(records: &[AnalysisRecord], timezone: Tz) -> DashboardOverview {
    DashboardOverview {
        totals: summarize(records),
        weekly_trend: weekly_trend(records, timezone),
        skills: skill_snapshot(records),
        emotions: emotion_breakdown(records),
        recent: records.iter().take(RECENT_ANALYSES).cloned().collect(),
    }
}

pub fn summarize(records: &[AnalysisRecord]) -> DashboardTotals {
    let latest = records.first();
    DashboardTotals {
        total: records.len(),
        average_score: rounded_mean(records.iter().map(|record| record.overall_score)),
        last_analysis_at: latest.map(|record| record.created_at),
        last_emotion: latest.map(|record| record.emotion.clone()),
        last_score: latest.map(|record| record.overall_score),
    }
}

/// Groups records by ISO week in `timezone`, oldest bucket first, keeping the
/// most recent eight.
pub fn weekly_trend(records: &[AnalysisRecord], timezone: Tz) -> Vec<WeeklyBucket> {
    let mut weeks: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for record in records {
        let week = record.created_at.with_timezone(&timezone).iso_week();
        let key = format!("{}-W{:02}", week.year(), week.week());
        weeks.entry(key).or_default().push(record.overall_score);
    }

    let skip = weeks.len().saturating_sub(TREND_WEEKS);
    weeks
        .into_iter()
        .skip(skip)
        .map(|(name, scores)| WeeklyBucket {
            name,
            presentations: scores.len(),
            score: rounded_mean(scores.into_iter()),
        })
        .collect()
}

/// Four skill scores taken from the most recent record.
pub fn skill_snapshot(records: &[AnalysisRecord]) -> Vec<SkillScore> {
    let (body, speech, engagement, confidence) = match records.first() {
        Some(latest) => (
            latest.body_score,
            latest.speech_score,
            to_percent(latest.emotion_analysis.fraction(ENGAGEMENT_EMOTION)),
            latest.body_language.score,
        ),
        None => (0, 0, 0, 0),
    };

    [
        ("Body Language", body),
        ("Speech Clarity", speech),
        ("Engagement", engagement),
        ("Confidence", confidence),
    ]
    .into_iter()
    .map(|(skill, score)| SkillScore {
        skill: skill.to_string(),
        score,
    })
    .collect()
}

pub fn emotion_breakdown(records: &[AnalysisRecord]) -> Vec<EmotionShare> {
    records
        .first()
        .map(|latest| {
            latest
                .emotion_analysis
                .emotions
                .iter()
                .take(EMOTION_SLICES)
                .map(|(name, fraction)| EmotionShare {
                    name: name.to_string(),
                    value: to_percent(fraction),
                })
                .collect()
        })
        .unwrap_or_default()
}

fn rounded_mean(scores: impl Iterator<Item = i64>) -> i64 {
    let (sum, count) = scores.fold((0i64, 0i64), |(sum, count), score| (sum + score, count + 1));
    if count == 0 {
        return 0;
    }
    (sum as f64 / count as f64).round() as i64
}

fn to_percent(fraction: f64) -> i64 {
    (fraction * 100.0).round() as i64
}
