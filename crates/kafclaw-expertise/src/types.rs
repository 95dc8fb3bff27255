//! Expertise tracker data model (spec §3 `ExpertiseRow`, §4.9).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of action a skill event records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    /// A task completed.
    TaskCompleted,
    /// A tool was used.
    ToolUsed,
    /// Explicit user feedback was recorded.
    UserFeedback,
    /// Anything else — counts as a failure per spec §4.9.
    Other,
}

impl Action {
    /// Whether this action counts toward the success or failure counter
    /// (spec §4.9: `action ∈ {task_completed, tool_used, user_feedback} →
    /// success; else failure`).
    #[must_use]
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Other)
    }
}

/// A single recorded skill event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillEvent {
    /// Skill (domain) name this event is attributed to.
    pub skill_name: String,
    /// The action performed.
    pub action: Action,
    /// Quality reading in `[0, 1]`.
    pub quality: f64,
    /// Duration of the underlying operation, in milliseconds.
    pub duration_ms: u64,
    /// When this event was recorded.
    pub recorded_at: DateTime<Utc>,
}

/// Trend direction for a skill's quality over time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    /// Mean of the last 10 events exceeds the previous 10 by > 0.1.
    Improving,
    /// Neither improving nor declining.
    Stable,
    /// Mean of the last 10 events is below the previous 10 by > 0.1.
    Declining,
}

/// Aggregate row for one skill (spec §3 `ExpertiseRow`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpertiseRow {
    /// Skill (domain) name.
    pub skill_name: String,
    /// Count of success-classified events.
    pub success_count: u64,
    /// Count of failure-classified events.
    pub failure_count: u64,
    /// Mean quality of the most recent ≤ 50 events.
    pub avg_quality: f64,
    /// Trend over the last 10 vs previous 10 events.
    pub trend: Trend,
    /// Timestamp of the most recent event.
    pub last_used: DateTime<Utc>,
    /// Sum of all recorded durations, in milliseconds.
    pub total_duration_ms: u64,
    /// Quality readings retained for `avg_quality`/`trend` computation,
    /// most recent last, capped at 50.
    #[serde(default)]
    pub recent_qualities: Vec<f64>,
}

impl ExpertiseRow {
    /// Start a new row from a single event.
    #[must_use]
    pub fn from_first_event(event: &SkillEvent) -> Self {
        let (success_count, failure_count) = if event.action.is_success() {
            (1, 0)
        } else {
            (0, 1)
        };
        Self {
            skill_name: event.skill_name.clone(),
            success_count,
            failure_count,
            avg_quality: event.quality,
            trend: Trend::Stable,
            last_used: event.recorded_at,
            total_duration_ms: event.duration_ms,
            recent_qualities: vec![event.quality],
        }
    }

    /// Total events recorded (success + failure).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.success_count + self.failure_count
    }

    /// Success rate in `[0, 1]`; `0.0` if no events have been recorded.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.success_count as f64 / total as f64
        }
    }

    /// Read-only composite score (spec §4.9):
    /// `0.6*successRate + 0.3*avgQuality + 0.1*min(1, total/100)`.
    #[must_use]
    pub fn score(&self) -> f64 {
        let volume_term = (self.total() as f64 / 100.0).min(1.0);
        0.6 * self.success_rate() + 0.3 * self.avg_quality + 0.1 * volume_term
    }
}

/// Mean of the last 10 events vs the previous 10, per spec §3/§4.9:
/// improving if the delta exceeds `0.1`, declining if under `-0.1`.
#[must_use]
pub fn compute_trend(recent_qualities: &[f64]) -> Trend {
    if recent_qualities.len() < 20 {
        return Trend::Stable;
    }
    let len = recent_qualities.len();
    let last_10 = &recent_qualities[len - 10..];
    let previous_10 = &recent_qualities[len - 20..len - 10];

    let mean = |xs: &[f64]| xs.iter().sum::<f64>() / xs.len() as f64;
    let delta = mean(last_10) - mean(previous_10);

    if delta > 0.1 {
        Trend::Improving
    } else if delta < -0.1 {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_success_classification() {
        assert!(Action::TaskCompleted.is_success());
        assert!(Action::ToolUsed.is_success());
        assert!(Action::UserFeedback.is_success());
        assert!(!Action::Other.is_success());
    }

    #[test]
    fn trend_stable_under_twenty_events() {
        let qualities = vec![0.9; 15];
        assert_eq!(compute_trend(&qualities), Trend::Stable);
    }

    #[test]
    fn trend_improving_when_delta_exceeds_threshold() {
        let mut qualities = vec![0.3; 10];
        qualities.extend(vec![0.6; 10]);
        assert_eq!(compute_trend(&qualities), Trend::Improving);
    }

    #[test]
    fn trend_declining_when_delta_below_negative_threshold() {
        let mut qualities = vec![0.8; 10];
        qualities.extend(vec![0.4; 10]);
        assert_eq!(compute_trend(&qualities), Trend::Declining);
    }

    #[test]
    fn score_formula_matches_spec_weights() {
        let row = ExpertiseRow {
            skill_name: "filesystem".to_string(),
            success_count: 100,
            failure_count: 0,
            avg_quality: 1.0,
            trend: Trend::Stable,
            last_used: Utc::now(),
            total_duration_ms: 0,
            recent_qualities: vec![],
        };
        assert!((row.score() - 1.0).abs() < 1e-9);
    }
}
