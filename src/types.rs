//! Core types for the Synheart Steps pipeline
//!
//! Values that flow between stages: parsed packets, achievement tiers, and the
//! per-packet report.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One validated step-counter observation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// Reading time (UTC)
    pub timestamp: DateTime<Utc>,
    /// Steps reported by this packet
    pub steps: u64,
}

impl Packet {
    pub fn new(timestamp: DateTime<Utc>, steps: u64) -> Self {
        Self { timestamp, steps }
    }

    /// Calendar date of the reading (UTC)
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }

    /// Clock portion of the reading
    pub fn time(&self) -> NaiveTime {
        self.timestamp.time()
    }
}

/// Motivational category derived from the daily distance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AchievementTier {
    Excellent,
    Good,
    KeepGoing,
    Participation,
}

impl AchievementTier {
    /// Stable lowercase name, identical to the serialized form
    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementTier::Excellent => "excellent",
            AchievementTier::Good => "good",
            AchievementTier::KeepGoing => "keep_going",
            AchievementTier::Participation => "participation",
        }
    }

    /// Fixed motivational message for this tier
    pub fn message(&self) -> &'static str {
        match self {
            AchievementTier::Excellent => "Excellent result! Goal achieved.",
            AchievementTier::Good => "Not bad! It was a productive day.",
            AchievementTier::KeepGoing => "We'll catch up tomorrow!",
            AchievementTier::Participation => {
                "Resting is useful too. Taking part matters more than winning!"
            }
        }
    }
}

/// Summary emitted after every stored packet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// Clock time of the packet that triggered the report
    pub time: NaiveTime,
    /// Steps accumulated today
    pub total_steps: u64,
    /// Distance walked today (km)
    pub distance_km: f64,
    /// Energy spent today (kcal)
    pub kcal: f64,
    /// Achievement tier for the distance
    pub tier: AchievementTier,
    /// Motivational message for the tier
    pub achievement: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time: {}.\nSteps today: {}.\nDistance: {:.2} km.\nCalories burned: {:.2} kcal.\n{}",
            self.time.format("%H:%M:%S"),
            self.total_steps,
            self.distance_km,
            self.kcal,
            self.achievement
        )
    }
}
