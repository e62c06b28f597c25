//! Metric derivation
//!
//! Converts a daily step total into distance, energy expenditure and an
//! achievement tier. All functions are pure; constants come from the
//! [`StepConfig`] the engine was built with.

use crate::accumulator::DaySeries;
use crate::config::StepConfig;
use crate::types::{AchievementTier, Packet, Report};

/// Calorie coefficient applied to body weight
pub const K1: f64 = 0.035;
/// Calorie coefficient applied to the speed/height term
pub const K2: f64 = 0.029;

const METERS_PER_KM: f64 = 1000.0;
const SECONDS_PER_MINUTE: f64 = 60.0;

/// Distance thresholds (km) for each tier, highest first
const TIER_THRESHOLDS: [(f64, AchievementTier); 3] = [
    (6.5, AchievementTier::Excellent),
    (3.9, AchievementTier::Good),
    (2.0, AchievementTier::KeepGoing),
];

/// Metrics engine for computing derived values from step totals
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    config: StepConfig,
}

impl MetricsEngine {
    pub fn new(config: StepConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StepConfig {
        &self.config
    }

    /// Sum of steps over the series
    pub fn total_steps(&self, series: &DaySeries) -> u64 {
        series.total_steps()
    }

    /// Distance walked (meters)
    pub fn distance_meters(&self, total_steps: u64) -> f64 {
        total_steps as f64 * self.config.step_length_m
    }

    /// Energy spent walking `distance_meters` (kcal)
    pub fn calories(&self, distance_meters: f64) -> f64 {
        let weight = self.config.weight_kg;
        let speed = self.config.walking_speed_mps;
        let height = self.config.height_m;

        let energy_per_minute = K1 * weight + (speed * speed / height) * K2 * weight;
        let minutes_walking = distance_meters / speed / SECONDS_PER_MINUTE;
        energy_per_minute * minutes_walking
    }

    /// Achievement tier for a daily distance (km)
    pub fn achievement_tier(&self, distance_km: f64) -> AchievementTier {
        achievement_tier(distance_km)
    }

    /// Build the report for `packet` from the current series
    pub fn report(&self, packet: &Packet, series: &DaySeries) -> Report {
        let total_steps = self.total_steps(series);
        let distance_m = self.distance_meters(total_steps);
        let kcal = self.calories(distance_m);
        let distance_km = distance_m / METERS_PER_KM;
        let tier = self.achievement_tier(distance_km);

        Report {
            time: packet.time(),
            total_steps,
            distance_km,
            kcal,
            tier,
            achievement: tier.message().to_string(),
        }
    }
}

/// Achievement tier for a daily distance (km)
pub fn achievement_tier(distance_km: f64) -> AchievementTier {
    TIER_THRESHOLDS
        .iter()
        .find(|(threshold, _)| distance_km >= *threshold)
        .map(|(_, tier)| *tier)
        .unwrap_or(AchievementTier::Participation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accumulator::DayAccumulator;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_distance() {
        let engine = MetricsEngine::default();
        assert!((engine.distance_meters(3000) - 1950.0).abs() < 1e-9);
        assert_eq!(engine.distance_meters(0), 0.0);
    }

    #[test]
    fn test_calories_formula() {
        let engine = MetricsEngine::default();
        let distance = 1950.0;

        let energy_per_minute = 0.035 * 75.0 + (1.39 * 1.39 / 1.75) * 0.029 * 75.0;
        let minutes = distance / 1.39 / 60.0;
        let expected = energy_per_minute * minutes;

        assert!((engine.calories(distance) - expected).abs() < 1e-9);
        // ~5.03 kcal/min over ~23.4 min
        assert!((engine.calories(distance) - 117.52).abs() < 0.01);
    }

    #[test]
    fn test_calories_use_config() {
        let heavy = MetricsEngine::new(StepConfig {
            weight_kg: 150.0,
            ..StepConfig::default()
        });
        let default = MetricsEngine::default();
        let ratio = heavy.calories(1000.0) / default.calories(1000.0);
        assert!((ratio - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_tier_thresholds() {
        assert_eq!(achievement_tier(10.0), AchievementTier::Excellent);
        assert_eq!(achievement_tier(6.5), AchievementTier::Excellent);
        assert_eq!(achievement_tier(6.49), AchievementTier::Good);
        assert_eq!(achievement_tier(3.9), AchievementTier::Good);
        assert_eq!(achievement_tier(3.89), AchievementTier::KeepGoing);
        assert_eq!(achievement_tier(2.0), AchievementTier::KeepGoing);
        assert_eq!(achievement_tier(1.95), AchievementTier::Participation);
        assert_eq!(achievement_tier(0.0), AchievementTier::Participation);
    }

    #[test]
    fn test_pure_functions_are_repeatable() {
        let engine = MetricsEngine::default();
        for steps in [0u64, 1, 3000, 12_345, 1_000_000] {
            let d1 = engine.distance_meters(steps);
            let d2 = engine.distance_meters(steps);
            assert_eq!(d1.to_bits(), d2.to_bits());
            assert_eq!(engine.calories(d1).to_bits(), engine.calories(d2).to_bits());
            assert_eq!(
                engine.achievement_tier(d1 / 1000.0),
                engine.achievement_tier(d2 / 1000.0)
            );
        }
    }

    #[test]
    fn test_report_from_series() {
        let now = Utc.with_ymd_and_hms(2024, 1, 15, 12, 0, 0).unwrap();
        let mut acc = DayAccumulator::default();
        acc.accept("20240115 08:00:00,1000", now).unwrap();
        acc.accept("20240115 09:00:00,2000", now).unwrap();

        let engine = MetricsEngine::default();
        let last = *acc.series().last().unwrap();
        let report = engine.report(&last, acc.series());

        assert_eq!(report.total_steps, 3000);
        assert!((report.distance_km - 1.95).abs() < 1e-9);
        assert_eq!(report.tier, AchievementTier::Participation);
        assert_eq!(report.time.to_string(), "09:00:00");
    }
}
