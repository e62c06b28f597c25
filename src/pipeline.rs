//! Pipeline orchestration
//!
//! This module provides the public API for Synheart Steps.
//! Each raw packet goes through:
//! 1. PacketParser - decode `"<timestamp>,<steps>"`
//! 2. DayAccumulator - freshness, ordering and rollover checks, storage
//! 3. MetricsEngine - distance, calories and achievement for the day total
//!
//! and ends up as a [`Report`], a rejection notice, or nothing at all for
//! zero-step packets.

use crate::accumulator::{Acceptance, DayAccumulator, DaySeries};
use crate::config::StepConfig;
use crate::error::{ConfigError, PacketError, RejectReason};
use crate::metrics::MetricsEngine;
use crate::parser::PacketParser;
use crate::sink::{Message, MessageSink};
use crate::source::{Clock, PacketSource};
use crate::types::Report;
use chrono::{DateTime, Utc};
use log::debug;
use serde::{Deserialize, Serialize};
use std::io;

/// Counters collected over one ingestion run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestSummary {
    pub processed: usize,
    pub stored: usize,
    pub ignored: usize,
    pub rollovers: usize,
    pub malformed: usize,
    pub wrong_day: usize,
    pub future_timestamp: usize,
    pub out_of_order: usize,
    /// Steps accumulated for the current day at the end of the run
    pub total_steps: u64,
}

impl IngestSummary {
    pub fn rejected(&self) -> usize {
        self.malformed + self.wrong_day + self.future_timestamp + self.out_of_order
    }

    fn record_rejection(&mut self, reason: RejectReason) {
        match reason {
            RejectReason::MalformedPacket => self.malformed += 1,
            RejectReason::WrongDay => self.wrong_day += 1,
            RejectReason::FutureTimestamp => self.future_timestamp += 1,
            RejectReason::OutOfOrder => self.out_of_order += 1,
        }
    }
}

/// Stateful processor for a single tracked day.
pub struct IngestionPipeline {
    accumulator: DayAccumulator,
    metrics: MetricsEngine,
}

impl Default for IngestionPipeline {
    fn default() -> Self {
        Self::new(StepConfig::default())
    }
}

impl IngestionPipeline {
    /// Create a pipeline from a configuration
    pub fn new(config: StepConfig) -> Self {
        Self {
            accumulator: DayAccumulator::new(PacketParser::from_config(&config)),
            metrics: MetricsEngine::new(config),
        }
    }

    /// Create a pipeline from a JSON configuration document
    pub fn from_config_json(json: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(StepConfig::from_json(json)?))
    }

    pub fn config(&self) -> &StepConfig {
        self.metrics.config()
    }

    pub fn series(&self) -> &DaySeries {
        self.accumulator.series()
    }

    pub fn total_steps(&self) -> u64 {
        self.accumulator.total_steps()
    }

    /// Forget everything accumulated so far
    pub fn reset(&mut self) {
        self.accumulator.reset();
    }

    /// Process one raw packet.
    ///
    /// Returns `Ok(None)` for zero-step packets, `Ok(Some(report))` when the
    /// packet was stored, and the rejection otherwise.
    pub fn ingest(&mut self, raw: &str, now: DateTime<Utc>) -> Result<Option<Report>, PacketError> {
        Ok(self.ingest_detailed(raw, now)?.1)
    }

    fn ingest_detailed(
        &mut self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<(Acceptance, Option<Report>), PacketError> {
        let acceptance = self.accumulator.accept(raw, now)?;
        let report = match acceptance {
            Acceptance::Ignored => None,
            Acceptance::Stored { packet, .. } => {
                let report = self.metrics.report(&packet, self.accumulator.series());
                debug!(
                    "{} steps today, {:.2} km, tier {}",
                    report.total_steps,
                    report.distance_km,
                    report.tier.as_str()
                );
                Some(report)
            }
        };
        Ok((acceptance, report))
    }

    /// Process one raw packet and hand the outcome to `sink`.
    ///
    /// Zero-step packets produce no message.
    pub fn process(
        &mut self,
        raw: &str,
        now: DateTime<Utc>,
        sink: &mut dyn MessageSink,
    ) -> io::Result<Result<Acceptance, PacketError>> {
        match self.ingest_detailed(raw, now) {
            Ok((acceptance, report)) => {
                if let Some(report) = report {
                    sink.emit(&Message::Report(report))?;
                }
                Ok(Ok(acceptance))
            }
            Err(error) => {
                sink.emit(&Message::Rejected {
                    packet: raw.to_string(),
                    error: error.clone(),
                })?;
                Ok(Err(error))
            }
        }
    }

    /// Drain `source`, sampling `clock` once per packet.
    ///
    /// Rejections are reported to the sink and counted; only I/O failures of
    /// the source or sink stop the run.
    pub fn run(
        &mut self,
        source: &mut dyn PacketSource,
        clock: &dyn Clock,
        sink: &mut dyn MessageSink,
    ) -> io::Result<IngestSummary> {
        let mut summary = IngestSummary::default();

        while let Some(raw) = source.next_packet()? {
            summary.processed += 1;
            match self.process(&raw, clock.now(), sink)? {
                Ok(Acceptance::Ignored) => summary.ignored += 1,
                Ok(Acceptance::Stored { rolled_over, .. }) => {
                    summary.stored += 1;
                    if rolled_over {
                        summary.rollovers += 1;
                    }
                }
                Err(error) => summary.record_rejection(error.reason()),
            }
        }

        summary.total_steps = self.total_steps();
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::CollectingSink;
    use crate::source::{sample_day, FixedClock, VecSource};
    use crate::types::AchievementTier;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 18, 0, 0).unwrap()
    }

    #[test]
    fn test_ingest_two_packets() {
        let mut pipeline = IngestionPipeline::default();

        let first = pipeline.ingest("20240115 08:00:00,1000", now()).unwrap().unwrap();
        assert_eq!(first.total_steps, 1000);

        let second = pipeline.ingest("20240115 09:00:00,2000", now()).unwrap().unwrap();
        assert_eq!(second.total_steps, 3000);
        assert!((second.distance_km - 1.95).abs() < 1e-9);
        assert_eq!(second.tier, AchievementTier::Participation);
        assert_eq!(second.time.format("%H:%M:%S").to_string(), "09:00:00");
    }

    #[test]
    fn test_zero_steps_produce_nothing() {
        let mut pipeline = IngestionPipeline::default();
        let mut sink = CollectingSink::new();

        let outcome = pipeline
            .process("20240115 08:00:00,0", now(), &mut sink)
            .unwrap();

        assert_eq!(outcome, Ok(Acceptance::Ignored));
        assert!(sink.messages.is_empty());
        assert!(pipeline.series().is_empty());
    }

    #[test]
    fn test_rejection_is_emitted() {
        let mut pipeline = IngestionPipeline::default();
        let mut sink = CollectingSink::new();

        pipeline
            .process("20240114 08:00:00,100", now(), &mut sink)
            .unwrap()
            .unwrap_err();

        let rejections: Vec<_> = sink.rejections().collect();
        assert_eq!(rejections.len(), 1);
        assert_eq!(rejections[0].reason(), RejectReason::WrongDay);
    }

    #[test]
    fn test_out_of_order_keeps_earlier_total() {
        let mut pipeline = IngestionPipeline::default();
        pipeline.ingest("20240115 10:00:00,500", now()).unwrap();

        let err = pipeline.ingest("20240115 10:00:00,900", now()).unwrap_err();
        assert_eq!(err.reason(), RejectReason::OutOfOrder);

        let report = pipeline.ingest("20240115 11:00:00,250", now()).unwrap().unwrap();
        assert_eq!(report.total_steps, 750);
    }

    #[test]
    fn test_leap_second_rejected() {
        let mut pipeline = IngestionPipeline::default();

        let err = pipeline.ingest("20240115 12:59:60,5", now()).unwrap_err();
        assert_eq!(err.reason(), RejectReason::MalformedPacket);
        assert!(pipeline.series().is_empty());

        let report = pipeline.ingest("20240115 13:00:00,5", now()).unwrap().unwrap();
        assert_eq!(report.time.format("%H:%M:%S").to_string(), "13:00:00");
        assert_eq!(report.total_steps, 5);
    }

    #[test]
    fn test_overflowing_total_rejected() {
        let mut pipeline = IngestionPipeline::default();
        let max = i64::MAX as u64;
        pipeline.ingest("20240115 01:00:00,9223372036854775807", now()).unwrap();
        pipeline.ingest("20240115 02:00:00,9223372036854775807", now()).unwrap();

        let err = pipeline
            .ingest("20240115 03:00:00,9223372036854775807", now())
            .unwrap_err();
        assert_eq!(err.reason(), RejectReason::MalformedPacket);
        assert_eq!(pipeline.total_steps(), 2 * max);
        assert_eq!(pipeline.series().len(), 2);
    }

    #[test]
    fn test_run_sample_day() {
        let today = now().date_naive();
        let mut source = sample_day(today);
        let mut sink = CollectingSink::new();
        let mut pipeline = IngestionPipeline::default();

        let summary = pipeline
            .run(&mut source, &FixedClock(now()), &mut sink)
            .unwrap();

        assert_eq!(
            summary,
            IngestSummary {
                processed: 11,
                stored: 2,
                ignored: 0,
                rollovers: 0,
                malformed: 4,
                wrong_day: 1,
                future_timestamp: 0,
                out_of_order: 4,
                total_steps: 678 + 1078,
            }
        );
        assert_eq!(summary.rejected(), 9);
        assert_eq!(sink.reports().count(), 2);
    }

    #[test]
    fn test_run_counts_rollover() {
        let mut pipeline = IngestionPipeline::default();
        let mut sink = CollectingSink::new();

        let evening = Utc.with_ymd_and_hms(2024, 1, 15, 23, 50, 0).unwrap();
        let mut day_one = VecSource::new(["20240115 23:00:00,300"]);
        pipeline
            .run(&mut day_one, &FixedClock(evening), &mut sink)
            .unwrap();

        let morning = Utc.with_ymd_and_hms(2024, 1, 16, 7, 0, 0).unwrap();
        let mut day_two = VecSource::new(["20240116 06:30:00,40"]);
        let summary = pipeline
            .run(&mut day_two, &FixedClock(morning), &mut sink)
            .unwrap();

        assert_eq!(summary.rollovers, 1);
        assert_eq!(summary.total_steps, 40);
    }

    #[test]
    fn test_from_config_json() {
        let pipeline = IngestionPipeline::from_config_json(r#"{"step_length_m": 0.8}"#).unwrap();
        assert_eq!(pipeline.config().step_length_m, 0.8);

        assert!(IngestionPipeline::from_config_json("not json").is_err());
    }
}
