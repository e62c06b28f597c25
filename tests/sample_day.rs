//! End-to-end ingestion of a recorded day through the public API

use chrono::{DateTime, TimeZone, Utc};
use pretty_assertions::assert_eq;
use std::io::Cursor;

use synheart_steps::sink::{CollectingSink, TextSink};
use synheart_steps::source::{FixedClock, LineSource};
use synheart_steps::{
    AchievementTier, IngestSummary, IngestionPipeline, RejectReason, StepConfig,
};

const RECORDED_DAY: &str = "\
20240609 23:58:00,400
20240610 06:15:00,1200
20240610 06:15:00,50
20240610 07:40:12,0
20240610 08:02:41,2100
garbage
20240610 12:30:00,+900
20240610 19:00:00,5000
20240610 21:00:00,300
";

fn evening() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 10, 20, 0, 0).unwrap()
}

#[test]
fn test_recorded_day_summary() {
    let mut pipeline = IngestionPipeline::default();
    let mut source = LineSource::new(Cursor::new(RECORDED_DAY));
    let mut sink = CollectingSink::new();

    let summary = pipeline
        .run(&mut source, &FixedClock(evening()), &mut sink)
        .unwrap();

    assert_eq!(
        summary,
        IngestSummary {
            processed: 9,
            stored: 4,
            ignored: 1,
            rollovers: 0,
            malformed: 1,
            wrong_day: 1,
            future_timestamp: 1,
            out_of_order: 1,
            total_steps: 1200 + 2100 + 900 + 5000,
        }
    );

    let reasons: Vec<RejectReason> = sink.rejections().map(|e| e.reason()).collect();
    assert_eq!(
        reasons,
        vec![
            RejectReason::WrongDay,
            RejectReason::OutOfOrder,
            RejectReason::MalformedPacket,
            RejectReason::FutureTimestamp,
        ]
    );

    let last = sink.reports().last().unwrap();
    assert_eq!(last.total_steps, 9200);
    // 9200 * 0.65 m = 5.98 km
    assert!((last.distance_km - 5.98).abs() < 1e-9);
    assert_eq!(last.tier, AchievementTier::Good);
}

#[test]
fn test_text_output_matches_report_layout() {
    let mut pipeline = IngestionPipeline::default();
    let mut source = LineSource::new(Cursor::new(
        "20240610 08:00:00,1000\n20240610 09:00:00,2000\n",
    ));
    let mut sink = TextSink::new(Vec::new());

    pipeline
        .run(&mut source, &FixedClock(evening()), &mut sink)
        .unwrap();

    let out = String::from_utf8(sink.into_inner()).unwrap();
    let blocks: Vec<&str> = out.split("\n\n").filter(|b| !b.is_empty()).collect();
    assert_eq!(blocks.len(), 2);

    let expected_kcal = {
        let energy_per_minute = 0.035 * 75.0 + (1.39 * 1.39 / 1.75) * 0.029 * 75.0;
        energy_per_minute * (1950.0 / 1.39 / 60.0)
    };
    assert_eq!(
        blocks[1],
        format!(
            "Time: 09:00:00.\nSteps today: 3000.\nDistance: 1.95 km.\nCalories burned: {:.2} kcal.\n{}",
            expected_kcal,
            AchievementTier::Participation.message()
        )
    );
}

#[test]
fn test_config_changes_metrics_not_validation() {
    let config = StepConfig {
        step_length_m: 1.0,
        ..StepConfig::default()
    };
    let mut pipeline = IngestionPipeline::new(config);

    let report = pipeline
        .ingest("20240610 10:00:00,6500", evening())
        .unwrap()
        .unwrap();
    assert!((report.distance_km - 6.5).abs() < 1e-9);
    assert_eq!(report.tier, AchievementTier::Excellent);

    let err = pipeline
        .ingest("20240610 09:00:00,10", evening())
        .unwrap_err();
    assert_eq!(err.reason(), RejectReason::OutOfOrder);
    assert_eq!(pipeline.total_steps(), 6500);
}
