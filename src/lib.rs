//! Synheart Steps - On-device step-counter ingestion
//!
//! Steps turns a stream of pedometer packets (`"YYYYMMDD HH:MM:SS,steps"`)
//! into per-day reports through a deterministic pipeline: packet parsing →
//! day accumulation (freshness, ordering, rollover) → metric derivation
//! (distance, calories, achievement) → report.
//!
//! ## Modules
//!
//! - **Core**: `parser`, `accumulator`, `metrics`, `pipeline`
//! - **Collaborators**: `source` (packets and clocks), `sink` (report output)
//! - **Interop**: `encoder` (JSON envelopes), `ffi` (C bindings)

pub mod accumulator;
pub mod config;
pub mod encoder;
pub mod error;
pub mod metrics;
pub mod parser;
pub mod pipeline;
pub mod sink;
pub mod source;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use accumulator::{Acceptance, DayAccumulator, DaySeries};
pub use config::StepConfig;
pub use error::{ConfigError, PacketError, RejectReason};
pub use metrics::MetricsEngine;
pub use parser::PacketParser;
pub use pipeline::{IngestSummary, IngestionPipeline};
pub use types::{AchievementTier, Packet, Report};

/// Steps version embedded in report envelopes
pub const STEPS_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report envelopes
pub const PRODUCER_NAME: &str = "synheart-steps";
