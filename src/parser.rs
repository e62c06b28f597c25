//! Packet parsing
//!
//! Decodes the `"<timestamp>,<steps>"` wire format into a [`Packet`].
//! Parsing is pure; ordering and freshness checks live in the accumulator.

use crate::config::{StepConfig, DEFAULT_TIMESTAMP_FORMAT};
use crate::error::PacketError;
use crate::types::Packet;
use chrono::{NaiveDateTime, Timelike};

/// Field separator of the wire format
pub const FIELD_SEPARATOR: char = ',';

/// Parser for raw step-counter packets
#[derive(Debug, Clone)]
pub struct PacketParser {
    format: String,
}

impl Default for PacketParser {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTAMP_FORMAT)
    }
}

impl PacketParser {
    /// Create a parser for the given chrono timestamp format
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }

    /// Create a parser using the timestamp format of a config
    pub fn from_config(config: &StepConfig) -> Self {
        Self::new(config.timestamp_format.clone())
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Parse a raw packet into a validated packet
    pub fn parse(&self, raw: &str) -> Result<Packet, PacketError> {
        let fields: Vec<&str> = raw.split(FIELD_SEPARATOR).collect();
        if fields.len() != 2 {
            return Err(PacketError::MalformedPacket(format!(
                "expected 2 fields, found {}",
                fields.len()
            )));
        }

        let timestamp = self.parse_timestamp(fields[0])?;
        let steps = parse_steps(fields[1])?;

        Ok(Packet::new(timestamp.and_utc(), steps))
    }

    fn parse_timestamp(&self, field: &str) -> Result<NaiveDateTime, PacketError> {
        let parsed = NaiveDateTime::parse_from_str(field, &self.format).map_err(|e| {
            PacketError::MalformedPacket(format!("invalid timestamp {field:?}: {e}"))
        })?;

        // chrono encodes second 60 as a nanosecond overflow
        if parsed.nanosecond() >= 1_000_000_000 {
            return Err(PacketError::MalformedPacket(format!(
                "timestamp {field:?} has second out of range"
            )));
        }

        // Only the canonical fixed-width rendering is accepted, so that
        // ordering by timestamp and ordering by raw text always agree.
        if parsed.format(&self.format).to_string() != field {
            return Err(PacketError::MalformedPacket(format!(
                "timestamp {field:?} is not in canonical form"
            )));
        }

        Ok(parsed)
    }
}

fn parse_steps(field: &str) -> Result<u64, PacketError> {
    let steps: i64 = field
        .parse()
        .map_err(|_| PacketError::MalformedPacket(format!("invalid step count {field:?}")))?;

    u64::try_from(steps)
        .map_err(|_| PacketError::MalformedPacket(format!("negative step count {steps}")))
}
