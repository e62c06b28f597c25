//! Error types for Synheart Steps

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Reasons a packet can be rejected by the accumulator.
///
/// Every variant is recoverable: the caller reports it and moves on to the
/// next packet. A rejected packet never changes the stored day series.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    #[error("Malformed packet: {0}")]
    MalformedPacket(String),

    #[error("Wrong day: packet is dated {packet_date}, today is {today}")]
    WrongDay {
        packet_date: NaiveDate,
        today: NaiveDate,
    },

    #[error("Timestamp {timestamp} is in the future (now {now})")]
    FutureTimestamp {
        timestamp: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("Out of order: {timestamp} is not after last accepted packet at {last}")]
    OutOfOrder {
        timestamp: DateTime<Utc>,
        last: DateTime<Utc>,
    },
}

impl PacketError {
    /// Stable machine-readable reason code
    pub fn reason(&self) -> RejectReason {
        match self {
            PacketError::MalformedPacket(_) => RejectReason::MalformedPacket,
            PacketError::WrongDay { .. } => RejectReason::WrongDay,
            PacketError::FutureTimestamp { .. } => RejectReason::FutureTimestamp,
            PacketError::OutOfOrder { .. } => RejectReason::OutOfOrder,
        }
    }
}

/// Rejection category without the offending values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    MalformedPacket,
    WrongDay,
    FutureTimestamp,
    OutOfOrder,
}

impl RejectReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectReason::MalformedPacket => "malformed_packet",
            RejectReason::WrongDay => "wrong_day",
            RejectReason::FutureTimestamp => "future_timestamp",
            RejectReason::OutOfOrder => "out_of_order",
        }
    }
}

/// Errors that can occur while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config value: {0}")]
    Invalid(String),
}

/// Errors raised while encoding reports
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_codes() {
        let err = PacketError::MalformedPacket("expected 2 fields".to_string());
        assert_eq!(err.reason(), RejectReason::MalformedPacket);
        assert_eq!(err.reason().as_str(), "malformed_packet");

        let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let err = PacketError::WrongDay {
            packet_date: today.pred_opt().unwrap(),
            today,
        };
        assert_eq!(err.reason(), RejectReason::WrongDay);
        assert!(err.to_string().contains("2024-01-14"));
    }

    #[test]
    fn test_reason_serializes_snake_case() {
        let json = serde_json::to_string(&RejectReason::FutureTimestamp).unwrap();
        assert_eq!(json, "\"future_timestamp\"");
    }
}
