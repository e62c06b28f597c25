//! Report encoding
//!
//! Wraps reports and rejection notices into JSON envelopes carrying producer
//! metadata, for machine consumers (NDJSON output, FFI).

use crate::error::{EncodeError, PacketError, RejectReason};
use crate::types::Report;
use crate::{PRODUCER_NAME, STEPS_VERSION};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current envelope schema version
pub const REPORT_SCHEMA: &str = "steps.report.v1";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Envelope body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Body {
    Report(Report),
    Rejected {
        reason: RejectReason,
        message: String,
        packet: String,
    },
}

/// JSON envelope emitted per packet outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub schema: String,
    pub producer: Producer,
    pub computed_at_utc: String,
    pub body: Body,
}

/// Encoder for producing report envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a report
    pub fn encode_report(&self, report: &Report) -> Envelope {
        self.envelope(Body::Report(report.clone()))
    }

    /// Wrap a rejection notice
    pub fn encode_rejection(&self, raw: &str, error: &PacketError) -> Envelope {
        self.envelope(Body::Rejected {
            reason: error.reason(),
            message: error.to_string(),
            packet: raw.to_string(),
        })
    }

    /// Encode a report to a single-line JSON string
    pub fn report_to_json(&self, report: &Report) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(&self.encode_report(report))?)
    }

    /// Encode a rejection to a single-line JSON string
    pub fn rejection_to_json(&self, raw: &str, error: &PacketError) -> Result<String, EncodeError> {
        Ok(serde_json::to_string(&self.encode_rejection(raw, error))?)
    }

    fn envelope(&self, body: Body) -> Envelope {
        Envelope {
            schema: REPORT_SCHEMA.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: STEPS_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now().to_rfc3339(),
            body,
        }
    }
}
