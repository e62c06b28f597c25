//! Message sinks
//!
//! The pipeline produces [`Message`]s; where they end up (terminal, log file,
//! UI) is the sink's business.

use crate::encoder::ReportEncoder;
use crate::error::PacketError;
use crate::types::Report;
use std::io::{self, Write};

/// Output of one processed packet
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Report(Report),
    Rejected { packet: String, error: PacketError },
}

/// Consumer of pipeline messages
pub trait MessageSink {
    fn emit(&mut self, message: &Message) -> io::Result<()>;
}

/// Human-readable text, each message followed by a blank line
pub struct TextSink<W> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for TextSink<W> {
    fn emit(&mut self, message: &Message) -> io::Result<()> {
        match message {
            Message::Report(report) => write!(self.writer, "{report}\n\n")?,
            Message::Rejected { error, .. } => write!(self.writer, "{error}\n\n")?,
        }
        self.writer.flush()
    }
}

/// One JSON envelope per line
pub struct NdjsonSink<W> {
    writer: W,
    encoder: ReportEncoder,
    flush: bool,
}

impl<W: Write> NdjsonSink<W> {
    pub fn new(writer: W, encoder: ReportEncoder) -> Self {
        Self {
            writer,
            encoder,
            flush: true,
        }
    }

    /// Control flushing after every record
    pub fn with_flush(mut self, flush: bool) -> Self {
        self.flush = flush;
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> MessageSink for NdjsonSink<W> {
    fn emit(&mut self, message: &Message) -> io::Result<()> {
        let line = match message {
            Message::Report(report) => self.encoder.report_to_json(report),
            Message::Rejected { packet, error } => self.encoder.rejection_to_json(packet, error),
        }
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        writeln!(self.writer, "{line}")?;
        if self.flush {
            self.writer.flush()?;
        }
        Ok(())
    }
}

/// Keeps every message in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub messages: Vec<Message>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reports(&self) -> impl Iterator<Item = &Report> {
        self.messages.iter().filter_map(|m| match m {
            Message::Report(report) => Some(report),
            Message::Rejected { .. } => None,
        })
    }

    pub fn rejections(&self) -> impl Iterator<Item = &PacketError> {
        self.messages.iter().filter_map(|m| match m {
            Message::Rejected { error, .. } => Some(error),
            Message::Report(_) => None,
        })
    }
}

impl MessageSink for CollectingSink {
    fn emit(&mut self, message: &Message) -> io::Result<()> {
        self.messages.push(message.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AchievementTier;
    use chrono::NaiveTime;

    fn report() -> Report {
        Report {
            time: NaiveTime::from_hms_opt(4, 45, 21).unwrap(),
            total_steps: 18_956,
            distance_km: 12.3214,
            kcal: 742.1,
            tier: AchievementTier::Excellent,
            achievement: AchievementTier::Excellent.message().to_string(),
        }
    }

    #[test]
    fn test_text_sink() {
        let mut sink = TextSink::new(Vec::new());
        sink.emit(&Message::Report(report())).unwrap();
        sink.emit(&Message::Rejected {
            packet: ",3456".to_string(),
            error: PacketError::MalformedPacket("invalid timestamp".to_string()),
        })
        .unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert!(out.starts_with("Time: 04:45:21.\n"));
        assert!(out.contains("Distance: 12.32 km.\n"));
        assert!(out.ends_with("Malformed packet: invalid timestamp\n\n"));
    }

    #[test]
    fn test_ndjson_sink() {
        let encoder = ReportEncoder::with_instance_id("sink-test".to_string());
        let mut sink = NdjsonSink::new(Vec::new(), encoder).with_flush(false);
        sink.emit(&Message::Report(report())).unwrap();
        sink.emit(&Message::Report(report())).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let value: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(value["producer"]["instance_id"], "sink-test");
        }
    }

    #[test]
    fn test_collecting_sink() {
        let mut sink = CollectingSink::new();
        sink.emit(&Message::Report(report())).unwrap();
        sink.emit(&Message::Rejected {
            packet: "x".to_string(),
            error: PacketError::MalformedPacket("x".to_string()),
        })
        .unwrap();

        assert_eq!(sink.reports().count(), 1);
        assert_eq!(sink.rejections().count(), 1);
    }
}
