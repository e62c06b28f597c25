//! Packet sources and clocks
//!
//! The pipeline pulls raw packets from a [`PacketSource`] and samples the
//! current time from a [`Clock`] once per packet. Both are injected so that
//! ingestion is deterministic under test.

use chrono::{DateTime, Days, NaiveDate, Utc};
use std::collections::VecDeque;
use std::io::{self, BufRead};

/// Producer of raw packet strings
pub trait PacketSource {
    /// Next raw packet, or `None` once the source is exhausted
    fn next_packet(&mut self) -> io::Result<Option<String>>;
}

/// Source of the reference "now" used for freshness checks
pub trait Clock {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock (UTC)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock frozen at a fixed instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// In-memory list of packets
#[derive(Debug, Clone, Default)]
pub struct VecSource {
    packets: VecDeque<String>,
}

impl VecSource {
    pub fn new<I, S>(packets: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            packets: packets.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }
}

impl PacketSource for VecSource {
    fn next_packet(&mut self) -> io::Result<Option<String>> {
        Ok(self.packets.pop_front())
    }
}

/// One packet per line from any buffered reader.
///
/// Line terminators are stripped; any other whitespace is part of the packet.
/// Blank lines are skipped.
pub struct LineSource<R> {
    reader: R,
    buffer: String,
}

impl<R: BufRead> LineSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> PacketSource for LineSource<R> {
    fn next_packet(&mut self) -> io::Result<Option<String>> {
        loop {
            self.buffer.clear();
            if self.reader.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }

            let line = self.buffer.trim_end_matches(['\n', '\r']);
            if !line.is_empty() {
                return Ok(Some(line.to_string()));
            }
        }
    }
}

/// Sample day used by the demo driver: a stale packet from an earlier date,
/// followed by malformed, duplicate, future-dated and valid readings stamped
/// with `today`.
pub fn sample_day(today: NaiveDate) -> VecSource {
    let stale = today
        .checked_sub_days(Days::new(1))
        .unwrap_or(today)
        .format("%Y%m%d");
    let day = today.format("%Y%m%d");

    let readings = [
        "01:41:03,-100",
        ",3456",
        "12:40:00, 3456 ",
        "something is wrong",
        "02:11:34,678",
        "02:11:34,792",
        "17:01:30,1078",
        "03:25:59,7830",
        "04:00:46,5325",
        "04:45:21,3123",
    ];

    let mut packets = vec![format!("{stale} 00:11:33,100")];
    packets.extend(readings.iter().map(|r| format!("{day} {r}")));
    VecSource::new(packets)
}
