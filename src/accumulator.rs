//! Day accumulation
//!
//! The accumulator owns the series of packets accepted for the current day.
//! It enforces, in order: well-formed input, same calendar day as "now", no
//! future timestamps, strictly increasing timestamps, a day total that fits
//! in `u64`, and day rollover.
//! A rejected packet never changes the stored series.

use crate::error::PacketError;
use crate::parser::PacketParser;
use crate::types::Packet;
use chrono::{DateTime, Utc};
use log::{debug, trace, warn};

/// Packets accepted for the current calendar day, oldest first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DaySeries {
    packets: Vec<Packet>,
}

impl DaySeries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packets(&self) -> &[Packet] {
        &self.packets
    }

    pub fn last(&self) -> Option<&Packet> {
        self.packets.last()
    }

    pub fn len(&self) -> usize {
        self.packets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packets.is_empty()
    }

    /// Sum of steps over all stored packets
    pub fn total_steps(&self) -> u64 {
        self.packets
            .iter()
            .fold(0u64, |total, p| total.saturating_add(p.steps))
    }

    fn push(&mut self, packet: Packet) {
        self.packets.push(packet);
    }

    fn clear(&mut self) {
        self.packets.clear();
    }
}

/// Outcome of a successful `accept`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceptance {
    /// Zero-step packet: nothing stored, nothing to report
    Ignored,
    /// Packet appended to the series
    Stored {
        packet: Packet,
        /// The previous day's packets were discarded first
        rolled_over: bool,
    },
}

/// Validates incoming packets and maintains the day series
#[derive(Debug, Clone, Default)]
pub struct DayAccumulator {
    parser: PacketParser,
    series: DaySeries,
}

impl DayAccumulator {
    pub fn new(parser: PacketParser) -> Self {
        Self {
            parser,
            series: DaySeries::new(),
        }
    }

    pub fn series(&self) -> &DaySeries {
        &self.series
    }

    pub fn total_steps(&self) -> u64 {
        self.series.total_steps()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    /// Drop all stored packets
    pub fn reset(&mut self) {
        self.series.clear();
    }

    /// Validate a raw packet against `now` and store it if acceptable.
    pub fn accept(&mut self, raw: &str, now: DateTime<Utc>) -> Result<Acceptance, PacketError> {
        let result = self.check_and_store(raw, now);
        if let Err(e) = &result {
            warn!("rejected packet {raw:?}: {e}");
        }
        result
    }

    fn check_and_store(
        &mut self,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<Acceptance, PacketError> {
        let packet = self.parser.parse(raw)?;

        if packet.steps == 0 {
            trace!("ignoring zero-step packet at {}", packet.timestamp);
            return Ok(Acceptance::Ignored);
        }

        let today = now.date_naive();
        if packet.date() != today {
            return Err(PacketError::WrongDay {
                packet_date: packet.date(),
                today,
            });
        }

        if packet.timestamp > now {
            return Err(PacketError::FutureTimestamp {
                timestamp: packet.timestamp,
                now,
            });
        }

        let mut rolled_over = false;
        if let Some(last) = self.series.last().copied() {
            if packet.timestamp <= last.timestamp {
                return Err(PacketError::OutOfOrder {
                    timestamp: packet.timestamp,
                    last: last.timestamp,
                });
            }

            // Reachable when the process runs across midnight
            rolled_over = packet.date() != last.date();
        }

        let carried = if rolled_over {
            0
        } else {
            self.series.total_steps()
        };
        let total = carried.checked_add(packet.steps).ok_or_else(|| {
            PacketError::MalformedPacket(format!(
                "daily step total overflows ({carried} + {})",
                packet.steps
            ))
        })?;

        if rolled_over {
            debug!(
                "day rollover to {}, discarding {} packets",
                packet.date(),
                self.series.len()
            );
            self.series.clear();
        }

        self.series.push(packet);
        debug!(
            "stored packet at {} ({} steps, {total} today)",
            packet.timestamp, packet.steps
        );

        Ok(Acceptance::Stored {
            packet,
            rolled_over,
        })
    }
}
