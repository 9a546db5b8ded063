//! Register decoding and the poll step of the poll-and-publish cycle.
//!
//! A poll reads every entry of the [`RegisterMap`] in order, decodes the
//! returned words as one big-endian unsigned integer and applies the entry's
//! scale. The first failing read aborts the whole poll, so a
//! [`MetricSnapshot`] only ever exists when every quantity was read.

use crate::bus::BusSession;
use crate::error::{BusError, ExporterError, Result};
use crate::registers::{Quantity, RegisterMap, RegisterSpec, WordCount};
use tracing::debug;

/// One decoded register value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Reading {
    pub quantity: Quantity,
    pub raw: u32,
    pub value: f64,
}

/// The physical values of one successful poll, in register-map order
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSnapshot {
    readings: Vec<Reading>,
}

impl MetricSnapshot {
    pub fn new(readings: Vec<Reading>) -> Self {
        Self { readings }
    }

    pub fn readings(&self) -> &[Reading] {
        &self.readings
    }

    pub fn value(&self, quantity: Quantity) -> Option<f64> {
        self.readings
            .iter()
            .find(|r| r.quantity == quantity)
            .map(|r| r.value)
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }
}

/// Combine register words into one unsigned integer, most significant word
/// first.
///
/// The number of words must match `width` exactly; a short (or long) response
/// is an error rather than being padded or truncated.
pub fn decode_words(words: &[u16], width: WordCount) -> std::result::Result<u32, BusError> {
    match (width, words) {
        (WordCount::One, [word]) => Ok(u32::from(*word)),
        (WordCount::Two, [high, low]) => Ok((u32::from(*high) << 16) | u32::from(*low)),
        _ => Err(BusError::ShortResponse {
            expected: usize::from(width.count()),
            actual: words.len(),
        }),
    }
}

async fn read_register<S: BusSession>(
    session: &mut S,
    spec: &RegisterSpec,
) -> std::result::Result<Reading, BusError> {
    let words = session
        .read_holding_registers(spec.address, spec.width.count())
        .await?;
    let raw = decode_words(&words, spec.width)?;

    Ok(Reading {
        quantity: spec.quantity,
        raw,
        value: spec.apply_scale(raw),
    })
}

/// Read every register in `registers` from `session`.
///
/// Returns [`ExporterError::Read`] naming the first register that failed;
/// nothing read before it is returned.
pub async fn poll<S: BusSession>(
    session: &mut S,
    registers: &RegisterMap,
) -> Result<MetricSnapshot> {
    let mut readings = Vec::with_capacity(registers.len());

    for spec in registers.iter() {
        let reading = read_register(session, spec)
            .await
            .map_err(|source| ExporterError::Read {
                quantity: spec.quantity,
                address: spec.address,
                source,
            })?;

        debug!(
            "{} @ {:#06x}: raw={} value={}",
            reading.quantity, spec.address, reading.raw, reading.value
        );
        readings.push(reading);
    }

    Ok(MetricSnapshot { readings })
}
