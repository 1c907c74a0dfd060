//! Sensor snapshot model and the reader capability consumed by the control loop.

pub mod ds18b20;
pub mod onewire;

use alloc::string::String;
use core::fmt;

use heapless::Vec;
use log::warn;
use thiserror_no_std::Error;

pub use ds18b20::Ds18b20Reader;
pub use onewire::{BitBangOneWire, OneWireBus, RomCode};

/// Upper bound on devices tracked on one bus.
pub const MAX_SENSORS: usize = 8;

/// Bus address of a sensor, written as a `0x`-prefixed hex string.
///
/// Comparison ignores ASCII case so `0xAA` in a config file matches the
/// lowercase ids produced by the reader.
#[derive(Debug, Clone)]
pub struct BusId(String);

impl BusId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl PartialEq for BusId {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_ignore_ascii_case(&other.0)
    }
}

impl Eq for BusId {}

impl From<&str> for BusId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Display for BusId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One temperature sample.
#[derive(Debug, Clone, PartialEq)]
pub struct SensorReading {
    pub id: BusId,
    /// Degrees Celsius.
    pub temperature: f32,
}

impl SensorReading {
    pub fn new(id: impl Into<BusId>, temperature: f32) -> Self {
        Self {
            id: id.into(),
            temperature,
        }
    }
}

/// Readings captured in a single read cycle.
///
/// Produced whole by a [`SensorReader`] and never edited afterwards; the
/// control loop swaps in a new snapshot rather than patching the old one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensorSnapshot {
    readings: Vec<SensorReading, MAX_SENSORS>,
}

impl SensorSnapshot {
    pub const fn new() -> Self {
        Self {
            readings: Vec::new(),
        }
    }

    /// Collect readings into a snapshot, keeping the first [`MAX_SENSORS`].
    pub fn from_readings(readings: impl IntoIterator<Item = SensorReading>) -> Self {
        let mut snapshot = Self::new();
        for reading in readings {
            if snapshot.readings.push(reading).is_err() {
                warn!("Snapshot full, dropping readings past {}", MAX_SENSORS);
                break;
            }
        }
        snapshot
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SensorReading> {
        self.readings.iter()
    }

    /// Reading for the given bus id, if present.
    pub fn find(&self, id: &BusId) -> Option<&SensorReading> {
        self.readings.iter().find(|r| &r.id == id)
    }
}

/// Transient bus failures. These never leave the reader; `read_all` logs them
/// and returns an empty snapshot.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SensorReadError {
    #[error("No presence pulse on the one-wire bus")]
    NoPresence,

    #[error("No sensors found on the one-wire bus")]
    NoSensors,

    #[error("Expected {expected} temperature sensors, {found} found")]
    TooFewSensors { expected: usize, found: usize },

    #[error("Too many devices on the one-wire bus (max: {max})")]
    TooManyDevices { max: usize },

    #[error("ROM search lost contact with the bus")]
    SearchFailed,

    #[error("CRC mismatch in {what}")]
    CrcMismatch { what: &'static str },

    #[error("One-wire pin fault")]
    PinFault,
}

/// Capability that produces a fresh [`SensorSnapshot`].
pub trait SensorReader {
    /// Read every sensor once.
    ///
    /// Must not fail: any bus error yields an empty snapshot.
    fn read_all(&mut self) -> impl Future<Output = SensorSnapshot>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_id_ignores_case() {
        assert_eq!(BusId::from("0xAA"), BusId::from("0xaa"));
        assert_ne!(BusId::from("0xAA"), BusId::from("0xAB"));
    }

    #[test]
    fn find_uses_bus_id() {
        let snapshot = SensorSnapshot::from_readings([
            SensorReading::new("0xaa", 20.5),
            SensorReading::new("0xbb", 21.0),
        ]);
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.find(&"0xBB".into()).map(|r| r.temperature), Some(21.0));
        assert!(snapshot.find(&"0xcc".into()).is_none());
    }

    #[test]
    fn from_readings_caps_at_capacity() {
        let snapshot = SensorSnapshot::from_readings(
            (0..MAX_SENSORS + 3).map(|i| SensorReading::new(BusId::new(alloc::format!("0x{i:x}")), 0.0)),
        );
        assert_eq!(snapshot.len(), MAX_SENSORS);
    }
}
