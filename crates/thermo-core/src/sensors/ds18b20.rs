//! DS18B20 temperature probes sharing one one-wire bus.

use embedded_hal_async::delay::DelayNs;
use heapless::Vec;
use log::{debug, info, warn};

use super::onewire::{CMD_SKIP_ROM, OneWireBus, RomCode, crc8};
use super::{MAX_SENSORS, SensorReadError, SensorReader, SensorReading, SensorSnapshot};

/// Number of probes the device is built with.
pub const EXPECTED_SENSORS: usize = 3;

const CMD_CONVERT_T: u8 = 0x44;
const CMD_WRITE_SCRATCHPAD: u8 = 0x4E;
const CMD_READ_SCRATCHPAD: u8 = 0xBE;

/// Configuration register value for 9-bit resolution (0.5 °C, ~94 ms conversion).
const RESOLUTION_9_BIT: u8 = 0x1F;

const CONVERSION_WAIT_MS: u32 = 100;

pub struct Ds18b20Reader<B, D> {
    bus: B,
    delay: D,
    expected: usize,
    roms: Option<Vec<RomCode, MAX_SENSORS>>,
}

impl<B, D> Ds18b20Reader<B, D>
where
    B: OneWireBus,
    D: DelayNs,
{
    pub fn new(bus: B, delay: D) -> Self {
        Self {
            bus,
            delay,
            expected: EXPECTED_SENSORS,
            roms: None,
        }
    }

    /// Override the minimum number of probes a scan must find.
    pub fn with_expected(mut self, expected: usize) -> Self {
        self.expected = expected;
        self
    }

    /// ROMs cached by the last successful scan.
    pub fn known_roms(&self) -> Option<&[RomCode]> {
        self.roms.as_deref()
    }

    /// Scan the bus and program every probe for 9-bit resolution.
    fn discover(&mut self) -> Result<Vec<RomCode, MAX_SENSORS>, SensorReadError> {
        let roms = self.bus.search()?;

        if roms.is_empty() {
            return Err(SensorReadError::NoSensors);
        }
        if roms.len() < self.expected {
            return Err(SensorReadError::TooFewSensors {
                expected: self.expected,
                found: roms.len(),
            });
        }

        for rom in &roms {
            self.set_resolution(rom)?;
        }

        info!("Found {} temperature probes", roms.len());
        Ok(roms)
    }

    fn set_resolution(&mut self, rom: &RomCode) -> Result<(), SensorReadError> {
        self.bus.select(rom)?;
        self.bus.write_byte(CMD_WRITE_SCRATCHPAD)?;
        // TH and TL alarm registers are unused.
        self.bus.write_byte(0x00)?;
        self.bus.write_byte(0x00)?;
        self.bus.write_byte(RESOLUTION_9_BIT)?;
        self.bus.reset()?;
        Ok(())
    }

    fn read_temperature(&mut self, rom: &RomCode) -> Result<f32, SensorReadError> {
        self.bus.select(rom)?;
        self.bus.write_byte(CMD_READ_SCRATCHPAD)?;

        let mut scratchpad = [0u8; 9];
        for byte in scratchpad.iter_mut() {
            *byte = self.bus.read_byte()?;
        }
        if crc8(&scratchpad[..8]) != scratchpad[8] {
            return Err(SensorReadError::CrcMismatch { what: "scratchpad" });
        }

        let raw = i16::from_le_bytes([scratchpad[0], scratchpad[1]]);
        Ok(f32::from(raw) / 16.0)
    }

    async fn try_read_all(&mut self) -> Result<SensorSnapshot, SensorReadError> {
        let roms = match &self.roms {
            Some(roms) => roms.clone(),
            None => {
                let roms = self.discover()?;
                self.roms = Some(roms.clone());
                roms
            }
        };

        if !self.bus.reset()? {
            return Err(SensorReadError::NoPresence);
        }
        self.bus.write_byte(CMD_SKIP_ROM)?;
        self.bus.write_byte(CMD_CONVERT_T)?;
        self.delay.delay_ms(CONVERSION_WAIT_MS).await;

        let mut readings = Vec::<SensorReading, MAX_SENSORS>::new();
        for rom in &roms {
            let temperature = self.read_temperature(rom)?;
            debug!("{} = {} C", rom.bus_id(), temperature);
            // Same capacity as the ROM list, cannot overflow.
            let _ = readings.push(SensorReading::new(rom.bus_id(), temperature));
        }

        Ok(SensorSnapshot::from_readings(readings))
    }
}

impl<B, D> SensorReader for Ds18b20Reader<B, D>
where
    B: OneWireBus,
    D: DelayNs,
{
    async fn read_all(&mut self) -> SensorSnapshot {
        match self.try_read_all().await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Error reading sensors: {}", e);
                SensorSnapshot::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::onewire::CMD_MATCH_ROM;
    use embassy_futures::block_on;
    use std::collections::VecDeque;
    use std::vec::Vec as StdVec;

    struct NoDelay {
        waited_ms: u32,
    }

    impl DelayNs for NoDelay {
        async fn delay_ns(&mut self, ns: u32) {
            self.waited_ms += ns / 1_000_000;
        }

        async fn delay_ms(&mut self, ms: u32) {
            self.waited_ms += ms;
        }
    }

    /// Byte-level fake: fixed ROM list and a scratchpad per ROM.
    struct FakeBus {
        devices: StdVec<(RomCode, [u8; 9])>,
        present: bool,
        searches: usize,
        written: StdVec<u8>,
        selected: Option<RomCode>,
        pending: VecDeque<u8>,
        match_bytes: Option<StdVec<u8>>,
    }

    impl FakeBus {
        fn new(devices: StdVec<(RomCode, [u8; 9])>) -> Self {
            Self {
                devices,
                present: true,
                searches: 0,
                written: StdVec::new(),
                selected: None,
                pending: VecDeque::new(),
                match_bytes: None,
            }
        }
    }

    impl OneWireBus for FakeBus {
        fn reset(&mut self) -> Result<bool, SensorReadError> {
            self.selected = None;
            self.match_bytes = None;
            self.pending.clear();
            Ok(self.present)
        }

        fn write_bit(&mut self, _bit: bool) -> Result<(), SensorReadError> {
            Ok(())
        }

        fn read_bit(&mut self) -> Result<bool, SensorReadError> {
            Ok(true)
        }

        fn write_byte(&mut self, byte: u8) -> Result<(), SensorReadError> {
            self.written.push(byte);

            if let Some(bytes) = self.match_bytes.as_mut() {
                bytes.push(byte);
                if bytes.len() == 8 {
                    let mut rom = [0u8; 8];
                    rom.copy_from_slice(bytes);
                    self.selected = Some(RomCode(rom));
                    self.match_bytes = None;
                }
                return Ok(());
            }

            match byte {
                CMD_MATCH_ROM => self.match_bytes = Some(StdVec::new()),
                CMD_READ_SCRATCHPAD => {
                    if let Some(rom) = self.selected
                        && let Some((_, pad)) = self.devices.iter().find(|(r, _)| *r == rom)
                    {
                        self.pending.extend(pad.iter().copied());
                    }
                }
                _ => {}
            }
            Ok(())
        }

        fn read_byte(&mut self) -> Result<u8, SensorReadError> {
            Ok(self.pending.pop_front().unwrap_or(0xFF))
        }

        fn search(&mut self) -> Result<Vec<RomCode, MAX_SENSORS>, SensorReadError> {
            self.searches += 1;
            Ok(self.devices.iter().map(|(rom, _)| *rom).collect())
        }
    }

    fn rom(serial: u8) -> RomCode {
        let mut bytes = [0x28, serial, 0, 0, 0, 0, 0, 0];
        bytes[7] = crc8(&bytes[..7]);
        RomCode(bytes)
    }

    fn scratchpad(raw: i16) -> [u8; 9] {
        let [lo, hi] = raw.to_le_bytes();
        let mut pad = [lo, hi, 0x4B, 0x46, RESOLUTION_9_BIT, 0xFF, 0x0C, 0x10, 0];
        pad[8] = crc8(&pad[..8]);
        pad
    }

    fn three_probes() -> FakeBus {
        FakeBus::new(std::vec![
            (rom(1), scratchpad(0x0150)), // 21.0
            (rom(2), scratchpad(0x0158)), // 21.5
            (rom(3), scratchpad(-0x0008)), // -0.5
        ])
    }

    #[test]
    fn reads_every_probe() {
        let mut reader = Ds18b20Reader::new(three_probes(), NoDelay { waited_ms: 0 });
        let snapshot = block_on(reader.read_all());

        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.find(&rom(1).bus_id()).unwrap().temperature, 21.0);
        assert_eq!(snapshot.find(&rom(2).bus_id()).unwrap().temperature, 21.5);
        assert_eq!(snapshot.find(&rom(3).bus_id()).unwrap().temperature, -0.5);
        assert_eq!(reader.delay.waited_ms, CONVERSION_WAIT_MS);
    }

    #[test]
    fn programs_resolution_once_and_caches_scan() {
        let mut reader = Ds18b20Reader::new(three_probes(), NoDelay { waited_ms: 0 });
        block_on(reader.read_all());
        block_on(reader.read_all());

        assert_eq!(reader.bus.searches, 1);
        let writes = reader
            .bus
            .written
            .windows(4)
            .filter(|w| *w == [CMD_WRITE_SCRATCHPAD, 0x00, 0x00, RESOLUTION_9_BIT])
            .count();
        assert_eq!(writes, 3);
        assert_eq!(reader.known_roms().map(<[RomCode]>::len), Some(3));
    }

    #[test]
    fn too_few_probes_yields_empty_and_rescans() {
        let mut bus = three_probes();
        bus.devices.truncate(2);
        let mut reader = Ds18b20Reader::new(bus, NoDelay { waited_ms: 0 });

        assert!(block_on(reader.read_all()).is_empty());
        assert!(block_on(reader.read_all()).is_empty());
        assert_eq!(reader.bus.searches, 2);
        assert!(reader.known_roms().is_none());
    }

    #[test]
    fn no_probes_yields_empty() {
        let mut reader = Ds18b20Reader::new(FakeBus::new(StdVec::new()), NoDelay { waited_ms: 0 });
        assert!(block_on(reader.read_all()).is_empty());
    }

    #[test]
    fn bad_scratchpad_crc_yields_empty() {
        let mut bus = three_probes();
        bus.devices[1].1[8] ^= 0x55;
        let mut reader = Ds18b20Reader::new(bus, NoDelay { waited_ms: 0 });
        assert!(block_on(reader.read_all()).is_empty());
    }

    #[test]
    fn lost_presence_yields_empty() {
        let mut reader = Ds18b20Reader::new(three_probes(), NoDelay { waited_ms: 0 });
        assert_eq!(block_on(reader.read_all()).len(), 3);

        reader.bus.present = false;
        assert!(block_on(reader.read_all()).is_empty());
    }
}
