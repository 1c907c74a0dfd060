//! Minimal one-wire bus: reset, byte transfer and ROM search.
//!
//! [`OneWireBus`] only needs the three slot primitives; byte transfer and
//! the ROM search are provided on top of them. [`BitBangOneWire`] drives the
//! slots on a single open-drain GPIO.

use alloc::format;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use heapless::Vec;

use super::{BusId, MAX_SENSORS, SensorReadError};

pub const CMD_SEARCH_ROM: u8 = 0xF0;
pub const CMD_MATCH_ROM: u8 = 0x55;
pub const CMD_SKIP_ROM: u8 = 0xCC;

/// 64-bit device ROM: family code, 48-bit serial, CRC.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomCode(pub [u8; 8]);

impl RomCode {
    pub fn family(&self) -> u8 {
        self.0[0]
    }

    pub fn is_valid(&self) -> bool {
        crc8(&self.0[..7]) == self.0[7]
    }

    /// `0x` + lowercase hex of the ROM read as a little-endian integer.
    pub fn bus_id(&self) -> BusId {
        BusId::new(format!("{:#x}", u64::from_le_bytes(self.0)))
    }
}

/// Dallas/Maxim CRC-8 (polynomial x^8 + x^5 + x^4 + 1, reflected).
pub fn crc8(bytes: &[u8]) -> u8 {
    let mut crc = 0u8;
    for &byte in bytes {
        let mut b = byte;
        for _ in 0..8 {
            let mix = (crc ^ b) & 0x01;
            crc >>= 1;
            if mix != 0 {
                crc ^= 0x8C;
            }
            b >>= 1;
        }
    }
    crc
}

pub trait OneWireBus {
    /// Issue a reset pulse. Returns `true` when at least one device answered.
    fn reset(&mut self) -> Result<bool, SensorReadError>;

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorReadError>;

    fn read_bit(&mut self) -> Result<bool, SensorReadError>;

    /// Write a byte, least significant bit first.
    fn write_byte(&mut self, byte: u8) -> Result<(), SensorReadError> {
        for i in 0..8 {
            self.write_bit(byte & (1 << i) != 0)?;
        }
        Ok(())
    }

    /// Read a byte, least significant bit first.
    fn read_byte(&mut self) -> Result<u8, SensorReadError> {
        let mut byte = 0u8;
        for i in 0..8 {
            if self.read_bit()? {
                byte |= 1 << i;
            }
        }
        Ok(byte)
    }

    /// Reset and address a single device.
    fn select(&mut self, rom: &RomCode) -> Result<(), SensorReadError> {
        if !self.reset()? {
            return Err(SensorReadError::NoPresence);
        }
        self.write_byte(CMD_MATCH_ROM)?;
        for &b in &rom.0 {
            self.write_byte(b)?;
        }
        Ok(())
    }

    /// Enumerate every device on the bus.
    ///
    /// Each ROM is CRC-checked; a corrupted ROM aborts the search.
    fn search(&mut self) -> Result<Vec<RomCode, MAX_SENSORS>, SensorReadError> {
        let mut found = Vec::new();
        let mut rom = [0u8; 8];
        // 1-based bit index of the last branch where 0 was taken; 0 means none left.
        let mut last_discrepancy = 0usize;

        loop {
            if !self.reset()? {
                return Err(SensorReadError::NoPresence);
            }
            self.write_byte(CMD_SEARCH_ROM)?;

            let mut last_zero = 0usize;
            for bit_number in 1..=64usize {
                let id_bit = self.read_bit()?;
                let cmp_bit = self.read_bit()?;
                if id_bit && cmp_bit {
                    return Err(SensorReadError::SearchFailed);
                }

                let byte = (bit_number - 1) / 8;
                let mask = 1u8 << ((bit_number - 1) % 8);

                let direction = if id_bit != cmp_bit {
                    id_bit
                } else {
                    let take_one = if bit_number < last_discrepancy {
                        rom[byte] & mask != 0
                    } else {
                        bit_number == last_discrepancy
                    };
                    if !take_one {
                        last_zero = bit_number;
                    }
                    take_one
                };

                if direction {
                    rom[byte] |= mask;
                } else {
                    rom[byte] &= !mask;
                }
                self.write_bit(direction)?;
            }

            let code = RomCode(rom);
            if !code.is_valid() {
                return Err(SensorReadError::CrcMismatch { what: "ROM code" });
            }
            found
                .push(code)
                .map_err(|_| SensorReadError::TooManyDevices { max: MAX_SENSORS })?;

            last_discrepancy = last_zero;
            if last_discrepancy == 0 {
                return Ok(found);
            }
        }
    }
}

// Standard-speed slot timings in microseconds.
const RESET_LOW_US: u32 = 480;
const PRESENCE_SAMPLE_US: u32 = 70;
const RESET_RECOVERY_US: u32 = 410;
const WRITE_ONE_LOW_US: u32 = 6;
const WRITE_ONE_RELEASE_US: u32 = 64;
const WRITE_ZERO_LOW_US: u32 = 60;
const WRITE_ZERO_RELEASE_US: u32 = 10;
const READ_LOW_US: u32 = 6;
const READ_SAMPLE_US: u32 = 9;
const READ_RECOVERY_US: u32 = 55;

/// One-wire master on a single open-drain pin with an external pull-up.
///
/// Driving the pin high releases the line. Every slot runs inside a critical
/// section so an interrupt cannot stretch the timing.
pub struct BitBangOneWire<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> BitBangOneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }

    fn drive_low(&mut self) -> Result<(), SensorReadError> {
        self.pin.set_low().map_err(|_| SensorReadError::PinFault)
    }

    fn release_line(&mut self) -> Result<(), SensorReadError> {
        self.pin.set_high().map_err(|_| SensorReadError::PinFault)
    }

    fn sample(&mut self) -> Result<bool, SensorReadError> {
        self.pin.is_high().map_err(|_| SensorReadError::PinFault)
    }
}

impl<P, D> OneWireBus for BitBangOneWire<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    fn reset(&mut self) -> Result<bool, SensorReadError> {
        critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(RESET_LOW_US);
            self.release_line()?;
            self.delay.delay_us(PRESENCE_SAMPLE_US);
            let present = !self.sample()?;
            self.delay.delay_us(RESET_RECOVERY_US);
            Ok(present)
        })
    }

    fn write_bit(&mut self, bit: bool) -> Result<(), SensorReadError> {
        let (low, release) = if bit {
            (WRITE_ONE_LOW_US, WRITE_ONE_RELEASE_US)
        } else {
            (WRITE_ZERO_LOW_US, WRITE_ZERO_RELEASE_US)
        };
        critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(low);
            self.release_line()?;
            self.delay.delay_us(release);
            Ok(())
        })
    }

    fn read_bit(&mut self) -> Result<bool, SensorReadError> {
        critical_section::with(|_| {
            self.drive_low()?;
            self.delay.delay_us(READ_LOW_US);
            self.release_line()?;
            self.delay.delay_us(READ_SAMPLE_US);
            let bit = self.sample()?;
            self.delay.delay_us(READ_RECOVERY_US);
            Ok(bit)
        })
    }
}
