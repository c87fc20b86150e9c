// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! DS1307 real-time clock driver (I2C, address 0x68).
//!
//! Every field lives in its own BCD register. Getters write the one-byte register pointer and
//! then read the value back in a separate transfer; setters send pointer and value in one write.
//! Nothing is cached, so every getter goes to the bus.
//!
//! Out-of-range field values are programmer errors and panic.

use core::fmt;

use embedded_hal::i2c::I2c;
use log::{debug, trace, warn};

use crate::drivers::bcd;

/// 7-bit I2C address.
pub const ADDRESS: u8 = 0x68;

// Register addresses
pub mod reg {
    pub const SECONDS: u8 = 0x00;
    pub const MINUTES: u8 = 0x01;
    pub const HOURS: u8 = 0x02;
    pub const DAY: u8 = 0x03;
    pub const DATE: u8 = 0x04;
    pub const MONTH: u8 = 0x05;
    pub const YEAR: u8 = 0x06;
    pub const CONTROL: u8 = 0x07;
}

/// Oscillator halt bit in the seconds register.
const CLOCK_HALT: u8 = 1 << 7;
/// 12-hour mode bit in the hours register.
const HOUR_12: u8 = 1 << 6;
/// PM bit in the hours register (12-hour mode only).
const HOUR_PM: u8 = 1 << 5;

/// SQW/OUT pin configuration, written verbatim to the control register.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum SquareWave {
    /// Output off, pin held low.
    OffLow = 0x00,
    /// Output off, pin held high.
    OffHigh = 0x80,
    Hz1 = 0x10,
    KHz4 = 0x11,
    KHz8 = 0x12,
    KHz32 = 0x13,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum HourMode {
    Hour24,
    Hour12,
}

/// AM/PM tag. Always `None` in 24-hour mode.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TimeMode {
    None,
    Am,
    Pm,
}

/// Hour register contents in binary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Hour {
    pub hour: u8,
    pub mode: HourMode,
    pub time: TimeMode,
}

impl Hour {
    /// Decode the raw hours register.
    pub fn from_register(raw: u8) -> Self {
        if (raw & HOUR_12) != 0 {
            let time = if (raw & HOUR_PM) != 0 {
                TimeMode::Pm
            } else {
                TimeMode::Am
            };
            Self {
                hour: bcd::to_binary(raw & 0x1F),
                mode: HourMode::Hour12,
                time,
            }
        } else {
            Self {
                hour: bcd::to_binary(raw & 0x3F),
                mode: HourMode::Hour24,
                time: TimeMode::None,
            }
        }
    }

    /// Whether the hour is legal for its mode (1..=12 with AM/PM, or 0..=23).
    pub fn is_valid(&self) -> bool {
        match self.mode {
            HourMode::Hour12 => (1..=12).contains(&self.hour) && self.time != TimeMode::None,
            HourMode::Hour24 => self.hour <= 23,
        }
    }

    /// The same instant in the other hour mode.
    ///
    /// Midnight is 12 AM and noon is 12 PM, so converting twice gives back the starting hour.
    pub fn toggled(self) -> Self {
        match self.mode {
            HourMode::Hour24 => {
                let time = if self.hour >= 12 {
                    TimeMode::Pm
                } else {
                    TimeMode::Am
                };
                let hour = match self.hour % 12 {
                    0 => 12,
                    h => h,
                };
                Self {
                    hour,
                    mode: HourMode::Hour12,
                    time,
                }
            }
            HourMode::Hour12 => {
                let hour = match (self.time, self.hour) {
                    (TimeMode::Pm, 12) => 12,
                    (TimeMode::Pm, h) => h + 12,
                    (_, 12) => 0,
                    (_, h) => h,
                };
                Self {
                    hour,
                    mode: HourMode::Hour24,
                    time: TimeMode::None,
                }
            }
        }
    }
}

/// Calendar and time fields, in binary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DateTime {
    /// 0..=99
    pub year: u8,
    /// 1..=12
    pub month: u8,
    /// Day of week, 1..=7
    pub day: u8,
    /// Day of month, 1..=31
    pub date: u8,
    pub hour: u8,
    /// 0..=59
    pub minutes: u8,
    /// 0..=59
    pub seconds: u8,
    pub hour_mode: HourMode,
    pub time_mode: TimeMode,
}

/// Error type for `Rtc` operations.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<E> {
    /// I2C transport failure, passed through unchanged.
    I2c(E),
    /// A 12-hour value was given without AM or PM. Nothing was written.
    InvalidTimeMode,
    /// The hours register holds a value outside its mode's range. Nothing was written.
    InvalidHour(u8),
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::I2c(e) => write!(f, "RTC I2C error: {:?}", e),
            Error::InvalidTimeMode => f.write_str("12-hour time needs AM or PM"),
            Error::InvalidHour(h) => write!(f, "RTC holds an invalid hour: {}", h),
        }
    }
}

/// DS1307 driver. The I2C bus is passed in as `&mut` to each method.
pub struct Rtc {
    address: u8,
}

impl Default for Rtc {
    fn default() -> Self {
        Self::new()
    }
}

impl Rtc {
    pub fn new() -> Self {
        Self { address: ADDRESS }
    }

    pub fn with_address(address: u8) -> Self {
        Self { address }
    }

    /// Write the register pointer, then read one byte.
    fn read_reg<I2C: I2c>(&mut self, i2c: &mut I2C, reg: u8) -> Result<u8, Error<I2C::Error>> {
        let mut value = [0u8; 1];
        i2c.write(self.address, &[reg]).map_err(Error::I2c)?;
        i2c.read(self.address, &mut value).map_err(Error::I2c)?;
        trace!("rtc: read reg 0x{:02X} = 0x{:02X}", reg, value[0]);
        Ok(value[0])
    }

    fn write_reg<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        reg: u8,
        value: u8,
    ) -> Result<(), Error<I2C::Error>> {
        trace!("rtc: write reg 0x{:02X} = 0x{:02X}", reg, value);
        i2c.write(self.address, &[reg, value]).map_err(Error::I2c)
    }

    /// Start the oscillator, configure SQW/OUT, then set the date.
    pub fn init<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        date: &DateTime,
        square_wave: SquareWave,
    ) -> Result<(), Error<I2C::Error>> {
        self.start(i2c)?;
        self.set_square_wave(i2c, square_wave)?;
        self.set_date(i2c, date)?;
        debug!("rtc: initialized, {:?}", date);
        Ok(())
    }

    /// Clear the oscillator halt bit, keeping the stored seconds.
    pub fn start<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<(), Error<I2C::Error>> {
        let seconds = self.read_reg(i2c, reg::SECONDS)?;
        self.write_reg(i2c, reg::SECONDS, seconds & !CLOCK_HALT)
    }

    /// Set the oscillator halt bit, keeping the stored seconds.
    pub fn halt<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<(), Error<I2C::Error>> {
        let seconds = self.read_reg(i2c, reg::SECONDS)?;
        self.write_reg(i2c, reg::SECONDS, seconds | CLOCK_HALT)
    }

    /// Whether the oscillator is running (halt bit clear).
    pub fn is_running<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<bool, Error<I2C::Error>> {
        Ok((self.read_reg(i2c, reg::SECONDS)? & CLOCK_HALT) == 0)
    }

    pub fn set_square_wave<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        square_wave: SquareWave,
    ) -> Result<(), Error<I2C::Error>> {
        self.write_reg(i2c, reg::CONTROL, square_wave as u8)
    }

    /// Raw control register (SQW/OUT configuration).
    pub fn square_wave<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        self.read_reg(i2c, reg::CONTROL)
    }

    /// Switch the stored hour between 12-hour and 24-hour representation.
    ///
    /// A corrupt hours register is reported as `Error::InvalidHour` and left untouched.
    pub fn change_hour_mode<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<(), Error<I2C::Error>> {
        let current = self.hour(i2c)?;
        if !current.is_valid() {
            warn!("rtc: hours register out of range: {:?}", current);
            return Err(Error::InvalidHour(current.hour));
        }
        let next = current.toggled();
        debug!("rtc: hour mode {:?} -> {:?}", current, next);
        self.set_hour(i2c, next.hour, next.mode, next.time)
    }

    // ---------------------------------------------------------------------------------------
    // Getters
    // ---------------------------------------------------------------------------------------

    /// Read every field, seconds first. Stops at the first failing register.
    pub fn date<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<DateTime, Error<I2C::Error>> {
        let seconds = self.seconds(i2c)?;
        let minutes = self.minutes(i2c)?;
        let hour = self.hour(i2c)?;
        let day = self.day(i2c)?;
        let date = self.date_of_month(i2c)?;
        let month = self.month(i2c)?;
        let year = self.year(i2c)?;

        Ok(DateTime {
            year,
            month,
            day,
            date,
            hour: hour.hour,
            minutes,
            seconds,
            hour_mode: hour.mode,
            time_mode: hour.time,
        })
    }

    pub fn year<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        Ok(bcd::to_binary(self.read_reg(i2c, reg::YEAR)?))
    }

    pub fn month<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        Ok(bcd::to_binary(self.read_reg(i2c, reg::MONTH)?))
    }

    pub fn date_of_month<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        Ok(bcd::to_binary(self.read_reg(i2c, reg::DATE)?))
    }

    /// Day of week.
    pub fn day<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        Ok(bcd::to_binary(self.read_reg(i2c, reg::DAY)?))
    }

    pub fn hour<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<Hour, Error<I2C::Error>> {
        Ok(Hour::from_register(self.read_reg(i2c, reg::HOURS)?))
    }

    pub fn minutes<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        Ok(bcd::to_binary(self.read_reg(i2c, reg::MINUTES)?))
    }

    /// Seconds, without the oscillator halt bit.
    pub fn seconds<I2C: I2c>(&mut self, i2c: &mut I2C) -> Result<u8, Error<I2C::Error>> {
        Ok(bcd::to_binary(self.read_reg(i2c, reg::SECONDS)? & !CLOCK_HALT))
    }

    // ---------------------------------------------------------------------------------------
    // Setters
    // ---------------------------------------------------------------------------------------

    /// Write every field, seconds first. Stops at the first failing register.
    pub fn set_date<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        date: &DateTime,
    ) -> Result<(), Error<I2C::Error>> {
        self.set_seconds(i2c, date.seconds)?;
        self.set_minutes(i2c, date.minutes)?;
        self.set_hour(i2c, date.hour, date.hour_mode, date.time_mode)?;
        self.set_day(i2c, date.day)?;
        self.set_date_of_month(i2c, date.date)?;
        self.set_month(i2c, date.month)?;
        self.set_year(i2c, date.year)
    }

    pub fn set_year<I2C: I2c>(&mut self, i2c: &mut I2C, year: u8) -> Result<(), Error<I2C::Error>> {
        assert!(year <= 99, "year out of range: {}", year);
        self.write_reg(i2c, reg::YEAR, bcd::to_bcd(year))
    }

    pub fn set_month<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        month: u8,
    ) -> Result<(), Error<I2C::Error>> {
        assert!((1..=12).contains(&month), "month out of range: {}", month);
        self.write_reg(i2c, reg::MONTH, bcd::to_bcd(month))
    }

    pub fn set_date_of_month<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        date: u8,
    ) -> Result<(), Error<I2C::Error>> {
        assert!((1..=31).contains(&date), "date out of range: {}", date);
        self.write_reg(i2c, reg::DATE, bcd::to_bcd(date))
    }

    /// Day of week.
    pub fn set_day<I2C: I2c>(&mut self, i2c: &mut I2C, day: u8) -> Result<(), Error<I2C::Error>> {
        assert!((1..=7).contains(&day), "day of week out of range: {}", day);
        self.write_reg(i2c, reg::DAY, bcd::to_bcd(day))
    }

    /// Write the hours register.
    ///
    /// `hour` must be 1..=12 in 12-hour mode and 0..=23 in 24-hour mode. In 12-hour mode `time`
    /// must be AM or PM; `TimeMode::None` is rejected without touching the bus. In 24-hour mode
    /// `time` is ignored.
    pub fn set_hour<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        hour: u8,
        mode: HourMode,
        time: TimeMode,
    ) -> Result<(), Error<I2C::Error>> {
        let value = match mode {
            HourMode::Hour12 => {
                assert!((1..=12).contains(&hour), "12-hour value out of range: {}", hour);
                let value = bcd::to_bcd(hour) | HOUR_12;
                match time {
                    TimeMode::Am => value,
                    TimeMode::Pm => value | HOUR_PM,
                    TimeMode::None => return Err(Error::InvalidTimeMode),
                }
            }
            HourMode::Hour24 => {
                assert!(hour <= 23, "24-hour value out of range: {}", hour);
                if time != TimeMode::None {
                    debug!("rtc: ignoring {:?} in 24-hour mode", time);
                }
                bcd::to_bcd(hour) & 0x3F
            }
        };

        self.write_reg(i2c, reg::HOURS, value)
    }

    pub fn set_minutes<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        minutes: u8,
    ) -> Result<(), Error<I2C::Error>> {
        assert!(minutes <= 59, "minutes out of range: {}", minutes);
        self.write_reg(i2c, reg::MINUTES, bcd::to_bcd(minutes))
    }

    /// Write the seconds, keeping the oscillator halt bit as the device has it.
    pub fn set_seconds<I2C: I2c>(
        &mut self,
        i2c: &mut I2C,
        seconds: u8,
    ) -> Result<(), Error<I2C::Error>> {
        assert!(seconds <= 59, "seconds out of range: {}", seconds);
        let halt = self.read_reg(i2c, reg::SECONDS)? & CLOCK_HALT;
        self.write_reg(i2c, reg::SECONDS, bcd::to_bcd(seconds) | halt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{BusFault, SimRtc};

    fn sample() -> DateTime {
        DateTime {
            year: 24,
            month: 11,
            day: 5,
            date: 28,
            hour: 21,
            minutes: 47,
            seconds: 9,
            hour_mode: HourMode::Hour24,
            time_mode: TimeMode::None,
        }
    }

    #[test]
    fn getter_writes_pointer_then_reads() {
        let mut i2c = SimRtc::new();
        i2c.regs[reg::MINUTES as usize] = 0x42;
        let mut rtc = Rtc::new();

        assert_eq!(rtc.minutes(&mut i2c).unwrap(), 42);
        assert_eq!(i2c.writes, vec![vec![reg::MINUTES]]);
        assert_eq!(i2c.reads, 1);
        assert_eq!(i2c.transactions, 2);
    }

    #[test]
    fn noon_in_12_hour_mode_round_trips() {
        let mut i2c = SimRtc::new();
        let mut rtc = Rtc::new();

        rtc.set_hour(&mut i2c, 12, HourMode::Hour12, TimeMode::Pm).unwrap();
        assert_eq!(i2c.regs[reg::HOURS as usize], 0x72);

        let hour = rtc.hour(&mut i2c).unwrap();
        assert_eq!(
            hour,
            Hour {
                hour: 12,
                mode: HourMode::Hour12,
                time: TimeMode::Pm
            }
        );
    }

    #[test]
    fn decodes_am_and_24_hour_registers() {
        assert_eq!(
            Hour::from_register(0x49),
            Hour {
                hour: 9,
                mode: HourMode::Hour12,
                time: TimeMode::Am
            }
        );
        assert_eq!(
            Hour::from_register(0x23),
            Hour {
                hour: 23,
                mode: HourMode::Hour24,
                time: TimeMode::None
            }
        );
    }

    #[test]
    #[should_panic]
    fn rejects_13_in_12_hour_mode() {
        let mut i2c = SimRtc::new();
        let _ = Rtc::new().set_hour(&mut i2c, 13, HourMode::Hour12, TimeMode::Am);
    }

    #[test]
    fn accepts_13_in_24_hour_mode() {
        let mut i2c = SimRtc::new();
        Rtc::new()
            .set_hour(&mut i2c, 13, HourMode::Hour24, TimeMode::None)
            .unwrap();
        assert_eq!(i2c.regs[reg::HOURS as usize], 0x13);
    }

    #[test]
    fn missing_am_pm_is_rejected_without_writing() {
        let mut i2c = SimRtc::new();
        assert_eq!(
            Rtc::new().set_hour(&mut i2c, 5, HourMode::Hour12, TimeMode::None),
            Err(Error::InvalidTimeMode)
        );
        assert!(i2c.writes.is_empty());
    }

    #[test]
    fn set_seconds_keeps_the_halt_bit() {
        let mut i2c = SimRtc::new();
        let mut rtc = Rtc::new();

        i2c.regs[reg::SECONDS as usize] = 0x80 | 0x31;
        rtc.set_seconds(&mut i2c, 7).unwrap();
        assert_eq!(i2c.regs[reg::SECONDS as usize], 0x87);
        assert_eq!(rtc.seconds(&mut i2c).unwrap(), 7);

        i2c.regs[reg::SECONDS as usize] = 0x31;
        rtc.set_seconds(&mut i2c, 59).unwrap();
        assert_eq!(i2c.regs[reg::SECONDS as usize], 0x59);
    }

    #[test]
    fn changing_hour_mode_twice_is_identity() {
        let mut rtc = Rtc::new();
        for h in 0..=23u8 {
            let mut i2c = SimRtc::new();
            rtc.set_hour(&mut i2c, h, HourMode::Hour24, TimeMode::None).unwrap();

            rtc.change_hour_mode(&mut i2c).unwrap();
            let twelve = rtc.hour(&mut i2c).unwrap();
            assert_eq!(twelve.mode, HourMode::Hour12);
            assert!((1..=12).contains(&twelve.hour), "{} -> {:?}", h, twelve);

            rtc.change_hour_mode(&mut i2c).unwrap();
            assert_eq!(
                rtc.hour(&mut i2c).unwrap(),
                Hour {
                    hour: h,
                    mode: HourMode::Hour24,
                    time: TimeMode::None
                }
            );
        }
    }

    #[test]
    fn hour_mode_conversion_edges() {
        let h24 = |hour| Hour {
            hour,
            mode: HourMode::Hour24,
            time: TimeMode::None,
        };
        let h12 = |hour, time| Hour {
            hour,
            mode: HourMode::Hour12,
            time,
        };

        assert_eq!(h24(0).toggled(), h12(12, TimeMode::Am));
        assert_eq!(h24(12).toggled(), h12(12, TimeMode::Pm));
        assert_eq!(h24(15).toggled(), h12(3, TimeMode::Pm));
        assert_eq!(h12(11, TimeMode::Am).toggled(), h24(11));
        assert_eq!(h12(7, TimeMode::Pm).toggled(), h24(19));
    }

    #[test]
    fn set_date_writes_seconds_first() {
        let mut i2c = SimRtc::new();
        let mut rtc = Rtc::new();

        rtc.set_date(&mut i2c, &sample()).unwrap();

        let pointers: Vec<u8> = i2c.writes.iter().filter(|w| w.len() == 2).map(|w| w[0]).collect();
        assert_eq!(pointers, vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(&i2c.regs[..7], &[0x09, 0x47, 0x21, 0x05, 0x28, 0x11, 0x24]);
        assert_eq!(rtc.date(&mut i2c).unwrap(), sample());
    }

    #[test]
    fn aggregate_stops_at_first_failure() {
        let mut i2c = SimRtc::new();
        let mut rtc = Rtc::new();
        rtc.set_date(&mut i2c, &sample()).unwrap();

        // Seconds and minutes take two transfers each; the hour pointer write fails.
        i2c.transactions = 0;
        i2c.fail_at = Some(4);
        assert_eq!(rtc.date(&mut i2c), Err(Error::I2c(BusFault)));
        assert_eq!(i2c.transactions, 5);
    }

    #[test]
    fn set_date_stops_at_first_failure() {
        let mut i2c = SimRtc::new();
        let mut rtc = Rtc::new();

        // Seconds take a read-modify-write (three transfers) and minutes one; the hour write fails.
        i2c.fail_at = Some(4);
        assert_eq!(rtc.set_date(&mut i2c, &sample()), Err(Error::I2c(BusFault)));
        assert_eq!(i2c.transactions, 5);

        let pointers: Vec<u8> = i2c.writes.iter().filter(|w| w.len() == 2).map(|w| w[0]).collect();
        assert_eq!(pointers, vec![reg::SECONDS, reg::MINUTES]);
        assert_eq!(&i2c.regs[2..7], &[0u8; 5]);
    }

    #[test]
    fn corrupt_hour_register_is_reported_not_rewritten() {
        let mut rtc = Rtc::new();
        for raw in [HOUR_12 | HOUR_PM | 0x19, HOUR_12 | 0x00, 0x24, 0x3F] {
            let mut i2c = SimRtc::new();
            i2c.regs[reg::HOURS as usize] = raw;

            let result = rtc.change_hour_mode(&mut i2c);
            assert!(
                matches!(result, Err(Error::InvalidHour(_))),
                "raw 0x{:02X}: {:?}",
                raw,
                result
            );
            assert_eq!(i2c.regs[reg::HOURS as usize], raw);
            assert!(i2c.writes.iter().all(|w| w.len() == 1));
        }
    }

    #[test]
    fn init_starts_clock_and_sets_square_wave() {
        let mut i2c = SimRtc::new();
        i2c.regs[reg::SECONDS as usize] = 0x80;
        let mut rtc = Rtc::new();

        assert!(!rtc.is_running(&mut i2c).unwrap());
        rtc.init(&mut i2c, &sample(), SquareWave::Hz1).unwrap();

        assert!(rtc.is_running(&mut i2c).unwrap());
        assert_eq!(rtc.square_wave(&mut i2c).unwrap(), 0x10);
        assert_eq!(rtc.date(&mut i2c).unwrap(), sample());

        rtc.halt(&mut i2c).unwrap();
        assert!(!rtc.is_running(&mut i2c).unwrap());
        assert_eq!(rtc.seconds(&mut i2c).unwrap(), 9);
    }

    #[test]
    fn wrong_address_surfaces_the_nack() {
        let mut i2c = SimRtc::new();
        let mut rtc = Rtc::with_address(0x51);
        assert_eq!(rtc.year(&mut i2c), Err(Error::I2c(BusFault)));
    }

    #[test]
    #[should_panic]
    fn month_zero_is_a_programmer_error() {
        let mut i2c = SimRtc::new();
        let _ = Rtc::new().set_month(&mut i2c, 0);
    }
}
