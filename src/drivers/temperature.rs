// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Board temperature sensor read through an ADC channel.
//!
//! The sensor is sampled with a blocking one-shot conversion. On the board the reader closure comes
//! from `hw::Adc::make_reader`, which starts the conversion, waits for end-of-conversion and powers
//! the converter down again.

/// Raw ADC counts to whole degrees Celsius, using the board calibration `raw / 10 - 50`.
///
/// The division truncates before the offset, so 499 counts read as -1 °C.
#[inline]
pub fn raw_to_celsius(raw: u16) -> i32 {
    raw as i32 / 10 - 50
}

/// Degrees Celsius narrowed to one signed byte, saturating at -128 and 127.
#[inline]
pub fn to_i8_saturating(celsius: i32) -> i8 {
    celsius.clamp(i8::MIN as i32, i8::MAX as i32) as i8
}

/// Temperature sensor.
///
/// `ReadRaw` is a closure that returns one raw 12-bit ADC conversion (0..4095).
pub struct TemperatureSensor<ReadRaw> {
    read_raw: ReadRaw,
}

impl<ReadRaw> TemperatureSensor<ReadRaw>
where
    ReadRaw: FnMut() -> u16,
{
    pub fn new(read_raw: ReadRaw) -> Self {
        Self { read_raw }
    }

    /// One raw conversion.
    #[inline]
    pub fn read_raw(&mut self) -> u16 {
        (self.read_raw)()
    }

    /// One conversion in degrees Celsius.
    pub fn read_celsius(&mut self) -> i32 {
        let raw = self.read_raw();
        let celsius = raw_to_celsius(raw);
        log::trace!("temperature: raw {} -> {} C", raw, celsius);
        celsius
    }

    pub fn free(self) -> ReadRaw {
        self.read_raw
    }
}
