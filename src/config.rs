// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Board constants and runtime configuration.
//!
//! The constants describe how the board is wired. `BoardConfig` holds the settings the firmware
//! applies at startup and can be adjusted with the `with_*` builders:
//!
//! ```rust
//! use sensorboard::config::BoardConfig;
//! use sensorboard::drivers::rtc::SquareWave;
//!
//! let cfg = BoardConfig::default()
//!     .with_square_wave(SquareWave::Hz1)
//!     .with_sample_period_ms(5_000);
//! ```

use log::LevelFilter;

use crate::drivers::rtc::SquareWave;

/// USART1 baud rate of the debug console.
pub const CONSOLE_BAUD: u32 = 115_200;

/// SPI2 clock for the EEPROM.
pub const EEPROM_SPI_KHZ: u32 = 1_000;

/// I2C1 clock for the RTC.
pub const RTC_I2C_KHZ: u32 = 100;

/// ADC1 channel wired to the internal temperature sensor.
pub const TEMPERATURE_CHANNEL: u8 = 18;

/// Status register value written by `Eeprom::init`; no block protection.
pub const EEPROM_STATUS: u16 = 0x0000;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BoardConfig {
    pub console_baud: u32,
    pub eeprom_spi_khz: u32,
    pub rtc_i2c_khz: u32,
    pub eeprom_status: u16,
    pub square_wave: SquareWave,
    pub temperature_channel: u8,
    /// Delay between status lines in the main loop
    pub sample_period_ms: u32,
    /// Most verbose `log` level forwarded to the console
    pub log_level: LevelFilter,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            console_baud: CONSOLE_BAUD,
            eeprom_spi_khz: EEPROM_SPI_KHZ,
            rtc_i2c_khz: RTC_I2C_KHZ,
            eeprom_status: EEPROM_STATUS,
            square_wave: SquareWave::OffLow,
            temperature_channel: TEMPERATURE_CHANNEL,
            sample_period_ms: 1_000,
            log_level: LevelFilter::Info,
        }
    }
}

impl BoardConfig {
    pub fn with_console_baud(mut self, baud: u32) -> Self {
        self.console_baud = baud;
        self
    }

    /// Set the SPI and I2C bus clocks.
    pub fn with_bus_clocks(mut self, spi_khz: u32, i2c_khz: u32) -> Self {
        self.eeprom_spi_khz = spi_khz;
        self.rtc_i2c_khz = i2c_khz;
        self
    }

    pub fn with_eeprom_status(mut self, status: u16) -> Self {
        self.eeprom_status = status;
        self
    }

    pub fn with_square_wave(mut self, square_wave: SquareWave) -> Self {
        self.square_wave = square_wave;
        self
    }

    pub fn with_temperature_channel(mut self, channel: u8) -> Self {
        self.temperature_channel = channel;
        self
    }

    pub fn with_sample_period_ms(mut self, period_ms: u32) -> Self {
        self.sample_period_ms = period_ms;
        self
    }

    pub fn with_log_level(mut self, level: LevelFilter) -> Self {
        self.log_level = level;
        self
    }
}
