// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # Device-Specific Drivers
//!
//! This module contains device-specific drivers that sit above the bus traits (`embedded-hal`
//! 1.0) and below the application logic. Buses are passed in as `&mut` to each call so that
//! several devices can share one bus.
//!
//! ## Existing drivers
//!
//! - [`bcd`] – packed BCD conversion shared by the RTC driver
//! - [`eeprom`] – 4 Mbit SPI serial EEPROM with 256-byte pages
//! - [`rtc`] – DS1307 I2C real-time clock
//! - [`temperature`] – ADC temperature sensor with board calibration

pub mod bcd;
pub mod eeprom;
pub mod rtc;
pub mod temperature;

pub use eeprom::Eeprom;
pub use rtc::Rtc;
pub use temperature::TemperatureSensor;
