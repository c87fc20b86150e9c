// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! # SensorBoard Firmware
//!
//! This crate contains the peripheral drivers for the SensorBoard data logger, written in Rust,
//! targeting an STM32F7 MCU.
//!
//! ## Crate Structure
//!
//! | Module | Purpose |
//! | ------ | -------- |
//! | [`drivers`] | Device-level drivers (SPI EEPROM, DS1307 RTC, temperature sensor) |
//! | [`console`] | Debug console over an injected serial port |
//! | [`config`]  | Board constants and runtime configuration |
//! | `hw` | MCU-level wrappers around USART, SPI, I2C, ADC (feature `board`) |
//!
//! The drivers only depend on the `embedded-hal` 1.0 traits, so they build and test on the host.
//! Everything that touches the STM32 peripherals lives in `hw` and is gated behind the `board`
//! feature.
//!
//! ## Getting Started
//!
//! Build docs:
//!
//! ```bash
//! cargo doc --no-deps --open
//! ```
//!
//! Run the driver tests on the host:
//!
//! ```bash
//! cargo test
//! ```
//!
//! Flash the board:
//!
//! ```bash
//! cargo run --release --features board --target thumbv7em-none-eabihf
//! ```
//!
//! ## License
//!
//! Licensed under the **MIT License**.
//! See the `LICENSE` file in the repository root for full terms.
//!
//! © 2025–2026 Christopher Liu

#![cfg_attr(not(test), no_std)]

pub mod config;
pub mod console;
pub mod drivers;

#[cfg(feature = "board")]
pub mod hw;

#[cfg(test)]
pub(crate) mod testing;
