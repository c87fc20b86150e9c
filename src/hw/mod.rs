// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! STM32F7 board support (feature `board`).

pub mod adc;
pub mod i2c;
pub mod logger;
pub mod pins;
pub mod spi;
pub mod usart;

pub use adc::Adc;
pub use i2c::I2cBus;
pub use pins::BoardPins;
pub use spi::ChipSelect;
pub use spi::SpiBus;
pub use usart::Usart;
