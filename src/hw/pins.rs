// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Pin definitions for the STM32F767 on the SensorBoard.

use stm32f7xx_hal::{
    gpio::{gpioa, gpiob, Alternate, OpenDrain, Output, PushPull},
    pac,
    prelude::*,
};

/// All board pins. Construct this once at startup using:
///
/// ```ignore
/// let pins = BoardPins::new(dp.GPIOA, dp.GPIOB);
/// ```
pub struct BoardPins {
    pub usart1: Usart1Pins,
    pub spi2: Spi2Pins,
    pub i2c1: I2c1Pins,
}

/// Debug console
pub struct Usart1Pins {
    pub tx: gpioa::PA9<Alternate<7>>,
    pub rx: gpioa::PA10<Alternate<7>>,
}

/// SPI2 SCK/MISO/MOSI and EEPROM CS
pub struct Spi2Pins {
    pub sck: gpiob::PB13<Alternate<5>>,
    pub miso: gpiob::PB14<Alternate<5>>,
    pub mosi: gpiob::PB15<Alternate<5>>,
    pub cs_eeprom: gpiob::PB12<Output<PushPull>>,
}

/// I2C1 bus to the RTC
pub struct I2c1Pins {
    pub scl: gpiob::PB8<Alternate<4, OpenDrain>>,
    pub sda: gpiob::PB9<Alternate<4, OpenDrain>>,
}

impl BoardPins {
    /// Create all named pins from raw GPIO peripherals.
    pub fn new(gpioa: pac::GPIOA, gpiob: pac::GPIOB) -> Self {
        let gpioa = gpioa.split();
        let gpiob = gpiob.split();

        Self {
            usart1: Usart1Pins {
                tx: gpioa.pa9.into_alternate::<7>(),
                rx: gpioa.pa10.into_alternate::<7>(),
            },

            spi2: Spi2Pins {
                sck: gpiob.pb13.into_alternate::<5>(),
                miso: gpiob.pb14.into_alternate::<5>(),
                mosi: gpiob.pb15.into_alternate::<5>(),
                cs_eeprom: gpiob.pb12.into_push_pull_output(),
            },

            i2c1: I2c1Pins {
                scl: gpiob.pb8.into_alternate_open_drain::<4>(),
                sda: gpiob.pb9.into_alternate_open_drain::<4>(),
            },
        }
    }
}
