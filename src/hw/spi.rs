// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Serial Peripheral Interface (SPI) abstraction layer.
//!
//! - `SpiBus` wraps a configured HAL SPI instance with 8-bit words and implements the
//!   `embedded-hal` 1.0 `SpiBus` trait the drivers are written against.
//! - `ChipSelect` is an active-low GPIO output wrapper for manual CS control, implementing
//!   `OutputPin`.

use core::convert::Infallible;

use embedded_hal::{digital, spi as hal_spi};
use stm32f7xx_hal::{
    gpio::{self, Output, PinState, PushPull},
    pac,
    prelude::*,
    spi::{self, Enabled, Spi},
};

/// SPI peripherals whose status register can be polled for the FIFO levels and busy flag.
pub trait BusyFlag {
    fn registers() -> &'static pac::spi1::RegisterBlock;
}

macro_rules! busy_flag {
    ($($SPI:ident),*) => {
        $(
            impl BusyFlag for pac::$SPI {
                #[inline]
                fn registers() -> &'static pac::spi1::RegisterBlock {
                    unsafe { &*pac::$SPI::ptr() }
                }
            }
        )*
    };
}

busy_flag!(SPI1, SPI2, SPI3, SPI4);

/// HAL SPI error, wrapped so it can report an `embedded-hal` error kind.
#[derive(Debug)]
pub struct SpiError(pub spi::Error);

impl hal_spi::Error for SpiError {
    fn kind(&self) -> hal_spi::ErrorKind {
        hal_spi::ErrorKind::Other
    }
}

impl From<spi::Error> for SpiError {
    fn from(e: spi::Error) -> Self {
        Self(e)
    }
}

/// Wrapper around an enabled HAL SPI instance (8-bit words).
pub struct SpiBus<I, P> {
    spi: Spi<I, P, Enabled<u8>>,
}

impl<I, P> SpiBus<I, P>
where
    I: spi::Instance + BusyFlag,
    P: spi::Pins<I>,
{
    pub fn new(spi: Spi<I, P, Enabled<u8>>) -> Self {
        Self { spi }
    }

    /// Perform a blocking, full-duplex transfer of one byte.
    pub fn transfer_byte(&mut self, byte: u8) -> Result<u8, SpiError> {
        let mut tmp = [byte];
        self.spi.transfer(&mut tmp)?;
        Ok(tmp[0])
    }

    pub fn free(self) -> Spi<I, P, Enabled<u8>> {
        self.spi
    }
}

impl<I, P> hal_spi::ErrorType for SpiBus<I, P> {
    type Error = SpiError;
}

impl<I, P> hal_spi::SpiBus<u8> for SpiBus<I, P>
where
    I: spi::Instance + BusyFlag,
    P: spi::Pins<I>,
{
    /// Clock in `words`, sending 0x00.
    fn read(&mut self, words: &mut [u8]) -> Result<(), SpiError> {
        for w in words.iter_mut() {
            *w = self.transfer_byte(0x00)?;
        }
        Ok(())
    }

    /// Send `words`, discarding the response.
    fn write(&mut self, words: &[u8]) -> Result<(), SpiError> {
        for &w in words {
            self.transfer_byte(w)?;
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), SpiError> {
        for i in 0..read.len().max(write.len()) {
            let out = write.get(i).copied().unwrap_or(0x00);
            let input = self.transfer_byte(out)?;
            if let Some(slot) = read.get_mut(i) {
                *slot = input;
            }
        }
        Ok(())
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), SpiError> {
        for w in words.iter_mut() {
            *w = self.transfer_byte(*w)?;
        }
        Ok(())
    }

    /// Block until the TX FIFO is empty and the last frame has left the shift register, then
    /// drop anything left in the RX FIFO.
    fn flush(&mut self) -> Result<(), SpiError> {
        let regs = I::registers();
        while regs.sr.read().ftlvl().bits() != 0 {}
        while regs.sr.read().bsy().bit_is_set() {}
        while regs.sr.read().frlvl().bits() != 0 {
            let _ = regs.dr.read();
        }
        Ok(())
    }
}

/// Manual chip-select line, active-low, generic over any GPIO pin.
pub struct ChipSelect<const P: char, const N: u8> {
    pin: gpio::Pin<P, N, Output<PushPull>>,
}

impl<const P: char, const N: u8> ChipSelect<P, N> {
    /// Create an active-low chip select and set to the inactive state (i.e., high).
    pub fn active_low<MODE>(pin: gpio::Pin<P, N, MODE>) -> Self {
        let mut pin = pin.into_push_pull_output();
        pin.set_state(PinState::High);
        Self { pin }
    }

    /// Assert the chip select.
    #[inline]
    pub fn select(&mut self) {
        self.pin.set_low();
    }

    /// Deassert the chip select.
    #[inline]
    pub fn deselect(&mut self) {
        self.pin.set_high();
    }

    pub fn free(self) -> gpio::Pin<P, N, Output<PushPull>> {
        self.pin
    }
}

impl<const P: char, const N: u8> digital::ErrorType for ChipSelect<P, N> {
    type Error = Infallible;
}

// Low is "selected".
impl<const P: char, const N: u8> digital::OutputPin for ChipSelect<P, N> {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.select();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.deselect();
        Ok(())
    }
}
