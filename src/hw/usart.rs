// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! USART abstraction layer.
//!
//! `Usart` owns both halves of a HAL serial port and implements [`SerialPort`], so it can be handed
//! to a [`Console`](crate::console::Console).
//!
//! To access the terminal on the host machine, connect to the debug USB port and use
//! ```
//! $ screen /dev/tty.usbmodem* <baud_rate>
//! ```
//!
//! To close the debug terminal, press `Ctrl+A` then `Ctrl+\` then `y`.

use nb::block;

use stm32f7xx_hal::{
    prelude::*,
    serial::{self, Instance, Pins, Rx, Serial, Tx},
};

use crate::console::SerialPort;

#[derive(Debug)]
pub enum UsartError {
    /// Transmitter rejected a byte or failed to drain.
    Tx,
    /// Receive error (framing, noise, overrun or parity).
    Rx(serial::Error),
}

pub struct Usart<U: Instance> {
    tx: Tx<U>,
    rx: Rx<U>,
}

impl<U: Instance> Usart<U> {
    pub fn new<PINS: Pins<U>>(serial: Serial<U, PINS>) -> Self {
        let (tx, rx) = serial.split();
        Self { tx, rx }
    }
}

impl<U: Instance> SerialPort for Usart<U> {
    type Error = UsartError;

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), UsartError> {
        for &b in bytes {
            block!(self.tx.write(b)).map_err(|_| UsartError::Tx)?;
        }
        Ok(())
    }

    fn read_byte(&mut self) -> Result<u8, UsartError> {
        block!(self.rx.read()).map_err(UsartError::Rx)
    }

    /// Block until the transmit register has drained.
    fn flush(&mut self) -> Result<(), UsartError> {
        block!(self.tx.flush()).map_err(|_| UsartError::Tx)
    }
}
