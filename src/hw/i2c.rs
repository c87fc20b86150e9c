// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Inter-Integrated Circuit (I2C) abstraction layer.
//!
//! `I2cBus` adapts a blocking HAL I2C master (`BlockingI2c`, which speaks the `embedded-hal` 0.2
//! blocking traits) to the `embedded-hal` 1.0 `I2c` trait used by the drivers. Each operation of a
//! transaction is issued as its own bus transfer.

use core::fmt;

use embedded_hal::i2c::{self as hal_i2c, Operation, SevenBitAddress};
use embedded_hal_02::blocking::i2c::{Read, Write};

/// HAL I2C error, wrapped so it can report an `embedded-hal` error kind.
#[derive(Debug)]
pub struct I2cError<E>(pub E);

impl<E: fmt::Debug> hal_i2c::Error for I2cError<E> {
    fn kind(&self) -> hal_i2c::ErrorKind {
        hal_i2c::ErrorKind::Other
    }
}

pub struct I2cBus<I2C> {
    i2c: I2C,
}

impl<I2C> I2cBus<I2C> {
    pub fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    pub fn free(self) -> I2C {
        self.i2c
    }
}

impl<I2C, E> hal_i2c::ErrorType for I2cBus<I2C>
where
    I2C: Write<Error = E> + Read<Error = E>,
    E: fmt::Debug,
{
    type Error = I2cError<E>;
}

impl<I2C, E> hal_i2c::I2c<SevenBitAddress> for I2cBus<I2C>
where
    I2C: Write<Error = E> + Read<Error = E>,
    E: fmt::Debug,
{
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => Write::write(&mut self.i2c, address, bytes),
                Operation::Read(buf) => Read::read(&mut self.i2c, address, buf),
            }
            .map_err(I2cError)?;
        }
        Ok(())
    }
}
