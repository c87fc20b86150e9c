// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! SPI serial EEPROM driver (4 Mbit, 2048 pages of 256 bytes).
//!
//! This module handles the opcode framing, write-enable latch and busy polling of the EEPROM.
//! The driver owns only its chip-select line; the SPI bus is passed in as `&mut` to each method
//! so that other devices can share it.
//!
//! Every transaction asserts chip select, runs its body, then drains the bus (`SpiBus::flush`)
//! and deasserts chip select. The drain and release happen on every exit path, including when
//! the body failed, so a transport error never leaves the line asserted for the next caller.
//!
//! Writes are split into page-sized bursts: a single WRITE never crosses a page boundary, and
//! each burst gets its own busy wait and write-enable, since the device clears the latch after
//! every write cycle. The page counter wraps from the last page back to page 0.
//!
//! Busy waits spin on [`Eeprom::is_busy`] under a [`BusyWait`] policy. The default policy,
//! [`Forever`], never gives up, so an unresponsive device hangs the caller.

use core::fmt;

use embedded_hal::{delay::DelayNs, digital::OutputPin, spi::SpiBus};
use log::{debug, trace, warn};

/// Bytes per page; the largest payload of a single WRITE burst.
pub const PAGE_SIZE: usize = 256;
/// Number of pages in the array.
pub const PAGE_COUNT: u16 = 2048;
/// Index of the last page; writes running past it continue at page 0.
pub const LAST_PAGE: u16 = PAGE_COUNT - 1;
/// Length of the manufacturer ID returned by SPID.
pub const ID_LEN: usize = 5;
/// Size of the security register.
pub const SECURITY_SIZE: usize = 256;

/// Significant address bits (19): 11 page bits and 8 column bits.
const ADDRESS_MASK: u32 = 0x07_FFFF;
/// Security register address that selects the LOCK / CHLK form of the security opcodes.
const LOCK_LOCATION: u32 = 0x00_0400;
/// Data byte sent with LOCK.
const LOCK_BIT: u8 = 0x02;

/// Instruction set.
///
/// The security register opcodes double up: the same byte means a different instruction
/// depending on the address that follows it, so each appears once here.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Write status register.
    Wrsr = 0x01,
    /// Write to the memory array (1 to 256 bytes).
    Write = 0x02,
    /// Read from the memory array.
    Read = 0x03,
    /// Reset the write-enable latch.
    Wrdi = 0x04,
    /// Read status register.
    Rdsr = 0x05,
    /// Set the write-enable latch.
    Wren = 0x06,
    /// Write ready/busy poll.
    Wrbp = 0x08,
    /// Software device reset.
    Srst = 0x7C,
    /// WREX, write to the security register.
    ///
    /// Addressed at the lock location this is LOCK, which permanently locks the security
    /// register.
    SecurityWrite = 0x82,
    /// RDEX, read from the security register.
    ///
    /// Addressed at the lock location this is CHLK, which reads back the lock status.
    SecurityRead = 0x83,
    /// Read the manufacturer ID.
    Spid = 0x9F,
}

impl Opcode {
    #[inline]
    pub fn byte(self) -> u8 {
        self as u8
    }
}

/// 16-bit status register, little-endian on the wire.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Status {
    raw: u16,
}

impl Status {
    #[inline]
    pub fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub fn raw(&self) -> u16 {
        self.raw
    }

    /// A write cycle is in progress.
    #[inline]
    pub fn busy(&self) -> bool {
        (self.raw & (1 << 0)) != 0
    }

    /// Write-enable latch.
    #[inline]
    pub fn write_enabled(&self) -> bool {
        (self.raw & (1 << 1)) != 0
    }
}

/// Error type for `Eeprom` operations.
#[derive(Debug, PartialEq, Eq)]
pub enum Error<S, P> {
    /// SPI transport failure, passed through unchanged.
    Spi(S),
    /// Chip-select pin failure.
    Pin(P),
    /// The busy-wait policy gave up before the device became ready.
    Timeout,
}

impl<S: fmt::Debug, P: fmt::Debug> fmt::Display for Error<S, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Spi(e) => write!(f, "EEPROM SPI error: {:?}", e),
            Error::Pin(e) => write!(f, "EEPROM chip-select error: {:?}", e),
            Error::Timeout => f.write_str("EEPROM stayed busy"),
        }
    }
}

/// Policy deciding how long to spin while the device reports busy.
pub trait BusyWait {
    /// Called once at the start of every wait.
    fn start(&mut self) {}

    /// Called after each poll that reported busy. Return `false` to abandon the wait.
    fn keep_waiting(&mut self) -> bool;
}

/// Spin until the device is ready, without limit.
#[derive(Copy, Clone, Debug, Default)]
pub struct Forever;

impl BusyWait for Forever {
    #[inline]
    fn keep_waiting(&mut self) -> bool {
        true
    }
}

/// Give up after a fixed number of busy polls.
#[derive(Copy, Clone, Debug)]
pub struct MaxPolls {
    limit: u32,
    remaining: u32,
}

impl MaxPolls {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            remaining: limit,
        }
    }
}

impl BusyWait for MaxPolls {
    fn start(&mut self) {
        self.remaining = self.limit;
    }

    fn keep_waiting(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }
}

/// Sleep `step_us` between polls and give up once `budget_us` has elapsed.
pub struct DelayTimeout<D> {
    delay: D,
    step_us: u32,
    budget_us: u32,
    elapsed_us: u32,
}

impl<D: DelayNs> DelayTimeout<D> {
    /// `step_us` must be non-zero, otherwise the budget would never run out.
    pub fn new(delay: D, step_us: u32, budget_us: u32) -> Self {
        assert!(step_us > 0, "busy-wait step must be non-zero");
        Self {
            delay,
            step_us,
            budget_us,
            elapsed_us: 0,
        }
    }

    pub fn free(self) -> D {
        self.delay
    }
}

impl<D: DelayNs> BusyWait for DelayTimeout<D> {
    fn start(&mut self) {
        self.elapsed_us = 0;
    }

    fn keep_waiting(&mut self) -> bool {
        if self.elapsed_us >= self.budget_us {
            return false;
        }
        self.delay.delay_us(self.step_us);
        self.elapsed_us = self.elapsed_us.saturating_add(self.step_us);
        true
    }
}

/// Three address bytes, MSB first. Only the low 3 bits of the top byte are significant.
#[inline]
fn address_bytes(address: u32) -> [u8; 3] {
    let address = address & ADDRESS_MASK;
    [(address >> 16) as u8 & 0x07, (address >> 8) as u8, address as u8]
}

/// Page following `page`, wrapping past the last page to page 0.
#[inline]
pub fn next_page(page: u16) -> u16 {
    if page >= LAST_PAGE {
        0
    } else {
        page + 1
    }
}

/// One WRITE burst: a payload that fits in the remainder of `page` starting at `column`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Burst<'a> {
    pub page: u16,
    pub column: u8,
    pub data: &'a [u8],
}

impl Burst<'_> {
    /// Opcode and address bytes that precede the payload.
    #[inline]
    pub fn header(&self) -> [u8; 4] {
        let [a2, a1, a0] = address_bytes(((self.page as u32) << 8) | self.column as u32);
        [Opcode::Write.byte(), a2, a1, a0]
    }
}

/// Splits a write into page-bounded bursts.
///
/// The first burst runs from the start address to the end of its page at most. Every following
/// burst starts at column 0 of the next page.
#[derive(Clone, Debug)]
pub struct Bursts<'a> {
    page: u16,
    column: u8,
    remaining: &'a [u8],
}

impl<'a> Bursts<'a> {
    pub fn new(address: u32, data: &'a [u8]) -> Self {
        let address = address & ADDRESS_MASK;
        Self {
            page: (address >> 8) as u16,
            column: address as u8,
            remaining: data,
        }
    }
}

impl<'a> Iterator for Bursts<'a> {
    type Item = Burst<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining.is_empty() {
            return None;
        }

        let space = PAGE_SIZE - self.column as usize;
        let (data, rest) = self.remaining.split_at(self.remaining.len().min(space));
        let burst = Burst {
            page: self.page,
            column: self.column,
            data,
        };

        self.remaining = rest;
        if !rest.is_empty() {
            // The device wraps to column 0 of the same page, so move on explicitly.
            self.page = next_page(self.page);
            self.column = 0;
        }

        Some(burst)
    }
}

/// EEPROM driver bound to a chip-select pin.
pub struct Eeprom<CS, W = Forever> {
    cs: CS,
    wait: W,
}

impl<CS: OutputPin> Eeprom<CS, Forever> {
    /// Construct a driver that waits on a busy device indefinitely.
    pub fn new(cs: CS) -> Self {
        Self { cs, wait: Forever }
    }
}

impl<CS: OutputPin, W: BusyWait> Eeprom<CS, W> {
    /// Construct a driver with a custom busy-wait policy.
    pub fn with_busy_wait(cs: CS, wait: W) -> Self {
        Self { cs, wait }
    }

    /// Release the chip-select pin.
    pub fn free(self) -> CS {
        self.cs
    }

    /// Run `body` with chip select asserted, then drain the bus and release chip select.
    ///
    /// The first error wins: body, then drain, then release.
    fn transaction<SPI, R>(
        &mut self,
        spi: &mut SPI,
        body: impl FnOnce(&mut SPI) -> Result<R, SPI::Error>,
    ) -> Result<R, Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.cs.set_low().map_err(Error::Pin)?;
        let result = body(spi);
        let drained = spi.flush();
        let released = self.cs.set_high();

        let value = result.map_err(Error::Spi)?;
        drained.map_err(Error::Spi)?;
        released.map_err(Error::Pin)?;
        Ok(value)
    }

    /// Send a bare one-byte instruction.
    fn command<SPI>(
        &mut self,
        spi: &mut SPI,
        opcode: Opcode,
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.transaction(spi, |spi| spi.write(&[opcode.byte()]))
    }

    /// Wait for the device to become ready, then program the status register.
    pub fn init<SPI>(
        &mut self,
        spi: &mut SPI,
        status: u16,
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.wait_ready(spi)?;
        self.write_status_register(spi, status)?;
        debug!("eeprom: initialized, status 0x{:04X}", status);
        Ok(())
    }

    /// Poll the ready/busy state with WRBP.
    ///
    /// A transport failure during the poll reads as "not busy": the status byte stays zero.
    /// A disconnected device is therefore indistinguishable from an idle one here.
    pub fn is_busy<SPI>(&mut self, spi: &mut SPI) -> bool
    where
        SPI: SpiBus,
    {
        let mut status = [0u8; 1];
        let polled = self.transaction(spi, |spi| {
            spi.write(&[Opcode::Wrbp.byte()])?;
            spi.read(&mut status)
        });

        if let Err(e) = polled {
            warn!("eeprom: busy poll failed, treating device as ready: {:?}", e);
        }

        status[0] != 0
    }

    /// Spin on `is_busy` under the configured policy.
    pub fn wait_ready<SPI>(&mut self, spi: &mut SPI) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.wait.start();
        while self.is_busy(spi) {
            if !self.wait.keep_waiting() {
                warn!("eeprom: device still busy, giving up");
                return Err(Error::Timeout);
            }
        }
        Ok(())
    }

    /// Read the raw 16-bit status register.
    pub fn read_status_register<SPI>(
        &mut self,
        spi: &mut SPI,
    ) -> Result<u16, Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let mut buf = [0u8; 2];
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::Rdsr.byte()])?;
            spi.read(&mut buf)
        })?;
        Ok(u16::from_le_bytes(buf))
    }

    /// Read the status register and parse into a `Status`.
    pub fn status<SPI>(&mut self, spi: &mut SPI) -> Result<Status, Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        Ok(Status::from_raw(self.read_status_register(spi)?))
    }

    /// Write the status register, low byte first.
    pub fn write_status_register<SPI>(
        &mut self,
        spi: &mut SPI,
        status: u16,
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let [lo, hi] = status.to_le_bytes();

        self.wait_ready(spi)?;
        self.write_enable(spi)?;
        self.transaction(spi, |spi| spi.write(&[Opcode::Wrsr.byte(), lo, hi]))
    }

    /// Set the write-enable latch. The device clears it after every write cycle.
    pub fn write_enable<SPI>(&mut self, spi: &mut SPI) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.command(spi, Opcode::Wren)
    }

    /// Reset the write-enable latch.
    pub fn write_disable<SPI>(
        &mut self,
        spi: &mut SPI,
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.wait_ready(spi)?;
        self.command(spi, Opcode::Wrdi)
    }

    /// Write `data` starting at `address`, splitting at page boundaries.
    ///
    /// Each burst is preceded by a busy wait and its own write-enable; the last one is followed
    /// by a busy wait so the data is committed when this returns.
    pub fn write<SPI>(
        &mut self,
        spi: &mut SPI,
        address: u32,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        if data.is_empty() {
            return Ok(());
        }

        for burst in Bursts::new(address, data) {
            trace!(
                "eeprom: write {} bytes at page {} column 0x{:02X}",
                burst.data.len(),
                burst.page,
                burst.column
            );

            let header = burst.header();
            self.wait_ready(spi)?;
            self.write_enable(spi)?;
            self.transaction(spi, |spi| {
                spi.write(&header)?;
                spi.write(burst.data)
            })?;
        }

        self.wait_ready(spi)
    }

    /// Read `buf.len()` bytes starting at `address`. The device advances across pages itself.
    pub fn read<SPI>(
        &mut self,
        spi: &mut SPI,
        address: u32,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let [a2, a1, a0] = address_bytes(address);
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::Read.byte(), a2, a1, a0])?;
            spi.read(buf)
        })
    }

    /// Read the 5-byte manufacturer ID.
    pub fn read_id<SPI>(
        &mut self,
        spi: &mut SPI,
    ) -> Result<[u8; ID_LEN], Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let mut id = [0u8; ID_LEN];
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::Spid.byte()])?;
            spi.read(&mut id)
        })?;
        Ok(id)
    }

    /// Issue a software reset once the device is idle.
    pub fn software_reset<SPI>(
        &mut self,
        spi: &mut SPI,
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        self.wait_ready(spi)?;
        self.command(spi, Opcode::Srst)?;
        debug!("eeprom: software reset");
        Ok(())
    }

    /// Read from the security register.
    pub fn read_security<SPI>(
        &mut self,
        spi: &mut SPI,
        offset: u8,
        buf: &mut [u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let [a2, a1, a0] = address_bytes(offset as u32);
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::SecurityRead.byte(), a2, a1, a0])?;
            spi.read(buf)
        })
    }

    /// Write to the security register. The payload must fit in the register.
    pub fn write_security<SPI>(
        &mut self,
        spi: &mut SPI,
        offset: u8,
        data: &[u8],
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        assert!(
            offset as usize + data.len() <= SECURITY_SIZE,
            "security write of {} bytes at 0x{:02X} overflows the register",
            data.len(),
            offset
        );

        let [a2, a1, a0] = address_bytes(offset as u32);
        self.wait_ready(spi)?;
        self.write_enable(spi)?;
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::SecurityWrite.byte(), a2, a1, a0])?;
            spi.write(data)
        })?;
        self.wait_ready(spi)
    }

    /// Permanently lock the security register (LOCK).
    pub fn lock_security<SPI>(
        &mut self,
        spi: &mut SPI,
    ) -> Result<(), Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let [a2, a1, a0] = address_bytes(LOCK_LOCATION);
        self.wait_ready(spi)?;
        self.write_enable(spi)?;
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::SecurityWrite.byte(), a2, a1, a0, LOCK_BIT])
        })?;
        self.wait_ready(spi)?;
        warn!("eeprom: security register locked");
        Ok(())
    }

    /// Check whether the security register is locked (CHLK).
    pub fn is_security_locked<SPI>(
        &mut self,
        spi: &mut SPI,
    ) -> Result<bool, Error<SPI::Error, CS::Error>>
    where
        SPI: SpiBus,
    {
        let [a2, a1, a0] = address_bytes(LOCK_LOCATION);
        let mut lock = [0u8; 1];
        self.transaction(spi, |spi| {
            spi.write(&[Opcode::SecurityRead.byte(), a2, a1, a0])?;
            spi.read(&mut lock)
        })?;
        Ok((lock[0] & 0x01) != 0)
    }
}
