// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Simulated devices for driver tests.
//!
//! `SimEeprom` models the SPI EEPROM behind a chip-select line: it decodes each frame when chip
//! select is released, honours the write-enable latch and reports busy for a configurable number
//! of polls after every write cycle. `SimRtc` models the DS1307 register file behind an I2C
//! register pointer. Both record the traffic they saw so tests can assert on the wire protocol.

use std::cell::{RefCell, RefMut};
use std::rc::Rc;

use core::convert::Infallible;

use embedded_hal::{digital, i2c, spi};

const MEMORY_SIZE: usize = 2048 * 256;
const ADDRESS_MASK: usize = MEMORY_SIZE - 1;
const LOCK_LOCATION: usize = 0x0400;

/// Address carried in bytes 1..4 of a frame.
fn frame_address(frame: &[u8]) -> usize {
    let byte = |i: usize| frame.get(i).copied().unwrap_or(0) as usize;
    ((byte(1) << 16) | (byte(2) << 8) | byte(3)) & ADDRESS_MASK
}

/// Injected transport failure.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct BusFault;

impl spi::Error for BusFault {
    fn kind(&self) -> spi::ErrorKind {
        spi::ErrorKind::Other
    }
}

impl i2c::Error for BusFault {
    fn kind(&self) -> i2c::ErrorKind {
        i2c::ErrorKind::NoAcknowledge(i2c::NoAcknowledgeSource::Address)
    }
}

/// A committed WRITE burst as seen on the wire.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Burst {
    pub page: u16,
    pub column: u8,
    pub data: Vec<u8>,
}

pub struct EepromState {
    pub memory: Vec<u8>,
    pub security: [u8; 256],
    pub security_locked: bool,
    /// Non-volatile status bits; busy and write-enable are derived.
    pub status: u16,
    pub write_enabled: bool,
    pub busy_polls_left: u32,
    /// Busy polls reported after each write cycle.
    pub busy_cycles: u32,
    pub hung: bool,
    pub id: [u8; 5],

    /// Any frame starting with this opcode fails on the bus.
    pub fail_opcode: Option<u8>,
    /// The response phase of WRBP fails on the bus.
    pub fail_poll_reads: bool,

    pub selected: bool,
    frame: Vec<u8>,
    frame_failed: bool,
    read_cursor: usize,
    flushed: bool,

    /// Host-to-device bytes of every completed frame.
    pub frames: Vec<Vec<u8>>,
    pub bursts: Vec<Burst>,
    pub unflushed_releases: u32,
    pub rejected_writes: u32,
    pub resets: u32,
}

impl EepromState {
    fn new() -> Self {
        Self {
            memory: vec![0xFF; MEMORY_SIZE],
            security: [0xFF; 256],
            security_locked: false,
            status: 0,
            write_enabled: false,
            busy_polls_left: 0,
            busy_cycles: 0,
            hung: false,
            id: [0x29, 0xCC, 0x00, 0x01, 0x00],
            fail_opcode: None,
            fail_poll_reads: false,
            selected: false,
            frame: Vec::new(),
            frame_failed: false,
            read_cursor: 0,
            flushed: false,
            frames: Vec::new(),
            bursts: Vec::new(),
            unflushed_releases: 0,
            rejected_writes: 0,
            resets: 0,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.hung || self.busy_polls_left > 0
    }

    fn status_value(&self) -> u16 {
        (self.status & !0x0003) | (self.is_busy() as u16) | ((self.write_enabled as u16) << 1)
    }

    fn respond(&mut self) -> Result<u8, BusFault> {
        let cursor = self.read_cursor;
        self.read_cursor += 1;

        let byte = match self.frame.first().copied() {
            Some(0x05) => self.status_value().to_le_bytes()[cursor.min(1)],
            Some(0x08) => {
                if self.fail_poll_reads {
                    return Err(BusFault);
                }
                let busy = self.is_busy();
                if cursor == 0 && self.busy_polls_left > 0 {
                    self.busy_polls_left -= 1;
                }
                if busy {
                    0xFF
                } else {
                    0x00
                }
            }
            Some(0x03) => self.memory[(frame_address(&self.frame) + cursor) & ADDRESS_MASK],
            Some(0x83) => {
                let address = frame_address(&self.frame);
                if address == LOCK_LOCATION {
                    self.security_locked as u8
                } else {
                    self.security[(address + cursor) & 0xFF]
                }
            }
            Some(0x9F) => self.id[cursor % self.id.len()],
            _ => 0x00,
        };
        Ok(byte)
    }

    fn commit_cycle(&mut self) {
        self.write_enabled = false;
        self.busy_polls_left = self.busy_cycles;
    }

    /// Decode the frame just released by chip select.
    fn process_frame(&mut self) {
        let frame = core::mem::take(&mut self.frame);
        self.frames.push(frame.clone());
        if self.frame_failed || frame.is_empty() {
            return;
        }

        let accepts_write = self.write_enabled && !self.is_busy();
        match frame[0] {
            0x06 if !self.is_busy() => self.write_enabled = true,
            0x04 => self.write_enabled = false,
            0x01 if frame.len() >= 3 => {
                if !accepts_write {
                    self.rejected_writes += 1;
                    return;
                }
                self.status = u16::from_le_bytes([frame[1], frame[2]]) & !0x0003;
                self.commit_cycle();
            }
            0x02 if frame.len() >= 4 => {
                if !accepts_write {
                    self.rejected_writes += 1;
                    return;
                }
                let address = frame_address(&frame);
                let page = address >> 8;
                let column = address & 0xFF;
                let data = &frame[4..];
                for (i, &b) in data.iter().enumerate() {
                    // The array wraps within the page it was addressed at.
                    self.memory[(page << 8) | ((column + i) & 0xFF)] = b;
                }
                self.bursts.push(Burst {
                    page: page as u16,
                    column: column as u8,
                    data: data.to_vec(),
                });
                self.commit_cycle();
            }
            0x82 if frame.len() >= 4 => {
                if !accepts_write {
                    self.rejected_writes += 1;
                    return;
                }
                let address = frame_address(&frame);
                if address == LOCK_LOCATION {
                    if frame.get(4).map_or(false, |b| b & 0x02 != 0) {
                        self.security_locked = true;
                    }
                } else if !self.security_locked {
                    for (i, &b) in frame[4..].iter().enumerate() {
                        self.security[(address + i) & 0xFF] = b;
                    }
                }
                self.commit_cycle();
            }
            0x7C => {
                self.resets += 1;
                self.write_enabled = false;
                self.busy_polls_left = 0;
            }
            _ => {}
        }
    }
}

/// Simulated SPI EEPROM; hand out `bus()` and `cs()` to the driver under test.
pub struct SimEeprom {
    state: Rc<RefCell<EepromState>>,
}

impl SimEeprom {
    pub fn new() -> Self {
        Self {
            state: Rc::new(RefCell::new(EepromState::new())),
        }
    }

    pub fn bus(&self) -> SimSpi {
        SimSpi {
            state: Rc::clone(&self.state),
        }
    }

    pub fn cs(&self) -> SimCs {
        SimCs {
            state: Rc::clone(&self.state),
        }
    }

    pub fn state(&self) -> RefMut<'_, EepromState> {
        self.state.borrow_mut()
    }
}

pub struct SimSpi {
    state: Rc<RefCell<EepromState>>,
}

impl spi::ErrorType for SimSpi {
    type Error = BusFault;
}

impl spi::SpiBus<u8> for SimSpi {
    fn read(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        assert!(state.selected, "SPI read without chip select");
        if state.fail_opcode.is_some() && state.fail_opcode == state.frame.first().copied() {
            state.frame_failed = true;
            return Err(BusFault);
        }
        for word in words.iter_mut() {
            match state.respond() {
                Ok(byte) => *word = byte,
                Err(e) => {
                    state.frame_failed = true;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn write(&mut self, words: &[u8]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        assert!(state.selected, "SPI write without chip select");
        state.frame.extend_from_slice(words);
        if state.fail_opcode.is_some() && state.fail_opcode == state.frame.first().copied() {
            state.frame_failed = true;
            return Err(BusFault);
        }
        Ok(())
    }

    fn transfer(&mut self, read: &mut [u8], write: &[u8]) -> Result<(), Self::Error> {
        self.write(write)?;
        self.read(read)
    }

    fn transfer_in_place(&mut self, words: &mut [u8]) -> Result<(), Self::Error> {
        self.write(words)?;
        words.fill(0);
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.state.borrow_mut().flushed = true;
        Ok(())
    }
}

pub struct SimCs {
    state: Rc<RefCell<EepromState>>,
}

impl digital::ErrorType for SimCs {
    type Error = Infallible;
}

impl digital::OutputPin for SimCs {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        state.selected = true;
        state.frame.clear();
        state.frame_failed = false;
        state.read_cursor = 0;
        state.flushed = false;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.selected {
            if !state.flushed {
                state.unflushed_releases += 1;
            }
            state.selected = false;
            state.process_frame();
        }
        Ok(())
    }
}

/// Simulated DS1307 register file.
pub struct SimRtc {
    pub address: u8,
    pub regs: [u8; 64],
    pub pointer: u8,
    /// Every write operation, pointer byte first.
    pub writes: Vec<Vec<u8>>,
    pub reads: usize,
    pub transactions: usize,
    /// Zero-based index of the transaction that fails with a NACK.
    pub fail_at: Option<usize>,
}

impl SimRtc {
    pub fn new() -> Self {
        Self {
            address: 0x68,
            regs: [0; 64],
            pointer: 0,
            writes: Vec::new(),
            reads: 0,
            transactions: 0,
            fail_at: None,
        }
    }
}

impl i2c::ErrorType for SimRtc {
    type Error = BusFault;
}

impl i2c::I2c for SimRtc {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        let index = self.transactions;
        self.transactions += 1;
        if address != self.address || self.fail_at == Some(index) {
            return Err(BusFault);
        }

        for op in operations.iter_mut() {
            match op {
                i2c::Operation::Write(bytes) => {
                    self.writes.push(bytes.to_vec());
                    if let Some((&pointer, values)) = bytes.split_first() {
                        self.pointer = pointer & 0x3F;
                        for &value in values {
                            self.regs[self.pointer as usize] = value;
                            self.pointer = (self.pointer + 1) & 0x3F;
                        }
                    }
                }
                i2c::Operation::Read(buf) => {
                    self.reads += 1;
                    for byte in buf.iter_mut() {
                        *byte = self.regs[self.pointer as usize];
                        self.pointer = (self.pointer + 1) & 0x3F;
                    }
                }
            }
        }
        Ok(())
    }
}
