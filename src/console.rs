// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Debug console over an injected serial port.
//!
//! `Console` owns whatever implements [`SerialPort`] (the board `Usart`, or a fake in tests). It
//! offers byte-count style `write_bytes`/`read` calls plus `core::fmt::Write`, so status lines
//! can be printed with `writeln!`.
//!
//! Note: terminals expect CRLF, so end `writeln!` format strings with `\r`.

use core::fmt;

/// Blocking byte-oriented serial port.
pub trait SerialPort {
    type Error: fmt::Debug;

    /// Transmit every byte, blocking until each is accepted.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;

    /// Block until one byte is received.
    fn read_byte(&mut self) -> Result<u8, Self::Error>;

    /// Block until every byte written so far has left the port.
    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

pub struct Console<P> {
    port: P,
}

impl<P: SerialPort> Console<P> {
    pub fn new(port: P) -> Self {
        Self { port }
    }

    /// Transmit `bytes`. Returns the number written, or 0 if the port failed.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        match self.port.write_all(bytes) {
            Ok(()) => bytes.len(),
            Err(e) => {
                log::debug!("console: write failed: {:?}", e);
                0
            }
        }
    }

    /// Receive exactly one byte into `buf[0]`, regardless of `buf.len()`.
    ///
    /// Returns 1 on success, or 0 if `buf` is empty or the port failed.
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let Some(slot) = buf.first_mut() else {
            return 0;
        };
        match self.port.read_byte() {
            Ok(b) => {
                *slot = b;
                1
            }
            Err(e) => {
                log::debug!("console: read failed: {:?}", e);
                0
            }
        }
    }

    /// Read bytes until CR or LF, or until `buf` is full.
    ///
    /// The terminator is consumed but not stored. Returns the number of bytes stored; a port error
    /// ends the line early.
    pub fn read_line(&mut self, buf: &mut [u8]) -> usize {
        let mut len = 0;
        while len < buf.len() {
            let mut byte = [0u8; 1];
            if self.read(&mut byte) == 0 {
                break;
            }
            if matches!(byte[0], b'\r' | b'\n') {
                break;
            }
            buf[len] = byte[0];
            len += 1;
        }
        len
    }

    /// Drain the port's transmit side.
    pub fn flush(&mut self) -> Result<(), P::Error> {
        self.port.flush()
    }

    /// Print one `log` record as `[LEVEL] target: message` followed by CRLF.
    pub fn write_record(&mut self, record: &log::Record<'_>) -> fmt::Result {
        use core::fmt::Write;

        writeln!(self, "[{}] {}: {}\r", record.level(), record.target(), record.args())
    }

    pub fn free(self) -> P {
        self.port
    }
}

// Implement `core::fmt::Write` so we can use `write!` / `writeln!` on `Console`.
impl<P: SerialPort> fmt::Write for Console<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.port.write_all(s.as_bytes()).map_err(|_| fmt::Error)
    }
}
