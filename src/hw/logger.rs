// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! `log` backend that prints to the USART1 debug console.
//!
//! The console lives in a static behind a critical section, so the firmware's own status lines go
//! through [`with_console`] and share the port with the driver logs. A record emitted while the
//! console is already borrowed (a driver logging from inside a `with_console` closure) is dropped.

use core::cell::RefCell;

use cortex_m::interrupt::{self, Mutex};
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};
use stm32f7xx_hal::pac::USART1;

use crate::console::Console;
use crate::hw::Usart;

pub type DebugConsole = Console<Usart<USART1>>;

static CONSOLE: Mutex<RefCell<Option<DebugConsole>>> = Mutex::new(RefCell::new(None));
static LOGGER: ConsoleLogger = ConsoleLogger;

struct ConsoleLogger;

impl Log for ConsoleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            with_console(|console| {
                let _ = console.write_record(record);
            });
        }
    }

    fn flush(&self) {
        with_console(|console| {
            let _ = console.flush();
        });
    }
}

/// Hand the console over and install the logger with `level` as the max level.
pub fn init(console: DebugConsole, level: LevelFilter) -> Result<(), SetLoggerError> {
    interrupt::free(|cs| CONSOLE.borrow(cs).replace(Some(console)));
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    Ok(())
}

/// Run `f` on the console. Returns `None` before `init` or when the console is already in use.
pub fn with_console<R>(f: impl FnOnce(&mut DebugConsole) -> R) -> Option<R> {
    interrupt::free(|cs| {
        let mut slot = CONSOLE.borrow(cs).try_borrow_mut().ok()?;
        let result = slot.as_mut().map(f);
        result
    })
}
