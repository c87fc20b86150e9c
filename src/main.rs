// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![no_main]
#![no_std]

use core::cell::RefCell;
use core::fmt::Write;

use cortex_m_rt::entry;
use panic_halt as _;

use hal::{
    i2c::{BlockingI2c, Mode as I2cMode},
    pac,
    prelude::*,
    serial::{Config, Serial},
    spi::{Mode, Phase, Polarity, Spi},
};
use stm32f7xx_hal as hal;

use sensorboard::config::BoardConfig;
use sensorboard::console::Console;
use sensorboard::drivers::eeprom::{MaxPolls, PAGE_COUNT, PAGE_SIZE};
use sensorboard::drivers::rtc::{DateTime, HourMode, TimeMode};
use sensorboard::drivers::temperature::to_i8_saturating;
use sensorboard::drivers::{Eeprom, Rtc, TemperatureSensor};
use sensorboard::hw::{logger, Adc, BoardPins, ChipSelect, I2cBus, SpiBus, Usart};

/// Print one CRLF-terminated status line on the debug console.
macro_rules! status {
    ($($arg:tt)*) => {
        logger::with_console(|console| {
            let _ = write!(console, $($arg)*);
            let _ = console.write_str("\r\n");
        })
    };
}

/// Busy polls allowed per EEPROM write cycle before giving up.
const EEPROM_MAX_POLLS: u32 = 100_000;

/// Bytes per log record: seven date fields plus the temperature.
const RECORD_LEN: usize = 8;

/// Date programmed when the RTC oscillator is found halted (first power-up or dead backup cell).
const EPOCH: DateTime = DateTime {
    year: 26,
    month: 1,
    day: 5,
    date: 1,
    hour: 0,
    minutes: 0,
    seconds: 0,
    hour_mode: HourMode::Hour24,
    time_mode: TimeMode::None,
};

#[entry]
fn main() -> ! {
    let cfg = BoardConfig::default();

    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    // Clocks
    let rcc = dp.RCC.constrain();
    let clocks = rcc.cfgr.freeze();
    let mut apb1 = rcc.apb1;

    let pins = BoardPins::new(dp.GPIOA, dp.GPIOB);
    let mut delay = cortex_m::delay::Delay::new(cp.SYST, clocks.sysclk().raw());

    // USART1 (DBG)
    let usart_cfg = Config {
        baud_rate: cfg.console_baud.bps(),
        ..Default::default()
    };
    let serial = Serial::new(
        dp.USART1,
        (pins.usart1.tx, pins.usart1.rx),
        &clocks,
        usart_cfg,
    );
    // Fails only if a logger is already installed.
    let _ = logger::init(Console::new(Usart::new(serial)), cfg.log_level);
    status!("SensorBoard up");

    // SPI2 (EEPROM)
    let spi_mode = Mode {
        polarity: Polarity::IdleLow,
        phase: Phase::CaptureOnFirstTransition,
    };
    let spi2_raw = Spi::new(dp.SPI2, (pins.spi2.sck, pins.spi2.miso, pins.spi2.mosi));
    let spi2_enabled =
        spi2_raw.enable::<u8>(spi_mode, cfg.eeprom_spi_khz.kHz(), &clocks, &mut apb1);
    let mut spi_bus = SpiBus::new(spi2_enabled);

    let cs = ChipSelect::active_low(pins.spi2.cs_eeprom);
    let mut eeprom = Eeprom::with_busy_wait(cs, MaxPolls::new(EEPROM_MAX_POLLS));

    match eeprom.init(&mut spi_bus, cfg.eeprom_status) {
        Ok(()) => {
            if let Ok(id) = eeprom.read_id(&mut spi_bus) {
                status!("EEPROM id {:02X?}", id);
            }
        }
        Err(e) => {
            status!("EEPROM init failed: {}", e);
        }
    }

    // I2C1 (RTC)
    let i2c1 = BlockingI2c::i2c1(
        dp.I2C1,
        (pins.i2c1.scl, pins.i2c1.sda),
        I2cMode::standard(cfg.rtc_i2c_khz.kHz()),
        &clocks,
        &mut apb1,
        50_000,
    );
    let mut i2c_bus = I2cBus::new(i2c1);
    let mut rtc = Rtc::new();

    let rtc_ready = match rtc.is_running(&mut i2c_bus) {
        Ok(true) => rtc.set_square_wave(&mut i2c_bus, cfg.square_wave),
        Ok(false) => rtc.init(&mut i2c_bus, &EPOCH, cfg.square_wave),
        Err(e) => Err(e),
    };
    if let Err(e) = rtc_ready {
        status!("RTC init failed: {}", e);
    }

    // ADC1 (internal temperature sensor)
    let adc = RefCell::new(Adc::adc1(dp.ADC1).with_temperature_sensor());
    let mut thermometer =
        TemperatureSensor::new(Adc::make_reader(&adc, cfg.temperature_channel));

    let capacity = PAGE_COUNT as usize * PAGE_SIZE / RECORD_LEN;
    let mut slot = 0usize;

    loop {
        let celsius = thermometer.read_celsius();

        match rtc.date(&mut i2c_bus) {
            Ok(now) => {
                status!(
                    "20{:02}-{:02}-{:02} {:02}:{:02}:{:02} {:?}  {} C",
                    now.year,
                    now.month,
                    now.date,
                    now.hour,
                    now.minutes,
                    now.seconds,
                    now.time_mode,
                    celsius
                );

                let record: [u8; RECORD_LEN] = [
                    now.year,
                    now.month,
                    now.date,
                    now.day,
                    now.hour,
                    now.minutes,
                    now.seconds,
                    to_i8_saturating(celsius) as u8,
                ];
                let address = (slot * RECORD_LEN) as u32;
                if let Err(e) = eeprom.write(&mut spi_bus, address, &record) {
                    status!("EEPROM write failed: {}", e);
                }
                slot = (slot + 1) % capacity;
            }
            Err(e) => {
                status!("RTC read failed: {}  {} C", e, celsius);
            }
        }

        log::logger().flush();
        delay.delay_ms(cfg.sample_period_ms);
    }
}
