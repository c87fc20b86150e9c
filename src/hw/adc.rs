// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Basic ADC support for STM32F7 using direct PAC register access.
//!
//! Thin wrapper around ADC1 with blocking single-channel reads. Each read powers the converter up,
//! runs one conversion and powers it down again.
//!
//! Example:
//! ```ignore
//! let adc = RefCell::new(Adc::adc1(dp.ADC1).with_temperature_sensor());
//! let mut sensor = TemperatureSensor::new(Adc::make_reader(&adc, TEMPERATURE_CHANNEL));
//! ```

use core::cell::RefCell;

use stm32f7xx_hal::pac;

/// ADC stabilization time after power-up, in core cycles (a few µs at the default clock).
const POWER_UP_CYCLES: u32 = 1_000;

/// Longest sample time (480 cycles), needed by the internal temperature sensor.
const SAMPLE_TIME_MAX: u32 = 0b111;

pub struct Adc {
    adc: pac::ADC1,
}

fn configure_common() {
    let common = unsafe { &*pac::ADC_COMMON::ptr() };

    // ADC prescaler: PCLK2 / 4
    common.ccr.modify(|_, w| w.adcpre().div4());
}

fn init_basic_adc(adc: &pac::adc1::RegisterBlock) {
    // Power off to configure
    adc.cr2.modify(|_, w| w.adon().clear_bit());

    // 12-bit, right-aligned, software trigger
    adc.cr1.modify(|_, w| w.res().bits(0b00));
    adc.cr2.modify(|_, w| {
        w.cont().clear_bit();
        w.align().right();
        w.exten().disabled();
        w
    });

    // Sequence length = 1 conversion
    adc.sqr1.modify(|_, w| w.l().bits(0));
}

impl Adc {
    /// Create and initialize ADC1, left powered down until the first read.
    pub fn adc1(adc1: pac::ADC1) -> Self {
        let rcc = unsafe { &*pac::RCC::ptr() };
        rcc.apb2enr.modify(|_, w| w.adc1en().set_bit());

        configure_common();
        init_basic_adc(&adc1);

        Self { adc: adc1 }
    }

    /// Connect the internal temperature sensor to its channel.
    pub fn with_temperature_sensor(self) -> Self {
        let common = unsafe { &*pac::ADC_COMMON::ptr() };
        common.ccr.modify(|_, w| w.tsvrefe().set_bit());
        self
    }

    /// Blocking one-shot conversion of `channel`.
    pub fn read(&mut self, channel: u8) -> u16 {
        let adc = &self.adc;
        let shift = 3 * u32::from(channel % 10);

        // Long sample time for channel stability
        if channel <= 9 {
            adc.smpr2
                .modify(|r, w| unsafe { w.bits(r.bits() | (SAMPLE_TIME_MAX << shift)) });
        } else {
            adc.smpr1
                .modify(|r, w| unsafe { w.bits(r.bits() | (SAMPLE_TIME_MAX << shift)) });
        }

        adc.sqr3
            .modify(|_, w| unsafe { w.sq1().bits(channel & 0x1F) });

        adc.cr2.modify(|_, w| w.adon().set_bit());
        cortex_m::asm::delay(POWER_UP_CYCLES);

        // Start
        adc.cr2.modify(|_, w| w.swstart().set_bit());

        // Wait for completion
        while adc.sr.read().eoc().bit_is_clear() {}

        let value = adc.dr.read().data().bits();

        adc.cr2.modify(|_, w| w.adon().clear_bit());
        value
    }

    /// Create a closure that reads the given channel from the ADC reference.
    pub fn make_reader<'a>(adc_ref: &'a RefCell<Self>, channel: u8) -> impl FnMut() -> u16 + 'a {
        move || adc_ref.borrow_mut().read(channel)
    }

    #[inline]
    pub fn free(self) -> pac::ADC1 {
        self.adc
    }
}
