//! Bring-up sequence: validation, reset, clock setup, RAM and FIFO layout, filters, bit
//! timing, then the requested mode. Steps touching the controller are skipped once an
//! error has been recorded.

use std::sync::Weak;
use crate::backend::Service;
use crate::bus::Bus;
use crate::constants::*;
use crate::error::ErrorCode;
use crate::filter::{FilterStatus, Filters};
use crate::hal::{Clock, IsrHandler, SpiBus};
use crate::queue::RingBuffer;
use crate::regs::*;
use crate::settings::Settings;
use super::{flow::Core, Shared};

/// Scratch RAM word for the connectivity checks.
const READ_BACK_ADDRESS: u16 = RAM_START;

impl<SPI: SpiBus> Shared<SPI> {
    pub(super) fn initialize(
        &self,
        settings: &Settings,
        handler: Option<IsrHandler>,
        filters: &Filters,
        service: Weak<dyn Service>,
    ) -> ErrorCode {
        let mut gpio = self.gpio.lock()
            .unwrap_or_else(|e| e.into_inner());
        let interrupt = gpio.interrupt_number(self.int_pin);
        let (mut error, interrupt) = self.validate(settings, handler.is_some(), filters, interrupt);

        let mut core = self.lock_core();
        core.running = false;
        if error.is_empty() {
            if self.int_pin != NO_INT_PIN {
                gpio.set_input_pullup(self.int_pin);
            }
            core.bus.deassert_cs();
            core.bus.set_clock(RESET_SPI_CLOCK);
            let configuration = OperationMode::Configuration;
            core.bus.write_byte(C1CON_REGISTER + 3, mode_request_byte(configuration, true));
            if !self.wait_for_mode(&mut core.bus, configuration, settings.timeout_ms()) {
                error |= ErrorCode::REQUESTED_CONFIGURATION_MODE_TIMEOUT;
            }
            core.bus.reset();
        }

        if error.is_empty() && !read_back_check(&mut core.bus) {
            error |= ErrorCode::READ_BACK_ERROR_WITH_1MHZ_SPI_CLOCK;
        }

        if error.is_empty() {
            let oscillator = settings.oscillator_control();
            core.bus.write_byte(OSC_REGISTER, oscillator.to_byte());
            if oscillator.pll && !self.wait_for_pll(&mut core.bus, settings.timeout_ms()) {
                error |= ErrorCode::X10_PLL_NOT_READY;
            }
        }

        core.bus.set_clock(settings.sys_clock() / 2);
        if error.is_empty() && !read_back_check(&mut core.bus) {
            error |= ErrorCode::READ_BACK_ERROR_WITH_FULL_SPEED_SPI_CLOCK;
        }

        if error.is_empty() {
            configure(&mut core, settings, filters);

            let mode = OperationMode::from(settings.requested_mode());
            core.bus.write_byte(C1CON_REGISTER + 3, mode_request_byte(mode, false));
            if !self.wait_for_mode(&mut core.bus, mode, settings.timeout_ms()) {
                error |= ErrorCode::REQUESTED_MODE_TIMEOUT;
            }
        }

        if error.is_empty() {
            core.running = true;
            drop(core);
            self.backend.start(service);
            if let (Some(interrupt), Some(handler)) = (interrupt, handler) {
                gpio.attach_interrupt(interrupt, handler, self.backend.trigger());
            }
        }
        error
    }

    /// Checks that do not touch the controller, every problem is reported.
    fn validate(
        &self,
        settings: &Settings,
        has_handler: bool,
        filters: &Filters,
        interrupt: Option<u8>,
    ) -> (ErrorCode, Option<u8>) {
        let mut error = ErrorCode::empty();
        if !settings.bit_rate_closed_to_desired_rate() {
            error |= ErrorCode::TOO_FAR_FROM_DESIRED_BIT_RATE;
        }
        if let Err(e) = settings.bit_timing().consistency() {
            log::debug!("ACAN2517 - {}", e);
            error |= ErrorCode::INCONSISTENT_BIT_RATE_SETTINGS;
        }

        let uses_pin = self.int_pin != NO_INT_PIN;
        if uses_pin && interrupt.is_none() {
            error |= ErrorCode::INT_PIN_IS_NOT_AN_INTERRUPT;
        }
        if uses_pin && !has_handler {
            error |= ErrorCode::ISR_IS_NULL;
        }
        if !uses_pin && has_handler {
            error |= ErrorCode::ISR_NOT_NULL_AND_NO_INT_PIN;
        }

        if settings.controller_txq_size() > MAX_FIFO_SIZE {
            error |= ErrorCode::CONTROLLER_TXQ_SIZE_GREATER_THAN_32;
        }
        if settings.controller_txq_priority() > MAX_PRIORITY {
            error |= ErrorCode::CONTROLLER_TXQ_PRIORITY_GREATER_THAN_31;
        }
        match settings.controller_receive_fifo_size() {
            0 => error |= ErrorCode::CONTROLLER_RECEIVE_FIFO_SIZE_IS_ZERO,
            size if size > MAX_FIFO_SIZE => {
                error |= ErrorCode::CONTROLLER_RECEIVE_FIFO_SIZE_GREATER_THAN_32
            },
            _ => {},
        }
        match settings.controller_transmit_fifo_size() {
            0 => error |= ErrorCode::CONTROLLER_TRANSMIT_FIFO_SIZE_IS_ZERO,
            size if size > MAX_FIFO_SIZE => {
                error |= ErrorCode::CONTROLLER_TRANSMIT_FIFO_SIZE_GREATER_THAN_32
            },
            _ => {},
        }
        if settings.controller_transmit_fifo_priority() > MAX_PRIORITY {
            error |= ErrorCode::CONTROLLER_TRANSMIT_FIFO_PRIORITY_GREATER_THAN_31;
        }
        if settings.ram_usage() > RAM_SIZE as usize {
            error |= ErrorCode::CONTROLLER_RAM_USAGE_GREATER_THAN_2048;
        }

        if filters.count() > MAX_FILTERS {
            error |= ErrorCode::MORE_THAN_32_FILTERS;
        }
        if filters.status() != FilterStatus::Ok {
            error |= ErrorCode::FILTER_DEFINITION_ERROR;
        }

        (error, interrupt.filter(|_| uses_pin))
    }

    fn wait_for_mode(&self, bus: &mut Bus<SPI>, mode: OperationMode, timeout_ms: u64) -> bool {
        let reached = wait_until(self.clock.as_ref(), timeout_ms, || {
            current_mode_bits(bus.read_byte(C1CON_REGISTER + 2)) == mode as u8
        });
        if !reached {
            log::warn!("ACAN2517 - {:?} mode not reached within {} ms", mode, timeout_ms);
        }
        reached
    }

    fn wait_for_pll(&self, bus: &mut Bus<SPI>, timeout_ms: u64) -> bool {
        let ready = wait_until(self.clock.as_ref(), timeout_ms, || {
            OscillatorStatus::from_bits_retain(bus.read_byte(OSC_REGISTER + 1))
                .contains(OscillatorStatus::OSCRDY)
        });
        if !ready {
            log::warn!("ACAN2517 - PLL not ready within {} ms", timeout_ms);
        }
        ready
    }
}

/// Polls `ready` until it holds or `timeout_ms` elapsed, it is evaluated at least once.
fn wait_until(clock: &dyn Clock, timeout_ms: u64, mut ready: impl FnMut() -> bool) -> bool {
    let deadline = clock.millis().saturating_add(timeout_ms);
    loop {
        if ready() {
            return true;
        }
        if clock.millis() >= deadline {
            return false;
        }
    }
}

/// Walks a single bit through a RAM word and reads it back.
fn read_back_check<SPI: SpiBus>(bus: &mut Bus<SPI>) -> bool {
    (0..u32::BITS).all(|shift| {
        let pattern = 1u32 << shift;
        bus.write_word(READ_BACK_ADDRESS, pattern);
        let read = bus.read_word(READ_BACK_ADDRESS);
        if read != pattern {
            log::debug!(
                "ACAN2517 - read back {:#010X} instead of {:#010X} at {} Hz",
                read,
                pattern,
                bus.clock(),
            );
        }
        read == pattern
    })
}

/// Driver buffers, controller RAM, FIFOs, filters, interrupts and bit timing.
fn configure<SPI: SpiBus>(core: &mut Core<SPI>, settings: &Settings, filters: &Filters) {
    core.transmit_buffer = RingBuffer::new(settings.driver_transmit_buffer_size());
    core.receive_buffer = RingBuffer::new(settings.driver_receive_buffer_size());
    core.tx_fifo_full = false;
    core.receive_overflow = 0;

    let bus = &mut core.bus;
    log::debug!("ACAN2517 - clearing controller RAM");
    for address in (RAM_START..RAM_END).step_by(4) {
        bus.write_word(address, 0);
    }

    let mut io = IoControl3::PM0 | IoControl3::PM1;
    io.set(IoControl3::SOF, settings.clko_pin().divisor_bits().is_none());
    io.set(IoControl3::TXCANOD, settings.txcan_open_drain());
    io.set(IoControl3::INTOD, settings.int_open_drain());
    bus.write_byte(IOCON_REGISTER + 3, io.bits());

    let txq = TxPriority {
        priority: settings.controller_txq_priority(),
        attempts: settings.controller_txq_attempts() as u8,
    };
    bus.write_byte(C1TXQCON_REGISTER + 2, txq.to_byte());
    bus.write_byte(C1TXQCON_REGISTER + 3, fifo_size_byte(settings.controller_txq_size()));
    core.uses_txq = settings.controller_txq_size() > 0;
    let control = if core.uses_txq { CanControl2::TXQEN } else { CanControl2::empty() };
    bus.write_byte(C1CON_REGISTER + 2, control.bits());

    let rx_fifo = c1fifocon_register(RECEIVE_FIFO_INDEX);
    bus.write_byte(rx_fifo + 3, fifo_size_byte(settings.controller_receive_fifo_size()));
    bus.write_byte(rx_fifo, FifoControl::TFNRFNIE.bits());

    let tx = TxPriority {
        priority: settings.controller_transmit_fifo_priority(),
        attempts: settings.controller_transmit_fifo_attempts() as u8,
    };
    let tx_fifo = c1fifocon_register(TRANSMIT_FIFO_INDEX);
    bus.write_byte(tx_fifo + 2, tx.to_byte());
    bus.write_byte(tx_fifo + 3, fifo_size_byte(settings.controller_transmit_fifo_size()));
    bus.write_byte(tx_fifo, FifoControl::TXEN.bits());

    core.callbacks = Vec::with_capacity(filters.count());
    for (index, entry) in filters.entries().iter().enumerate() {
        let index = index as u16;
        log::debug!("ACAN2517 - filter {}: {:?}", index, entry);
        bus.write_word(c1mask_register(index), entry.mask());
        bus.write_word(c1fltobj_register(index), entry.acceptance());
        bus.write_byte(c1fltcon_register(index), filter_control_byte(RECEIVE_FIFO_INDEX));
        core.callbacks.push(entry.callback().cloned());
    }

    bus.write_byte(C1INT_REGISTER + 2, (InterruptEnables::RXIE | InterruptEnables::TXIE).bits());
    bus.write_byte(C1INT_REGISTER + 3, 0);

    let timing = NominalBitTiming::from(settings.bit_timing());
    bus.write_word(C1NBTCFG_REGISTER, timing.to_word());
    log::debug!(
        "ACAN2517 - {:?} at {} bit/s, {} Hz system clock, {} bytes of RAM",
        settings.requested_mode(),
        settings.bit_rate(),
        settings.sys_clock(),
        settings.ram_usage(),
    );
}
