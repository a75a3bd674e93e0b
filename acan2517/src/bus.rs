//! Register access layer.
//!
//! The plain accessors own the bus for one access. The `*_spi` accessors expect the caller
//! to hold it already, see [`Bus::transaction`].

use crate::constants::OBJECT_SIZE;
use crate::hal::{SpiBus, SpiSettings};
use crate::wire;

pub struct Bus<SPI> {
    spi: SPI,
    settings: SpiSettings,
}

impl<SPI: SpiBus> Bus<SPI> {
    pub fn new(spi: SPI, clock: u32) -> Self {
        Self { spi, settings: SpiSettings::new(clock) }
    }

    /// Clock used by the following transactions.
    #[inline]
    pub fn set_clock(&mut self, clock: u32) {
        log::debug!("ACAN2517 - SPI clock set to {} Hz", clock);
        self.settings = SpiSettings::new(clock);
    }

    #[inline]
    pub fn clock(&self) -> u32 {
        self.settings.clock
    }

    #[inline]
    pub fn deassert_cs(&mut self) {
        self.spi.deassert_cs();
    }

    #[inline]
    pub fn begin_transaction(&mut self) {
        self.spi.begin_transaction(&self.settings);
    }

    #[inline]
    pub fn end_transaction(&mut self) {
        self.spi.end_transaction();
    }

    /// Runs `f` while owning the bus.
    pub fn transaction<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.begin_transaction();
        let result = f(self);
        self.end_transaction();
        result
    }

    /// One chip-select bracketed exchange.
    #[inline]
    fn exchange(&mut self, buffer: &mut [u8]) {
        self.spi.assert_cs();
        self.spi.transfer(buffer);
        self.spi.deassert_cs();
    }

    pub fn read_byte_spi(&mut self, address: u16) -> u8 {
        let mut buffer = wire::read_byte_frame(address);
        self.exchange(&mut buffer);
        buffer[2]
    }

    pub fn write_byte_spi(&mut self, address: u16, value: u8) {
        let mut buffer = wire::write_byte_frame(address, value);
        self.exchange(&mut buffer);
    }

    pub fn read_word_spi(&mut self, address: u16) -> u32 {
        let mut buffer = wire::read_word_frame(address);
        self.exchange(&mut buffer);
        wire::word_from_frame(&buffer)
    }

    pub fn write_word_spi(&mut self, address: u16, value: u32) {
        let mut buffer = wire::write_word_frame(address, value);
        self.exchange(&mut buffer);
    }

    /// Reads a whole message object, header and payload, in a single exchange.
    pub fn read_object_spi(&mut self, address: u16) -> [u8; OBJECT_SIZE] {
        let mut buffer = wire::read_object_frame(address);
        self.exchange(&mut buffer);
        wire::object_from_frame(&buffer)
    }

    pub fn write_object_spi(&mut self, address: u16, object: &[u8; OBJECT_SIZE]) {
        let mut buffer = wire::write_object_frame(address, object);
        self.exchange(&mut buffer);
    }

    pub fn reset_spi(&mut self) {
        let mut buffer = wire::reset_frame();
        self.exchange(&mut buffer);
    }

    #[inline]
    pub fn read_byte(&mut self, address: u16) -> u8 {
        self.transaction(|bus| bus.read_byte_spi(address))
    }

    #[inline]
    pub fn write_byte(&mut self, address: u16, value: u8) {
        self.transaction(|bus| bus.write_byte_spi(address, value))
    }

    #[inline]
    pub fn read_word(&mut self, address: u16) -> u32 {
        self.transaction(|bus| bus.read_word_spi(address))
    }

    #[inline]
    pub fn write_word(&mut self, address: u16, value: u32) {
        self.transaction(|bus| bus.write_word_spi(address, value))
    }

    #[inline]
    pub fn reset(&mut self) {
        self.transaction(|bus| bus.reset_spi())
    }
}
