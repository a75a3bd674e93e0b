//! Platform capabilities consumed by the driver.

use std::{sync::Arc, time::Instant};

/// Handler attached to the interrupt line.
pub type IsrHandler = Arc<dyn Fn() + Send + Sync>;

/// Bus parameters applied for the duration of a transaction.
///
/// The chip always talks MSB first in SPI mode 0, only the clock changes between the
/// initialization phases.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpiSettings {
    pub clock: u32,
}

impl SpiSettings {
    #[inline]
    pub const fn new(clock: u32) -> Self {
        Self { clock }
    }
}

/// SPI bus shared with the MCP2517FD.
///
/// The bus is assumed reliable: transfers cannot fail, corrupted exchanges are caught by the
/// read-back checks of the initialization.
pub trait SpiBus: Send {
    /// Takes exclusive ownership of the bus and applies `settings`.
    fn begin_transaction(&mut self, settings: &SpiSettings);
    /// Releases the bus taken by [`SpiBus::begin_transaction`].
    fn end_transaction(&mut self);
    fn assert_cs(&mut self);
    fn deassert_cs(&mut self);
    /// Full duplex exchange, the received bytes replace `buffer`.
    fn transfer(&mut self, buffer: &mut [u8]);
}

/// How the interrupt line triggers the attached handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    FallingEdge,
    LowLevel,
}

/// GPIO side of the platform, only used while initializing.
pub trait Gpio: Send {
    /// Interrupt number of `pin`, `None` when the pin cannot raise interrupts.
    fn interrupt_number(&self, pin: u8) -> Option<u8>;
    fn set_input_pullup(&mut self, pin: u8);
    fn attach_interrupt(&mut self, interrupt: u8, handler: IsrHandler, trigger: Trigger);
}

/// Gpio for boards without an interrupt line, the driver is then polled.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoGpio;

impl Gpio for NoGpio {
    fn interrupt_number(&self, _: u8) -> Option<u8> {
        None
    }

    fn set_input_pullup(&mut self, _: u8) {}

    fn attach_interrupt(&mut self, _: u8, _: IsrHandler, _: Trigger) {}
}

/// Monotonic millisecond counter used for the initialization deadlines.
pub trait Clock: Send + Sync {
    fn millis(&self) -> u64;
}

/// [`Clock`] backed by [`Instant`], counting from its creation.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Clock for SystemClock {
    #[inline]
    fn millis(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
