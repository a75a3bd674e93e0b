//! [`SpiBus`] over `embedded-hal` 1.0 traits.

use embedded_hal::{digital::OutputPin, spi};
use crate::hal::{SpiBus, SpiSettings};

/// Exclusive `embedded-hal` bus plus a chip select pin.
///
/// The clock of such a bus is fixed at construction, [`SpiSettings`] are only logged. Bus
/// errors are logged and otherwise ignored, the read-back checks of the initialization catch
/// a bus that does not work.
pub struct EmbeddedHalBus<SPI, CS> {
    spi: SPI,
    cs: CS,
}

impl<SPI, CS> EmbeddedHalBus<SPI, CS> {
    pub fn new(spi: SPI, cs: CS) -> Self {
        Self { spi, cs }
    }

    pub fn release(self) -> (SPI, CS) {
        (self.spi, self.cs)
    }
}

impl<SPI, CS> SpiBus for EmbeddedHalBus<SPI, CS>
where
    SPI: spi::SpiBus<u8> + Send,
    CS: OutputPin + Send,
{
    fn begin_transaction(&mut self, settings: &SpiSettings) {
        log::trace!("ACAN2517 - SPI transaction at {} Hz", settings.clock);
    }

    fn end_transaction(&mut self) {
        self.spi.flush()
            .unwrap_or_else(|e| log::warn!("ACAN2517 - SPI flush failed: {:?}", e));
    }

    fn assert_cs(&mut self) {
        self.cs.set_low()
            .unwrap_or_else(|e| log::warn!("ACAN2517 - CS assert failed: {:?}", e));
    }

    fn deassert_cs(&mut self) {
        self.cs.set_high()
            .unwrap_or_else(|e| log::warn!("ACAN2517 - CS deassert failed: {:?}", e));
    }

    fn transfer(&mut self, buffer: &mut [u8]) {
        self.spi.transfer_in_place(buffer)
            .unwrap_or_else(|e| log::warn!("ACAN2517 - SPI transfer failed: {:?}", e));
    }
}
