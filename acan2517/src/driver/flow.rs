//! Flow control between the driver buffers and the controller FIFOs, and the interrupt core.
//!
//! Every method expects the caller to hold the driver lock. The `_spi` ones also expect the
//! bus to be owned already.

use crate::bus::Bus;
use crate::codec::{decode_object, encode_object};
use crate::constants::{
    c1fifocon_register, c1fifosta_register, c1fifoua_register, C1INT_REGISTER, C1TXQCON_REGISTER,
    C1TXQSTA_REGISTER, C1TXQUA_REGISTER, RAM_START, RECEIVE_FIFO_INDEX, TRANSMIT_FIFO_INDEX,
};
use crate::filter::Callback;
use crate::frame::{CanMessage, TxRoute};
use crate::hal::SpiBus;
use crate::queue::RingBuffer;
use crate::regs::{FifoCommand, FifoControl, FifoStatus, InterruptFlags};

pub(crate) struct Core<SPI> {
    pub(crate) bus: Bus<SPI>,
    pub(crate) transmit_buffer: RingBuffer<CanMessage>,
    pub(crate) receive_buffer: RingBuffer<CanMessage>,
    /// Mirrors TFNRFNIE of the transmit FIFO.
    pub(crate) tx_fifo_full: bool,
    pub(crate) uses_txq: bool,
    pub(crate) callbacks: Vec<Option<Callback>>,
    pub(crate) receive_overflow: usize,
    pub(crate) running: bool,
}

impl<SPI: SpiBus> Core<SPI> {
    pub(crate) fn new(bus: Bus<SPI>) -> Self {
        Self {
            bus,
            transmit_buffer: RingBuffer::new(0),
            receive_buffer: RingBuffer::new(0),
            tx_fifo_full: false,
            uses_txq: false,
            callbacks: Vec::new(),
            receive_overflow: 0,
            running: false,
        }
    }

    /// One pass over C1INT, `true` when a frame was received or transmitted.
    pub(crate) fn isr_core(&mut self) -> bool {
        if !self.running {
            return false;
        }

        self.bus.begin_transaction();
        let flags = InterruptFlags::from_bits_truncate(self.bus.read_word_spi(C1INT_REGISTER));
        let mut handled = false;
        if flags.contains(InterruptFlags::RXIF) {
            self.receive_interrupt_spi();
            handled = true;
        }
        if flags.contains(InterruptFlags::TXIF) {
            self.transmit_interrupt_spi();
            handled = true;
        }
        for cause in [InterruptFlags::TBCIF, InterruptFlags::MODIF, InterruptFlags::SERRIF] {
            if flags.contains(cause) {
                let (offset, value) = cause.clear_write();
                self.bus.write_byte_spi(C1INT_REGISTER + offset, value);
            }
        }
        self.bus.end_transaction();
        handled
    }

    pub(crate) fn try_send(&mut self, frame: &CanMessage) -> bool {
        let route = match frame.route() {
            Some(route) => route,
            None => {
                log::trace!(
                    "ACAN2517 - frame {} rejected, no route for tag {}",
                    frame,
                    frame.index(),
                );
                return false;
            },
        };

        self.bus.begin_transaction();
        let result = match route {
            TxRoute::Fifo => self.enter_in_transmit_buffer_spi(frame),
            TxRoute::Queue => self.send_via_txq_spi(frame),
        };
        self.bus.end_transaction();
        result
    }

    /// Oldest received frame, with the callback of the filter that accepted it.
    pub(crate) fn receive(&mut self) -> Option<(CanMessage, Option<Callback>)> {
        let frame = self.receive_buffer.remove()?;
        // room again in the receive buffer, listen to the receive FIFO
        self.bus.write_byte(c1fifocon_register(RECEIVE_FIFO_INDEX), FifoControl::TFNRFNIE.bits());
        let callback = self.callbacks
            .get(frame.index() as usize)
            .cloned()
            .flatten();
        Some((frame, callback))
    }

    fn enter_in_transmit_buffer_spi(&mut self, frame: &CanMessage) -> bool {
        if self.tx_fifo_full {
            return self.transmit_buffer.append(*frame);
        }

        self.append_in_controller_tx_fifo_spi(frame);
        let status = self.bus.read_byte_spi(c1fifosta_register(TRANSMIT_FIFO_INDEX));
        let status = FifoStatus::from_bits_retain(status);
        if !status.contains(FifoStatus::TFNRFNIF) {
            log::trace!("ACAN2517 - transmit FIFO full, buffering");
            self.bus.write_byte_spi(
                c1fifocon_register(TRANSMIT_FIFO_INDEX),
                (FifoControl::TXEN | FifoControl::TFNRFNIE).bits(),
            );
            self.tx_fifo_full = true;
        }
        true
    }

    fn append_in_controller_tx_fifo_spi(&mut self, frame: &CanMessage) {
        let offset = self.bus.read_word_spi(c1fifoua_register(TRANSMIT_FIFO_INDEX));
        let address = RAM_START.wrapping_add(offset as u16);
        self.bus.write_object_spi(address, &encode_object(frame));
        self.bus.write_byte_spi(
            c1fifocon_register(TRANSMIT_FIFO_INDEX) + 1,
            (FifoCommand::UINC | FifoCommand::TXREQ).bits(),
        );
        log::trace!("ACAN2517 - {} queued in transmit FIFO at {:#05X}", frame, address);
    }

    fn send_via_txq_spi(&mut self, frame: &CanMessage) -> bool {
        let not_full = self.uses_txq
            && FifoStatus::from_bits_retain(self.bus.read_byte_spi(C1TXQSTA_REGISTER))
                .contains(FifoStatus::TFNRFNIF);
        if not_full {
            let address = RAM_START.wrapping_add(self.bus.read_word_spi(C1TXQUA_REGISTER) as u16);
            self.bus.write_object_spi(address, &encode_object(frame));
            self.bus.write_byte_spi(
                C1TXQCON_REGISTER + 1,
                (FifoCommand::UINC | FifoCommand::TXREQ).bits(),
            );
            log::trace!("ACAN2517 - {} queued in TXQ at {:#05X}", frame, address);
        }
        not_full
    }

    fn transmit_interrupt_spi(&mut self) {
        if let Some(frame) = self.transmit_buffer.remove() {
            self.append_in_controller_tx_fifo_spi(&frame);
        }
        if self.transmit_buffer.is_empty() {
            let control = FifoControl::TXEN.bits();
            self.bus.write_byte_spi(c1fifocon_register(TRANSMIT_FIFO_INDEX), control);
            self.tx_fifo_full = false;
        }
    }

    fn receive_interrupt_spi(&mut self) {
        self.bus.read_byte_spi(c1fifosta_register(RECEIVE_FIFO_INDEX));
        let offset = self.bus.read_word_spi(c1fifoua_register(RECEIVE_FIFO_INDEX));
        let address = RAM_START.wrapping_add(offset as u16);
        let frame = decode_object(&self.bus.read_object_spi(address));
        log::trace!("ACAN2517 - {} received by filter {}", frame, frame.index());
        if !self.receive_buffer.append(frame) {
            self.receive_overflow += 1;
            log::warn!("ACAN2517 - receive buffer full, frame {} dropped", frame);
        }
        let command = FifoCommand::UINC.bits();
        self.bus.write_byte_spi(c1fifocon_register(RECEIVE_FIFO_INDEX) + 1, command);
        if self.receive_buffer.is_full() {
            // stop listening until the application makes room
            self.bus.write_byte_spi(c1fifocon_register(RECEIVE_FIFO_INDEX), 0);
        }
    }
}
