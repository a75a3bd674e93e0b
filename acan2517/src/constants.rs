//! MCP2517FD register map (DS20005688B) and driver constants.

pub const C1CON_REGISTER: u16 = 0x000;
pub const C1NBTCFG_REGISTER: u16 = 0x004;
pub const C1INT_REGISTER: u16 = 0x01C;
pub const C1TREC_REGISTER: u16 = 0x034;
pub const C1BDIAG0_REGISTER: u16 = 0x038;

pub const C1TXQCON_REGISTER: u16 = 0x050;
pub const C1TXQSTA_REGISTER: u16 = 0x054;
pub const C1TXQUA_REGISTER: u16 = 0x058;

pub const OSC_REGISTER: u16 = 0xE00;
pub const IOCON_REGISTER: u16 = 0xE04;

/// FIFO control register, `index` in 1..=31.
#[inline]
pub const fn c1fifocon_register(index: u16) -> u16 {
    0x05C + 12 * (index - 1)
}

/// FIFO status register, `index` in 1..=31.
#[inline]
pub const fn c1fifosta_register(index: u16) -> u16 {
    0x060 + 12 * (index - 1)
}

/// FIFO user address register, `index` in 1..=31.
#[inline]
pub const fn c1fifoua_register(index: u16) -> u16 {
    0x064 + 12 * (index - 1)
}

/// Filter control byte, `index` in 0..=31.
#[inline]
pub const fn c1fltcon_register(index: u16) -> u16 {
    0x1D0 + index
}

/// Filter object register, `index` in 0..=31.
#[inline]
pub const fn c1fltobj_register(index: u16) -> u16 {
    0x1F0 + 8 * index
}

/// Filter mask register, `index` in 0..=31.
#[inline]
pub const fn c1mask_register(index: u16) -> u16 {
    0x1F4 + 8 * index
}

/// First byte of the message RAM, user address registers are relative to it.
pub const RAM_START: u16 = 0x400;
/// Size of the message RAM in bytes.
pub const RAM_SIZE: u16 = 2048;
pub const RAM_END: u16 = RAM_START + RAM_SIZE;

/// Size of a CAN 2.0B message object in RAM: 8 bytes header, 8 bytes payload.
pub const OBJECT_SIZE: usize = 16;

pub const RECEIVE_FIFO_INDEX: u16 = 1;
pub const TRANSMIT_FIFO_INDEX: u16 = 2;

/// Capacity limit shared by the TXQ, every FIFO and the filter bank.
pub const MAX_FIFO_SIZE: u8 = 32;
pub const MAX_PRIORITY: u8 = 31;
pub const MAX_FILTERS: usize = 32;

/// SPI clock used for reset and the first connectivity check.
pub const RESET_SPI_CLOCK: u32 = 1_000_000;

/// Default deadline for mode changes and PLL lock, in milliseconds.
pub const DEFAULT_TIMEOUT_MS: u64 = 2;

/// Pin value meaning no interrupt line is wired, the driver is then polled.
pub const NO_INT_PIN: u8 = 255;

/// Maximum pending wake-ups queued for the deferred worker.
pub const WORKER_SEMAPHORE_MAX: usize = 10;
