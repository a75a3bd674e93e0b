//! Register fields touched by the driver, with their bit positions (DS20005688B).
//!
//! Multi-byte registers are mostly accessed one byte at a time, so most of the types below
//! describe a single byte of a register and say which one.

use bitflags::bitflags;
use rs_can::CanError;

bitflags! {
    /// C1INT bits 0..=15, the interrupt causes.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptFlags: u32 {
        /// Transmit FIFO interrupt.
        const TXIF = 1 << 0;
        /// Receive FIFO interrupt.
        const RXIF = 1 << 1;
        /// Time base counter overflow.
        const TBCIF = 1 << 2;
        /// Operation mode changed.
        const MODIF = 1 << 3;
        const TEFIF = 1 << 4;
        const ECCIF = 1 << 8;
        const SPICRCIF = 1 << 9;
        const TXATIF = 1 << 10;
        const RXOVIF = 1 << 11;
        /// System error.
        const SERRIF = 1 << 12;
        const CERRIF = 1 << 13;
        const WAKIF = 1 << 14;
        const IVMIF = 1 << 15;
    }
}

impl InterruptFlags {
    /// Byte offset in C1INT and the value written back there to clear a single cause.
    #[inline]
    pub fn clear_write(self) -> (u16, u8) {
        let bit = self.bits().trailing_zeros();
        ((bit / 8) as u16, 1 << (bit % 8))
    }
}

bitflags! {
    /// C1INT byte 2, enables for the causes of byte 0.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct InterruptEnables: u8 {
        const TXIE = 1 << 0;
        const RXIE = 1 << 1;
        const TBCIE = 1 << 2;
        const MODIE = 1 << 3;
        const TEFIE = 1 << 4;
    }
}

bitflags! {
    /// Byte 0 of C1FIFOCONm and C1TXQCON.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoControl: u8 {
        /// Transmit FIFO not full / receive FIFO not empty interrupt enable.
        const TFNRFNIE = 1 << 0;
        const TFHRFHIE = 1 << 1;
        const TFERFFIE = 1 << 2;
        const RXOVIE = 1 << 3;
        const TXATIE = 1 << 4;
        const RXTSEN = 1 << 5;
        const RTREN = 1 << 6;
        /// FIFO is a transmit FIFO.
        const TXEN = 1 << 7;
    }
}

bitflags! {
    /// Byte 1 of C1FIFOCONm and C1TXQCON.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoCommand: u8 {
        /// Increment the head (transmit) or tail (receive) of the FIFO.
        const UINC = 1 << 0;
        const TXREQ = 1 << 1;
        const FRESET = 1 << 2;
    }
}

bitflags! {
    /// Byte 0 of C1FIFOSTAm and C1TXQSTA.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct FifoStatus: u8 {
        /// Transmit FIFO not full / receive FIFO not empty.
        const TFNRFNIF = 1 << 0;
        const TFHRFHIF = 1 << 1;
        const TFERFFIF = 1 << 2;
        const RXOVIF = 1 << 3;
        const TXATIF = 1 << 4;
        const TXERR = 1 << 5;
        const TXLARB = 1 << 6;
        const TXABT = 1 << 7;
    }
}

/// Byte 2 of C1FIFOCONm and C1TXQCON: bits 6..=5 retransmission attempts, bits 4..=0 priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxPriority {
    pub priority: u8,
    pub attempts: u8,
}

impl TxPriority {
    #[inline]
    pub fn to_byte(self) -> u8 {
        ((self.attempts & 0x03) << 5) | (self.priority & 0x1F)
    }
}

/// Byte 3 of C1FIFOCONm and C1TXQCON: bits 7..=5 payload size (0 is 8 bytes), bits 4..=0
/// FIFO depth minus one.
#[inline]
pub fn fifo_size_byte(size: u8) -> u8 {
    size.saturating_sub(1) & 0x1F
}

/// C1NBTCFG, every field stored minus one: BRP bits 31..=24, TSEG1 23..=16, TSEG2 14..=8,
/// SJW 6..=0.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NominalBitTiming {
    pub prescaler: u16,
    pub phase_segment1: u16,
    pub phase_segment2: u8,
    pub sjw: u8,
}

impl NominalBitTiming {
    pub fn to_word(self) -> u32 {
        let brp = (self.prescaler.wrapping_sub(1) & 0xFF) as u32;
        let tseg1 = (self.phase_segment1.wrapping_sub(1) & 0xFF) as u32;
        let tseg2 = (self.phase_segment2.wrapping_sub(1) & 0x7F) as u32;
        let sjw = (self.sjw.wrapping_sub(1) & 0x7F) as u32;
        (brp << 24) | (tseg1 << 16) | (tseg2 << 8) | sjw
    }

    pub fn from_word(word: u32) -> Self {
        Self {
            prescaler: ((word >> 24) & 0xFF) as u16 + 1,
            phase_segment1: ((word >> 16) & 0xFF) as u16 + 1,
            phase_segment2: ((word >> 8) & 0x7F) as u8 + 1,
            sjw: (word & 0x7F) as u8 + 1,
        }
    }
}

/// C1CON REQOP / OPMOD values.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum OperationMode {
    NormalFd = 0,
    Sleep = 1,
    InternalLoopback = 2,
    ListenOnly = 3,
    Configuration = 4,
    ExternalLoopback = 5,
    #[default]
    Normal20B = 6,
    Restricted = 7,
}

impl TryFrom<u8> for OperationMode {
    type Error = CanError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::NormalFd),
            1 => Ok(Self::Sleep),
            2 => Ok(Self::InternalLoopback),
            3 => Ok(Self::ListenOnly),
            4 => Ok(Self::Configuration),
            5 => Ok(Self::ExternalLoopback),
            6 => Ok(Self::Normal20B),
            7 => Ok(Self::Restricted),
            _ => Err(CanError::other_error("operation mode not supported")),
        }
    }
}

/// C1CON byte 3: bit 3 aborts all pending transmissions, bits 2..=0 request a mode.
#[inline]
pub fn mode_request_byte(mode: OperationMode, abort_all: bool) -> u8 {
    (mode as u8 & 0x07) | if abort_all { 1 << 3 } else { 0 }
}

/// OPMOD field from C1CON byte 2, bits 7..=5.
#[inline]
pub fn current_mode_bits(byte2: u8) -> u8 {
    (byte2 >> 5) & 0x07
}

bitflags! {
    /// C1CON byte 2.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct CanControl2: u8 {
        const RTXAT = 1 << 0;
        const ESIGM = 1 << 1;
        const SERR2LOM = 1 << 2;
        const STEF = 1 << 3;
        /// Enable the TXQ and reserve its RAM.
        const TXQEN = 1 << 4;
    }
}

/// OSC byte 0: bit 0 10x PLL, bit 4 system clock divided by 2, bits 6..=5 CLKO divisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OscillatorControl {
    pub pll: bool,
    pub sclk_divide_by_2: bool,
    /// `None` leaves the CLKO divisor at zero, the pin then outputs start-of-frame.
    pub clko_divisor: Option<u8>,
}

impl OscillatorControl {
    pub fn to_byte(self) -> u8 {
        let mut byte = 0;
        if self.pll {
            byte |= 1 << 0;
        }
        if self.sclk_divide_by_2 {
            byte |= 1 << 4;
        }
        if let Some(divisor) = self.clko_divisor {
            byte |= (divisor & 0x03) << 5;
        }
        byte
    }
}

bitflags! {
    /// OSC byte 1, read only status.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OscillatorStatus: u8 {
        const PLLRDY = 1 << 0;
        /// Set once the clock selected by byte 0, PLL included, is running.
        const OSCRDY = 1 << 2;
        const SCLKRDY = 1 << 4;
    }
}

bitflags! {
    /// IOCON byte 3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IoControl3: u8 {
        const PM0 = 1 << 0;
        const PM1 = 1 << 1;
        const TXCANOD = 1 << 4;
        /// CLKO pin outputs start-of-frame.
        const SOF = 1 << 5;
        const INTOD = 1 << 6;
    }
}

/// C1FLTCONm byte: bit 7 enables the filter, bits 4..=0 pick the destination FIFO.
#[inline]
pub fn filter_control_byte(fifo: u16) -> u8 {
    (1 << 7) | (fifo as u8 & 0x1F)
}

bitflags! {
    /// C1TREC bits 16..=21.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct ErrorState: u8 {
        const EWARN = 1 << 0;
        const RXWARN = 1 << 1;
        const TXWARN = 1 << 2;
        const RXBP = 1 << 3;
        const TXBP = 1 << 4;
        const TXBO = 1 << 5;
    }
}

/// C1TREC decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ErrorCounters {
    pub receive: u8,
    pub transmit: u8,
    pub state: ErrorState,
}

impl ErrorCounters {
    pub fn from_word(word: u32) -> Self {
        Self {
            receive: word as u8,
            transmit: (word >> 8) as u8,
            state: ErrorState::from_bits_truncate((word >> 16) as u8),
        }
    }

    #[inline]
    pub fn is_bus_off(&self) -> bool {
        self.state.contains(ErrorState::TXBO)
    }
}
