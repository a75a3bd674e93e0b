//! SPI instruction framing.
//!
//! Every instruction starts with a 16-bit command word sent MSB first: opcode in the upper
//! four bits, register or RAM address in the lower twelve. Payload words follow in little
//! endian byte order.

use crate::constants::OBJECT_SIZE;

#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Reset = 0b0000,
    Write = 0b0010,
    Read = 0b0011,
}

pub const ADDRESS_MASK: u16 = 0x0FFF;
pub const COMMAND_SIZE: usize = 2;

/// Command word bytes for `opcode` at `address`.
#[inline]
pub fn command(opcode: Opcode, address: u16) -> [u8; COMMAND_SIZE] {
    ((address & ADDRESS_MASK) | ((opcode as u16) << 12)).to_be_bytes()
}

/// Splits a command word back into opcode bits and address.
#[inline]
pub fn parse_command(bytes: [u8; COMMAND_SIZE]) -> (u8, u16) {
    let word = u16::from_be_bytes(bytes);
    ((word >> 12) as u8, word & ADDRESS_MASK)
}

/// The reset instruction is an all-zero command word.
#[inline]
pub fn reset_frame() -> [u8; COMMAND_SIZE] {
    command(Opcode::Reset, 0)
}

#[inline]
pub fn write_byte_frame(address: u16, value: u8) -> [u8; 3] {
    let [c0, c1] = command(Opcode::Write, address);
    [c0, c1, value]
}

/// Read command followed by one dummy byte clocking the value in.
#[inline]
pub fn read_byte_frame(address: u16) -> [u8; 3] {
    let [c0, c1] = command(Opcode::Read, address);
    [c0, c1, 0]
}

#[inline]
pub fn write_word_frame(address: u16, value: u32) -> [u8; 6] {
    let mut buffer = [0; 6];
    buffer[..COMMAND_SIZE].copy_from_slice(&command(Opcode::Write, address));
    buffer[COMMAND_SIZE..].copy_from_slice(&value.to_le_bytes());
    buffer
}

#[inline]
pub fn read_word_frame(address: u16) -> [u8; 6] {
    let mut buffer = [0; 6];
    buffer[..COMMAND_SIZE].copy_from_slice(&command(Opcode::Read, address));
    buffer
}

/// Word clocked in after a [`read_word_frame`] exchange.
#[inline]
pub fn word_from_frame(buffer: &[u8; 6]) -> u32 {
    u32::from_le_bytes([buffer[2], buffer[3], buffer[4], buffer[5]])
}

/// Whole message object in one exchange: command, header and payload.
#[inline]
pub fn write_object_frame(
    address: u16,
    object: &[u8; OBJECT_SIZE],
) -> [u8; COMMAND_SIZE + OBJECT_SIZE] {
    let mut buffer = [0; COMMAND_SIZE + OBJECT_SIZE];
    buffer[..COMMAND_SIZE].copy_from_slice(&command(Opcode::Write, address));
    buffer[COMMAND_SIZE..].copy_from_slice(object);
    buffer
}

#[inline]
pub fn read_object_frame(address: u16) -> [u8; COMMAND_SIZE + OBJECT_SIZE] {
    let mut buffer = [0; COMMAND_SIZE + OBJECT_SIZE];
    buffer[..COMMAND_SIZE].copy_from_slice(&command(Opcode::Read, address));
    buffer
}

#[inline]
pub fn object_from_frame(buffer: &[u8; COMMAND_SIZE + OBJECT_SIZE]) -> [u8; OBJECT_SIZE] {
    let mut object = [0; OBJECT_SIZE];
    object.copy_from_slice(&buffer[COMMAND_SIZE..]);
    object
}
