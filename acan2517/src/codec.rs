//! CAN 2.0B message objects as laid out in the controller RAM.
//!
//! | bytes  | content                                                        |
//! |--------|----------------------------------------------------------------|
//! | 0..4   | identifier word, see [`encode_identifier`]                     |
//! | 4..8   | control word, see [`ObjectHeader`]                             |
//! | 8..16  | payload                                                        |
//!
//! The receive FIFO is configured without timestamps, so received objects share the layout.

use rs_can::{CAN_FRAME_MAX_SIZE, EFF_MASK, SFF_MASK};
use crate::constants::OBJECT_SIZE;
use crate::frame::CanMessage;

/// Identifier word of an extended frame: the 11 base bits (ID28..ID18) sit in bits 0..=10
/// and the 18 extension bits (ID17..ID0) in bits 11..=28.
#[inline]
pub fn encode_identifier(id: u32, extended: bool) -> u32 {
    if extended {
        ((id >> 18) & SFF_MASK) | ((id & 0x3FFFF) << 11)
    } else {
        id & SFF_MASK
    }
}

/// Inverse of [`encode_identifier`].
#[inline]
pub fn decode_identifier(raw: u32, extended: bool) -> u32 {
    if extended {
        (((raw >> 11) & 0x3FFFF) | ((raw & SFF_MASK) << 18)) & EFF_MASK
    } else {
        raw & SFF_MASK
    }
}

/// Control word of a message object.
///
/// bits 3..=0 DLC, bit 4 IDE, bit 5 RTR, bits 15..=11 filter hit (receive only).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ObjectHeader {
    pub dlc: u8,
    pub extended: bool,
    pub remote: bool,
    pub filter_hit: u8,
}

impl ObjectHeader {
    const IDE: u32 = 1 << 4;
    const RTR: u32 = 1 << 5;
    const FILHIT_SHIFT: u32 = 11;

    #[inline]
    pub fn to_word(self) -> u32 {
        let mut word = (self.dlc & 0x0F) as u32;
        if self.extended {
            word |= Self::IDE;
        }
        if self.remote {
            word |= Self::RTR;
        }
        word | (((self.filter_hit & 0x1F) as u32) << Self::FILHIT_SHIFT)
    }

    #[inline]
    pub fn from_word(word: u32) -> Self {
        Self {
            dlc: (word & 0x0F) as u8,
            extended: word & Self::IDE != 0,
            remote: word & Self::RTR != 0,
            filter_hit: ((word >> Self::FILHIT_SHIFT) & 0x1F) as u8,
        }
    }
}

/// Message object for `frame`, the length is clamped to 8.
pub fn encode_object(frame: &CanMessage) -> [u8; OBJECT_SIZE] {
    let header = ObjectHeader {
        dlc: frame.len.min(CAN_FRAME_MAX_SIZE as u8),
        extended: frame.ext,
        remote: frame.rtr,
        filter_hit: 0,
    };

    let mut object = [0; OBJECT_SIZE];
    object[0..4].copy_from_slice(&encode_identifier(frame.id, frame.ext).to_le_bytes());
    object[4..8].copy_from_slice(&header.to_word().to_le_bytes());
    object[8..].copy_from_slice(&frame.data);
    object
}

/// Frame held by a received object, `idx` set to the filter hit.
///
/// The DLC is kept as received in [`CanMessage::len`], a DLC of 9..=15 still carries 8
/// payload bytes through `length()` and `data()`.
pub fn decode_object(object: &[u8; OBJECT_SIZE]) -> CanMessage {
    let raw = u32::from_le_bytes([object[0], object[1], object[2], object[3]]);
    let control = u32::from_le_bytes([object[4], object[5], object[6], object[7]]);
    let header = ObjectHeader::from_word(control);
    if header.dlc as usize > CAN_FRAME_MAX_SIZE {
        log::trace!(
            "ACAN2517 - received DLC {}, payload limited to {} bytes",
            header.dlc,
            CAN_FRAME_MAX_SIZE,
        );
    }

    let mut data = [0; CAN_FRAME_MAX_SIZE];
    data.copy_from_slice(&object[8..]);
    CanMessage {
        id: decode_identifier(raw, header.extended),
        ext: header.extended,
        rtr: header.remote,
        len: header.dlc,
        data,
        idx: header.filter_hit,
        direct: rs_can::Direct::Receive,
    }
}
