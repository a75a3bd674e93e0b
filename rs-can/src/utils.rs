use crate::constants::CAN_FRAME_MAX_SIZE;

/// get classic CAN dlc, `None` when the length does not fit a CAN 2.0 frame.
#[inline]
pub fn can_dlc(length: usize) -> Option<u8> {
    match length {
        ..=CAN_FRAME_MAX_SIZE => Some(length as u8),
        _ => None,
    }
}
