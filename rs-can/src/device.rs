use crate::frame::Frame;

/// Non-blocking CAN driver.
///
/// Every call returns immediately; a full transmit path or an empty receive path is a plain
/// status, not an error.
pub trait CanDriver {
    type Frame: Frame;
    /// Hands `frame` to the driver, `false` when there is no room for it.
    fn try_transmit(&self, frame: &Self::Frame) -> bool;
    /// Whether a received frame is waiting.
    fn available(&self) -> bool;
    /// Takes the oldest received frame.
    fn try_receive(&self) -> Option<Self::Frame>;
}
