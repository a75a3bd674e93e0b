use std::fmt::{Display, Formatter};
use bitflags::bitflags;
use rs_can::CanError;

bitflags! {
    /// Problems found by [`crate::Acan2517::initialize`], an empty set means success.
    ///
    /// Every check runs, so several flags can be reported at once.
    #[repr(transparent)]
    #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ErrorCode: u32 {
        const TOO_FAR_FROM_DESIRED_BIT_RATE = 1 << 0;
        const INCONSISTENT_BIT_RATE_SETTINGS = 1 << 1;
        const INT_PIN_IS_NOT_AN_INTERRUPT = 1 << 2;
        const ISR_IS_NULL = 1 << 3;
        const REQUESTED_MODE_TIMEOUT = 1 << 4;
        const MORE_THAN_32_FILTERS = 1 << 5;
        const CONTROLLER_RECEIVE_FIFO_SIZE_IS_ZERO = 1 << 6;
        const CONTROLLER_RECEIVE_FIFO_SIZE_GREATER_THAN_32 = 1 << 7;
        const CONTROLLER_TRANSMIT_FIFO_SIZE_IS_ZERO = 1 << 8;
        const CONTROLLER_TRANSMIT_FIFO_SIZE_GREATER_THAN_32 = 1 << 9;
        const CONTROLLER_RAM_USAGE_GREATER_THAN_2048 = 1 << 10;
        const CONTROLLER_TXQ_PRIORITY_GREATER_THAN_31 = 1 << 11;
        const CONTROLLER_TRANSMIT_FIFO_PRIORITY_GREATER_THAN_31 = 1 << 12;
        const CONTROLLER_TXQ_SIZE_GREATER_THAN_32 = 1 << 13;
        const REQUESTED_CONFIGURATION_MODE_TIMEOUT = 1 << 14;
        const X10_PLL_NOT_READY = 1 << 15;
        const READ_BACK_ERROR_WITH_FULL_SPEED_SPI_CLOCK = 1 << 16;
        const READ_BACK_ERROR_WITH_1MHZ_SPI_CLOCK = 1 << 17;
        const ISR_NOT_NULL_AND_NO_INT_PIN = 1 << 18;
        const FILTER_DEFINITION_ERROR = 1 << 19;
    }
}

impl ErrorCode {
    /// `Err` carrying the flag names when any flag is set.
    pub fn into_result(self) -> Result<(), CanError> {
        match self.is_empty() {
            true => Ok(()),
            false => Err(CanError::config_error(self.to_string())),
        }
    }
}

impl Display for ErrorCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return f.write_str("no error");
        }

        let names = self.iter_names()
            .map(|(name, _)| name)
            .collect::<Vec<_>>();
        f.write_str(&names.join(" | "))
    }
}
