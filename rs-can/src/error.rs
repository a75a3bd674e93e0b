#[derive(thiserror::Error, Debug, Clone, Eq, PartialEq)]
pub enum CanError {
    #[error("RUST-CAN - device configuration error: {0}")]
    DeviceConfigError(String),

    #[error("RUST-CAN - other error: {0}")]
    OtherError(String),
}

impl CanError {
    #[inline]
    pub fn other_error<T: Into<String>>(msg: T) -> Self {
        Self::OtherError(msg.into())
    }

    #[inline]
    pub fn config_error<T: Into<String>>(msg: T) -> Self {
        Self::DeviceConfigError(msg.into())
    }
}
