//! **`rs-can`**, device independent CAN 2.0 vocabulary shared by the controller drivers.
//!
//! Identifiers, the classic [`Frame`] trait, the non-blocking [`CanDriver`] trait and
//! the [`CanError`] type live here so every driver speaks the same language.

mod constants;
pub use constants::*;
mod device;
pub use device::*;
mod error;
pub use error::*;
mod frame;
pub use frame::*;

pub mod utils;
