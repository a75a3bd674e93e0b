//! **`acan2517`**, driver of the Microchip MCP2517FD CAN controller used in CAN 2.0B mode.
//!
//! The controller sits on an SPI bus; the platform provides the bus, the interrupt pin and a
//! millisecond clock through the traits of [`hal`]. Frames are exchanged as [`CanMessage`]s
//! through bounded driver buffers, the interrupt line (or [`Acan2517::poll`]) moves them
//! between those buffers and the controller FIFOs.
//!
//! ```ignore
//! let driver = Acan2517::new(spi, NO_INT_PIN, NoGpio);
//! driver.initialize_pass_all(&Settings::default(), None).into_result()?;
//! driver.try_send(&CanMessage::new(0x123u32, &[0xDE, 0xAD]).unwrap());
//! driver.poll();
//! ```

pub mod backend;
pub mod bus;
pub mod codec;
pub mod constants;
mod driver;
pub use driver::*;
mod error;
pub use error::*;
pub mod filter;
mod frame;
pub use frame::*;
pub mod hal;
pub mod queue;
pub mod regs;
pub mod settings;
pub mod wire;

#[cfg(feature = "embedded-hal")]
mod embedded;
#[cfg(feature = "embedded-hal")]
pub use embedded::*;

pub use filter::{Callback, FilterStatus, Filters, FrameFormat};
pub use hal::{Clock, Gpio, IsrHandler, NoGpio, SpiBus, SpiSettings, SystemClock, Trigger};
pub use rs_can::{CanDriver, CanError, Frame, Id};
pub use settings::{BitTiming, ClkoPin, Oscillator, RequestedMode, RetransmissionAttempts, Settings};
