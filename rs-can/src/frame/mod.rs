mod identifier;
pub use identifier::*;

use std::fmt::{Display, Formatter, Write};
use crate::utils::can_dlc;

#[repr(C)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Direct {
    #[default]
    Transmit,
    Receive,
}

impl Display for Direct {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Transmit => f.write_str("Tx"),
            Self::Receive => f.write_str("Rx"),
        }
    }
}

/// Classic CAN 2.0 frame.
pub trait Frame: Send + Sync {
    /// `None` when `data` does not fit a CAN 2.0 frame.
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self>
    where
        Self: Sized;

    fn new_remote(id: impl Into<Id>, len: usize) -> Option<Self>
    where
        Self: Sized;

    fn id(&self) -> Id;

    fn is_remote(&self) -> bool;

    fn is_extended(&self) -> bool {
        self.id().is_extended()
    }

    fn direct(&self) -> Direct;

    fn set_direct(&mut self, direct: Direct) -> &mut Self
    where
        Self: Sized;

    /// ensure return the actual length of data.
    fn data(&self) -> &[u8];

    fn dlc(&self) -> Option<u8> {
        can_dlc(self.length())
    }

    fn length(&self) -> usize;
}

impl Display for dyn Frame {
    /// Output Frame as `asc` String.
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let data_str = if self.is_remote() {
            " ".to_owned()
        } else {
            self.data()
                .iter()
                .fold(String::new(), |mut out, &b| {
                    let _ = write!(out, "{b:02x} ");
                    out
                })
        };

        write!(f, "{}{: <4} {} {} {} {}",
               format!("{: >8x}", self.id().into_bits()),
               if self.is_extended() { "x" } else { "" },
               self.direct(),
               if self.is_remote() { "r" } else { "d" },
               format!("{: >2}", self.length()),
               data_str,
        )
    }
}
