use std::fmt::{Display, Formatter};
use bitflags::bitflags;
use crate::constants::{EFF_MASK, SFF_MASK};

bitflags! {
    /// Flags carried in the upper bits of an all-in-one 32-bit identifier.
    ///
    /// The values follow the Linux SocketCAN `can_id` layout so an [`Id`] can be built from,
    /// or flattened into, a single `u32`.
    #[repr(transparent)]
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct IdentifierFlags: u32 {
        /// The frame is using the extended format i.e. 29-bit extended identifiers.
        const EXTENDED = 0x8000_0000;
        /// The frame is a remote transmission request.
        const REMOTE = 0x4000_0000;
    }
}

/// CAN 2.0 identifier, 11-bit standard or 29-bit extended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Id {
    Standard(u16),
    Extended(u32),
}

impl From<u32> for Id {
    /// Decodes an all-in-one identifier; without the [`IdentifierFlags::EXTENDED`] flag values
    /// above 11 bits are still promoted to extended.
    fn from(id: u32) -> Self {
        if id & IdentifierFlags::EXTENDED.bits() != 0 || id & EFF_MASK > SFF_MASK {
            Self::Extended(id & EFF_MASK)
        } else {
            Self::Standard(id as u16)
        }
    }
}

impl From<Id> for u32 {
    #[inline]
    fn from(id: Id) -> Self {
        id.into_bits()
    }
}

impl Id {
    /// Standard identifier, `None` above 0x7FF.
    #[inline]
    pub fn new_standard(id: u16) -> Option<Self> {
        match id as u32 {
            0..=SFF_MASK => Some(Self::Standard(id)),
            _ => None,
        }
    }

    /// Extended identifier, `None` above 0x1FFFFFFF.
    #[inline]
    pub fn new_extended(id: u32) -> Option<Self> {
        match id {
            0..=EFF_MASK => Some(Self::Extended(id)),
            _ => None,
        }
    }

    /// Builds an identifier from raw bits, masking to the width selected by `extended`.
    #[inline]
    pub fn from_bits(bits: u32, extended: bool) -> Self {
        if extended {
            Self::Extended(bits & EFF_MASK)
        } else {
            Self::Standard((bits & SFF_MASK) as u16)
        }
    }

    #[inline]
    pub fn into_bits(self) -> u32 {
        match self {
            Self::Standard(id) => id as u32,
            Self::Extended(id) => id,
        }
    }

    #[inline]
    pub fn from_hex(hex_str: &str, extended: bool) -> Option<Self> {
        let bits = u32::from_str_radix(hex_str, 16).ok()?;
        match extended {
            true => Self::new_extended(bits),
            false => Self::new_standard(u16::try_from(bits).ok()?),
        }
    }

    #[inline]
    pub fn into_hex(self) -> String {
        format!("{:08X}", self.into_bits())
    }

    /// All-in-one representation with [`IdentifierFlags::EXTENDED`] set for extended ids.
    #[inline]
    pub fn as_flagged(self) -> u32 {
        match self {
            Self::Standard(id) => id as u32,
            Self::Extended(id) => id | IdentifierFlags::EXTENDED.bits(),
        }
    }

    /// Returns the Base ID part of this extended identifier.
    #[inline]
    pub fn standard_id(self) -> Self {
        match self {
            Self::Standard(_) => self,
            Self::Extended(v) => Self::Standard((v >> 18) as u16),     // ID-28 to ID-18
        }
    }

    #[inline]
    pub fn is_extended(&self) -> bool {
        matches!(self, Self::Extended(_))
    }
}

impl Display for Id {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Standard(id) => write!(f, "{:03X}", id),
            Self::Extended(id) => write!(f, "{:08X}x", id),
        }
    }
}
