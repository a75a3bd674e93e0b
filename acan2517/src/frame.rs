use std::fmt::{Display, Formatter};
use rs_can::{Direct, Frame, Id, CAN_FRAME_MAX_SIZE, EFF_MASK, SFF_MASK};

/// Route tag of a frame handed to the transmit FIFO, buffered by the driver.
pub const TX_FIFO_ROUTE: u8 = 0;
/// Route tag of a frame handed to the TXQ, never buffered.
pub const TXQ_ROUTE: u8 = 255;

/// Hardware destination of a transmitted frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxRoute {
    Fifo,
    Queue,
}

impl TxRoute {
    /// `None` for tags that are not a transmit destination.
    #[inline]
    pub fn from_tag(tag: u8) -> Option<Self> {
        match tag {
            TX_FIFO_ROUTE => Some(Self::Fifo),
            TXQ_ROUTE => Some(Self::Queue),
            _ => None,
        }
    }

    #[inline]
    pub fn tag(self) -> u8 {
        match self {
            Self::Fifo => TX_FIFO_ROUTE,
            Self::Queue => TXQ_ROUTE,
        }
    }
}

/// CAN 2.0B frame exchanged with the MCP2517FD.
///
/// `idx` is the filter index that accepted a received frame, and the [`TxRoute`] tag of a
/// frame to transmit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CanMessage {
    pub(crate) id: u32,
    pub(crate) ext: bool,
    pub(crate) rtr: bool,
    pub(crate) len: u8,
    pub(crate) data: [u8; CAN_FRAME_MAX_SIZE],
    pub(crate) idx: u8,
    pub(crate) direct: Direct,
}

impl Frame for CanMessage {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        let length = data.len();
        if length > CAN_FRAME_MAX_SIZE {
            return None;
        }

        let id: Id = id.into();
        let mut payload = [0; CAN_FRAME_MAX_SIZE];
        payload[..length].copy_from_slice(data);
        Some(Self {
            id: id.into_bits(),
            ext: id.is_extended(),
            len: length as u8,
            data: payload,
            ..Default::default()
        })
    }

    fn new_remote(id: impl Into<Id>, len: usize) -> Option<Self> {
        if len > CAN_FRAME_MAX_SIZE {
            return None;
        }

        let id: Id = id.into();
        Some(Self {
            id: id.into_bits(),
            ext: id.is_extended(),
            rtr: true,
            len: len as u8,
            ..Default::default()
        })
    }

    #[inline]
    fn id(&self) -> Id {
        Id::from_bits(self.id, self.ext)
    }

    #[inline]
    fn is_remote(&self) -> bool {
        self.rtr
    }

    #[inline]
    fn is_extended(&self) -> bool {
        self.ext
    }

    #[inline]
    fn direct(&self) -> Direct {
        self.direct
    }

    #[inline]
    fn set_direct(&mut self, direct: Direct) -> &mut Self {
        self.direct = direct;
        self
    }

    #[inline]
    fn data(&self) -> &[u8] {
        &self.data[..self.length()]
    }

    #[inline]
    fn length(&self) -> usize {
        (self.len as usize).min(CAN_FRAME_MAX_SIZE)
    }
}

impl CanMessage {
    /// Raw identifier bits, 11 or 29 wide.
    #[inline]
    pub fn raw_id(&self) -> u32 {
        self.id & if self.ext { EFF_MASK } else { SFF_MASK }
    }

    /// Length field as stored, a received DLC of 9..=15 or a hand-set value may exceed 8.
    #[inline]
    pub fn len(&self) -> u8 {
        self.len
    }

    #[inline]
    pub fn set_len(&mut self, len: u8) -> &mut Self {
        self.len = len;
        self
    }

    /// The whole 8-byte payload buffer, including bytes past [`Frame::length`].
    #[inline]
    pub fn payload(&self) -> &[u8; CAN_FRAME_MAX_SIZE] {
        &self.data
    }

    #[inline]
    pub fn index(&self) -> u8 {
        self.idx
    }

    #[inline]
    pub fn set_index(&mut self, idx: u8) -> &mut Self {
        self.idx = idx;
        self
    }

    /// Transmit destination selected by the tag, `None` when the tag is not a route.
    #[inline]
    pub fn route(&self) -> Option<TxRoute> {
        TxRoute::from_tag(self.idx)
    }

    #[inline]
    pub fn set_route(&mut self, route: TxRoute) -> &mut Self {
        self.idx = route.tag();
        self
    }
}

impl Display for CanMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        <dyn Frame as Display>::fmt(self, f)
    }
}
