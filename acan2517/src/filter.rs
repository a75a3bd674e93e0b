//! Receive filters, installed in order: the position of an entry is its filter index.
//!
//! C1FLTOBJm and C1MASKm share one layout: SID bits 0..=10, EID bits 11..=28, bit 30 is
//! EXIDE in the filter and MIDE in the mask.

use std::{fmt::{Debug, Formatter}, sync::Arc};
use rs_can::{EFF_MASK, SFF_MASK};
use crate::codec::encode_identifier;
use crate::frame::CanMessage;

/// Called by [`crate::Acan2517::dispatch`] with a frame accepted by the filter.
pub type Callback = Arc<dyn Fn(&CanMessage) + Send + Sync>;

const EXIDE: u32 = 1 << 30;
const MIDE: u32 = 1 << 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameFormat {
    Standard,
    Extended,
}

/// Outcome of the builder calls, only the first problem is kept.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum FilterStatus {
    #[default]
    Ok,
    StandardIdentifierTooLarge,
    ExtendedIdentifierTooLarge,
    StandardMaskTooLarge,
    ExtendedMaskTooLarge,
    StandardAcceptanceTooLarge,
    ExtendedAcceptanceTooLarge,
    InconsistencyBetweenMaskAndAcceptance,
}

#[derive(Clone)]
pub struct FilterEntry {
    pub(crate) mask: u32,
    pub(crate) acceptance: u32,
    pub(crate) callback: Option<Callback>,
}

impl FilterEntry {
    /// C1MASKm value.
    #[inline]
    pub fn mask(&self) -> u32 {
        self.mask
    }

    /// C1FLTOBJm value.
    #[inline]
    pub fn acceptance(&self) -> u32 {
        self.acceptance
    }

    #[inline]
    pub fn callback(&self) -> Option<&Callback> {
        self.callback.as_ref()
    }
}

impl Debug for FilterEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterEntry")
            .field("mask", &format_args!("{:#010X}", self.mask))
            .field("acceptance", &format_args!("{:#010X}", self.acceptance))
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Filters {
    entries: Vec<FilterEntry>,
    status: FilterStatus,
}

impl Filters {
    pub fn new() -> Self {
        Default::default()
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn status(&self) -> FilterStatus {
        self.status
    }

    #[inline]
    pub fn entries(&self) -> &[FilterEntry] {
        &self.entries
    }

    /// Accepts every frame, standard and extended.
    pub fn append_pass_all(&mut self, callback: Option<Callback>) -> &mut Self {
        self.append_raw(0, 0, callback)
    }

    /// Accepts every frame of `format`.
    pub fn append_format_filter(
        &mut self,
        format: FrameFormat,
        callback: Option<Callback>,
    ) -> &mut Self {
        let acceptance = match format {
            FrameFormat::Standard => 0,
            FrameFormat::Extended => EXIDE,
        };
        self.append_raw(MIDE, acceptance, callback)
    }

    /// Accepts the frames of `format` carrying exactly `identifier`.
    pub fn append_frame_filter(
        &mut self,
        format: FrameFormat,
        identifier: u32,
        callback: Option<Callback>,
    ) -> &mut Self {
        let (limit, status) = match format {
            FrameFormat::Standard => (SFF_MASK, FilterStatus::StandardIdentifierTooLarge),
            FrameFormat::Extended => (EFF_MASK, FilterStatus::ExtendedIdentifierTooLarge),
        };
        if identifier > limit {
            self.record(status);
        }

        self.append_matching(format, limit, identifier & limit, callback)
    }

    /// Accepts the frames of `format` whose identifier equals `acceptance` on the bits set
    /// in `mask`.
    pub fn append_filter(
        &mut self,
        format: FrameFormat,
        mask: u32,
        acceptance: u32,
        callback: Option<Callback>,
    ) -> &mut Self {
        let (limit, mask_status, acceptance_status) = match format {
            FrameFormat::Standard => (
                SFF_MASK,
                FilterStatus::StandardMaskTooLarge,
                FilterStatus::StandardAcceptanceTooLarge,
            ),
            FrameFormat::Extended => (
                EFF_MASK,
                FilterStatus::ExtendedMaskTooLarge,
                FilterStatus::ExtendedAcceptanceTooLarge,
            ),
        };
        if mask > limit {
            self.record(mask_status);
        }
        if acceptance > limit {
            self.record(acceptance_status);
        }
        if acceptance & !mask & limit != 0 {
            self.record(FilterStatus::InconsistencyBetweenMaskAndAcceptance);
        }

        self.append_matching(format, mask & limit, acceptance & limit, callback)
    }

    /// Appends register values as they are.
    pub fn append_raw(
        &mut self,
        mask: u32,
        acceptance: u32,
        callback: Option<Callback>,
    ) -> &mut Self {
        self.entries.push(FilterEntry { mask, acceptance, callback });
        self
    }

    fn append_matching(
        &mut self,
        format: FrameFormat,
        mask: u32,
        acceptance: u32,
        callback: Option<Callback>,
    ) -> &mut Self {
        let extended = format == FrameFormat::Extended;
        let ide = if extended { EXIDE } else { 0 };
        self.append_raw(
            encode_identifier(mask, extended) | MIDE,
            encode_identifier(acceptance, extended) | ide,
            callback,
        )
    }

    #[inline]
    fn record(&mut self, status: FilterStatus) {
        if self.status == FilterStatus::Ok {
            log::warn!("ACAN2517 - filter {} rejected: {:?}", self.entries.len(), status);
            self.status = status;
        }
    }
}
