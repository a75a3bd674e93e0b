use std::{fs::read_to_string, path::Path};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use rs_can::CanError;
use crate::constants::{DEFAULT_TIMEOUT_MS, OBJECT_SIZE};
use crate::regs::{NominalBitTiming, OperationMode, OscillatorControl};

/// Oscillator wired to OSC1/OSC2 and how the system clock is derived from it.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Oscillator {
    #[serde(rename = "osc_4mhz")]
    Osc4MHz,
    #[serde(rename = "osc_4mhz_divided_by_2")]
    Osc4MHzDividedBy2,
    #[serde(rename = "osc_4mhz_10x_pll")]
    Osc4MHz10xPll,
    #[serde(rename = "osc_4mhz_10x_pll_divided_by_2")]
    Osc4MHz10xPllDividedBy2,
    #[serde(rename = "osc_20mhz")]
    Osc20MHz,
    #[serde(rename = "osc_20mhz_divided_by_2")]
    Osc20MHzDividedBy2,
    #[default]
    #[serde(rename = "osc_40mhz")]
    Osc40MHz,
    #[serde(rename = "osc_40mhz_divided_by_2")]
    Osc40MHzDividedBy2,
}

impl Oscillator {
    /// System clock in Hz.
    pub fn sys_clock(self) -> u32 {
        match self {
            Self::Osc4MHz => 4_000_000,
            Self::Osc4MHzDividedBy2 => 2_000_000,
            Self::Osc4MHz10xPll => 40_000_000,
            Self::Osc4MHz10xPllDividedBy2 => 20_000_000,
            Self::Osc20MHz => 20_000_000,
            Self::Osc20MHzDividedBy2 => 10_000_000,
            Self::Osc40MHz => 40_000_000,
            Self::Osc40MHzDividedBy2 => 20_000_000,
        }
    }

    #[inline]
    pub fn uses_pll(self) -> bool {
        matches!(self, Self::Osc4MHz10xPll | Self::Osc4MHz10xPllDividedBy2)
    }

    #[inline]
    pub fn divides_by_2(self) -> bool {
        matches!(
            self,
            Self::Osc4MHzDividedBy2
                | Self::Osc4MHz10xPllDividedBy2
                | Self::Osc20MHzDividedBy2
                | Self::Osc40MHzDividedBy2
        )
    }
}

/// Function of the CLKO/SOF pin.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClkoPin {
    #[serde(rename = "divided_by_1")]
    DividedBy1 = 0,
    #[serde(rename = "divided_by_2")]
    DividedBy2 = 1,
    #[serde(rename = "divided_by_4")]
    DividedBy4 = 2,
    #[default]
    #[serde(rename = "divided_by_10")]
    DividedBy10 = 3,
    StartOfFrame = 4,
}

impl ClkoPin {
    /// CLKO divisor field, `None` when the pin outputs start-of-frame.
    #[inline]
    pub fn divisor_bits(self) -> Option<u8> {
        match self {
            Self::StartOfFrame => None,
            divisor => Some(divisor as u8),
        }
    }
}

/// Modes the controller can be left in after initialization.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedMode {
    #[default]
    #[serde(rename = "normal_20b")]
    Normal20B,
    ListenOnly,
    InternalLoopback,
    ExternalLoopback,
}

impl From<RequestedMode> for OperationMode {
    fn from(mode: RequestedMode) -> Self {
        match mode {
            RequestedMode::Normal20B => Self::Normal20B,
            RequestedMode::ListenOnly => Self::ListenOnly,
            RequestedMode::InternalLoopback => Self::InternalLoopback,
            RequestedMode::ExternalLoopback => Self::ExternalLoopback,
        }
    }
}

/// Retransmission attempts of a transmit FIFO or the TXQ.
#[repr(u8)]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetransmissionAttempts {
    Disabled = 0,
    Three = 1,
    #[default]
    Unlimited = 3,
}

/// Nominal bit timing, every field 1-based, in time quanta except the prescaler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Getters)]
pub struct BitTiming {
    #[getter(copy)]
    prescaler: u16,
    #[getter(copy)]
    phase_segment1: u16,
    #[getter(copy)]
    phase_segment2: u8,
    #[getter(copy)]
    sjw: u8,
}

impl Default for BitTiming {
    /// 1 Mbit/s with a 40 MHz system clock, sample point at 80%.
    fn default() -> Self {
        Self { prescaler: 1, phase_segment1: 31, phase_segment2: 8, sjw: 8 }
    }
}

impl BitTiming {
    pub fn new(prescaler: u16, phase_segment1: u16, phase_segment2: u8, sjw: u8) -> Self {
        Self { prescaler, phase_segment1, phase_segment2, sjw }
    }

    /// Time quanta per bit, the sync segment included.
    #[inline]
    pub fn quanta_per_bit(&self) -> u32 {
        1 + self.phase_segment1 as u32 + self.phase_segment2 as u32
    }

    /// Checks every field against the C1NBTCFG ranges.
    pub fn consistency(&self) -> Result<(), CanError> {
        if !(1..=256).contains(&self.prescaler) {
            let msg = format!("prescaler {} not in 1..=256", self.prescaler);
            return Err(CanError::config_error(msg));
        }
        if !(2..=256).contains(&self.phase_segment1) {
            let msg = format!("phase segment 1 {} not in 2..=256", self.phase_segment1);
            return Err(CanError::config_error(msg));
        }
        if !(1..=128).contains(&self.phase_segment2) {
            let msg = format!("phase segment 2 {} not in 1..=128", self.phase_segment2);
            return Err(CanError::config_error(msg));
        }
        if self.sjw == 0 || self.sjw > self.phase_segment2 {
            let msg = format!("SJW {} not in 1..={}", self.sjw, self.phase_segment2);
            return Err(CanError::config_error(msg));
        }
        Ok(())
    }
}

impl From<BitTiming> for NominalBitTiming {
    fn from(timing: BitTiming) -> Self {
        Self {
            prescaler: timing.prescaler,
            phase_segment1: timing.phase_segment1,
            phase_segment2: timing.phase_segment2,
            sjw: timing.sjw,
        }
    }
}

/// Controller and driver configuration consumed by [`crate::Acan2517::initialize`].
///
/// Bit timing is not computed here: it comes from the caller with
/// `bit_rate_closed_to_desired_rate` telling whether it matches the wanted bit rate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Getters)]
#[serde(default)]
pub struct Settings {
    #[getter(copy)]
    oscillator: Oscillator,
    #[getter(copy)]
    clko_pin: ClkoPin,
    #[getter(copy)]
    txcan_open_drain: bool,
    #[getter(copy)]
    int_open_drain: bool,
    #[getter(copy)]
    bit_timing: BitTiming,
    #[getter(copy)]
    bit_rate_closed_to_desired_rate: bool,
    #[getter(copy)]
    requested_mode: RequestedMode,
    #[getter(copy)]
    driver_transmit_buffer_size: usize,
    #[getter(copy)]
    driver_receive_buffer_size: usize,
    #[getter(copy)]
    controller_receive_fifo_size: u8,
    #[getter(copy)]
    controller_transmit_fifo_size: u8,
    #[getter(copy)]
    controller_transmit_fifo_priority: u8,
    #[getter(copy)]
    controller_transmit_fifo_attempts: RetransmissionAttempts,
    #[getter(copy)]
    controller_txq_size: u8,
    #[getter(copy)]
    controller_txq_priority: u8,
    #[getter(copy)]
    controller_txq_attempts: RetransmissionAttempts,
    /// Deadline of mode changes and PLL lock, in milliseconds.
    #[getter(copy)]
    timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            oscillator: Default::default(),
            clko_pin: Default::default(),
            txcan_open_drain: false,
            int_open_drain: false,
            bit_timing: Default::default(),
            bit_rate_closed_to_desired_rate: true,
            requested_mode: Default::default(),
            driver_transmit_buffer_size: 16,
            driver_receive_buffer_size: 32,
            controller_receive_fifo_size: 32,
            controller_transmit_fifo_size: 16,
            controller_transmit_fifo_priority: 0,
            controller_transmit_fifo_attempts: Default::default(),
            controller_txq_size: 0,
            controller_txq_priority: 0,
            controller_txq_attempts: Default::default(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Settings {
    pub fn new(oscillator: Oscillator, bit_timing: BitTiming) -> Self {
        Self {
            oscillator,
            bit_timing,
            ..Default::default()
        }
    }

    pub fn from_yaml(yaml: &str) -> Result<Self, CanError> {
        serde_yaml::from_str(yaml)
            .map_err(|e| CanError::other_error(format!("Error parsing YAML: {:?}", e)))
    }

    pub fn from_yaml_file<P: AsRef<Path>>(path: P) -> Result<Self, CanError> {
        let path = path.as_ref();
        let data = read_to_string(path)
            .map_err(|e| {
                CanError::other_error(format!("Unable to read `{}`: {:?}", path.display(), e))
            })?;
        Self::from_yaml(&data)
    }

    #[inline]
    pub fn sys_clock(&self) -> u32 {
        self.oscillator.sys_clock()
    }

    /// Bit rate produced by the bit timing, 0 when the timing is degenerate.
    pub fn bit_rate(&self) -> u32 {
        let divisor = self.bit_timing.prescaler as u32 * self.bit_timing.quanta_per_bit();
        match divisor {
            0 => 0,
            _ => self.sys_clock() / divisor,
        }
    }

    /// Controller RAM taken by the TXQ and both FIFOs, in bytes.
    #[inline]
    pub fn ram_usage(&self) -> usize {
        OBJECT_SIZE * (self.controller_txq_size as usize
            + self.controller_receive_fifo_size as usize
            + self.controller_transmit_fifo_size as usize)
    }

    pub(crate) fn oscillator_control(&self) -> OscillatorControl {
        OscillatorControl {
            pll: self.oscillator.uses_pll(),
            sclk_divide_by_2: self.oscillator.divides_by_2(),
            clko_divisor: self.clko_pin.divisor_bits(),
        }
    }

    pub fn set_oscillator(&mut self, oscillator: Oscillator) -> &mut Self {
        self.oscillator = oscillator;
        self
    }

    pub fn set_clko_pin(&mut self, clko_pin: ClkoPin) -> &mut Self {
        self.clko_pin = clko_pin;
        self
    }

    pub fn set_txcan_open_drain(&mut self, open_drain: bool) -> &mut Self {
        self.txcan_open_drain = open_drain;
        self
    }

    pub fn set_int_open_drain(&mut self, open_drain: bool) -> &mut Self {
        self.int_open_drain = open_drain;
        self
    }

    pub fn set_bit_timing(
        &mut self,
        bit_timing: BitTiming,
        closed_to_desired_rate: bool,
    ) -> &mut Self {
        self.bit_timing = bit_timing;
        self.bit_rate_closed_to_desired_rate = closed_to_desired_rate;
        self
    }

    pub fn set_requested_mode(&mut self, mode: RequestedMode) -> &mut Self {
        self.requested_mode = mode;
        self
    }

    pub fn set_driver_transmit_buffer_size(&mut self, size: usize) -> &mut Self {
        self.driver_transmit_buffer_size = size;
        self
    }

    pub fn set_driver_receive_buffer_size(&mut self, size: usize) -> &mut Self {
        self.driver_receive_buffer_size = size;
        self
    }

    pub fn set_controller_receive_fifo_size(&mut self, size: u8) -> &mut Self {
        self.controller_receive_fifo_size = size;
        self
    }

    pub fn set_controller_transmit_fifo(
        &mut self,
        size: u8,
        priority: u8,
        attempts: RetransmissionAttempts,
    ) -> &mut Self {
        self.controller_transmit_fifo_size = size;
        self.controller_transmit_fifo_priority = priority;
        self.controller_transmit_fifo_attempts = attempts;
        self
    }

    /// Size 0 disables the TXQ.
    pub fn set_controller_txq(
        &mut self,
        size: u8,
        priority: u8,
        attempts: RetransmissionAttempts,
    ) -> &mut Self {
        self.controller_txq_size = size;
        self.controller_txq_priority = priority;
        self.controller_txq_attempts = attempts;
        self
    }

    pub fn set_timeout_ms(&mut self, timeout_ms: u64) -> &mut Self {
        self.timeout_ms = timeout_ms;
        self
    }
}
