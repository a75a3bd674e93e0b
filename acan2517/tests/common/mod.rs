#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{atomic::{AtomicU64, Ordering}, Arc, Mutex, MutexGuard};
use acan2517::{
    codec::{decode_object, encode_object},
    constants::*,
    wire::{parse_command, Opcode, COMMAND_SIZE},
    CanMessage, Clock, Gpio, IsrHandler, SpiBus, SpiSettings, Trigger,
};

/// Object offsets answered by the user address registers.
pub const TXQ_OFFSET: u32 = 0x000;
pub const RX_OFFSET: u32 = 0x100;
pub const TX_OFFSET: u32 = 0x200;

const MEMORY_SIZE: usize = 0x1000;
const CONFIGURATION_MODE: u8 = 4;

/// Register level model of a MCP2517FD, enough for the driver paths.
pub struct Chip {
    pub memory: Vec<u8>,
    /// Mode the chip is stuck in, requests for another one are ignored.
    pub mode_lock: Option<u8>,
    pub pll_broken: bool,
    /// RAM reads return 0xFF above this SPI clock.
    pub max_clock: Option<u32>,
    /// Transmit FIFO depth used instead of the configured one.
    pub tx_capacity_override: Option<usize>,
    /// Report RXIF even when the receive FIFO interrupt is disabled.
    pub ignore_receive_enable: bool,
    pub clock: u32,
    pub clock_history: Vec<u32>,
    pub mode_requests: Vec<u8>,
    pub interrupt_clears: Vec<(u16, u8)>,
    pub latched: u32,
    pub tx_pending: VecDeque<[u8; OBJECT_SIZE]>,
    pub sent: Vec<[u8; OBJECT_SIZE]>,
    pub txq_pending: VecDeque<[u8; OBJECT_SIZE]>,
    pub rx_pending: VecDeque<[u8; OBJECT_SIZE]>,
    pub resets: usize,
    pub exchanges: usize,
    pub violations: usize,
    in_transaction: bool,
    cs: bool,
}

impl Default for Chip {
    fn default() -> Self {
        let mut memory = vec![0; MEMORY_SIZE];
        memory[2] = CONFIGURATION_MODE << 5;
        Self {
            memory,
            mode_lock: None,
            pll_broken: false,
            max_clock: None,
            tx_capacity_override: None,
            ignore_receive_enable: false,
            clock: 0,
            clock_history: Vec::new(),
            mode_requests: Vec::new(),
            interrupt_clears: Vec::new(),
            latched: 0,
            tx_pending: VecDeque::new(),
            sent: Vec::new(),
            txq_pending: VecDeque::new(),
            rx_pending: VecDeque::new(),
            resets: 0,
            exchanges: 0,
            violations: 0,
            in_transaction: false,
            cs: false,
        }
    }
}

impl Chip {
    /// Powers up locked in `mode`.
    pub fn lock_mode(&mut self, mode: u8) {
        self.mode_lock = Some(mode);
        self.set_opmod(mode);
    }

    pub fn opmod(&self) -> u8 {
        (self.memory[2] >> 5) & 0x07
    }

    fn set_opmod(&mut self, mode: u8) {
        self.memory[2] = (self.memory[2] & 0x1F) | ((mode & 0x07) << 5);
    }

    pub fn byte(&self, address: u16) -> u8 {
        self.memory[address as usize]
    }

    pub fn word(&self, address: u16) -> u32 {
        let a = address as usize;
        let mut bytes = [0; 4];
        bytes.copy_from_slice(&self.memory[a..a + 4]);
        u32::from_le_bytes(bytes)
    }

    pub fn set_word(&mut self, address: u16, value: u32) {
        let a = address as usize;
        self.memory[a..a + 4].copy_from_slice(&value.to_le_bytes());
    }

    fn tx_capacity(&self) -> usize {
        self.tx_capacity_override
            .unwrap_or((self.byte(c1fifocon_register(TRANSMIT_FIFO_INDEX) + 3) & 0x1F) as usize + 1)
    }

    fn txq_capacity(&self) -> usize {
        match self.memory[2] & (1 << 4) {
            0 => 0,
            _ => (self.byte(C1TXQCON_REGISTER + 3) & 0x1F) as usize + 1,
        }
    }

    fn tx_not_full(&self) -> bool {
        self.tx_pending.len() < self.tx_capacity()
    }

    pub fn interrupt_flags(&self) -> u32 {
        let mut flags = self.latched;
        let tx_enabled = self.byte(c1fifocon_register(TRANSMIT_FIFO_INDEX)) & 1 != 0;
        if tx_enabled && self.tx_not_full() {
            flags |= 1 << 0;
        }
        let rx_enabled = self.byte(c1fifocon_register(RECEIVE_FIFO_INDEX)) & 1 != 0;
        if !self.rx_pending.is_empty() && (rx_enabled || self.ignore_receive_enable) {
            flags |= 1 << 1;
        }
        flags
    }

    /// Bus side transmission of the oldest frame of the transmit FIFO.
    pub fn complete_one(&mut self) -> bool {
        match self.tx_pending.pop_front() {
            Some(object) => {
                self.sent.push(object);
                true
            },
            None => false,
        }
    }

    pub fn sent_frames(&self) -> Vec<CanMessage> {
        self.sent.iter().map(decode_object).collect()
    }

    pub fn pending_frames(&self) -> Vec<CanMessage> {
        self.tx_pending.iter().map(decode_object).collect()
    }

    /// Frame arriving from the bus, routed by the installed filters. `false` when no
    /// filter accepts it.
    pub fn inject(&mut self, frame: &CanMessage) -> bool {
        let mut object = encode_object(frame);
        let identifier = u32::from_le_bytes([object[0], object[1], object[2], object[3]]);
        let header = u32::from_le_bytes([object[4], object[5], object[6], object[7]]);
        let candidate = (identifier & 0x1FFF_FFFF) | ((header >> 4) & 1) << 30;
        for index in 0..MAX_FILTERS as u16 {
            if self.byte(c1fltcon_register(index)) & 0x80 == 0 {
                continue;
            }
            let mask = self.word(c1mask_register(index));
            let acceptance = self.word(c1fltobj_register(index));
            if (candidate ^ acceptance) & mask & 0x5FFF_FFFF == 0 {
                let header = header | ((index as u32) << 11);
                object[4..8].copy_from_slice(&header.to_le_bytes());
                self.rx_pending.push_back(object);
                return true;
            }
        }
        false
    }

    fn reset(&mut self) {
        self.resets += 1;
        self.memory.iter_mut().for_each(|b| *b = 0);
        self.set_opmod(self.mode_lock.unwrap_or(CONFIGURATION_MODE));
        self.latched = 0;
        self.tx_pending.clear();
        self.txq_pending.clear();
        self.rx_pending.clear();
    }

    fn corrupted(&self, address: u16) -> bool {
        (RAM_START..RAM_END).contains(&address)
            && self.max_clock.map_or(false, |limit| self.clock > limit)
    }

    fn read(&mut self, address: u16) -> u8 {
        let rx_fifo_ua = c1fifoua_register(RECEIVE_FIFO_INDEX);
        let tx_fifo_ua = c1fifoua_register(TRANSMIT_FIFO_INDEX);
        let offset = |value: u32| value.to_le_bytes();
        match address {
            a if a == C1INT_REGISTER || a == C1INT_REGISTER + 1 => {
                self.interrupt_flags().to_le_bytes()[(a - C1INT_REGISTER) as usize]
            },
            a if a == c1fifosta_register(RECEIVE_FIFO_INDEX) => (!self.rx_pending.is_empty()) as u8,
            a if a == c1fifosta_register(TRANSMIT_FIFO_INDEX) => self.tx_not_full() as u8,
            C1TXQSTA_REGISTER => (self.txq_pending.len() < self.txq_capacity()) as u8,
            a if (C1TXQUA_REGISTER..C1TXQUA_REGISTER + 4).contains(&a) => {
                offset(TXQ_OFFSET)[(a - C1TXQUA_REGISTER) as usize]
            },
            a if (rx_fifo_ua..rx_fifo_ua + 4).contains(&a) => {
                if a == rx_fifo_ua {
                    if let Some(object) = self.rx_pending.front().copied() {
                        let base = (RAM_START as u32 + RX_OFFSET) as usize;
                        self.memory[base..base + OBJECT_SIZE].copy_from_slice(&object);
                    }
                }
                offset(RX_OFFSET)[(a - rx_fifo_ua) as usize]
            },
            a if (tx_fifo_ua..tx_fifo_ua + 4).contains(&a) => {
                offset(TX_OFFSET)[(a - tx_fifo_ua) as usize]
            },
            a if a == OSC_REGISTER + 1 => {
                let pll = self.byte(OSC_REGISTER) & 1 != 0;
                match pll && self.pll_broken {
                    true => 0,
                    false => 0x04 | pll as u8,
                }
            },
            a if self.corrupted(a) => 0xFF,
            a => self.memory[a as usize],
        }
    }

    fn take_object(&self, offset: u32) -> [u8; OBJECT_SIZE] {
        let base = (RAM_START as u32 + offset) as usize;
        let mut object = [0; OBJECT_SIZE];
        object.copy_from_slice(&self.memory[base..base + OBJECT_SIZE]);
        object
    }

    fn write(&mut self, address: u16, value: u8) {
        match address {
            2 => self.memory[2] = (value & 0x1F) | (self.memory[2] & 0xE0),
            3 => {
                self.memory[3] = value;
                let mode = value & 0x07;
                self.mode_requests.push(mode);
                if self.mode_lock.is_none() {
                    self.set_opmod(mode);
                }
            },
            a if a == C1INT_REGISTER || a == C1INT_REGISTER + 1 => {
                self.interrupt_clears.push((a - C1INT_REGISTER, value));
                self.latched &= !((value as u32) << (8 * (a - C1INT_REGISTER)));
            },
            a if a == c1fifocon_register(RECEIVE_FIFO_INDEX) + 1 => {
                if value & 1 != 0 {
                    self.rx_pending.pop_front();
                }
            },
            a if a == c1fifocon_register(TRANSMIT_FIFO_INDEX) + 1 => {
                if value & 0x03 == 0x03 {
                    let object = self.take_object(TX_OFFSET);
                    self.tx_pending.push_back(object);
                }
            },
            a if a == C1TXQCON_REGISTER + 1 => {
                if value & 0x03 == 0x03 {
                    let object = self.take_object(TXQ_OFFSET);
                    self.txq_pending.push_back(object);
                }
            },
            a if a == OSC_REGISTER + 1 => {},
            a => self.memory[a as usize] = value,
        }
    }

    fn exchange(&mut self, buffer: &mut [u8]) {
        self.exchanges += 1;
        if !self.cs || !self.in_transaction {
            self.violations += 1;
        }
        if buffer.len() < COMMAND_SIZE {
            return;
        }

        let (opcode, address) = parse_command([buffer[0], buffer[1]]);
        if opcode == Opcode::Reset as u8 {
            self.reset();
            return;
        }
        for (i, byte) in buffer[COMMAND_SIZE..].iter_mut().enumerate() {
            let a = address + i as u16;
            if opcode == Opcode::Write as u8 {
                self.write(a, *byte);
            } else if opcode == Opcode::Read as u8 {
                *byte = self.read(a);
            }
        }
    }
}

/// [`SpiBus`] wired to a shared [`Chip`].
#[derive(Clone, Default)]
pub struct SimBus(pub Arc<Mutex<Chip>>);

impl SimBus {
    pub fn chip(&self) -> MutexGuard<'_, Chip> {
        self.0.lock().unwrap()
    }
}

impl SpiBus for SimBus {
    fn begin_transaction(&mut self, settings: &SpiSettings) {
        let mut chip = self.chip();
        chip.in_transaction = true;
        chip.clock = settings.clock;
        if chip.clock_history.last() != Some(&settings.clock) {
            chip.clock_history.push(settings.clock);
        }
    }

    fn end_transaction(&mut self) {
        self.chip().in_transaction = false;
    }

    fn assert_cs(&mut self) {
        self.chip().cs = true;
    }

    fn deassert_cs(&mut self) {
        self.chip().cs = false;
    }

    fn transfer(&mut self, buffer: &mut [u8]) {
        self.chip().exchange(buffer);
    }
}

#[derive(Default)]
pub struct GpioState {
    pub interrupt: Option<u8>,
    pub pullups: Vec<u8>,
    pub attached: Vec<(u8, Trigger)>,
    pub handler: Option<IsrHandler>,
}

#[derive(Clone, Default)]
pub struct MockGpio(pub Arc<Mutex<GpioState>>);

impl MockGpio {
    pub fn with_interrupt(interrupt: u8) -> Self {
        let gpio = Self::default();
        gpio.state().interrupt = Some(interrupt);
        gpio
    }

    pub fn state(&self) -> MutexGuard<'_, GpioState> {
        self.0.lock().unwrap()
    }

    /// Raises the interrupt line once.
    pub fn fire(&self) {
        let handler = self.state().handler.clone();
        if let Some(handler) = handler {
            handler();
        }
    }
}

impl Gpio for MockGpio {
    fn interrupt_number(&self, _: u8) -> Option<u8> {
        self.state().interrupt
    }

    fn set_input_pullup(&mut self, pin: u8) {
        self.state().pullups.push(pin);
    }

    fn attach_interrupt(&mut self, interrupt: u8, handler: IsrHandler, trigger: Trigger) {
        let mut state = self.state();
        state.attached.push((interrupt, trigger));
        state.handler = Some(handler);
    }
}

/// Clock advancing by one millisecond on every read.
#[derive(Clone, Default)]
pub struct TickClock(pub Arc<AtomicU64>);

impl Clock for TickClock {
    fn millis(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst)
    }
}

/// Polled driver on `bus` with a ticking clock.
pub fn polled(bus: &SimBus) -> acan2517::Acan2517<SimBus> {
    let mut builder = acan2517::Acan2517::builder(bus.clone());
    builder.set_clock(TickClock::default());
    builder.build()
}

/// 1 Mbit/s from 40 MHz, 4-deep controller FIFOs, no TXQ.
pub fn small_fifos() -> acan2517::Settings {
    let mut settings = acan2517::Settings::default();
    settings.set_controller_receive_fifo_size(4)
        .set_controller_transmit_fifo(4, 0, acan2517::RetransmissionAttempts::Unlimited);
    settings
}
