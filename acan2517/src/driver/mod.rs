mod flow;
mod init;

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use rs_can::CanDriver;
use crate::backend::{DirectCall, InterruptBackend, Service};
use crate::bus::Bus;
use crate::constants::{C1BDIAG0_REGISTER, C1TREC_REGISTER, NO_INT_PIN, RESET_SPI_CLOCK};
use crate::error::ErrorCode;
use crate::filter::Filters;
use crate::frame::CanMessage;
use crate::hal::{Clock, Gpio, IsrHandler, NoGpio, SpiBus, SystemClock};
use crate::regs::ErrorCounters;
use crate::settings::Settings;
use self::flow::Core;

pub(crate) struct Shared<SPI> {
    core: Mutex<Core<SPI>>,
    gpio: Mutex<Box<dyn Gpio>>,
    clock: Box<dyn Clock>,
    backend: Box<dyn InterruptBackend>,
    int_pin: u8,
}

impl<SPI: SpiBus> Shared<SPI> {
    fn lock_core(&self) -> MutexGuard<'_, Core<SPI>> {
        self.core.lock()
            .unwrap_or_else(|e| {
                log::warn!("ACAN2517 - driver lock poisoned, recovering");
                e.into_inner()
            })
    }
}

impl<SPI: SpiBus> Service for Shared<SPI> {
    #[inline]
    fn service(&self) -> bool {
        self.lock_core().isr_core()
    }
}

/// Collects the platform parts of an [`Acan2517`].
pub struct Acan2517Builder<SPI> {
    spi: SPI,
    int_pin: u8,
    gpio: Box<dyn Gpio>,
    clock: Box<dyn Clock>,
    backend: Box<dyn InterruptBackend>,
}

impl<SPI: SpiBus + 'static> Acan2517Builder<SPI> {
    /// Polled driver without interrupt line, serviced in the caller's context.
    pub fn new(spi: SPI) -> Self {
        Self {
            spi,
            int_pin: NO_INT_PIN,
            gpio: Box::new(NoGpio),
            clock: Box::new(SystemClock::default()),
            backend: Box::new(DirectCall),
        }
    }

    /// INT output of the controller wired to `pin` of `gpio`.
    pub fn set_interrupt_pin<G: Gpio + 'static>(&mut self, pin: u8, gpio: G) -> &mut Self {
        self.int_pin = pin;
        self.gpio = Box::new(gpio);
        self
    }

    pub fn set_clock<C: Clock + 'static>(&mut self, clock: C) -> &mut Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn set_backend<B: InterruptBackend + 'static>(&mut self, backend: B) -> &mut Self {
        self.backend = Box::new(backend);
        self
    }

    pub fn build(self) -> Acan2517<SPI> {
        Acan2517 {
            shared: Arc::new(Shared {
                core: Mutex::new(Core::new(Bus::new(self.spi, RESET_SPI_CLOCK))),
                gpio: Mutex::new(self.gpio),
                clock: self.clock,
                backend: self.backend,
                int_pin: self.int_pin,
            }),
        }
    }
}

/// MCP2517FD CAN 2.0B driver.
///
/// Frames to send go to the controller transmit FIFO, or to a driver buffer while that FIFO
/// is full; received frames wait in a driver buffer until taken by [`Acan2517::receive`] or
/// [`Acan2517::dispatch`]. Every operation but [`Acan2517::initialize`] returns at once.
pub struct Acan2517<SPI> {
    shared: Arc<Shared<SPI>>,
}

impl<SPI: SpiBus + 'static> Acan2517<SPI> {
    /// Driver serviced in the caller's context, `int_pin` may be [`NO_INT_PIN`].
    pub fn new<G: Gpio + 'static>(spi: SPI, int_pin: u8, gpio: G) -> Self {
        let mut builder = Acan2517Builder::new(spi);
        builder.set_interrupt_pin(int_pin, gpio);
        builder.build()
    }

    #[inline]
    pub fn builder(spi: SPI) -> Acan2517Builder<SPI> {
        Acan2517Builder::new(spi)
    }

    /// Configures the controller and starts it in the requested mode.
    ///
    /// `handler` is attached to the interrupt pin, see [`Acan2517::interrupt_handler`]. The
    /// callbacks of `filters` are copied into the driver.
    pub fn initialize(
        &self,
        settings: &Settings,
        handler: Option<IsrHandler>,
        filters: &Filters,
    ) -> ErrorCode {
        let service = Arc::downgrade(&self.shared) as Weak<dyn Service>;
        let code = self.shared.initialize(settings, handler, filters, service);
        match code.is_empty() {
            true => log::info!("ACAN2517 - controller running at {} bit/s", settings.bit_rate()),
            false => log::warn!("ACAN2517 - initialization failed: {}", code),
        }
        code
    }

    /// [`Acan2517::initialize`] with a single filter accepting every frame.
    pub fn initialize_pass_all(
        &self,
        settings: &Settings,
        handler: Option<IsrHandler>,
    ) -> ErrorCode {
        let mut filters = Filters::new();
        filters.append_pass_all(None);
        self.initialize(settings, handler, &filters)
    }

    /// Handler to attach to the interrupt pin, it does nothing once the driver is dropped.
    pub fn interrupt_handler(&self) -> IsrHandler {
        let shared = Arc::downgrade(&self.shared);
        Arc::new(move || {
            if let Some(shared) = shared.upgrade() {
                shared.backend.interrupt(&*shared);
            }
        })
    }

    /// Entry point of the interrupt line, `true` when a frame was handled synchronously.
    #[inline]
    pub fn interrupt_entry(&self) -> bool {
        self.shared.backend.interrupt(&*self.shared)
    }

    /// Services the controller without interrupt line.
    #[inline]
    pub fn poll(&self) -> bool {
        self.shared.backend.poll(&*self.shared)
    }

    /// `frame.index()` selects the route: `0` transmit FIFO, `255` TXQ, anything else is
    /// refused. `false` when the route has no room left.
    pub fn try_send(&self, frame: &CanMessage) -> bool {
        let mut core = self.shared.lock_core();
        if !core.running {
            log::trace!("ACAN2517 - controller not running, frame {} refused", frame);
            return false;
        }
        core.try_send(frame)
    }

    #[inline]
    pub fn available(&self) -> bool {
        !self.shared.lock_core().receive_buffer.is_empty()
    }

    pub fn receive(&self) -> Option<CanMessage> {
        self.shared.lock_core()
            .receive()
            .map(|(frame, _)| frame)
    }

    /// Takes one received frame and hands it to `notifier` with its filter index, then to
    /// the callback of that filter. `false` when nothing was received.
    pub fn dispatch(&self, notifier: Option<&dyn Fn(u8)>) -> bool {
        let received = self.shared.lock_core().receive();
        match received {
            Some((frame, callback)) => {
                if let Some(notifier) = notifier {
                    notifier(frame.index());
                }
                if let Some(callback) = callback {
                    callback(&frame);
                }
                true
            },
            None => false,
        }
    }

    /// Raw C1BDIAG0: receive and transmit error counters of both bit rates.
    pub fn read_error_counters(&self) -> u32 {
        self.shared.lock_core().bus.read_word(C1BDIAG0_REGISTER)
    }

    /// C1TREC decoded.
    pub fn read_transmit_receive_errors(&self) -> ErrorCounters {
        ErrorCounters::from_word(self.shared.lock_core().bus.read_word(C1TREC_REGISTER))
    }

    #[inline]
    pub fn transmit_buffer_size(&self) -> usize {
        self.shared.lock_core().transmit_buffer.capacity()
    }

    #[inline]
    pub fn transmit_buffer_count(&self) -> usize {
        self.shared.lock_core().transmit_buffer.count()
    }

    #[inline]
    pub fn transmit_buffer_peak_count(&self) -> usize {
        self.shared.lock_core().transmit_buffer.peak_count()
    }

    #[inline]
    pub fn reset_transmit_buffer_peak_count(&self) {
        self.shared.lock_core().transmit_buffer.reset_peak()
    }

    #[inline]
    pub fn receive_buffer_size(&self) -> usize {
        self.shared.lock_core().receive_buffer.capacity()
    }

    #[inline]
    pub fn receive_buffer_count(&self) -> usize {
        self.shared.lock_core().receive_buffer.count()
    }

    #[inline]
    pub fn receive_buffer_peak_count(&self) -> usize {
        self.shared.lock_core().receive_buffer.peak_count()
    }

    #[inline]
    pub fn reset_receive_buffer_peak_count(&self) {
        self.shared.lock_core().receive_buffer.reset_peak()
    }

    /// Received frames dropped because the receive buffer was full.
    #[inline]
    pub fn receive_overflow_count(&self) -> usize {
        self.shared.lock_core().receive_overflow
    }
}

impl<SPI: SpiBus + 'static> CanDriver for Acan2517<SPI> {
    type Frame = CanMessage;

    #[inline]
    fn try_transmit(&self, frame: &Self::Frame) -> bool {
        self.try_send(frame)
    }

    #[inline]
    fn available(&self) -> bool {
        Acan2517::available(self)
    }

    #[inline]
    fn try_receive(&self) -> Option<Self::Frame> {
        self.receive()
    }
}
