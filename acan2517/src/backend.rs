//! How a raised interrupt line, or a poll request, reaches the interrupt core.

use std::{
    sync::{mpsc::{self, Receiver, SyncSender, TrySendError}, Mutex, MutexGuard, Weak},
    thread::{self, JoinHandle},
};
use crate::constants::WORKER_SEMAPHORE_MAX;
use crate::hal::Trigger;

/// Something able to run one pass of the interrupt core.
pub trait Service: Send + Sync {
    /// Handles the pending causes once, `true` when a frame was received or transmitted.
    fn service(&self) -> bool;
}

pub trait InterruptBackend: Send + Sync {
    /// Trigger the interrupt line is attached with.
    fn trigger(&self) -> Trigger;
    /// Called once the controller is running.
    fn start(&self, service: Weak<dyn Service>);
    /// Interrupt line asserted, `true` when a frame was handled synchronously.
    fn interrupt(&self, service: &dyn Service) -> bool;
    /// Services everything pending, `true` when a frame was handled synchronously.
    fn poll(&self, service: &dyn Service) -> bool;
}

/// Runs the interrupt core in the caller's context.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectCall;

impl InterruptBackend for DirectCall {
    #[inline]
    fn trigger(&self) -> Trigger {
        Trigger::LowLevel
    }

    fn start(&self, _: Weak<dyn Service>) {}

    #[inline]
    fn interrupt(&self, service: &dyn Service) -> bool {
        service.service()
    }

    fn poll(&self, service: &dyn Service) -> bool {
        let mut handled = false;
        while service.service() {
            handled = true;
        }
        handled
    }
}

/// Defers the interrupt core to a dedicated worker thread.
///
/// The interrupt handler and [`InterruptBackend::poll`] only post a wake-up on a bounded
/// channel; the worker receives it and services the controller until nothing is pending.
/// Wake-ups beyond [`WORKER_SEMAPHORE_MAX`] are dropped.
pub struct DeferredWorker {
    name: String,
    wake: Mutex<Option<SyncSender<()>>>,
    pending: Mutex<Option<Receiver<()>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Default for DeferredWorker {
    fn default() -> Self {
        Self::new("ACAN2517Handler")
    }
}

impl DeferredWorker {
    pub fn new<S: Into<String>>(name: S) -> Self {
        let (wake, pending) = mpsc::sync_channel::<()>(WORKER_SEMAPHORE_MAX);
        Self {
            name: name.into(),
            wake: Mutex::new(Some(wake)),
            pending: Mutex::new(Some(pending)),
            worker: Default::default(),
        }
    }

    #[inline]
    pub fn is_running(&self) -> bool {
        lock(&self.worker).is_some()
    }

    fn wake(&self) {
        if let Some(wake) = lock(&self.wake).as_ref() {
            match wake.try_send(()) {
                Ok(_) | Err(TrySendError::Full(_)) => {},
                Err(TrySendError::Disconnected(_)) => {
                    log::trace!("ACAN2517 - worker `{}` gone, wake-up dropped", self.name)
                },
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock()
        .unwrap_or_else(|e| e.into_inner())
}

impl InterruptBackend for DeferredWorker {
    #[inline]
    fn trigger(&self) -> Trigger {
        Trigger::FallingEdge
    }

    fn start(&self, service: Weak<dyn Service>) {
        let mut worker = lock(&self.worker);
        let pending = match lock(&self.pending).take() {
            Some(pending) => pending,
            None => {
                log::debug!("ACAN2517 - worker `{}` already started", self.name);
                return;
            },
        };

        let spawned = thread::Builder::new()
            .name(self.name.clone())
            .spawn(move || {
                while pending.recv().is_ok() {
                    match service.upgrade() {
                        Some(service) => while service.service() {},
                        None => break,
                    }
                }
            });
        match spawned {
            Ok(handle) => {
                log::info!("ACAN2517 - worker `{}` started", self.name);
                *worker = Some(handle);
            },
            Err(e) => log::warn!("ACAN2517 - unable to spawn worker `{}`: {}", self.name, e),
        }
    }

    #[inline]
    fn interrupt(&self, _: &dyn Service) -> bool {
        self.wake();
        false
    }

    #[inline]
    fn poll(&self, _: &dyn Service) -> bool {
        self.wake();
        false
    }
}

impl Drop for DeferredWorker {
    fn drop(&mut self) {
        // closing the channel ends the worker loop
        drop(lock(&self.wake).take());
        if let Some(handle) = lock(&self.worker).take() {
            // the last driver handle may be released by the worker itself
            if handle.thread().id() == thread::current().id() {
                return;
            }
            match handle.join() {
                Ok(_) => log::info!("ACAN2517 - worker `{}` stopped", self.name),
                Err(_) => log::warn!("ACAN2517 - worker `{}` panicked", self.name),
            }
        }
    }
}
