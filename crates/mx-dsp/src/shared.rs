//! Cross-thread meter sharing
//!
//! Meters themselves are plain `&mut self` state machines. `Shared` wraps
//! one in an `Arc<Mutex<..>>` so an audio thread can feed it while a UI
//! thread polls readings. Every lock is held for a single bounded meter
//! call; no meter takes another meter's lock.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::Meter;

/// Clonable handle to a mutex-protected meter.
pub struct Shared<M> {
    inner: Arc<Mutex<M>>,
}

impl<M> Clone for Shared<M> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<M> Shared<M> {
    pub fn new(meter: M) -> Self {
        Self {
            inner: Arc::new(Mutex::new(meter)),
        }
    }

    /// Lock the meter for a sequence of calls.
    pub fn lock(&self) -> MutexGuard<'_, M> {
        self.inner.lock()
    }

    /// Run a closure under the lock and return its result.
    pub fn with<R>(&self, f: impl FnOnce(&mut M) -> R) -> R {
        f(&mut self.inner.lock())
    }
}

impl<M: Meter> Shared<M> {
    pub fn reset(&self) {
        self.inner.lock().reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meters::PeakMeter;

    #[test]
    fn test_concurrent_process_and_read() {
        let meter = Shared::new(PeakMeter::new(48000.0));
        let writer = meter.clone();

        let handle = std::thread::spawn(move || {
            for _ in 0..1000 {
                writer.with(|m| m.process(&[0.5, -0.8, 0.2]));
            }
        });

        for _ in 0..1000 {
            let peak = meter.with(|m| m.peak());
            assert!((0.0..=0.8).contains(&peak));
        }

        handle.join().unwrap();
        assert!((meter.lock().peak() - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_reset_through_handle() {
        let meter = Shared::new(PeakMeter::new(48000.0));
        meter.with(|m| m.process(&[1.0]));
        meter.reset();
        assert_eq!(meter.lock().peak(), 0.0);
    }
}
