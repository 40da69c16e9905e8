//! Peak and RMS level meters
//!
//! Both are single-channel; run one instance per channel for multichannel
//! metering. `PeakMeter` applies an exponential ballistic decay between
//! blocks plus a timed hold; `RmsMeter` keeps a running sum of squares over
//! a fixed window so each sample costs one subtract and one add.

use mx_core::{Sample, lin_to_db};

use crate::Meter;

// ═══════════════════════════════════════════════════════════════════════════════
// PEAK METER
// ═══════════════════════════════════════════════════════════════════════════════

/// Peak level meter with exponential decay and peak hold.
pub struct PeakMeter {
    peak: f64,
    hold: f64,
    hold_time: f64,
    decay_rate: f64,
    sample_rate: f64,
    hold_count: i64,
}

impl PeakMeter {
    pub fn new(sample_rate: f64) -> Self {
        Self {
            peak: 0.0,
            hold: 0.0,
            hold_time: 3.0,
            decay_rate: 20.0, // dB per second
            sample_rate,
            hold_count: 0,
        }
    }

    /// Set the hold time in seconds.
    pub fn set_hold_time(&mut self, seconds: f64) {
        self.hold_time = seconds;
    }

    /// Set the decay rate in dB per second.
    pub fn set_decay_rate(&mut self, db_per_second: f64) {
        self.decay_rate = db_per_second;
    }

    pub fn process(&mut self, samples: &[Sample]) {
        let mut block_peak = 0.0;
        for &sample in samples {
            let abs = sample.abs();
            if abs > block_peak {
                block_peak = abs;
            }
        }

        // Decay the running peak across the elapsed block, then let a
        // louder block override it
        let decay_per_sample =
            self.decay_rate / self.sample_rate / 20.0 * std::f64::consts::LN_10;
        self.peak *= (-decay_per_sample * samples.len() as f64).exp();

        if block_peak > self.peak {
            self.peak = block_peak;
        }

        if block_peak > self.hold {
            self.hold = block_peak;
            self.hold_count = (self.hold_time * self.sample_rate) as i64;
        } else {
            self.hold_count -= samples.len() as i64;
            if self.hold_count <= 0 {
                self.hold = self.peak;
                self.hold_count = 0;
            }
        }
    }

    /// Current peak level, linear.
    pub fn peak(&self) -> f64 {
        self.peak
    }

    /// Current peak level in dBFS; -inf when silent.
    pub fn peak_db(&self) -> f64 {
        lin_to_db(self.peak)
    }

    /// Held peak level, linear.
    pub fn hold(&self) -> f64 {
        self.hold
    }

    /// Held peak level in dBFS; -inf when silent.
    pub fn hold_db(&self) -> f64 {
        lin_to_db(self.hold)
    }
}

impl Meter for PeakMeter {
    fn reset(&mut self) {
        self.peak = 0.0;
        self.hold = 0.0;
        self.hold_count = 0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// RMS METER
// ═══════════════════════════════════════════════════════════════════════════════

/// Windowed RMS meter over a circular buffer with a running sum of squares.
///
/// Until the window fills, the mean is taken over the samples seen so far.
pub struct RmsMeter {
    window_size: usize,
    buffer: Vec<f64>,
    write_pos: usize,
    sum: f64,
    count: usize,
}

impl RmsMeter {
    pub fn new(window_size_samples: usize) -> Self {
        Self {
            window_size: window_size_samples,
            buffer: vec![0.0; window_size_samples],
            write_pos: 0,
            sum: 0.0,
            count: 0,
        }
    }

    pub fn process(&mut self, samples: &[Sample]) {
        for &sample in samples {
            let old = self.buffer[self.write_pos];
            self.sum -= old * old;

            self.buffer[self.write_pos] = sample;
            self.sum += sample * sample;

            self.write_pos = (self.write_pos + 1) % self.window_size;
            if self.count < self.window_size {
                self.count += 1;
            }
        }
    }

    /// Current RMS level, linear. 0 before any input.
    pub fn rms(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        // Rounding in the running sum can push it fractionally negative
        (self.sum.max(0.0) / self.count as f64).sqrt()
    }

    /// Current RMS level in dBFS; -inf when silent.
    pub fn rms_db(&self) -> f64 {
        lin_to_db(self.rms())
    }
}

impl Meter for RmsMeter {
    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.sum = 0.0;
        self.count = 0;
        self.write_pos = 0;
    }
}
