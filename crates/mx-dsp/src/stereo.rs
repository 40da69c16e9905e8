//! Stereo field metering
//!
//! Three independent streaming estimators over paired channel buffers:
//! - `CorrelationMeter` - windowed Pearson correlation with peak-hold
//! - `BalanceMeter` - smoothed L/R power balance
//! - `StereoWidthMeter` - smoothed mid/side power ratio
//!
//! `StereoFieldAnalyzer` owns all three and drives them with the same input
//! pair per call.

use mx_core::Sample;

use crate::Meter;

// ═══════════════════════════════════════════════════════════════════════════════
// CORRELATION METER
// ═══════════════════════════════════════════════════════════════════════════════

/// Qualitative phase relationship derived from the smoothed correlation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PhaseStatus {
    InPhase,
    MostlyInPhase,
    PartiallyCorrelated,
    MostlyOutOfPhase,
    OutOfPhase,
}

impl std::fmt::Display for PhaseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            PhaseStatus::InPhase => "In Phase",
            PhaseStatus::MostlyInPhase => "Mostly In Phase",
            PhaseStatus::PartiallyCorrelated => "Partially Correlated",
            PhaseStatus::MostlyOutOfPhase => "Mostly Out of Phase",
            PhaseStatus::OutOfPhase => "Out of Phase",
        };
        f.write_str(s)
    }
}

/// Stereo correlation meter
///
/// Recomputes the Pearson coefficient over the full analysis window each
/// time the twin circular buffers hold a complete window of fresh samples,
/// then smooths it exponentially. Peak-hold tracks the most negative raw
/// coefficient; its countdown is measured in full-buffer recomputations,
/// so the effective hold duration scales with the window size.
pub struct CorrelationMeter {
    window_size: usize,
    buffer_l: Vec<f64>,
    buffer_r: Vec<f64>,
    write_pos: usize,
    count: usize,
    correlation: f64,
    averaging: f64,
    peak_hold: f64,
    peak_hold_time: f64,
    peak_hold_count: i64,
    sample_rate: f64,
}

impl CorrelationMeter {
    pub fn new(window_size: usize, sample_rate: f64) -> Self {
        Self {
            window_size,
            buffer_l: vec![0.0; window_size],
            buffer_r: vec![0.0; window_size],
            write_pos: 0,
            count: 0,
            correlation: 0.0, // Neutral until the window fills
            averaging: 0.9,
            peak_hold: 1.0, // Best case until something worse arrives
            peak_hold_time: 3.0,
            peak_hold_count: 0,
            sample_rate,
        }
    }

    /// Set the exponential averaging factor. Values outside [0, 1] are
    /// ignored.
    pub fn set_averaging(&mut self, factor: f64) {
        if (0.0..=1.0).contains(&factor) {
            self.averaging = factor;
        } else {
            log::debug!("ignoring correlation averaging factor {factor}");
        }
    }

    /// Set the peak hold time in seconds.
    pub fn set_peak_hold_time(&mut self, seconds: f64) {
        self.peak_hold_time = seconds;
    }

    /// Feed a stereo block. Mismatched lengths are a caller contract
    /// violation and leave the meter untouched.
    pub fn process(&mut self, samples_l: &[Sample], samples_r: &[Sample]) {
        if samples_l.len() != samples_r.len() {
            log::warn!(
                "correlation meter: channel length mismatch ({} vs {})",
                samples_l.len(),
                samples_r.len()
            );
            return;
        }

        for (&l, &r) in samples_l.iter().zip(samples_r) {
            self.buffer_l[self.write_pos] = l;
            self.buffer_r[self.write_pos] = r;

            self.write_pos = (self.write_pos + 1) % self.window_size;
            if self.count < self.window_size {
                self.count += 1;
            }
        }

        // Recompute only once the window has filled
        if self.count == self.window_size {
            let raw = self.pearson();

            self.correlation = self.correlation * self.averaging + raw * (1.0 - self.averaging);

            // Peak hold follows the most negative raw coefficient; the
            // countdown is in units of full-buffer recomputations
            if raw < self.peak_hold {
                self.peak_hold = raw;
                self.peak_hold_count =
                    (self.peak_hold_time * self.sample_rate / self.window_size as f64) as i64;
            } else {
                self.peak_hold_count -= 1;
                if self.peak_hold_count <= 0 {
                    self.peak_hold = self.correlation;
                    self.peak_hold_count = 0;
                }
            }
        }
    }

    /// Pearson correlation coefficient over the full buffer, clamped to
    /// [-1, 1]. Silence on both channels counts as perfectly correlated;
    /// silence on exactly one channel as uncorrelated.
    fn pearson(&self) -> f64 {
        let n = self.count as f64;

        let mean_l: f64 = self.buffer_l.iter().sum::<f64>() / n;
        let mean_r: f64 = self.buffer_r.iter().sum::<f64>() / n;

        let mut numerator = 0.0;
        let mut var_l = 0.0;
        let mut var_r = 0.0;

        for (&l, &r) in self.buffer_l.iter().zip(&self.buffer_r) {
            let dl = l - mean_l;
            let dr = r - mean_r;
            numerator += dl * dr;
            var_l += dl * dl;
            var_r += dr * dr;
        }

        if var_l == 0.0 || var_r == 0.0 {
            if var_l == 0.0 && var_r == 0.0 {
                return 1.0;
            }
            return 0.0;
        }

        (numerator / (var_l.sqrt() * var_r.sqrt())).clamp(-1.0, 1.0)
    }

    /// Smoothed correlation in [-1, 1].
    pub fn correlation(&self) -> f64 {
        self.correlation
    }

    /// Most negative correlation currently held.
    pub fn peak_hold(&self) -> f64 {
        self.peak_hold
    }

    /// Qualitative phase classification.
    pub fn phase_status(&self) -> PhaseStatus {
        let corr = self.correlation;
        if corr > 0.9 {
            PhaseStatus::InPhase
        } else if corr > 0.5 {
            PhaseStatus::MostlyInPhase
        } else if corr > -0.5 {
            PhaseStatus::PartiallyCorrelated
        } else if corr > -0.9 {
            PhaseStatus::MostlyOutOfPhase
        } else {
            PhaseStatus::OutOfPhase
        }
    }

    /// Mono compatibility score mapping [-1, 1] to [0, 1].
    pub fn mono_compatibility(&self) -> f64 {
        (self.correlation + 1.0) / 2.0
    }
}

impl Meter for CorrelationMeter {
    fn reset(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.write_pos = 0;
        self.count = 0;
        self.correlation = 0.0;
        self.peak_hold = 1.0;
        self.peak_hold_count = 0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// BALANCE METER
// ═══════════════════════════════════════════════════════════════════════════════

/// Stereo balance meter
///
/// Exponentially smoothed mean-square power per channel; O(1) memory.
/// Balance is -1 (full left) .. +1 (full right).
pub struct BalanceMeter {
    power_l: f64,
    power_r: f64,
    balance: f64,
    averaging: f64,
}

impl Default for BalanceMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl BalanceMeter {
    pub fn new() -> Self {
        Self {
            power_l: 0.0,
            power_r: 0.0,
            balance: 0.0,
            averaging: 0.95,
        }
    }

    pub fn process(&mut self, samples_l: &[Sample], samples_r: &[Sample]) {
        if samples_l.len() != samples_r.len() {
            log::warn!(
                "balance meter: channel length mismatch ({} vs {})",
                samples_l.len(),
                samples_r.len()
            );
            return;
        }
        if samples_l.is_empty() {
            return;
        }

        let count = samples_l.len() as f64;
        let sum_l: f64 = samples_l.iter().map(|&s| s * s).sum();
        let sum_r: f64 = samples_r.iter().map(|&s| s * s).sum();

        self.power_l = self.power_l * self.averaging + (sum_l / count) * (1.0 - self.averaging);
        self.power_r = self.power_r * self.averaging + (sum_r / count) * (1.0 - self.averaging);

        let total = self.power_l + self.power_r;
        self.balance = if total > 0.0 {
            (self.power_r - self.power_l) / total
        } else {
            0.0
        };
    }

    /// Balance in [-1, 1]; 0 when both channels are silent.
    pub fn balance(&self) -> f64 {
        self.balance
    }

    /// R/L power ratio in dB; 0 unless both channels carry power.
    pub fn balance_db(&self) -> f64 {
        if self.power_l > 0.0 && self.power_r > 0.0 {
            10.0 * (self.power_r / self.power_l).log10()
        } else {
            0.0
        }
    }
}

impl Meter for BalanceMeter {
    fn reset(&mut self) {
        self.power_l = 0.0;
        self.power_r = 0.0;
        self.balance = 0.0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// WIDTH METER
// ═══════════════════════════════════════════════════════════════════════════════

/// Stereo width meter
///
/// Smoothed mid/side power; width = sqrt(side/mid). 0 means mono, 1 normal
/// stereo, values above 1 extra wide. As mid power approaches zero with
/// nonzero side power the ratio diverges toward infinity; callers must
/// tolerate infinite or NaN results.
pub struct StereoWidthMeter {
    mid_power: f64,
    side_power: f64,
    width: f64,
    averaging: f64,
}

impl Default for StereoWidthMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl StereoWidthMeter {
    pub fn new() -> Self {
        Self {
            mid_power: 0.0,
            side_power: 0.0,
            width: 0.0,
            averaging: 0.95,
        }
    }

    pub fn process(&mut self, samples_l: &[Sample], samples_r: &[Sample]) {
        if samples_l.len() != samples_r.len() {
            log::warn!(
                "width meter: channel length mismatch ({} vs {})",
                samples_l.len(),
                samples_r.len()
            );
            return;
        }
        if samples_l.is_empty() {
            return;
        }

        let mut sum_mid = 0.0;
        let mut sum_side = 0.0;
        for (&l, &r) in samples_l.iter().zip(samples_r) {
            let mid = (l + r) * 0.5;
            let side = (l - r) * 0.5;
            sum_mid += mid * mid;
            sum_side += side * side;
        }

        let count = samples_l.len() as f64;
        self.mid_power =
            self.mid_power * self.averaging + (sum_mid / count) * (1.0 - self.averaging);
        self.side_power =
            self.side_power * self.averaging + (sum_side / count) * (1.0 - self.averaging);

        let total = self.mid_power + self.side_power;
        self.width = if total > 0.0 {
            (self.side_power / self.mid_power).sqrt()
        } else {
            0.0
        };
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    /// Side/mid power ratio in dB; -inf unless both carry power.
    pub fn width_db(&self) -> f64 {
        if self.mid_power > 0.0 && self.side_power > 0.0 {
            10.0 * (self.side_power / self.mid_power).log10()
        } else {
            f64::NEG_INFINITY
        }
    }
}

impl Meter for StereoWidthMeter {
    fn reset(&mut self) {
        self.mid_power = 0.0;
        self.side_power = 0.0;
        self.width = 0.0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPOSITE ANALYZER
// ═══════════════════════════════════════════════════════════════════════════════

/// Aggregated stereo field measurements.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct StereoFieldAnalysis {
    pub correlation: f64,
    pub phase_status: PhaseStatus,
    pub mono_compatibility: f64,
    pub balance: f64,
    pub width: f64,
    pub width_db: f64,
}

/// Composite analyzer owning correlation, balance, and width meters.
///
/// Each sub-meter is independent; the composite only forwards the same
/// input pair to all three.
pub struct StereoFieldAnalyzer {
    correlation: CorrelationMeter,
    balance: BalanceMeter,
    width: StereoWidthMeter,
}

impl StereoFieldAnalyzer {
    pub fn new(window_size: usize, sample_rate: f64) -> Self {
        Self {
            correlation: CorrelationMeter::new(window_size, sample_rate),
            balance: BalanceMeter::new(),
            width: StereoWidthMeter::new(),
        }
    }

    pub fn process(&mut self, samples_l: &[Sample], samples_r: &[Sample]) {
        self.correlation.process(samples_l, samples_r);
        self.balance.process(samples_l, samples_r);
        self.width.process(samples_l, samples_r);
    }

    pub fn analysis(&self) -> StereoFieldAnalysis {
        StereoFieldAnalysis {
            correlation: self.correlation.correlation(),
            phase_status: self.correlation.phase_status(),
            mono_compatibility: self.correlation.mono_compatibility(),
            balance: self.balance.balance(),
            width: self.width.width(),
            width_db: self.width.width_db(),
        }
    }

    pub fn correlation_meter(&self) -> &CorrelationMeter {
        &self.correlation
    }

    pub fn correlation_meter_mut(&mut self) -> &mut CorrelationMeter {
        &mut self.correlation
    }

    pub fn balance_meter(&self) -> &BalanceMeter {
        &self.balance
    }

    pub fn width_meter(&self) -> &StereoWidthMeter {
        &self.width
    }
}

impl Meter for StereoFieldAnalyzer {
    fn reset(&mut self) {
        self.correlation.reset();
        self.balance.reset();
        self.width.reset();
    }
}
