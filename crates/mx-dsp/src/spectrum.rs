//! Framing spectrum analyzer
//!
//! Wraps the FFT core with an input ring, hop/overlap framing, and
//! time-averaging. A single `process` call may produce zero, one, or many
//! spectrum updates depending on input length versus hop size.

use mx_core::{MxResult, Sample};

use crate::Meter;
use crate::fft::Fft;
use crate::window::Window;

/// Spectrum averaging policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum AveragingMode {
    None,
    Exponential,
    Linear,
    PeakHold,
}

/// Real-time spectrum analyzer
pub struct SpectrumAnalyzer {
    fft_size: usize,
    sample_rate: f64,
    fft: Fft,
    buffer: Vec<f64>,
    write_pos: usize,
    hop_size: usize,
    averaging: AveragingMode,
    avg_history: Vec<Vec<f64>>,
    avg_write_pos: usize,
    avg_count: usize,
    smoothing: f64,
    min_freq: f64,
    max_freq: f64,
    min_bin: usize,
    max_bin: usize,
    frame: Vec<f64>,
    output: Vec<f64>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer. `fft_size` must be a power of two.
    pub fn new(fft_size: usize, sample_rate: f64, window: Window) -> MxResult<Self> {
        let mut sa = Self {
            fft_size,
            sample_rate,
            fft: Fft::new(fft_size, window)?,
            buffer: vec![0.0; fft_size],
            write_pos: 0,
            hop_size: fft_size / 2, // 50% overlap by default
            averaging: AveragingMode::None,
            avg_history: Vec::new(),
            avg_write_pos: 0,
            avg_count: 0,
            smoothing: 0.9,
            min_freq: 20.0,
            max_freq: sample_rate / 2.0,
            min_bin: 0,
            max_bin: 0,
            frame: vec![0.0; fft_size / 2 + 1],
            output: vec![0.0; fft_size / 2 + 1],
        };

        sa.update_bin_range();
        Ok(sa)
    }

    /// Set the hop size (samples advanced per FFT frame).
    /// Values outside (0, fft_size] are ignored.
    pub fn set_hop_size(&mut self, hop_size: usize) {
        if hop_size > 0 && hop_size <= self.fft_size {
            self.hop_size = hop_size;
        } else {
            log::debug!("ignoring hop size {hop_size} for FFT size {}", self.fft_size);
        }
    }

    /// Set the averaging mode and, for linear averaging, the history depth.
    pub fn set_averaging(&mut self, mode: AveragingMode, depth: usize) {
        self.averaging = mode;
        if mode != AveragingMode::None && depth > 0 {
            self.avg_history = vec![vec![0.0; self.fft_size / 2 + 1]; depth];
            self.avg_write_pos = 0;
            self.avg_count = 0;
        }
    }

    /// Set the exponential averaging weight. Values outside [0, 1] are
    /// ignored.
    pub fn set_smoothing(&mut self, smoothing: f64) {
        if (0.0..=1.0).contains(&smoothing) {
            self.smoothing = smoothing;
        } else {
            log::debug!("ignoring smoothing factor {smoothing}");
        }
    }

    /// Restrict the bin range used by the range-limited queries.
    pub fn set_frequency_range(&mut self, min_freq: f64, max_freq: f64) {
        self.min_freq = min_freq.max(0.0);
        self.max_freq = max_freq.min(self.sample_rate / 2.0);
        self.update_bin_range();
    }

    fn update_bin_range(&mut self) {
        let bin_width = self.sample_rate / self.fft_size as f64;
        self.min_bin = (self.min_freq / bin_width) as usize;
        self.max_bin = ((self.max_freq / bin_width) as usize + 1).min(self.fft_size / 2);
    }

    /// Feed samples. Returns true when at least one new spectrum was
    /// produced during this call.
    pub fn process(&mut self, samples: &[Sample]) -> bool {
        let mut spectrum_ready = false;

        for &sample in samples {
            self.buffer[self.write_pos] = sample;
            self.write_pos += 1;

            if self.write_pos >= self.fft_size {
                self.fft.forward(&self.buffer);
                self.frame.copy_from_slice(self.fft.magnitude());
                self.apply_averaging();

                // Shift the buffer left by the hop size, keeping the overlap
                if self.hop_size < self.fft_size {
                    self.buffer.copy_within(self.hop_size.., 0);
                    self.write_pos = self.fft_size - self.hop_size;
                } else {
                    self.write_pos = 0;
                }

                spectrum_ready = true;
            }
        }

        spectrum_ready
    }

    fn apply_averaging(&mut self) {
        match self.averaging {
            AveragingMode::None => {
                self.output.copy_from_slice(&self.frame);
            }

            AveragingMode::Exponential => {
                for (out, &mag) in self.output.iter_mut().zip(&self.frame) {
                    *out = *out * self.smoothing + mag * (1.0 - self.smoothing);
                }
            }

            AveragingMode::Linear => {
                if !self.avg_history.is_empty() {
                    self.avg_history[self.avg_write_pos].copy_from_slice(&self.frame);
                    self.avg_write_pos = (self.avg_write_pos + 1) % self.avg_history.len();
                    if self.avg_count < self.avg_history.len() {
                        self.avg_count += 1;
                    }

                    for i in 0..self.output.len() {
                        let sum: f64 = self.avg_history[..self.avg_count]
                            .iter()
                            .map(|spectrum| spectrum[i])
                            .sum();
                        self.output[i] = sum / self.avg_count as f64;
                    }
                }
            }

            AveragingMode::PeakHold => {
                for (out, &mag) in self.output.iter_mut().zip(&self.frame) {
                    if mag > *out {
                        *out = mag;
                    }
                }
            }
        }
    }

    /// Current magnitude spectrum (length fft_size/2 + 1).
    pub fn spectrum(&self) -> &[f64] {
        &self.output
    }

    /// Current spectrum in decibels, floored at -120 dB.
    pub fn spectrum_db(&self) -> Vec<f64> {
        self.output
            .iter()
            .map(|&mag| if mag > 0.0 { 20.0 * mag.log10() } else { -120.0 })
            .collect()
    }

    /// Spectrum restricted to the configured frequency range.
    pub fn spectrum_in_range(&self) -> &[f64] {
        if self.min_bin >= self.max_bin {
            return &[];
        }
        &self.output[self.min_bin..self.max_bin]
    }

    /// Range-restricted spectrum in decibels.
    pub fn spectrum_db_in_range(&self) -> Vec<f64> {
        self.spectrum_in_range()
            .iter()
            .map(|&mag| if mag > 0.0 { 20.0 * mag.log10() } else { -120.0 })
            .collect()
    }

    /// Frequency and magnitude of the strongest bin in the configured range.
    pub fn peak_frequency(&self) -> (f64, f64) {
        let mut max_mag = 0.0;
        let mut max_bin = 0;

        for i in self.min_bin..self.max_bin.min(self.output.len()) {
            if self.output[i] > max_mag {
                max_mag = self.output[i];
                max_bin = i;
            }
        }

        (self.frequency_for_bin(max_bin), max_mag)
    }

    /// Total energy (sum of squared magnitude) in a frequency band.
    /// An inverted or fully out-of-range band yields 0.
    pub fn band_energy(&self, min_freq: f64, max_freq: f64) -> f64 {
        let min_bin = self.bin_for_frequency(min_freq);
        let max_bin = self.bin_for_frequency(max_freq).min(self.output.len() - 1);
        if min_bin > max_bin {
            return 0.0;
        }

        self.output[min_bin..=max_bin]
            .iter()
            .map(|&mag| mag * mag)
            .sum()
    }

    /// RMS magnitude per octave band spanning [center/sqrt2, center*sqrt2].
    pub fn octave_bands(&self, center_freqs: &[f64]) -> Vec<f64> {
        center_freqs
            .iter()
            .map(|&center| {
                let lower = self.bin_for_frequency(center / std::f64::consts::SQRT_2);
                let upper = self.bin_for_frequency(center * std::f64::consts::SQRT_2);

                let mut energy = 0.0;
                let mut count = 0;
                for bin in lower..=upper.min(self.output.len().saturating_sub(1)) {
                    energy += self.output[bin] * self.output[bin];
                    count += 1;
                }

                if count > 0 {
                    (energy / count as f64).sqrt()
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// Center frequency of a bin.
    #[inline]
    pub fn frequency_for_bin(&self, bin: usize) -> f64 {
        bin as f64 * self.sample_rate / self.fft_size as f64
    }

    /// Bin index of a frequency.
    #[inline]
    pub fn bin_for_frequency(&self, freq: f64) -> usize {
        (freq.max(0.0) * self.fft_size as f64 / self.sample_rate) as usize
    }
}

impl Meter for SpectrumAnalyzer {
    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.frame.fill(0.0);
        self.output.fill(0.0);
        self.write_pos = 0;
        self.avg_write_pos = 0;
        self.avg_count = 0;
        for spectrum in &mut self.avg_history {
            spectrum.fill(0.0);
        }
    }
}

/// Standard ISO octave band center frequencies (31.5 Hz .. 16 kHz).
pub fn standard_octave_bands() -> Vec<f64> {
    vec![
        31.5, 63.0, 125.0, 250.0, 500.0, 1000.0, 2000.0, 4000.0, 8000.0, 16000.0,
    ]
}

/// Standard 1/3-octave band center frequencies within [20, 20000] Hz,
/// generated as 1000 * 2^(i/3).
pub fn standard_third_octave_bands() -> Vec<f64> {
    let base = 1000.0;
    (-16..=13)
        .map(|i| base * 2.0_f64.powf(i as f64 / 3.0))
        .filter(|&f| (20.0..=20000.0).contains(&f))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
            .collect()
    }

    #[test]
    fn test_process_reports_new_spectrum() {
        let mut sa = SpectrumAnalyzer::new(1024, 48000.0, Window::Hann).unwrap();

        assert!(!sa.process(&sine(1000.0, 48000.0, 512)));
        assert!(sa.process(&sine(1000.0, 48000.0, 512)));
        // Hop is 512, so another 512 samples produce the next frame
        assert!(sa.process(&sine(1000.0, 48000.0, 512)));
    }

    #[test]
    fn test_peak_frequency() {
        let mut sa = SpectrumAnalyzer::new(4096, 48000.0, Window::Hann).unwrap();
        sa.process(&sine(1000.0, 48000.0, 4096));

        let (freq, mag) = sa.peak_frequency();
        let bin_width = 48000.0 / 4096.0;
        assert!((freq - 1000.0).abs() <= bin_width, "peak at {freq} Hz");
        assert!(mag > 0.0);
    }

    #[test]
    fn test_peak_hold_never_decays() {
        let mut sa = SpectrumAnalyzer::new(1024, 48000.0, Window::Hann).unwrap();
        sa.set_averaging(AveragingMode::PeakHold, 1);

        sa.process(&sine(1000.0, 48000.0, 1024));
        let held = sa.spectrum().to_vec();

        sa.process(&vec![0.0; 4096]);
        for (now, then) in sa.spectrum().iter().zip(&held) {
            assert!(now >= then);
        }
    }

    #[test]
    fn test_linear_averaging_matches_mean() {
        let mut sa = SpectrumAnalyzer::new(256, 48000.0, Window::Rectangular).unwrap();
        sa.set_hop_size(256);
        sa.set_averaging(AveragingMode::Linear, 4);

        // Two frames: one sine frame, one silent frame
        let tone = sine(3000.0, 48000.0, 256);
        sa.process(&tone);
        let first = sa.spectrum().to_vec();
        sa.process(&vec![0.0; 256]);

        // With two frames stored, output is their arithmetic mean; the
        // silent frame halves every bin of the first.
        for (avg, full) in sa.spectrum().iter().zip(&first) {
            assert!((avg - full / 2.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_range_queries() {
        let mut sa = SpectrumAnalyzer::new(1024, 48000.0, Window::Hann).unwrap();
        sa.process(&sine(1000.0, 48000.0, 1024));

        sa.set_frequency_range(500.0, 2000.0);
        let in_range = sa.spectrum_in_range();
        assert!(!in_range.is_empty());
        assert!(in_range.len() < sa.spectrum().len());

        // Inverted range yields nothing
        sa.set_frequency_range(10000.0, 1000.0);
        assert!(sa.spectrum_in_range().is_empty());
    }

    #[test]
    fn test_band_energy_concentrated_at_tone() {
        let mut sa = SpectrumAnalyzer::new(4096, 48000.0, Window::Hann).unwrap();
        sa.process(&sine(1000.0, 48000.0, 4096));

        let near = sa.band_energy(900.0, 1100.0);
        let far = sa.band_energy(4000.0, 8000.0);
        assert!(near > far * 100.0);
    }

    #[test]
    fn test_band_energy_degenerate_ranges() {
        let mut sa = SpectrumAnalyzer::new(1024, 48000.0, Window::Hann).unwrap();
        sa.process(&sine(1000.0, 48000.0, 1024));

        // Inverted band
        assert_eq!(sa.band_energy(8000.0, 4000.0), 0.0);
        // Both limits above Nyquist
        assert_eq!(sa.band_energy(30000.0, 40000.0), 0.0);
        // A band clipped at Nyquist still sums what exists
        assert!(sa.band_energy(0.0, 96000.0) > 0.0);
    }

    #[test]
    fn test_octave_band_helpers() {
        let octaves = standard_octave_bands();
        assert_eq!(octaves.len(), 10);
        assert_eq!(octaves[0], 31.5);
        assert_eq!(octaves[9], 16000.0);

        let thirds = standard_third_octave_bands();
        assert!(thirds.iter().all(|&f| (20.0..=20000.0).contains(&f)));
        // Successive centers are a third of an octave apart
        for pair in thirds.windows(2) {
            assert!((pair[1] / pair[0] - 2.0_f64.powf(1.0 / 3.0)).abs() < 1e-9);
        }
    }

    #[test]
    fn test_reset() {
        let mut sa = SpectrumAnalyzer::new(1024, 48000.0, Window::Hann).unwrap();
        sa.process(&sine(1000.0, 48000.0, 2048));
        assert!(sa.spectrum().iter().any(|&m| m > 0.0));

        sa.reset();
        assert!(sa.spectrum().iter().all(|&m| m == 0.0));
    }
}
