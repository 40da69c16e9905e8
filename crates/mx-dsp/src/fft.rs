//! Radix-2 Cooley-Tukey FFT
//!
//! Iterative decimation-in-time transform over preallocated scratch arrays:
//! bit-reversal permutation followed by log2(N) butterfly stages, each with
//! an incrementally rotated twiddle factor. The inverse transform uses the
//! conjugate-forward-conjugate identity. Transform sizes must be powers of
//! two and are validated at construction.

use mx_core::{MxError, MxResult, Sample};
use rustfft::num_complex::Complex;

use crate::window::Window;

/// FFT engine with a precomputed analysis window.
///
/// Created once per (size, window) pair; `forward`/`inverse` reuse the
/// internal scratch arrays and never allocate on the transform path.
pub struct Fft {
    size: usize,
    window: Window,
    window_data: Vec<f64>,
    re: Vec<f64>,
    im: Vec<f64>,
    magnitude: Vec<f64>,
    phase: Vec<f64>,
}

impl Fft {
    /// Create an FFT engine. `size` must be a non-zero power of two.
    pub fn new(size: usize, window: Window) -> MxResult<Self> {
        if !size.is_power_of_two() {
            return Err(MxError::InvalidFftSize(size));
        }

        Ok(Self {
            size,
            window,
            window_data: window.coefficients(size),
            re: vec![0.0; size],
            im: vec![0.0; size],
            magnitude: vec![0.0; size / 2 + 1],
            phase: vec![0.0; size / 2 + 1],
        })
    }

    #[inline]
    pub fn size(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn window(&self) -> Window {
        self.window
    }

    /// Forward transform of a real signal.
    ///
    /// The input is windowed and zero-padded (or truncated) to the FFT size.
    /// Returns magnitude and phase for bins `0..=size/2`.
    pub fn forward(&mut self, input: &[Sample]) -> (&[f64], &[f64]) {
        let n = input.len().min(self.size);
        for i in 0..n {
            self.re[i] = input[i] * self.window_data[i];
            self.im[i] = 0.0;
        }
        for i in n..self.size {
            self.re[i] = 0.0;
            self.im[i] = 0.0;
        }

        radix2(&mut self.re, &mut self.im);

        for i in 0..=self.size / 2 {
            self.magnitude[i] = (self.re[i] * self.re[i] + self.im[i] * self.im[i]).sqrt();
            self.phase[i] = self.im[i].atan2(self.re[i]);
        }

        (&self.magnitude, &self.phase)
    }

    /// Forward transform of a complex signal, returning the full N-bin
    /// spectrum.
    pub fn forward_complex(&mut self, input: &[Complex<f64>]) -> Vec<Complex<f64>> {
        let n = input.len().min(self.size);
        for i in 0..n {
            let c = input[i] * self.window_data[i];
            self.re[i] = c.re;
            self.im[i] = c.im;
        }
        for i in n..self.size {
            self.re[i] = 0.0;
            self.im[i] = 0.0;
        }

        radix2(&mut self.re, &mut self.im);

        (0..self.size)
            .map(|i| Complex::new(self.re[i], self.im[i]))
            .collect()
    }

    /// Inverse transform via the conjugate-forward-conjugate identity,
    /// scaled by 1/N. Inputs shorter than the FFT size are zero-padded.
    pub fn inverse(&mut self, re: &[f64], im: &[f64]) -> Vec<f64> {
        let n = re.len().min(im.len()).min(self.size);
        self.re[..n].copy_from_slice(&re[..n]);
        for i in 0..n {
            self.im[i] = -im[i];
        }
        for i in n..self.size {
            self.re[i] = 0.0;
            self.im[i] = 0.0;
        }

        radix2(&mut self.re, &mut self.im);

        let scale = 1.0 / self.size as f64;
        self.re.iter().map(|&r| r * scale).collect()
    }

    /// Magnitude spectrum from the last `forward` call.
    #[inline]
    pub fn magnitude(&self) -> &[f64] {
        &self.magnitude
    }

    /// Phase spectrum from the last `forward` call.
    #[inline]
    pub fn phase(&self) -> &[f64] {
        &self.phase
    }

    /// Magnitude spectrum in decibels, floored at -120 dB.
    pub fn magnitude_db(&self) -> Vec<f64> {
        self.magnitude
            .iter()
            .map(|&mag| if mag > 0.0 { 20.0 * mag.log10() } else { -120.0 })
            .collect()
    }

    /// Center frequency of a bin.
    #[inline]
    pub fn frequency_for_bin(&self, bin: usize, sample_rate: f64) -> f64 {
        bin as f64 * sample_rate / self.size as f64
    }
}

/// In-place radix-2 DIT transform over parallel real/imaginary arrays.
fn radix2(re: &mut [f64], im: &mut [f64]) {
    let n = re.len();

    // Bit-reversal permutation
    let mut j = 0;
    for i in 0..n {
        if i < j {
            re.swap(i, j);
            im.swap(i, j);
        }
        let mut m = n >> 1;
        while m >= 1 && j >= m {
            j -= m;
            m >>= 1;
        }
        j += m;
    }

    // Butterfly stages
    let mut stage = 2;
    while stage <= n {
        let theta = -2.0 * std::f64::consts::PI / stage as f64;
        let w_re = theta.cos();
        let w_im = theta.sin();

        let mut k = 0;
        while k < n {
            let mut wt_re = 1.0;
            let mut wt_im = 0.0;

            for j in 0..stage / 2 {
                let i1 = k + j;
                let i2 = i1 + stage / 2;

                let t_re = wt_re * re[i2] - wt_im * im[i2];
                let t_im = wt_re * im[i2] + wt_im * re[i2];

                re[i2] = re[i1] - t_re;
                im[i2] = im[i1] - t_im;
                re[i1] += t_re;
                im[i1] += t_im;

                let old_re = wt_re;
                wt_re = old_re * w_re - wt_im * w_im;
                wt_im = old_re * w_im + wt_im * w_re;
            }

            k += stage;
        }

        stage <<= 1;
    }
}

/// Power spectrum from a magnitude spectrum (element-wise square).
pub fn power_spectrum(magnitude: &[f64]) -> Vec<f64> {
    magnitude.iter().map(|&mag| mag * mag).collect()
}

/// Cross-correlation of two equal-length signals via the frequency domain.
///
/// Both signals are zero-padded to the next power of two >= 2n, transformed,
/// multiplied as A * conj(B), and inverse-transformed. The circular result
/// is rotated into a signed-lag array of length 2n-1 with negative lags
/// first; autocorrelation therefore peaks at index n-1.
pub fn cross_correlation(a: &[Sample], b: &[Sample]) -> MxResult<Vec<f64>> {
    if a.len() != b.len() {
        return Err(MxError::ChannelMismatch {
            left: a.len(),
            right: b.len(),
        });
    }

    let n = a.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut size = 1;
    while size < 2 * n {
        size <<= 1;
    }

    let mut fft = Fft::new(size, Window::Rectangular)?;

    let padded_a: Vec<Complex<f64>> = a.iter().map(|&x| Complex::new(x, 0.0)).collect();
    let padded_b: Vec<Complex<f64>> = b.iter().map(|&x| Complex::new(x, 0.0)).collect();

    let spec_a = fft.forward_complex(&padded_a);
    let spec_b = fft.forward_complex(&padded_b);

    let mut re = vec![0.0; size];
    let mut im = vec![0.0; size];
    for i in 0..size {
        let product = spec_a[i] * spec_b[i].conj();
        re[i] = product.re;
        im[i] = product.im;
    }

    let correlation = fft.inverse(&re, &im);

    let mut result = vec![0.0; 2 * n - 1];
    // Negative lags come from the tail of the circular result
    for i in 0..n - 1 {
        result[i] = correlation[size - n + 1 + i];
    }
    // Zero and positive lags
    result[n - 1..].copy_from_slice(&correlation[..n]);

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(Fft::new(1000, Window::Hann).is_err());
        assert!(Fft::new(0, Window::Hann).is_err());
        assert!(Fft::new(1024, Window::Hann).is_ok());
    }

    #[test]
    fn test_sine_peak_detection() {
        let windows = [
            Window::Rectangular,
            Window::Hann,
            Window::Hamming,
            Window::Blackman,
            Window::BlackmanHarris,
            Window::Kaiser,
            Window::FlatTop,
        ];
        let size = 2048;
        let sample_rate = 44100.0;
        let freq = 440.0;

        for window in windows {
            let mut fft = Fft::new(size, window).unwrap();
            let input: Vec<f64> = (0..size)
                .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin())
                .collect();

            let (magnitude, _) = fft.forward(&input);

            let mut max_mag = 0.0;
            let mut max_bin = 0;
            for (i, &mag) in magnitude.iter().enumerate() {
                if mag > max_mag {
                    max_mag = mag;
                    max_bin = i;
                }
            }

            let peak_freq = fft.frequency_for_bin(max_bin, sample_rate);
            let tolerance = sample_rate / size as f64;
            assert!(
                (peak_freq - freq).abs() <= tolerance,
                "{window:?}: peak at {peak_freq} Hz, expected {freq} Hz"
            );
        }
    }

    #[test]
    fn test_inverse_round_trip() {
        let size = 1024;
        let sample_rate = 44100.0;
        let mut fft = Fft::new(size, Window::Rectangular).unwrap();

        let freqs = [100.0, 250.0, 500.0];
        let input: Vec<f64> = (0..size)
            .map(|i| {
                freqs
                    .iter()
                    .map(|f| (2.0 * PI * f * i as f64 / sample_rate).sin())
                    .sum::<f64>()
                    / freqs.len() as f64
            })
            .collect();

        let spectrum: Vec<Complex<f64>> = {
            let complex_in: Vec<Complex<f64>> =
                input.iter().map(|&x| Complex::new(x, 0.0)).collect();
            fft.forward_complex(&complex_in)
        };

        let re: Vec<f64> = spectrum.iter().map(|c| c.re).collect();
        let im: Vec<f64> = spectrum.iter().map(|c| c.im).collect();
        let output = fft.inverse(&re, &im);

        for i in 0..size {
            assert!(
                (output[i] - input[i]).abs() < 1e-10,
                "round trip diverged at {i}: {} vs {}",
                output[i],
                input[i]
            );
        }
    }

    #[test]
    fn test_magnitude_db_floor() {
        let mut fft = Fft::new(64, Window::Rectangular).unwrap();
        fft.forward(&vec![0.0; 64]);
        for &db in &fft.magnitude_db() {
            assert_eq!(db, -120.0);
        }
    }

    #[test]
    fn test_power_spectrum() {
        let magnitude = [0.0, 1.0, 2.0, 0.5];
        let power = power_spectrum(&magnitude);
        for (p, m) in power.iter().zip(&magnitude) {
            assert!((p - m * m).abs() < 1e-12);
        }
    }

    #[test]
    fn test_autocorrelation_peaks_at_zero_lag() {
        let n = 128;
        let signal: Vec<f64> = (0..n).map(|i| (i as f64 * 0.3).sin()).collect();

        let result = cross_correlation(&signal, &signal).unwrap();
        assert_eq!(result.len(), 2 * n - 1);

        let mut max_idx = 0;
        let mut max_val = f64::NEG_INFINITY;
        for (i, &v) in result.iter().enumerate() {
            if v > max_val {
                max_val = v;
                max_idx = i;
            }
        }
        assert_eq!(max_idx, n - 1, "autocorrelation must peak at zero lag");
    }

    #[test]
    fn test_cross_correlation_length_mismatch() {
        let a = vec![0.0; 16];
        let b = vec![0.0; 15];
        assert!(cross_correlation(&a, &b).is_err());
    }

    #[test]
    fn test_frequency_for_bin() {
        let fft = Fft::new(1024, Window::Hann).unwrap();
        assert!((fft.frequency_for_bin(0, 48000.0)).abs() < 1e-12);
        assert!((fft.frequency_for_bin(512, 48000.0) - 24000.0).abs() < 1e-9);
    }
}
