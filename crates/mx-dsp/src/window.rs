//! Analysis window functions
//!
//! All windows are precomputed once per FFT instance. Coefficients are
//! symmetric and lie in [0, 1]; the cosine-sum windows with negative lobes
//! (Blackman, flat-top) are clamped at zero.

use std::f64::consts::PI;

/// Window function selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Window {
    Rectangular,
    Hann,
    Hamming,
    Blackman,
    BlackmanHarris,
    Kaiser,
    FlatTop,
}

impl Window {
    /// Compute the window coefficient sequence of length `n`.
    pub fn coefficients(self, n: usize) -> Vec<f64> {
        if n < 2 {
            return vec![1.0; n];
        }

        let m = (n - 1) as f64;

        match self {
            Window::Rectangular => vec![1.0; n],

            Window::Hann => (0..n)
                .map(|i| 0.5 * (1.0 - (2.0 * PI * i as f64 / m).cos()))
                .collect(),

            Window::Hamming => (0..n)
                .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / m).cos())
                .collect(),

            Window::Blackman => (0..n)
                .map(|i| {
                    let x = i as f64 / m;
                    let val = 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos();
                    val.max(0.0)
                })
                .collect(),

            Window::BlackmanHarris => {
                let (a0, a1, a2, a3) = (0.35875, 0.48829, 0.14128, 0.01168);
                (0..n)
                    .map(|i| {
                        let x = i as f64 / m;
                        a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
                            - a3 * (6.0 * PI * x).cos()
                    })
                    .collect()
            }

            Window::Kaiser => {
                // beta = 8.6 gives good sidelobe suppression
                let beta = 8.6;
                let denom = bessel_i0(beta);
                (0..n)
                    .map(|i| {
                        let x = 2.0 * i as f64 / m - 1.0;
                        bessel_i0(beta * (1.0 - x * x).sqrt()) / denom
                    })
                    .collect()
            }

            Window::FlatTop => {
                let (a0, a1, a2, a3, a4) =
                    (0.21557895, 0.41663158, 0.277263158, 0.083578947, 0.006947368);
                (0..n)
                    .map(|i| {
                        let x = i as f64 / m;
                        let val = a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
                            - a3 * (6.0 * PI * x).cos()
                            + a4 * (8.0 * PI * x).cos();
                        val.max(0.0)
                    })
                    .collect()
            }
        }
    }
}

/// Modified Bessel function of the first kind, order 0.
///
/// Polynomial series for |x| < 3.75, asymptotic expansion otherwise
/// (Abramowitz & Stegun 9.8.1 / 9.8.2).
fn bessel_i0(x: f64) -> f64 {
    if x == 0.0 {
        return 1.0;
    }

    let ax = x.abs();

    if ax < 3.75 {
        let y = (x / 3.75) * (x / 3.75);
        1.0 + y
            * (3.5156229
                + y * (3.0899424
                    + y * (1.2067492 + y * (0.2659732 + y * (0.360768e-1 + y * 0.45813e-2)))))
    } else {
        let y = 3.75 / ax;
        (ax.exp() / ax.sqrt())
            * (0.39894228
                + y * (0.1328592e-1
                    + y * (0.225319e-2
                        + y * (-0.157565e-2
                            + y * (0.916281e-2
                                + y * (-0.2057706e-1
                                    + y * (0.2635537e-1
                                        + y * (-0.1647633e-1 + y * 0.392377e-2))))))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_WINDOWS: [Window; 7] = [
        Window::Rectangular,
        Window::Hann,
        Window::Hamming,
        Window::Blackman,
        Window::BlackmanHarris,
        Window::Kaiser,
        Window::FlatTop,
    ];

    #[test]
    fn test_coefficients_in_range() {
        for window in ALL_WINDOWS {
            let coeffs = window.coefficients(1024);
            for &c in &coeffs {
                assert!(c >= 0.0, "{window:?}: negative coefficient {c}");
                assert!(c <= 1.0001, "{window:?}: coefficient > 1: {c}");
            }
        }
    }

    #[test]
    fn test_coefficients_symmetric() {
        let n = 1024;
        for window in ALL_WINDOWS {
            let coeffs = window.coefficients(n);
            for i in 0..n / 2 {
                assert!(
                    (coeffs[i] - coeffs[n - 1 - i]).abs() < 1e-10,
                    "{window:?}: asymmetric at {i}: {} != {}",
                    coeffs[i],
                    coeffs[n - 1 - i]
                );
            }
        }
    }

    #[test]
    fn test_hann_endpoints() {
        let coeffs = Window::Hann.coefficients(512);
        assert!(coeffs[0].abs() < 1e-12);
        assert!(coeffs[511].abs() < 1e-10);
        // Peak at the center
        assert!((coeffs[255] - 1.0).abs() < 1e-4);
    }

    #[test]
    fn test_bessel_i0() {
        // I0(0) = 1, I0(1) ~ 1.26607, I0(5) ~ 27.2399 (crosses into the
        // asymptotic regime)
        assert!((bessel_i0(0.0) - 1.0).abs() < 1e-12);
        assert!((bessel_i0(1.0) - 1.26607).abs() < 1e-4);
        assert!((bessel_i0(5.0) - 27.2399).abs() < 0.01);
    }
}
