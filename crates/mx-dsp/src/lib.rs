//! mx-dsp: Real-time audio measurement algorithms for Metrix
//!
//! Every meter is a fixed-capacity state machine: constructed once with its
//! window/FFT size, sample rate, and channel count, then fed sample blocks
//! from the audio callback. Accessors can be polled from another thread by
//! wrapping a meter in [`shared::Shared`].
//!
//! ## Modules
//! - `window` - Analysis window functions (Hann, Kaiser, Blackman-Harris, ...)
//! - `fft` - Radix-2 Cooley-Tukey FFT with cross-correlation
//! - `spectrum` - Framing spectrum analyzer with hop/overlap and averaging
//! - `stereo` - Correlation, balance, and width meters
//! - `meters` - Peak and RMS level meters
//! - `biquad` - Second-order IIR sections (K-weighting designs)
//! - `loudness` - ITU-R BS.1770-4 LUFS meter
//! - `phasescope` - Phase scope / vector scope point data
//! - `shared` - Monitor wrapper for cross-thread metering

pub mod biquad;
pub mod fft;
pub mod loudness;
pub mod meters;
pub mod phasescope;
pub mod shared;
pub mod spectrum;
pub mod stereo;
pub mod window;

/// Trait for all meters: streaming state that can be cleared in place.
///
/// `reset` zeroes accumulators and delay memory without reallocating.
pub trait Meter: Send {
    fn reset(&mut self);
}
