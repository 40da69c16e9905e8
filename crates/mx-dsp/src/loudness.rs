//! ITU-R BS.1770-4 loudness measurement
//!
//! K-weighting (shelving pre-filter + RLB high-pass per channel) feeding
//! three measurement paths:
//! - momentary: 400 ms blocks, 100 ms update
//! - short-term: 3 s blocks, 100 ms update
//! - integrated: gated mean over 100 ms blocks with absolute (-70 LUFS)
//!   and relative (-10 LU) gates, plus loudness range (LRA) from the
//!   10th/95th percentiles
//!
//! Input is interleaved across channels. All loudness values are LUFS;
//! -inf means not enough data yet.

use mx_core::Sample;

use crate::Meter;
use crate::biquad::{Biquad, BiquadCoeffs};

const ABSOLUTE_GATE_LUFS: f64 = -70.0;
const RELATIVE_GATE_LU: f64 = -10.0;

/// Per-channel BS.1770-4 weight.
///
/// Stereo: both 1.0. 5.1: L/R/C 1.0, LFE 0.0, surrounds 1.41. The LFE
/// test runs first so six-channel layouts mute index 3 instead of
/// boosting it.
fn channel_weight(channels: usize, ch: usize) -> f64 {
    if channels > 5 && ch == 3 {
        0.0
    } else if channels > 2 && (3..=4).contains(&ch) {
        1.41
    } else {
        1.0
    }
}

/// Overlapping measurement block over an interleaved buffer.
///
/// Fills to `block_size` frames, records the per-channel mean square into
/// a rotating history, then shifts the buffer left so `overlap` frames
/// carry over into the next block.
struct BlockAccumulator {
    block_size: usize,
    overlap: usize,
    channels: usize,
    buffer: Vec<f64>,
    pos: usize,
    history: Vec<Vec<f64>>,
    write_pos: usize,
}

impl BlockAccumulator {
    fn new(block_size: usize, overlap: usize, channels: usize, history_len: usize) -> Self {
        Self {
            block_size,
            overlap,
            channels,
            buffer: vec![0.0; block_size * channels],
            pos: 0,
            history: vec![vec![0.0; channels]; history_len],
            write_pos: 0,
        }
    }

    fn push(&mut self, sample: f64) {
        self.buffer[self.pos] = sample;
        self.pos += 1;

        if self.pos >= self.buffer.len() {
            for ch in 0..self.channels {
                let mut power = 0.0;
                let mut count = 0usize;
                let mut i = ch;
                while i < self.buffer.len() {
                    power += self.buffer[i] * self.buffer[i];
                    count += 1;
                    i += self.channels;
                }
                self.history[self.write_pos][ch] = power / count as f64;
            }
            self.write_pos = (self.write_pos + 1) % self.history.len();

            let shift = (self.block_size - self.overlap) * self.channels;
            self.buffer.copy_within(shift.., 0);
            self.pos = self.overlap * self.channels;
        }
    }

    /// Mean loudness over the valid history entries, -inf when none.
    fn loudness(&self) -> f64 {
        let mut total = 0.0;
        let mut valid = 0usize;

        for powers in &self.history {
            let mut block_power = 0.0;
            for (ch, &power) in powers.iter().enumerate() {
                block_power += channel_weight(self.channels, ch) * power;
            }
            if block_power > 0.0 {
                let loudness = -0.691 + 10.0 * block_power.log10();
                total += 10.0_f64.powf(loudness / 10.0);
                valid += 1;
            }
        }

        if valid == 0 {
            return f64::NEG_INFINITY;
        }
        10.0 * (total / valid as f64).log10()
    }

    fn reset(&mut self) {
        self.buffer.fill(0.0);
        self.pos = 0;
        for powers in &mut self.history {
            powers.fill(0.0);
        }
        self.write_pos = 0;
    }
}

/// BS.1770-4 loudness meter over interleaved multichannel input.
pub struct LufsMeter {
    channels: usize,
    pre_filters: Vec<Biquad>,
    shelf_filters: Vec<Biquad>,
    momentary: BlockAccumulator,
    short_term: BlockAccumulator,
    // 100 ms accumulator feeding the integrated/LRA history, independent
    // of the host block size
    integrated_buffer: Vec<f64>,
    integrated_pos: usize,
    integrated_blocks: Vec<f64>,
}

impl LufsMeter {
    pub fn new(sample_rate: f64, channels: usize) -> Self {
        let pre = BiquadCoeffs::k_weighting_pre_filter(sample_rate);
        let shelf = BiquadCoeffs::k_weighting_high_shelf(sample_rate);

        let momentary_size = (0.4 * sample_rate) as usize;
        let momentary_overlap = (0.3 * sample_rate) as usize;
        let short_term_size = (3.0 * sample_rate) as usize;
        let short_term_overlap = (2.9 * sample_rate) as usize;
        let integrated_size = (0.1 * sample_rate) as usize;

        Self {
            channels,
            pre_filters: vec![Biquad::new(pre); channels],
            shelf_filters: vec![Biquad::new(shelf); channels],
            momentary: BlockAccumulator::new(momentary_size, momentary_overlap, channels, 1),
            short_term: BlockAccumulator::new(short_term_size, short_term_overlap, channels, 30),
            integrated_buffer: vec![0.0; integrated_size * channels],
            integrated_pos: 0,
            integrated_blocks: Vec::new(),
        }
    }

    #[inline]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Feed interleaved samples (frame = one sample per channel). A
    /// trailing partial frame is dropped.
    pub fn process(&mut self, samples: &[Sample]) {
        if samples.len() % self.channels != 0 {
            log::debug!(
                "lufs meter: dropping {} trailing samples of a partial frame",
                samples.len() % self.channels
            );
        }

        for frame in samples.chunks_exact(self.channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                let filtered = self.shelf_filters[ch].process(self.pre_filters[ch].process(sample));

                self.momentary.push(filtered);
                self.short_term.push(filtered);

                self.integrated_buffer[self.integrated_pos] = filtered;
                self.integrated_pos += 1;
            }

            if self.integrated_pos >= self.integrated_buffer.len() {
                self.flush_integrated_block();
            }
        }
    }

    /// Convert the filled 100 ms buffer into one gating-history entry.
    fn flush_integrated_block(&mut self) {
        let mut mean_square = 0.0;
        for ch in 0..self.channels {
            let mut power = 0.0;
            let mut count = 0usize;
            let mut i = ch;
            while i < self.integrated_buffer.len() {
                power += self.integrated_buffer[i] * self.integrated_buffer[i];
                count += 1;
                i += self.channels;
            }
            mean_square += channel_weight(self.channels, ch) * power / count as f64;
        }

        if mean_square > 0.0 {
            self.integrated_blocks
                .push(-0.691 + 10.0 * mean_square.log10());
        }
        self.integrated_pos = 0;
    }

    /// Momentary loudness (400 ms window) in LUFS.
    pub fn momentary_lufs(&self) -> f64 {
        self.momentary.loudness()
    }

    /// Short-term loudness (3 s window) in LUFS.
    pub fn short_term_lufs(&self) -> f64 {
        self.short_term.loudness()
    }

    /// Integrated loudness with two-pass gating in LUFS.
    pub fn integrated_lufs(&self) -> f64 {
        if self.integrated_blocks.is_empty() {
            return f64::NEG_INFINITY;
        }

        // Pass 1: ungated mean sets the relative threshold
        let sum: f64 = self
            .integrated_blocks
            .iter()
            .map(|&l| 10.0_f64.powf(l / 10.0))
            .sum();
        let ungated = 10.0 * (sum / self.integrated_blocks.len() as f64).log10();

        if !self
            .integrated_blocks
            .iter()
            .any(|&l| l >= ABSOLUTE_GATE_LUFS)
        {
            return f64::NEG_INFINITY;
        }

        // Pass 2: survivors of both gates
        let relative_threshold = ungated + RELATIVE_GATE_LU;
        let mut sum = 0.0;
        let mut count = 0usize;
        for &l in &self.integrated_blocks {
            if l >= ABSOLUTE_GATE_LUFS && l >= relative_threshold {
                sum += 10.0_f64.powf(l / 10.0);
                count += 1;
            }
        }

        if count == 0 {
            return f64::NEG_INFINITY;
        }
        10.0 * (sum / count as f64).log10()
    }

    /// Loudness range (LRA) in LU from the 10th and 95th percentiles of
    /// the absolute-gated block history. 0 until at least 20 gated blocks
    /// exist.
    pub fn loudness_range(&self) -> f64 {
        if self.integrated_blocks.len() < 20 {
            return 0.0;
        }

        let mut gated: Vec<f64> = self
            .integrated_blocks
            .iter()
            .copied()
            .filter(|&l| l >= ABSOLUTE_GATE_LUFS)
            .collect();

        if gated.len() < 20 {
            return 0.0;
        }

        gated.sort_unstable_by(|a, b| a.total_cmp(b));

        let idx10 = (gated.len() as f64 * 0.1) as usize;
        let idx95 = (gated.len() as f64 * 0.95) as usize;
        gated[idx95] - gated[idx10]
    }
}

impl Meter for LufsMeter {
    fn reset(&mut self) {
        self.momentary.reset();
        self.short_term.reset();
        self.integrated_buffer.fill(0.0);
        self.integrated_pos = 0;
        self.integrated_blocks.clear();
        for filter in self
            .pre_filters
            .iter_mut()
            .chain(self.shelf_filters.iter_mut())
        {
            filter.reset();
        }
    }
}
