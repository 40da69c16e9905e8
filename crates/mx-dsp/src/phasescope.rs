//! Phase scope and vector scope point data
//!
//! Produces display-ready point clouds from a stereo stream; no rendering
//! happens here. Each point carries a brightness that decays once per
//! `process` call so old trail segments fade.

use mx_core::Sample;

use crate::Meter;

// ═══════════════════════════════════════════════════════════════════════════════
// PHASE SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// A point in the normalized [-1, 1] display plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PhasePoint {
    pub x: f64,
    pub y: f64,
}

/// Display projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PhaseScopeMode {
    /// X = left, Y = right.
    Lissajous,
    /// Rotated 45 degrees so mono content plots vertically.
    Goniometer,
    /// Raw samples kept for `polar_data`.
    Polar,
}

/// Summary statistics over the currently buffered points.
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
pub struct PhaseScopeStats {
    pub average_mid: f64,
    pub average_side: f64,
    /// Side-to-mid ratio of mean absolute values.
    pub width: f64,
    pub max_radius: f64,
    /// 0..1, higher means the angles cluster tightly.
    pub phase_concentration: f64,
    /// Mean phase angle in radians.
    pub dominant_angle: f64,
}

/// Stereo phase scope over a circular sample buffer.
pub struct PhaseScope {
    buffer_size: usize,
    buffer_l: Vec<f64>,
    buffer_r: Vec<f64>,
    write_pos: usize,
    count: usize,
    points: Vec<PhasePoint>,
    brightness: Vec<f64>,
    rotation: f64,
    scale: f64,
    decay: f64,
    persistence: f64,
}

impl PhaseScope {
    pub fn new(buffer_size: usize) -> Self {
        Self {
            buffer_size,
            buffer_l: vec![0.0; buffer_size],
            buffer_r: vec![0.0; buffer_size],
            write_pos: 0,
            count: 0,
            points: vec![PhasePoint::default(); buffer_size],
            brightness: vec![0.0; buffer_size],
            rotation: 0.0,
            scale: 1.0,
            decay: 0.95,
            persistence: 0.8,
        }
    }

    pub fn set_mode(&mut self, mode: PhaseScopeMode) {
        self.rotation = match mode {
            PhaseScopeMode::Lissajous => 0.0,
            PhaseScopeMode::Goniometer => std::f64::consts::FRAC_PI_4,
            PhaseScopeMode::Polar => 0.0,
        };
    }

    /// Brightness decay per process call. Values outside [0, 1] are
    /// ignored.
    pub fn set_decay(&mut self, decay: f64) {
        if (0.0..=1.0).contains(&decay) {
            self.decay = decay;
        } else {
            log::debug!("ignoring phase scope decay {decay}");
        }
    }

    /// Trail persistence factor. Values outside [0, 1] are ignored.
    pub fn set_persistence(&mut self, persistence: f64) {
        if (0.0..=1.0).contains(&persistence) {
            self.persistence = persistence;
        } else {
            log::debug!("ignoring phase scope persistence {persistence}");
        }
    }

    pub fn persistence(&self) -> f64 {
        self.persistence
    }

    /// Display scale factor. Must be positive.
    pub fn set_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.scale = scale;
        } else {
            log::debug!("ignoring phase scope scale {scale}");
        }
    }

    pub fn process(&mut self, samples_l: &[Sample], samples_r: &[Sample]) {
        if samples_l.len() != samples_r.len() {
            log::warn!(
                "phase scope: channel length mismatch ({} vs {})",
                samples_l.len(),
                samples_r.len()
            );
            return;
        }

        for b in &mut self.brightness {
            *b *= self.decay;
        }

        let (sin, cos) = self.rotation.sin_cos();
        for (&l, &r) in samples_l.iter().zip(samples_r) {
            self.buffer_l[self.write_pos] = l;
            self.buffer_r[self.write_pos] = r;

            let sl = l * self.scale;
            let sr = r * self.scale;
            self.points[self.write_pos] = if self.rotation != 0.0 {
                PhasePoint {
                    x: sl * cos - sr * sin,
                    y: sl * sin + sr * cos,
                }
            } else {
                PhasePoint { x: sl, y: sr }
            };
            self.brightness[self.write_pos] = 1.0;

            self.write_pos = (self.write_pos + 1) % self.buffer_size;
            if self.count < self.buffer_size {
                self.count += 1;
            }
        }
    }

    /// Index of the i-th buffered point in chronological order.
    fn ordered_index(&self, i: usize) -> usize {
        if self.count == self.buffer_size {
            (self.write_pos + i) % self.buffer_size
        } else {
            i
        }
    }

    /// Display points oldest first, paired with their brightness.
    pub fn points(&self) -> (Vec<PhasePoint>, Vec<f64>) {
        let mut points = Vec::with_capacity(self.count);
        let mut brightness = Vec::with_capacity(self.count);
        for i in 0..self.count {
            let idx = self.ordered_index(i);
            points.push(self.points[idx]);
            brightness.push(self.brightness[idx]);
        }
        (points, brightness)
    }

    /// (radius, angle, brightness) triples for polar rendering, oldest
    /// first. Angle is atan2(R, L) over the scaled raw samples.
    pub fn polar_data(&self) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let mut radius = Vec::with_capacity(self.count);
        let mut angle = Vec::with_capacity(self.count);
        let mut bright = Vec::with_capacity(self.count);

        for i in 0..self.count {
            let idx = self.ordered_index(i);
            let x = self.buffer_l[idx] * self.scale;
            let y = self.buffer_r[idx] * self.scale;
            radius.push((x * x + y * y).sqrt());
            angle.push(y.atan2(x));
            bright.push(self.brightness[idx]);
        }

        (radius, angle, bright)
    }

    /// Summary statistics over the buffered samples; zeros before any
    /// input.
    pub fn statistics(&self) -> PhaseScopeStats {
        if self.count == 0 {
            return PhaseScopeStats::default();
        }

        let mut sum_mid = 0.0;
        let mut sum_side = 0.0;
        let mut max_radius = 0.0;

        for i in 0..self.count {
            let idx = self.ordered_index(i);
            let l = self.buffer_l[idx];
            let r = self.buffer_r[idx];

            sum_mid += ((l + r) * 0.5).abs();
            sum_side += ((l - r) * 0.5).abs();

            let radius = (l * l + r * r).sqrt();
            if radius > max_radius {
                max_radius = radius;
            }
        }

        let average_mid = sum_mid / self.count as f64;
        let average_side = sum_side / self.count as f64;
        let width = if average_mid > 0.0 {
            average_side / average_mid
        } else {
            0.0
        };

        // Concentration from the spread of the instantaneous angles
        let mut sum_angle = 0.0;
        let mut sum_angle_sq = 0.0;
        let mut valid = 0usize;
        for i in 0..self.count {
            let idx = self.ordered_index(i);
            let l = self.buffer_l[idx];
            let r = self.buffer_r[idx];
            if l != 0.0 || r != 0.0 {
                let angle = r.atan2(l);
                sum_angle += angle;
                sum_angle_sq += angle * angle;
                valid += 1;
            }
        }

        let (phase_concentration, dominant_angle) = if valid > 0 {
            let mean = sum_angle / valid as f64;
            let variance = sum_angle_sq / valid as f64 - mean * mean;
            (1.0 / (1.0 + variance.abs().sqrt()), mean)
        } else {
            (0.0, 0.0)
        };

        PhaseScopeStats {
            average_mid,
            average_side,
            width,
            max_radius,
            phase_concentration,
            dominant_angle,
        }
    }
}

impl Meter for PhaseScope {
    fn reset(&mut self) {
        self.buffer_l.fill(0.0);
        self.buffer_r.fill(0.0);
        self.brightness.fill(0.0);
        self.points.fill(PhasePoint::default());
        self.write_pos = 0;
        self.count = 0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// VECTOR SCOPE
// ═══════════════════════════════════════════════════════════════════════════════

/// A graticule label with its anchor position.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct VectorScopeLabel {
    pub position: PhasePoint,
    pub text: &'static str,
}

/// Goniometer-mode phase scope bundled with a static graticule.
pub struct VectorScope {
    scope: PhaseScope,
    grid: Vec<PhasePoint>,
    labels: Vec<VectorScopeLabel>,
}

impl VectorScope {
    pub fn new(buffer_size: usize) -> Self {
        let mut scope = PhaseScope::new(buffer_size);
        scope.set_mode(PhaseScopeMode::Goniometer);

        Self {
            scope,
            grid: build_graticule(),
            labels: vec![
                VectorScopeLabel {
                    position: PhasePoint { x: 0.0, y: 1.0 },
                    text: "M",
                },
                VectorScopeLabel {
                    position: PhasePoint { x: -1.0, y: 0.0 },
                    text: "L",
                },
                VectorScopeLabel {
                    position: PhasePoint { x: 1.0, y: 0.0 },
                    text: "R",
                },
                VectorScopeLabel {
                    position: PhasePoint { x: 0.0, y: -1.0 },
                    text: "S",
                },
            ],
        }
    }

    pub fn process(&mut self, samples_l: &[Sample], samples_r: &[Sample]) {
        self.scope.process(samples_l, samples_r);
    }

    pub fn points(&self) -> (Vec<PhasePoint>, Vec<f64>) {
        self.scope.points()
    }

    pub fn grid(&self) -> &[PhasePoint] {
        &self.grid
    }

    pub fn labels(&self) -> &[VectorScopeLabel] {
        &self.labels
    }

    pub fn statistics(&self) -> PhaseScopeStats {
        self.scope.statistics()
    }
}

impl Meter for VectorScope {
    fn reset(&mut self) {
        self.scope.reset();
    }
}

/// Five concentric circles of 64 points each plus twelve radial lines as
/// center/edge point pairs.
fn build_graticule() -> Vec<PhasePoint> {
    const CIRCLES: usize = 5;
    const CIRCLE_POINTS: usize = 64;
    const RADIAL_LINES: usize = 12;

    let mut grid = Vec::with_capacity(CIRCLES * CIRCLE_POINTS + RADIAL_LINES * 2);

    for c in 1..=CIRCLES {
        let radius = c as f64 / CIRCLES as f64;
        for i in 0..CIRCLE_POINTS {
            let angle = 2.0 * std::f64::consts::PI * i as f64 / CIRCLE_POINTS as f64;
            grid.push(PhasePoint {
                x: radius * angle.cos(),
                y: radius * angle.sin(),
            });
        }
    }

    for i in 0..RADIAL_LINES {
        let angle = 2.0 * std::f64::consts::PI * i as f64 / RADIAL_LINES as f64;
        grid.push(PhasePoint { x: 0.0, y: 0.0 });
        grid.push(PhasePoint {
            x: angle.cos(),
            y: angle.sin(),
        });
    }

    grid
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lissajous_points_are_raw_samples() {
        let mut scope = PhaseScope::new(16);
        scope.process(&[0.5, -0.25], &[0.1, 0.75]);

        let (points, brightness) = scope.points();
        assert_eq!(points.len(), 2);
        assert_relative_eq!(points[0].x, 0.5);
        assert_relative_eq!(points[0].y, 0.1);
        assert_relative_eq!(points[1].x, -0.25);
        assert_relative_eq!(points[1].y, 0.75);
        assert_eq!(brightness, vec![1.0, 1.0]);
    }

    #[test]
    fn test_goniometer_rotates_mono_to_vertical() {
        let mut scope = PhaseScope::new(16);
        scope.set_mode(PhaseScopeMode::Goniometer);
        // Identical L and R: a mono signal plots on the Y axis
        scope.process(&[0.5], &[0.5]);

        let (points, _) = scope.points();
        assert_relative_eq!(points[0].x, 0.0, epsilon = 1e-12);
        assert_relative_eq!(points[0].y, 0.5 * 2.0_f64.sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_brightness_decays_per_call() {
        let mut scope = PhaseScope::new(16);
        scope.set_decay(0.5);
        scope.process(&[0.3], &[0.3]);
        scope.process(&[0.1], &[0.1]);

        let (_, brightness) = scope.points();
        assert_relative_eq!(brightness[0], 0.5);
        assert_relative_eq!(brightness[1], 1.0);
    }

    #[test]
    fn test_points_ordered_oldest_first_after_wrap() {
        let mut scope = PhaseScope::new(4);
        // Six samples into a four-slot buffer: the oldest two fall off
        let l = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        scope.process(&l, &l);

        let (points, _) = scope.points();
        assert_eq!(points.len(), 4);
        assert_relative_eq!(points[0].x, 0.3);
        assert_relative_eq!(points[3].x, 0.6);
    }

    #[test]
    fn test_polar_data() {
        let mut scope = PhaseScope::new(8);
        scope.process(&[1.0], &[0.0]);

        let (radius, angle, bright) = scope.polar_data();
        assert_relative_eq!(radius[0], 1.0);
        assert_relative_eq!(angle[0], 0.0);
        assert_eq!(bright[0], 1.0);
    }

    #[test]
    fn test_statistics_mono_signal() {
        let mut scope = PhaseScope::new(64);
        // Strictly positive so every point sits in the first quadrant
        let tone: Vec<f64> = (0..64).map(|i| 0.3 + 0.2 * (i as f64 * 0.3).sin()).collect();
        scope.process(&tone, &tone);

        let stats = scope.statistics();
        assert!(stats.average_side < 1e-12);
        assert_relative_eq!(stats.width, 0.0);
        // Mono content sits on the 45-degree diagonal
        assert_relative_eq!(
            stats.dominant_angle,
            std::f64::consts::FRAC_PI_4,
            epsilon = 1e-9
        );
        assert!(stats.phase_concentration > 0.99);
    }

    #[test]
    fn test_mismatched_lengths_no_op() {
        let mut scope = PhaseScope::new(8);
        scope.process(&[0.1, 0.2], &[0.1]);
        let (points, _) = scope.points();
        assert!(points.is_empty());
    }

    #[test]
    fn test_vector_scope_graticule() {
        let scope = VectorScope::new(32);
        // 5 circles of 64 points plus 12 radial pairs
        assert_eq!(scope.grid().len(), 5 * 64 + 12 * 2);
        assert_eq!(scope.labels().len(), 4);
        assert_eq!(scope.labels()[0].text, "M");
    }

    #[test]
    fn test_reset() {
        let mut scope = PhaseScope::new(8);
        scope.process(&[0.5], &[0.5]);
        scope.reset();

        let (points, _) = scope.points();
        assert!(points.is_empty());
        assert_eq!(scope.statistics().max_radius, 0.0);
    }
}
