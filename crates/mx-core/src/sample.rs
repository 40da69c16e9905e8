//! Sample types and level conversion helpers

/// Type alias for audio samples (always f64 for maximum precision)
pub type Sample = f64;

/// Stereo sample pair
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[repr(C)]
pub struct StereoSample {
    pub left: Sample,
    pub right: Sample,
}

impl StereoSample {
    #[inline]
    pub const fn new(left: Sample, right: Sample) -> Self {
        Self { left, right }
    }

    #[inline]
    pub const fn mono(value: Sample) -> Self {
        Self {
            left: value,
            right: value,
        }
    }

    #[inline]
    pub fn to_mid_side(self) -> MidSideSample {
        MidSideSample {
            mid: (self.left + self.right) * 0.5,
            side: (self.left - self.right) * 0.5,
        }
    }
}

/// Mid/Side sample pair
#[derive(Debug, Clone, Copy, Default, serde::Serialize, serde::Deserialize)]
#[repr(C)]
pub struct MidSideSample {
    pub mid: Sample,
    pub side: Sample,
}

impl MidSideSample {
    #[inline]
    pub fn to_stereo(self) -> StereoSample {
        StereoSample {
            left: self.mid + self.side,
            right: self.mid - self.side,
        }
    }
}

/// Convert a linear amplitude to decibels. Zero or negative input maps to -inf.
#[inline]
pub fn lin_to_db(lin: Sample) -> Sample {
    if lin > 0.0 {
        20.0 * lin.log10()
    } else {
        f64::NEG_INFINITY
    }
}

/// Convert decibels to linear amplitude.
#[inline]
pub fn db_to_lin(db: Sample) -> Sample {
    10.0_f64.powf(db / 20.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mid_side_round_trip() {
        let s = StereoSample::new(0.8, -0.3);
        let back = s.to_mid_side().to_stereo();
        assert!((back.left - s.left).abs() < 1e-12);
        assert!((back.right - s.right).abs() < 1e-12);
    }

    #[test]
    fn test_db_conversion() {
        assert!((lin_to_db(1.0)).abs() < 1e-12);
        assert!((lin_to_db(0.5) + 6.0206).abs() < 0.001);
        assert!(lin_to_db(0.0).is_infinite());
        assert!((db_to_lin(-20.0) - 0.1).abs() < 1e-12);
    }
}
