//! Pressure colormap
//!
//! Maps pressure to a three-anchor gradient (low → mid → high). The normalized
//! value goes through a power curve before the lookup, which spreads the upper
//! part of the range over more of the gradient.

use vasculo_core::math::{inverse_lerp, lerp_rgb};
use vasculo_core::Rgb;

/// Low pressure anchor (blue)
pub const LOW_PRESSURE_COLOR: Rgb = [0.12, 0.35, 0.95];
/// Medium pressure anchor (yellow)
pub const MID_PRESSURE_COLOR: Rgb = [1.0, 0.85, 0.2];
/// High pressure anchor (red)
pub const HIGH_PRESSURE_COLOR: Rgb = [0.9, 0.12, 0.1];
/// Exponent of the power curve applied to normalized pressure
pub const PRESSURE_EXPONENT: f32 = 0.4;

/// Three-anchor gradient with a power curve
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PressureColormap {
    pub low: Rgb,
    pub mid: Rgb,
    pub high: Rgb,
    pub exponent: f32,
}

impl PressureColormap {
    /// Default blue-yellow-red map
    pub const DEFAULT: Self = Self {
        low: LOW_PRESSURE_COLOR,
        mid: MID_PRESSURE_COLOR,
        high: HIGH_PRESSURE_COLOR,
        exponent: PRESSURE_EXPONENT,
    };

    /// Normalize `value` into `[0, 1]` over `min..=max`.
    ///
    /// An empty range (or a non-finite value) maps to 0.5.
    pub fn normalize(value: f32, min: f32, max: f32) -> f32 {
        if !(max - min).is_finite() || (max - min).abs() <= f32::EPSILON {
            return 0.5;
        }
        let t = inverse_lerp(min, max, value);
        if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.5 }
    }

    /// Color for an already normalized value, before the power curve
    pub fn gradient(&self, t: f32) -> Rgb {
        if t <= 0.0 {
            self.low
        } else if t >= 1.0 {
            self.high
        } else if t < 0.5 {
            lerp_rgb(self.low, self.mid, t * 2.0)
        } else {
            lerp_rgb(self.mid, self.high, (t - 0.5) * 2.0)
        }
    }

    /// Color for a pressure value observed within `min..=max`
    pub fn color(&self, pressure: f32, min: f32, max: f32) -> Rgb {
        let t = Self::normalize(pressure, min, max);
        self.gradient(t.powf(self.exponent))
    }
}

impl Default for PressureColormap {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Map pressure to a color with the default colormap
pub fn pressure_to_color(pressure: f32, min: f32, max: f32) -> Rgb {
    PressureColormap::DEFAULT.color(pressure, min, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchors() {
        assert_eq!(pressure_to_color(80.0, 80.0, 120.0), LOW_PRESSURE_COLOR);
        assert_eq!(pressure_to_color(120.0, 80.0, 120.0), HIGH_PRESSURE_COLOR);
    }

    #[test]
    fn test_deterministic() {
        let a = pressure_to_color(97.3, 80.0, 120.0);
        let b = pressure_to_color(97.3, 80.0, 120.0);
        assert_eq!(a.map(f32::to_bits), b.map(f32::to_bits));
    }

    #[test]
    fn test_empty_range_uses_midpoint() {
        let expected = PressureColormap::DEFAULT.gradient(0.5f32.powf(PRESSURE_EXPONENT));
        assert_eq!(pressure_to_color(5.0, 5.0, 5.0), expected);
    }

    #[test]
    fn test_power_curve_biases_high() {
        // 0.2^0.4 ≈ 0.525, already past the mid anchor
        let color = pressure_to_color(0.2, 0.0, 1.0);
        let t = (0.2f32.powf(0.4) - 0.5) * 2.0;
        let expected = lerp_rgb(MID_PRESSURE_COLOR, HIGH_PRESSURE_COLOR, t);
        for (c, e) in color.iter().zip(expected.iter()) {
            assert!((c - e).abs() < 1e-6);
        }
    }

    #[test]
    fn test_out_of_range_clamped() {
        assert_eq!(pressure_to_color(-10.0, 0.0, 1.0), LOW_PRESSURE_COLOR);
        assert_eq!(pressure_to_color(10.0, 0.0, 1.0), HIGH_PRESSURE_COLOR);
        assert_eq!(PressureColormap::normalize(f32::NAN, 0.0, 1.0), 0.5);
    }

    #[test]
    fn test_mid_anchor() {
        assert_eq!(PressureColormap::DEFAULT.gradient(0.5), MID_PRESSURE_COLOR);
    }
}
