//! Output processing pipeline
//!
//! Applies post-processing to rendered frames before sending to hardware.
//! Processing order:
//! 1. Per-pixel brightness scaling
//! 2. Gamma correction
//!
//! Leader and followers run the same pipeline on the same raw pixels and
//! brightness scalar, so both strips look the same. Brightness is never a
//! driver-global setting.

use crate::math8::{gamma8, scale8};
use crate::Rgb;

/// Output processor - applies post-processing to frames
#[derive(Debug, Clone, Copy)]
pub struct OutputProcessor {
    gamma: bool,
}

impl Default for OutputProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputProcessor {
    pub const fn new() -> Self {
        Self { gamma: true }
    }

    /// Processor that only scales brightness
    pub const fn linear() -> Self {
        Self { gamma: false }
    }

    /// Process `frame` into `out`
    pub fn apply<const N: usize>(&self, frame: &[Rgb; N], brightness: u8, out: &mut [Rgb; N]) {
        for (dst, src) in out.iter_mut().zip(frame) {
            *dst = self.pixel(*src, brightness);
        }
    }

    #[inline]
    fn pixel(&self, color: Rgb, brightness: u8) -> Rgb {
        let scaled = Rgb::new(
            scale8(color.r, brightness),
            scale8(color.g, brightness),
            scale8(color.b, brightness),
        );
        if self.gamma {
            Rgb::new(gamma8(scaled.r), gamma8(scaled.g), gamma8(scaled.b))
        } else {
            scaled
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_before_gamma() {
        let frame = [Rgb::new(255, 128, 0); 3];
        let mut out = [Rgb::default(); 3];
        OutputProcessor::new().apply(&frame, 128, &mut out);

        let scaled = scale8(128, 128);
        assert_eq!(out[0], Rgb::new(gamma8(127), gamma8(scaled), 0));
    }

    #[test]
    fn full_brightness_linear_is_identity() {
        let frame = [Rgb::new(10, 20, 30), Rgb::new(200, 100, 50)];
        let mut out = [Rgb::default(); 2];
        OutputProcessor::linear().apply(&frame, 255, &mut out);
        assert_eq!(out, frame);
    }

    #[test]
    fn zero_brightness_is_black() {
        let frame = [Rgb::new(255, 255, 255); 4];
        let mut out = [Rgb::new(1, 1, 1); 4];
        OutputProcessor::new().apply(&frame, 0, &mut out);
        assert!(out.iter().all(|c| *c == Rgb::default()));
    }
}
