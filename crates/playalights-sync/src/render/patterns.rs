use smart_leds::hsv::{hsv2rgb, Hsv};

use super::{RenderContext, Renderer};
use crate::math8::scale8;
use crate::Rgb;

/// Hue distance covered by the whole strip
const RAINBOW_SPAN: u32 = 255;

/// Hue step between the three points of the flow gradient
const HUE_STEP: u8 = 60;

const fn hsv(hue: u8, val: u8) -> Hsv {
    Hsv { hue, sat: 255, val }
}

/// Hue gradient along the strip, shifted by the global hue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rainbow;

impl<const N: usize> Renderer<N> for Rainbow {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]) {
        if N == 0 {
            return;
        }
        for (i, led) in leds.iter_mut().enumerate() {
            let offset = (i as u32 * RAINBOW_SPAN / N as u32) as u8;
            *led = hsv2rgb(hsv(ctx.global_hue.wrapping_add(offset), 255));
        }
    }
}

/// Three-point gradient over the first half, mirrored onto the second
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RainbowFlow;

impl<const N: usize> Renderer<N> for RainbowFlow {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]) {
        if N == 0 {
            return;
        }
        let center = N.div_ceil(2);
        let half = center.max(2) - 1;

        // Blend c1 -> c2 -> c3 by stepping the hue linearly through both steps
        for (i, led) in leds.iter_mut().take(center).enumerate() {
            let step = (i.min(half) * usize::from(HUE_STEP) * 2 / half) as u8;
            *led = hsv2rgb(hsv(ctx.global_hue.wrapping_add(step), 255));
        }
        mirror_half(leds);
    }
}

/// Mirror the first half of the strip around the center
pub(crate) fn mirror_half(leds: &mut [Rgb]) {
    let len = leds.len();
    for i in 0..len.div_ceil(2) {
        leds[len - 1 - i] = leds[i];
    }
}

/// Sparse random sparkles, reseeded every tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confetti;

impl<const N: usize> Renderer<N> for Confetti {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]) {
        for (i, led) in leds.iter_mut().enumerate() {
            let hash = mix(ctx.random_seed ^ (i as u32).wrapping_mul(0x9E37_79B9));
            // One pixel in eight lights up
            *led = if hash & 0x7 == 0 {
                let hue = ctx.global_hue.wrapping_add((hash >> 8) as u8 & 0x3F);
                hsv2rgb(hsv(hue, 255))
            } else {
                Rgb::default()
            };
        }
    }
}

/// 32-bit integer finalizer
const fn mix(mut x: u32) -> u32 {
    x ^= x >> 16;
    x = x.wrapping_mul(0x7FEB_352D);
    x ^= x >> 15;
    x = x.wrapping_mul(0x846C_A68B);
    x ^= x >> 16;
    x
}

/// Whole strip breathing in the global hue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pulse;

impl<const N: usize> Renderer<N> for Pulse {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]) {
        let rate = 2 + u32::from(ctx.speed) / 32;
        let phase = (ctx.elapsed_ticks.wrapping_mul(rate) & 0x1FF) as u16;
        // Triangle wave 0..=255..=0 over 512 steps
        let level = (if phase < 256 { phase } else { 511 - phase }) as u8;
        let color = hsv2rgb(hsv(ctx.global_hue, 255));
        let dimmed = Rgb::new(
            scale8(color.r, level),
            scale8(color.g, level),
            scale8(color.b, level),
        );
        leds.fill(dimmed);
    }
}

/// Dot with a fading tail running along the strip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Comet;

const COMET_TAIL: usize = 12;

impl<const N: usize> Renderer<N> for Comet {
    #[allow(clippy::cast_possible_truncation)]
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]) {
        leds.fill(Rgb::default());
        if N == 0 {
            return;
        }
        let step = 1 + usize::from(ctx.speed) / 64;
        let head = (ctx.elapsed_ticks as usize).wrapping_mul(step) % N;
        let color = hsv2rgb(hsv(ctx.global_hue, 255));

        for t in 0..COMET_TAIL.min(N) {
            let fade = (255 - t * 255 / COMET_TAIL) as u8;
            let index = (head + N - t) % N;
            leds[index] = Rgb::new(
                scale8(color.r, fade),
                scale8(color.g, fade),
                scale8(color.b, fade),
            );
        }
    }
}
