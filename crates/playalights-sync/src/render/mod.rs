//! Pattern rendering
//!
//! Patterns are pure functions of a [`RenderContext`]: the leader and every
//! follower regenerate the exact same pixels from the same context, which is
//! what the pattern-parameter payload relies on.
//!
//! All patterns are stored in an enum to avoid heap allocations.

mod patterns;
mod processor;

pub use patterns::{Comet, Confetti, Pulse, Rainbow, RainbowFlow};
pub use processor::OutputProcessor;

use crate::Rgb;

/// Everything a pattern may depend on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderContext {
    /// Selected pattern, see [`PatternSlot::from_index`]
    pub pattern_index: u8,
    /// Hue offset advancing every tick
    pub global_hue: u8,
    /// Seed for pseudo-random patterns
    pub random_seed: u32,
    /// Ticks since the pattern started
    pub elapsed_ticks: u32,
    /// Animation speed (0-255)
    pub speed: u8,
}

impl RenderContext {
    /// Advance to the next tick
    ///
    /// The seed follows a fixed LCG so that peers stepping from the same
    /// context stay in lock-step.
    pub fn advance(&mut self) {
        self.elapsed_ticks = self.elapsed_ticks.wrapping_add(1);
        self.global_hue = self.global_hue.wrapping_add(1 + self.speed / 64);
        self.random_seed = self
            .random_seed
            .wrapping_mul(1_664_525)
            .wrapping_add(1_013_904_223);
    }

    /// Switch to the next pattern and restart its animation
    pub fn next_pattern(&mut self) {
        self.pattern_index = (self.pattern_index + 1) % PatternSlot::COUNT;
        self.elapsed_ticks = 0;
    }
}

/// Trait for pattern implementations
pub trait Renderer<const N: usize> {
    /// Fill `leds` for the given context
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]);
}

/// Pattern slot - enum containing all built-in patterns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSlot {
    /// All LEDs off
    Off,
    /// Hue gradient along the strip
    Rainbow(Rainbow),
    /// Three-point gradient mirrored around the center
    RainbowFlow(RainbowFlow),
    /// Random sparkles
    Confetti(Confetti),
    /// Whole strip breathing in one hue
    Pulse(Pulse),
    /// Dot with a fading tail running along the strip
    Comet(Comet),
}

impl Default for PatternSlot {
    fn default() -> Self {
        Self::Rainbow(Rainbow)
    }
}

impl PatternSlot {
    /// Patterns reachable by index, `Off` excluded
    pub const COUNT: u8 = 5;

    /// Pattern for a context index, wrapping around
    pub const fn from_index(index: u8) -> Self {
        match index % Self::COUNT {
            0 => Self::Rainbow(Rainbow),
            1 => Self::RainbowFlow(RainbowFlow),
            2 => Self::Confetti(Confetti),
            3 => Self::Pulse(Pulse),
            _ => Self::Comet(Comet),
        }
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Rainbow(_) => "rainbow",
            Self::RainbowFlow(_) => "rainbow_flow",
            Self::Confetti(_) => "confetti",
            Self::Pulse(_) => "pulse",
            Self::Comet(_) => "comet",
        }
    }
}

impl<const N: usize> Renderer<N> for PatternSlot {
    fn render(&mut self, ctx: &RenderContext, leds: &mut [Rgb; N]) {
        match self {
            Self::Off => leds.fill(Rgb::default()),
            Self::Rainbow(p) => p.render(ctx, leds),
            Self::RainbowFlow(p) => p.render(ctx, leds),
            Self::Confetti(p) => p.render(ctx, leds),
            Self::Pulse(p) => p.render(ctx, leds),
            Self::Comet(p) => p.render(ctx, leds),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_wraps_over_patterns() {
        assert_eq!(PatternSlot::from_index(0).name(), "rainbow");
        assert_eq!(PatternSlot::from_index(PatternSlot::COUNT), PatternSlot::from_index(0));
        assert_eq!(PatternSlot::from_index(4).name(), "comet");
    }

    #[test]
    fn same_context_renders_same_pixels() {
        let mut ctx = RenderContext {
            random_seed: 0xC0FFEE,
            ..RenderContext::default()
        };
        for _ in 0..17 {
            ctx.advance();
        }

        for index in 0..PatternSlot::COUNT {
            ctx.pattern_index = index;
            let mut a = [Rgb::default(); 90];
            let mut b = [Rgb::default(); 90];
            PatternSlot::from_index(index).render(&ctx, &mut a);
            PatternSlot::from_index(index).render(&ctx, &mut b);
            assert_eq!(a, b, "pattern {}", index);
        }
    }

    #[test]
    fn next_pattern_restarts_animation() {
        let mut ctx = RenderContext {
            pattern_index: 4,
            elapsed_ticks: 99,
            ..RenderContext::default()
        };
        ctx.next_pattern();
        assert_eq!(ctx.pattern_index, 0);
        assert_eq!(ctx.elapsed_ticks, 0);
    }

    #[test]
    fn off_clears_strip() {
        let mut leds = [Rgb::new(9, 9, 9); 8];
        PatternSlot::Off.render(&RenderContext::default(), &mut leds);
        assert!(leds.iter().all(|c| *c == Rgb::default()));
    }
}
