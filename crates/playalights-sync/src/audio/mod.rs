//! Audio envelope engine
//!
//! Turns raw microphone buffers into the two scalars that drive the strip:
//! brightness and speed. The pipeline per tick is
//!
//! 1. mean absolute amplitude with a fixed input gain,
//! 2. adaptive floor/peak tracking and normalization (widened in loud rooms),
//! 3. hysteresis beat detection feeding the tempo tracker,
//! 4. attack/decay envelopes producing the output scalars.

mod envelope;
mod tempo;

pub use envelope::Envelope;
pub use tempo::{median_interval, TempoTracker, BEAT_HISTORY, INTERVAL_HISTORY};

use embassy_time::Instant;

use crate::config::AudioConfig;
use crate::math8::unit_to_u8;

/// Smallest normalization span, keeps silence from amplifying noise
const MIN_SPAN: f32 = 1e-3;

/// Output of one audio tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AudioFrame {
    /// Gained input level (0.0-1.0)
    pub level: f32,
    /// Level normalized into the adaptive window (0.0-1.0)
    pub normalized: f32,
    /// Beat detected on this tick
    pub beat: bool,
    /// Loud or noisy room detected
    pub loud: bool,
    /// Smoothed tempo estimate, 0.0 when unknown
    pub bpm: f32,
    /// Music present (sticky)
    pub music: bool,
    pub brightness: u8,
    pub speed: u8,
}

/// Adaptive noise floor and peak
#[derive(Debug, Clone, Copy, Default)]
pub struct LevelTracker {
    floor: f32,
    peak: f32,
    primed: bool,
}

impl LevelTracker {
    /// Update both trackers with the current level
    ///
    /// Each tracker follows quickly in its natural direction (floor down,
    /// peak up) and slowly in the other one.
    pub fn update(&mut self, level: f32, config: &AudioConfig) {
        if !self.primed {
            self.floor = level;
            self.peak = level;
            self.primed = true;
            return;
        }

        let floor_alpha = if level < self.floor {
            config.fast_smoothing
        } else {
            config.slow_smoothing
        };
        self.floor = self.floor * floor_alpha + level * (1.0 - floor_alpha);

        let peak_alpha = if level > self.peak {
            config.fast_smoothing
        } else {
            config.slow_smoothing
        };
        self.peak = self.peak * peak_alpha + level * (1.0 - peak_alpha);
        self.peak = self.peak.max(self.floor);
    }

    pub fn floor(&self) -> f32 {
        self.floor
    }

    pub fn peak(&self) -> f32 {
        self.peak
    }

    /// Loud or noisy room: flat dynamics or a high floor
    pub fn is_loud(&self, config: &AudioConfig) -> bool {
        self.peak - self.floor < config.min_dynamic_range || self.floor > config.loud_floor
    }

    /// Map `level` into the tracked window
    pub fn normalize(&self, level: f32, config: &AudioConfig) -> f32 {
        let (mut low, mut high) = (self.floor, self.peak);
        if self.is_loud(config) {
            let widen = (high - low) * config.loud_window_expansion;
            low -= widen;
            high += widen;
        }
        let span = (high - low).max(config.min_dynamic_range).max(MIN_SPAN);
        ((level - low) / span).clamp(0.0, 1.0)
    }
}

/// Rising-edge detector with hysteresis
#[derive(Debug, Clone, Copy)]
pub struct BeatDetector {
    armed: bool,
}

impl Default for BeatDetector {
    fn default() -> Self {
        Self { armed: true }
    }
}

impl BeatDetector {
    /// Returns `true` on the tick the level crosses `threshold` upwards
    pub fn detect(&mut self, normalized: f32, threshold: f32, hysteresis: f32) -> bool {
        if self.armed {
            if normalized > threshold {
                self.armed = false;
                return true;
            }
        } else if normalized < threshold - hysteresis {
            self.armed = true;
        }
        false
    }
}

/// Mean absolute amplitude with gain, clamped to 0.0-1.0
#[allow(clippy::cast_precision_loss)]
pub fn input_level(samples: &[i16], gain: f32) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: u64 = samples
        .iter()
        .map(|&s| u64::from(s.unsigned_abs()))
        .sum();
    let mean = sum as f32 / samples.len() as f32;
    (mean / 32768.0 * gain).clamp(0.0, 1.0)
}

/// Full audio pipeline
pub struct AudioEngine {
    config: AudioConfig,
    tracker: LevelTracker,
    detector: BeatDetector,
    tempo: TempoTracker,
    brightness: Envelope,
    speed: Envelope,
    last: AudioFrame,
}

impl AudioEngine {
    pub fn new(config: AudioConfig) -> Self {
        Self {
            brightness: Envelope::new(config.idle_brightness),
            speed: Envelope::new(0.0),
            config,
            tracker: LevelTracker::default(),
            detector: BeatDetector::default(),
            tempo: TempoTracker::new(),
            last: AudioFrame::default(),
        }
    }

    pub fn config(&self) -> &AudioConfig {
        &self.config
    }

    /// Most recent output
    pub fn last_frame(&self) -> AudioFrame {
        self.last
    }

    /// Process one sample buffer captured at `now`
    pub fn process(&mut self, samples: &[i16], now: Instant) -> AudioFrame {
        let config = self.config;
        let level = input_level(samples, config.input_gain);

        self.tracker.update(level, &config);
        let loud = self.tracker.is_loud(&config);
        let normalized = self.tracker.normalize(level, &config);

        let threshold = if loud {
            config.loud_beat_threshold
        } else {
            config.beat_threshold
        };
        let beat = self
            .detector
            .detect(normalized, threshold, config.beat_hysteresis);
        if beat {
            self.tempo.on_beat(now, &config);
        }
        let music = self.tempo.update_music(now, &config);

        let idle = self
            .tempo
            .last_beat()
            .is_none_or(|at| now.saturating_duration_since(at) >= config.idle_timeout);
        let brightness = if idle {
            self.brightness.set(config.idle_brightness, now);
            config.idle_brightness
        } else {
            self.brightness
                .update(brightness_curve(normalized, &config), now, config.brightness_decay)
        };
        let speed = self.speed.update(normalized, now, config.speed_decay);

        self.last = AudioFrame {
            level,
            normalized,
            beat,
            loud,
            bpm: self.tempo.bpm().unwrap_or(0.0),
            music,
            brightness: unit_to_u8(brightness),
            speed: unit_to_u8(speed),
        };
        self.last
    }
}

/// Brightness response to a normalized level
///
/// Levels under `min_signal` stay at the idle baseline; above it the
/// rescaled level follows a power curve up to full brightness.
pub fn brightness_curve(normalized: f32, config: &AudioConfig) -> f32 {
    let idle = config.idle_brightness;
    if normalized < config.min_signal {
        return idle;
    }
    let span = (1.0 - config.min_signal).max(MIN_SPAN);
    let rescaled = ((normalized - config.min_signal) / span).clamp(0.0, 1.0);
    idle + (1.0 - idle) * libm::powf(rescaled, config.brightness_curve)
}
