//! Engine configuration
//!
//! Defaults follow the timings the controllers ship with: a 20 ms render
//! tick, a 100 ms leader heartbeat and a 1.5 s leader timeout.

use embassy_time::Duration;

use crate::error::ConfigError;
use crate::protocol::{CHUNK_LEDS, MAX_CHUNKS};

/// How a node recovers from a lost or ambiguous leader
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElectionPolicy {
    /// Only refuse promotion while another leader is audible.
    /// Followers fall back to standalone on leader timeout.
    ConflictAvoidance,
    /// Conflict avoidance plus active token election and rejoin attempts
    Active,
}

/// What a leader broadcasts each render tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPayload {
    /// Full LED buffer split into chunks
    RawPixels,
    /// Pattern parameters only; followers regenerate the pattern locally
    PatternParameters,
}

/// Timing and protocol configuration of a node
#[derive(Debug, Clone, Copy)]
pub struct SyncConfig {
    /// Interval of the cooperative tick and of leader frame broadcasts
    pub render_interval: Duration,
    /// Leader silence after which a follower gives up on it
    pub leader_timeout: Duration,
    /// Interval of the leader's token-only heartbeat
    pub heartbeat_interval: Duration,
    /// Missed heartbeats before a follower starts an election
    pub missed_heartbeat_threshold: u8,
    /// Spread of the priority-biased election broadcast delays
    pub election_base_delay: Duration,
    /// Upper bound of the random part of the election delay
    pub election_jitter: Duration,
    /// Decision deadline of an election round, relative to its start
    pub election_timeout: Duration,
    /// Time without a complete frame, while chunks keep arriving, that
    /// triggers a restart
    pub stuck_timeout: Duration,
    /// Mandatory pause between two chunks of one frame
    pub inter_packet_delay: Duration,
    /// Pause between rejoin attempts after a timeout demotion
    pub rejoin_interval: Duration,
    /// Rejoin attempts before a node stays standalone
    pub max_rejoin_attempts: u8,
    /// Recovery policy
    pub election_policy: ElectionPolicy,
    /// Leader payload kind
    pub payload: SyncPayload,
    /// Brightness used while rendering in plain mode
    pub plain_brightness: u8,
    /// Speed used while rendering in plain mode
    pub plain_speed: u8,
    /// Time a pattern stays selected before the leader advances it
    pub pattern_duration: Duration,
}

impl SyncConfig {
    pub const fn new() -> Self {
        Self {
            render_interval: Duration::from_millis(20),
            leader_timeout: Duration::from_millis(1500),
            heartbeat_interval: Duration::from_millis(100),
            missed_heartbeat_threshold: 3,
            election_base_delay: Duration::from_millis(200),
            election_jitter: Duration::from_millis(50),
            election_timeout: Duration::from_millis(300),
            stuck_timeout: Duration::from_millis(8000),
            inter_packet_delay: Duration::from_micros(200),
            rejoin_interval: Duration::from_millis(2000),
            max_rejoin_attempts: 5,
            election_policy: ElectionPolicy::Active,
            payload: SyncPayload::RawPixels,
            plain_brightness: 200,
            plain_speed: 128,
            pattern_duration: Duration::from_secs(30),
        }
    }

    /// Silence after which the expected heartbeats count as missed
    pub fn missed_heartbeat_window(&self) -> Duration {
        self.heartbeat_interval * u32::from(self.missed_heartbeat_threshold)
    }

    /// Check the configuration against an LED count
    pub fn validate(&self, led_count: usize) -> Result<(), ConfigError> {
        let max = CHUNK_LEDS * MAX_CHUNKS;
        if led_count == 0 || led_count > max {
            return Err(ConfigError::TooManyLeds {
                leds: led_count,
                max,
            });
        }
        if self.render_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroInterval("render_interval"));
        }
        if self.heartbeat_interval.as_ticks() == 0 {
            return Err(ConfigError::ZeroInterval("heartbeat_interval"));
        }
        if self.election_base_delay >= self.election_timeout {
            return Err(ConfigError::ElectionDelayExceedsDeadline);
        }
        if self.stuck_timeout <= self.leader_timeout {
            return Err(ConfigError::StuckTimeoutTooShort);
        }
        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Tuning of the audio envelope engine
#[derive(Debug, Clone, Copy)]
pub struct AudioConfig {
    /// Linear gain applied to the raw mean amplitude
    pub input_gain: f32,
    /// EMA factor for tracker moves in their natural direction
    pub fast_smoothing: f32,
    /// EMA factor for tracker moves against their natural direction
    pub slow_smoothing: f32,
    /// Dynamic range below which the room counts as loud
    pub min_dynamic_range: f32,
    /// Floor above which the room counts as loud
    pub loud_floor: f32,
    /// Fraction of the tracked range added on both sides when loud
    pub loud_window_expansion: f32,
    /// Beat threshold on the normalized level
    pub beat_threshold: f32,
    /// Beat threshold in a loud room
    pub loud_beat_threshold: f32,
    /// Level drop below the threshold needed to re-arm beat detection
    pub beat_hysteresis: f32,
    /// Shortest accepted inter-beat interval
    pub min_beat_interval: Duration,
    /// Longest accepted inter-beat interval
    pub max_beat_interval: Duration,
    /// Weight of the previous BPM estimate
    pub bpm_smoothing: f32,
    /// Window used to count recent beats
    pub bpm_window: Duration,
    /// Beats within the window that switch music detection on
    pub music_enter_beats: usize,
    /// Beats within the window that keep music detection on
    pub music_sustain_beats: usize,
    /// Time music detection survives below the sustain level
    pub music_grace: Duration,
    /// Normalized level below which brightness is not raised
    pub min_signal: f32,
    /// Exponent of the brightness response curve
    pub brightness_curve: f32,
    /// Brightness baseline during silence (0.0-1.0)
    pub idle_brightness: f32,
    /// Time without beats before brightness returns to the baseline
    pub idle_timeout: Duration,
    /// Decay time constant of the brightness envelope
    pub brightness_decay: Duration,
    /// Decay time constant of the speed envelope
    pub speed_decay: Duration,
}

impl AudioConfig {
    pub const fn new() -> Self {
        Self {
            input_gain: 4.0,
            fast_smoothing: 0.8,
            slow_smoothing: 0.99,
            min_dynamic_range: 0.05,
            loud_floor: 0.3,
            loud_window_expansion: 0.25,
            beat_threshold: 0.6,
            loud_beat_threshold: 0.45,
            beat_hysteresis: 0.1,
            min_beat_interval: Duration::from_millis(150),
            max_beat_interval: Duration::from_millis(2000),
            bpm_smoothing: 0.9,
            bpm_window: Duration::from_millis(5000),
            music_enter_beats: 4,
            music_sustain_beats: 1,
            music_grace: Duration::from_millis(3000),
            min_signal: 0.1,
            brightness_curve: 2.0,
            idle_brightness: 0.35,
            idle_timeout: Duration::from_millis(4000),
            brightness_decay: Duration::from_millis(250),
            speed_decay: Duration::from_millis(600),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self::new()
    }
}
