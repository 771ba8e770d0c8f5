use embassy_time::{Duration, Instant};
use heapless::{HistoryBuffer, Vec};

use crate::config::AudioConfig;

/// Beat timestamps kept for the music detector
pub const BEAT_HISTORY: usize = 32;

/// Inter-beat intervals kept for the BPM estimate
pub const INTERVAL_HISTORY: usize = 16;

/// Intervals needed before a BPM estimate is published
const MIN_INTERVALS: usize = 3;

/// BPM estimate and sticky music detection from beat timestamps
pub struct TempoTracker {
    beats: HistoryBuffer<Instant, BEAT_HISTORY>,
    intervals: HistoryBuffer<u32, INTERVAL_HISTORY>,
    bpm: Option<f32>,
    music: bool,
    quiet_since: Option<Instant>,
}

impl Default for TempoTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TempoTracker {
    pub const fn new() -> Self {
        Self {
            beats: HistoryBuffer::new(),
            intervals: HistoryBuffer::new(),
            bpm: None,
            music: false,
            quiet_since: None,
        }
    }

    /// Record a detected beat
    pub fn on_beat(&mut self, now: Instant, config: &AudioConfig) {
        if let Some(&previous) = self.beats.recent() {
            let interval = now.saturating_duration_since(previous);
            if interval >= config.min_beat_interval && interval <= config.max_beat_interval {
                self.intervals
                    .write(u32::try_from(interval.as_millis()).unwrap_or(u32::MAX));
                self.refresh_bpm(config);
            }
        }
        self.beats.write(now);
    }

    fn refresh_bpm(&mut self, config: &AudioConfig) {
        let Some(median) = median_interval(self.intervals.as_slice()) else {
            return;
        };
        let raw = 60_000.0 / median;
        self.bpm = Some(match self.bpm {
            Some(bpm) => bpm * config.bpm_smoothing + raw * (1.0 - config.bpm_smoothing),
            None => raw,
        });
    }

    /// Re-evaluate the music flag against the beats of the last window
    pub fn update_music(&mut self, now: Instant, config: &AudioConfig) -> bool {
        let recent = self.beats_within(now, config.bpm_window);

        if !self.music {
            if recent >= config.music_enter_beats {
                self.music = true;
                self.quiet_since = None;
            }
        } else if recent >= config.music_sustain_beats {
            self.quiet_since = None;
        } else {
            let since = *self.quiet_since.get_or_insert(now);
            if now.saturating_duration_since(since) >= config.music_grace {
                self.music = false;
                self.quiet_since = None;
            }
        }
        self.music
    }

    /// Beats seen within `window` before `now`
    pub fn beats_within(&self, now: Instant, window: Duration) -> usize {
        self.beats
            .oldest_ordered()
            .filter(|&&at| now.saturating_duration_since(at) <= window)
            .count()
    }

    pub fn last_beat(&self) -> Option<Instant> {
        self.beats.recent().copied()
    }

    pub fn bpm(&self) -> Option<f32> {
        self.bpm
    }
}

/// Median of the stored intervals in milliseconds
///
/// `None` until enough intervals were collected. A single outlier cannot
/// move the median the way it would move a mean.
#[allow(clippy::cast_precision_loss)]
pub fn median_interval(intervals: &[u32]) -> Option<f32> {
    if intervals.len() < MIN_INTERVALS {
        return None;
    }
    let len = intervals.len().min(INTERVAL_HISTORY);
    let mut sorted: Vec<u32, INTERVAL_HISTORY> = Vec::from_slice(&intervals[..len]).ok()?;
    sorted.sort_unstable();

    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1] as f32 + sorted[mid] as f32) / 2.0
    } else {
        sorted[mid] as f32
    })
}
