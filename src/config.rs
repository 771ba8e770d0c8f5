//! Sync tuning of this firmware build
//!
//! Engine defaults apply unless a build feature selects otherwise.

use playalights_sync::{AudioConfig, ElectionPolicy, SyncConfig, SyncPayload};

/// Leader payload of this build
#[cfg(feature = "pattern-params")]
const PAYLOAD: SyncPayload = SyncPayload::PatternParameters;
#[cfg(not(feature = "pattern-params"))]
const PAYLOAD: SyncPayload = SyncPayload::RawPixels;

/// Recovery policy of this build
#[cfg(feature = "conflict-avoidance")]
const ELECTION_POLICY: ElectionPolicy = ElectionPolicy::ConflictAvoidance;
#[cfg(not(feature = "conflict-avoidance"))]
const ELECTION_POLICY: ElectionPolicy = ElectionPolicy::Active;

pub const SYNC: SyncConfig = {
    let mut config = SyncConfig::new();
    config.payload = PAYLOAD;
    config.election_policy = ELECTION_POLICY;
    config
};

pub const AUDIO: AudioConfig = AudioConfig::new();

/// Packets buffered between the radio task and the node tick
pub const INBOX_DEPTH: usize = 32;

/// Microphone samples captured per tick
pub const AUDIO_SAMPLES: usize = 128;
