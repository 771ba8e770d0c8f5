use embassy_futures::select::{Either, select};
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Instant, Timer};

use playalights_sync::NodeSettings;

use crate::infrastructure::config::{PATTERN_WRITE_SPACING, SETTINGS_WRITE_DEBOUNCE};
use crate::infrastructure::drivers::SettingsStorage;

/// Size of the settings channel
const SETTINGS_CHANNEL_SIZE: usize = 4;

type SettingsChannel = Channel<CriticalSectionRawMutex, NodeSettings, SETTINGS_CHANNEL_SIZE>;

/// Settings changes on their way to flash
static SETTINGS_CHANNEL: SettingsChannel = Channel::new();

/// Queue changed settings for saving; `false` while the queue is full
pub fn request_save(settings: NodeSettings) -> bool {
    SETTINGS_CHANNEL.try_send(settings).is_ok()
}

/// Task writing settings changes to flash
///
/// A change is written once no newer one arrived for the debounce time.
/// Mode changes are written right away after that; changes that only move
/// the rotating pattern are spaced out to spare the flash.
#[embassy_executor::task]
pub async fn persistence_task(mut storage: SettingsStorage, mut stored: NodeSettings) {
    let receiver = SETTINGS_CHANNEL.receiver();
    let mut pending: Option<NodeSettings> = None;
    let mut last_write: Option<Instant> = None;

    loop {
        match select(receiver.receive(), Timer::after(SETTINGS_WRITE_DEBOUNCE)).await {
            Either::First(settings) => pending = Some(settings),
            Either::Second(()) => {
                let Some(settings) = pending else {
                    continue;
                };
                if settings == stored {
                    pending = None;
                    continue;
                }
                let pattern_only = settings.mode == stored.mode;
                if pattern_only && last_write.is_some_and(|at| at.elapsed() < PATTERN_WRITE_SPACING) {
                    continue;
                }

                match storage.save(settings) {
                    Ok(()) => {
                        log::info!("persistence: saved mode {} pattern {}", settings.mode, settings.pattern);
                        stored = settings;
                        pending = None;
                    }
                    Err(e) => log::warn!("persistence: write failed: {:?}", e),
                }
                last_write = Some(Instant::now());
            }
        }
    }
}
