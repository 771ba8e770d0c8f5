use embassy_sync::channel::Channel;
use embassy_time::{Instant, Ticker};

use playalights_sync::{AudioSource, PacketInbox, TickOutcome};

use crate::config::{AUDIO_SAMPLES, INBOX_DEPTH};
use crate::infrastructure::adapters::ButtonEvents;
use crate::infrastructure::drivers::AdcMicrophone;
use crate::infrastructure::tasks::request_save;
use crate::infrastructure::types::FirmwareNode;

/// Packets handed from the radio task to the node tick
pub static PACKET_INBOX: PacketInbox<INBOX_DEPTH> = Channel::new();

/// Task driving the sync node
///
/// Every render interval it feeds the node, in order, the pending button
/// presses, the queued packets and one tick. The microphone is only sampled
/// while the node renders audio-reactively. Changed settings are handed to
/// the persistence task.
#[embassy_executor::task]
pub async fn node_task(
    mut node: FirmwareNode,
    mut microphone: AdcMicrophone<'static>,
    buttons: ButtonEvents,
) {
    let mut ticker = Ticker::every(node.config().render_interval);
    let mut samples = [0i16; AUDIO_SAMPLES];
    let mut saved = node.settings();

    loop {
        ticker.next().await;
        let now = Instant::now();

        while let Ok(event) = buttons.try_receive() {
            node.handle_button(event, now);
        }
        node.drain_inbox(&PACKET_INBOX, now);

        let captured = if node.wants_audio() {
            let count = microphone.capture(&mut samples);
            Some(&samples[..count])
        } else {
            None
        };

        if node.tick(now, captured) == TickOutcome::Restart {
            log::warn!("node: restarting device");
            esp_hal::system::software_reset();
        }

        let settings = node.settings();
        if settings != saved && request_save(settings) {
            saved = settings;
        }
    }
}
