use esp_radio::esp_now::EspNowReceiver;

use playalights_sync::inbox::enqueue_packet;

use super::node::PACKET_INBOX;

/// Background task copying received ESP-NOW frames into the packet inbox
///
/// Decoding happens on the node tick; this task never blocks on a full inbox.
#[embassy_executor::task]
pub async fn radio_rx_task(mut receiver: EspNowReceiver<'static>) {
    loop {
        let received = receiver.receive_async().await;
        if let Err(e) = enqueue_packet(&PACKET_INBOX, received.data()) {
            log::debug!("radio: dropped packet: {}", e);
        }
    }
}
