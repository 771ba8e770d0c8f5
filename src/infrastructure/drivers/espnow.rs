use static_cell::make_static;

use esp_hal::peripherals::WIFI;
use esp_radio::esp_now::{BROADCAST_ADDRESS, EspNowReceiver, EspNowSender};
use esp_radio::wifi::{ClientConfig, Config, ModeConfig, WifiController};

use playalights_sync::protocol::MAX_PACKET_LEN;
use playalights_sync::{Radio, RadioError};

use crate::mk_static;

/// ESP-NOW broadcast transmitter
///
/// Sends block until the radio reports the transmission done. There are no
/// acknowledgements on the broadcast address, so success only means the
/// frame left the antenna.
pub struct EspNowRadio {
    sender: EspNowSender<'static>,
}

impl Radio for EspNowRadio {
    fn broadcast(&mut self, payload: &[u8]) -> Result<(), RadioError> {
        if payload.len() > MAX_PACKET_LEN {
            return Err(RadioError::PayloadTooLarge);
        }
        let waiter = self.sender.send(&BROADCAST_ADDRESS, payload).map_err(|e| {
            log::debug!("espnow: send rejected: {:?}", e);
            RadioError::QueueFull
        })?;
        waiter.wait().map_err(|e| {
            log::debug!("espnow: send failed: {:?}", e);
            RadioError::SendFailed
        })
    }
}

/// Start Wi-Fi in station mode without connecting and bring up ESP-NOW
/// on `channel`
///
/// Returns the transmit half for the node and the receive half for the
/// radio task.
pub fn init_espnow(wifi: WIFI<'static>, channel: u8) -> (EspNowRadio, EspNowReceiver<'static>) {
    let radio = &*make_static!(esp_radio::init().unwrap());
    let (controller, interfaces) = esp_radio::wifi::new(radio, wifi, Config::default()).unwrap();

    let controller = mk_static!(WifiController<'static>, controller);
    controller
        .set_config(&ModeConfig::Client(ClientConfig::default()))
        .unwrap();
    controller.start().unwrap();

    let esp_now = interfaces.esp_now;
    esp_now.set_channel(channel).unwrap();
    log::info!("espnow: version {:?} on channel {}", esp_now.version(), channel);

    let (_manager, sender, receiver) = esp_now.split();
    (EspNowRadio { sender }, receiver)
}
