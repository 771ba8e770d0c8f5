mod espnow;
mod flash_storage;
mod led_ws2812;
mod microphone;
mod random;

pub use espnow::{EspNowRadio, init_espnow};
pub use flash_storage::{SettingsStorage, StorageError};
pub use led_ws2812::EspLedDriver;
pub use microphone::AdcMicrophone;
pub use random::HardwareRng;
