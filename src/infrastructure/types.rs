use embassy_time::Delay;
use playalights_sync::SyncNode;

use crate::infrastructure::adapters::LogStatusDisplay;
use crate::infrastructure::config::LED_COUNT;
use crate::infrastructure::drivers::{EspLedDriver, EspNowRadio, HardwareRng};

pub type LightDriver = EspLedDriver<'static>;

pub type FirmwareNode =
    SyncNode<EspNowRadio, Delay, LightDriver, LogStatusDisplay, HardwareRng, LED_COUNT>;
