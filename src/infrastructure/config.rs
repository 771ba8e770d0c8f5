#![allow(clippy::unreadable_literal)]

use embassy_time::Duration;

pub struct DeviceConfig {
    pub name: &'static str,
}

pub struct LightConfig {
    pub skip_leds: usize,
}

pub struct RadioConfig {
    /// ESP-NOW channel shared by every node
    pub channel: u8,
}

pub struct ButtonConfig {
    /// Shorter presses are contact bounce
    pub debounce_ms: u64,
    /// Presses held at least this long are long presses
    pub long_press_ms: u64,
}

pub const DEVICE: DeviceConfig = DeviceConfig {
    name: "Playalights Node",
};

/// LEDs driven by the node, identical on every node of a deployment
#[cfg(feature = "strip-300")]
pub const LED_COUNT: usize = 300;
#[cfg(not(feature = "strip-300"))]
pub const LED_COUNT: usize = 150;

pub const LIGHT: LightConfig = LightConfig { skip_leds: 0 };

pub const RADIO: RadioConfig = RadioConfig { channel: 1 };

pub const BUTTON: ButtonConfig = ButtonConfig {
    debounce_ms: 30,
    long_press_ms: 1000,
};

#[macro_export]
macro_rules! led_gpio {
    ($p:expr) => {
        $p.GPIO33
    };
}

#[macro_export]
macro_rules! button_gpio {
    ($p:expr) => {
        $p.GPIO37
    };
}

#[macro_export]
macro_rules! microphone_gpio {
    ($p:expr) => {
        $p.GPIO36
    };
}

/// Base address of the `settings` partition (partitions.csv)
pub const SETTINGS_PARTITION_OFFSET: u32 = 0x31_0000;

/// Quiet time before changed settings are written
pub const SETTINGS_WRITE_DEBOUNCE: Duration = Duration::from_secs(3);

/// Minimum spacing of writes that only move the rotating pattern
pub const PATTERN_WRITE_SPACING: Duration = Duration::from_secs(600);
