#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Delay, Duration};

use esp_alloc as _;
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, efuse::Efuse, timer::timg::TimerGroup};
use esp_storage::FlashStorage;

use playalights_node::config::{AUDIO, SYNC};
use playalights_node::infrastructure::adapters::{LogStatusDisplay, bind_button, button_events};
use playalights_node::infrastructure::config::{
    DEVICE, LED_COUNT, LIGHT, RADIO, SETTINGS_PARTITION_OFFSET,
};
use playalights_node::infrastructure::drivers::{
    AdcMicrophone, EspLedDriver, HardwareRng, SettingsStorage, init_espnow,
};
use playalights_node::infrastructure::tasks::{node_task, persistence_task, radio_rx_task};
use playalights_node::infrastructure::types::FirmwareNode;
use playalights_sync::NodeToken;
use playalights_sync::node::NodePorts;

esp_bootloader_esp_idf::esp_app_desc!();

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();

    // Initialize hardware
    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    // Allocate heap memory for the radio stack
    esp_alloc::heap_allocator!(size: 72 * 1024);

    // Start rtos
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let token = NodeToken::from_mac(&Efuse::read_base_mac_address());
    log::info!("{}: token {} driving {} LEDs", DEVICE.name, token, LED_COUNT);

    // Radio first: the hardware RNG needs it for entropy
    let (radio, receiver) = init_espnow(peripherals.WIFI, RADIO.channel);
    spawner.spawn(radio_rx_task(receiver)).ok();

    let leds = EspLedDriver::new(
        peripherals.RMT,
        playalights_node::led_gpio!(peripherals),
        LIGHT.skip_leds,
    );
    let microphone = AdcMicrophone::new(
        peripherals.ADC1,
        playalights_node::microphone_gpio!(peripherals),
    );
    bind_button(peripherals.IO_MUX, playalights_node::button_gpio!(peripherals));

    let ports = NodePorts {
        radio,
        delay: Delay,
        leds,
        display: LogStatusDisplay::default(),
        rng: HardwareRng::new(),
    };
    let mut node = FirmwareNode::new(token, SYNC, AUDIO, ports).unwrap();

    // Restore the mode and pattern of the previous run
    let mut storage = SettingsStorage::new(
        FlashStorage::new(peripherals.FLASH),
        SETTINGS_PARTITION_OFFSET,
    );
    match storage.load() {
        Ok(settings) => node.restore(settings),
        Err(e) => log::info!("settings: none saved ({:?})", e),
    }
    spawner
        .spawn(persistence_task(storage, node.settings()))
        .ok();
    spawner.spawn(node_task(node, microphone, button_events())).ok();

    loop {
        embassy_time::Timer::after(Duration::from_secs(5)).await;
    }
}
