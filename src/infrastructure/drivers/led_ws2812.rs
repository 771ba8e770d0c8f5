use static_cell::make_static;

use esp_hal::xtensa_lx::interrupt;
use esp_hal::{gpio::interconnect::PeripheralOutput, peripherals::RMT, rmt::Rmt, time::Rate};
use esp_hal_smartled::{SmartLedsAdapter, buffer_size, smart_led_buffer};
use smart_leds::SmartLedsWrite;

use playalights_sync::{LedDriver, Rgb};

use crate::infrastructure::config;

pub(crate) const MAX_LED_COUNT: usize = config::LED_COUNT + config::LIGHT.skip_leds;

/// ESP-specific LED driver using RMT peripheral
///
/// This driver uses the ESP32's RMT (Remote Control) peripheral
/// to generate the precise timing signals required by WS2812B LEDs.
pub struct EspLedDriver<'a> {
    adapter: SmartLedsAdapter<'a, { buffer_size(MAX_LED_COUNT) }>,
    skip_leds: usize,
}

impl<'a> EspLedDriver<'a> {
    /// Create a new ESP LED driver
    ///
    /// # Arguments
    /// * `rmt` - RMT peripheral
    /// * `pin` - GPIO pin connected to the LED data line
    /// * `skip_leds` - dark LEDs in front of the strip
    pub fn new<O>(rmt: RMT<'a>, pin: O, skip_leds: usize) -> Self
    where
        O: PeripheralOutput<'a>,
    {
        let rmt = Rmt::new(rmt, Rate::from_mhz(80)).unwrap();

        // Safety: This is a static buffer that lives for the entire program
        // We use make_static! to ensure the buffer has 'static lifetime
        let rmt_buffer = make_static!(smart_led_buffer!(MAX_LED_COUNT));
        let adapter = SmartLedsAdapter::new(rmt.channel0, pin, rmt_buffer);

        Self { adapter, skip_leds }
    }
}

impl<const N: usize> LedDriver<N> for EspLedDriver<'static> {
    fn write(&mut self, colors: &[Rgb; N]) {
        let frame = core::iter::repeat_n(Rgb::default(), self.skip_leds).chain(colors.iter().copied());
        // RMT timing breaks if an interrupt lands mid-frame
        let result = interrupt::free(|| self.adapter.write(frame));
        if let Err(e) = result {
            log::warn!("led: write failed: {:?}", e);
        }
    }
}
