use esp_hal::Blocking;
use esp_hal::analog::adc::{Adc, AdcConfig, AdcPin, Attenuation};
use esp_hal::peripherals::{ADC1, GPIO36};

use playalights_sync::AudioSource;

/// Midpoint of the 12-bit ADC range, where a biased microphone idles
const ADC_MIDPOINT: i32 = 2048;

/// Analog microphone sampled with one-shot ADC reads
pub struct AdcMicrophone<'d> {
    adc: Adc<'d, ADC1<'d>, Blocking>,
    pin: AdcPin<GPIO36<'d>, ADC1<'d>>,
}

impl<'d> AdcMicrophone<'d> {
    pub fn new(adc: ADC1<'d>, pin: GPIO36<'d>) -> Self {
        let mut config = AdcConfig::new();
        let pin = config.enable_pin(pin, Attenuation::_11dB);
        let adc = Adc::new(adc, config);
        Self { adc, pin }
    }
}

impl AudioSource for AdcMicrophone<'_> {
    fn capture(&mut self, buffer: &mut [i16]) -> usize {
        for (captured, sample) in buffer.iter_mut().enumerate() {
            let Ok(raw) = nb::block!(self.adc.read_oneshot(&mut self.pin)) else {
                log::debug!("microphone: adc read failed after {} samples", captured);
                return captured;
            };
            *sample = centered(raw);
        }
        buffer.len()
    }
}

/// Map a 12-bit reading around the bias point onto the full `i16` range
#[allow(clippy::cast_possible_truncation)]
fn centered(raw: u16) -> i16 {
    ((i32::from(raw) - ADC_MIDPOINT) * 16).clamp(i32::from(i16::MIN), i32::from(i16::MAX)) as i16
}
