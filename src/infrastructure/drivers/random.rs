use esp_hal::rng::Rng;
use rand_core::{RngCore, impls};

/// Hardware random number generator behind the engine's `RngCore` seam
///
/// Entropy is only guaranteed while the radio is running, which is the case
/// for the whole lifetime of the node.
pub struct HardwareRng(Rng);

impl HardwareRng {
    pub fn new() -> Self {
        Self(Rng::new())
    }
}

impl Default for HardwareRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for HardwareRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        u64::from(self.0.random()) << 32 | u64::from(self.0.random())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        impls::fill_bytes_via_next(self, dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}
