//! Flash storage of the node settings.
//!
//! One small record at the start of the `settings` partition. The record is
//! only trusted when its magic header matches.

use bytemuck::{Pod, Zeroable};
use embedded_storage::nor_flash::{NorFlash, ReadNorFlash};
use esp_storage::FlashStorage;
use playalights_sync::{NodeSettings, OperatingMode};

const BLOCK_SIZE: u32 = 4096;
const MAGIC_HEADER: u16 = 0x5EA7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    DriverError,
    InvalidMagicHeader,
    InvalidData,
}

#[derive(Debug, Clone, Copy, Zeroable, Pod)]
#[repr(C)]
struct PersistentSettings {
    magic: u16,
    mode: u8,
    pattern: u8,
}

const RECORD_SIZE: usize = size_of::<PersistentSettings>();

impl From<NodeSettings> for PersistentSettings {
    fn from(settings: NodeSettings) -> Self {
        Self {
            magic: MAGIC_HEADER,
            mode: settings.mode.as_u8(),
            pattern: settings.pattern,
        }
    }
}

impl TryFrom<PersistentSettings> for NodeSettings {
    type Error = StorageError;

    fn try_from(record: PersistentSettings) -> Result<Self, Self::Error> {
        if record.magic != MAGIC_HEADER {
            return Err(StorageError::InvalidMagicHeader);
        }
        Ok(Self {
            mode: OperatingMode::from_u8(record.mode).ok_or(StorageError::InvalidData)?,
            pattern: record.pattern,
        })
    }
}

/// Settings record in on-chip flash
///
/// Owned by the persistence task after boot, so no other task touches the
/// flash.
pub struct SettingsStorage {
    flash: FlashStorage<'static>,
    addr: u32,
}

impl SettingsStorage {
    pub fn new(flash: FlashStorage<'static>, addr: u32) -> Self {
        Self { flash, addr }
    }

    /// Read the saved settings
    pub fn load(&mut self) -> Result<NodeSettings, StorageError> {
        let mut buffer = [0u8; RECORD_SIZE];
        self.flash
            .read(self.addr, &mut buffer)
            .map_err(|_| StorageError::DriverError)?;
        bytemuck::pod_read_unaligned::<PersistentSettings>(&buffer).try_into()
    }

    /// Replace the saved settings
    pub fn save(&mut self, settings: NodeSettings) -> Result<(), StorageError> {
        let record = PersistentSettings::from(settings);
        self.flash
            .erase(self.addr, self.addr + BLOCK_SIZE)
            .map_err(|_| StorageError::DriverError)?;
        self.flash
            .write(self.addr, bytemuck::bytes_of(&record))
            .map_err(|_| StorageError::DriverError)
    }
}
