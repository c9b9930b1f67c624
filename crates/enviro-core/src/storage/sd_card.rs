//! SD card implementation of the log medium.
//!
//! SD card operations are blocking. Each operation opens the volume, the
//! root directory and the file, writes, and closes everything again, so
//! no storage handle ever survives a cycle.

use embedded_sdmmc::{
    Error, Mode, SdCard, SdCardError, TimeSource, Timestamp, VolumeIdx, VolumeManager,
};

use super::LogMedium;

/// Log files carry no meaningful timestamps; the schema has its own ID
/// column.
pub struct NullTimeSource;

impl TimeSource for NullTimeSource {
    fn get_timestamp(&self) -> Timestamp {
        Timestamp {
            year_since_1970: 0,
            zero_indexed_month: 0,
            zero_indexed_day: 0,
            hours: 0,
            minutes: 0,
            seconds: 0,
        }
    }
}

pub struct SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    volume_mgr: VolumeManager<SdCard<S, D>, T, 4, 4, 1>,
}

impl<S, D, T> SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    /// Create a new SD card storage manager
    pub fn new(sd_card: SdCard<S, D>, ts: T) -> Self {
        let volume_mgr = VolumeManager::new(sd_card, ts);

        Self { volume_mgr }
    }

    fn write(&self, file_name: &str, mode: Mode, data: &[u8]) -> Result<(), Error<SdCardError>> {
        // Open volume
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;

        // Open root directory
        let root_dir = volume0.open_root_dir()?;

        // Open file in the requested mode
        let file = root_dir.open_file_in_dir(file_name, mode)?;

        // Write data to file
        file.write(data)?;

        // Resources are automatically closed when dropped (RAII)
        // Explicitly close them to handle errors
        file.close()?;
        root_dir.close()?;
        volume0.close()?;

        Ok(())
    }
}

impl<S, D, T> LogMedium for SdCardStorage<S, D, T>
where
    S: embedded_hal::spi::SpiDevice<u8>,
    D: embedded_hal::delay::DelayNs,
    T: TimeSource,
{
    type Error = Error<SdCardError>;

    fn is_empty(&mut self, path: &str) -> Result<bool, Self::Error> {
        let volume0 = self.volume_mgr.open_volume(VolumeIdx(0))?;
        let root_dir = volume0.open_root_dir()?;

        let length = match root_dir.open_file_in_dir(path, Mode::ReadOnly) {
            Ok(file) => {
                let length = file.length();
                file.close()?;
                length
            }
            // A missing file counts as an empty store.
            Err(Error::NotFound) => 0,
            Err(e) => return Err(e),
        };

        root_dir.close()?;
        volume0.close()?;

        Ok(length == 0)
    }

    fn create(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.write(path, Mode::ReadWriteCreateOrTruncate, data)
    }

    fn append(&mut self, path: &str, data: &[u8]) -> Result<(), Self::Error> {
        self.write(path, Mode::ReadWriteCreateOrAppend, data)
    }
}
