//! Async I2C bus sharing.
//!
//! The node has one physical I2C bus and seven driver instances. Each
//! driver gets its own `AsyncI2cDevice` over a shared Embassy mutex, so
//! only one bus transaction is ever in flight. The pipeline itself is a
//! single task reading sensors strictly in order; the mutex is what lets
//! the drivers each own an `I2c` handle.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embedded_hal_async::i2c::{ErrorType, I2c, Operation};

/// One device handle on the shared async I2C bus.
///
/// Embassy's `Mutex` provides async locking that can be held across await
/// points, so a transaction yields to the executor instead of spinning
/// while the bus is busy.
pub struct AsyncI2cDevice<'a, T> {
    bus: &'a Mutex<CriticalSectionRawMutex, T>,
}

impl<'a, T> AsyncI2cDevice<'a, T> {
    /// Create a new `AsyncI2cDevice`.
    #[inline]
    pub const fn new(bus: &'a Mutex<CriticalSectionRawMutex, T>) -> Self {
        Self { bus }
    }
}

impl<T> ErrorType for AsyncI2cDevice<'_, T>
where
    T: ErrorType,
{
    type Error = T::Error;
}

impl<T> I2c for AsyncI2cDevice<'_, T>
where
    T: I2c,
{
    #[inline]
    async fn read(&mut self, address: u8, read: &mut [u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.read(address, read).await
    }

    #[inline]
    async fn write(&mut self, address: u8, write: &[u8]) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write(address, write).await
    }

    #[inline]
    async fn write_read(
        &mut self,
        address: u8,
        write: &[u8],
        read: &mut [u8],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.write_read(address, write, read).await
    }

    #[inline]
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        let mut bus = self.bus.lock().await;
        bus.transaction(address, operations).await
    }
}

// Safety: AsyncI2cDevice can be sent across thread boundaries if the underlying
// bus type is Send. The Mutex ensures exclusive access.
unsafe impl<T: Send> Send for AsyncI2cDevice<'_, T> {}
