mod bh1715;
mod bme280;
mod ccs811;
mod sht31;
mod veml6030;

use core::marker::PhantomData;

use thiserror_no_std::Error;

/// Errors a sensor driver can report.
///
/// Every variant is recoverable at the cycle level: the failing sensor's
/// slots are substituted and the cycle continues with degraded data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SensorError {
    /// The underlying I2C transaction failed.
    #[error("bus transaction failed")]
    Bus,
    /// The sensor has no fresh measurement available.
    #[error("no measurement ready")]
    NotReady,
    /// The response failed its checksum.
    #[error("checksum mismatch in sensor response")]
    Crc,
    /// The device at the configured address is not the expected part.
    #[error("unexpected device identity")]
    BadId,
}

/// Outcome of one measurement attempt for one value slot.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Ok(f32),
    Unavailable,
}

impl Reading {
    /// Classify a raw driver value. The drivers' not-a-number sentinel
    /// means the measurement is invalid.
    pub fn from_raw(value: f32) -> Self {
        if value.is_nan() {
            Self::Unavailable
        } else {
            Self::Ok(value)
        }
    }

    /// The raw value, with NaN standing in for an unavailable reading.
    pub fn raw(self) -> f32 {
        match self {
            Self::Ok(value) => value,
            Self::Unavailable => f32::NAN,
        }
    }

    /// The raw value, with `substitute` standing in for an unavailable
    /// reading.
    pub fn raw_or(self, substitute: f32) -> f32 {
        match self {
            Self::Ok(value) => value,
            Self::Unavailable => substitute,
        }
    }

    pub fn is_available(self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Trait for sensor reading data structures.
/// Provides compile-time guarantees about the number of values and their
/// conversion to arrays.
pub trait SensorReadings<const COUNT: usize> {
    /// Convert the readings into a fixed-size array.
    fn to_array(self) -> [f32; COUNT];
}

/// Trait for sensors that produce typed readings.
pub trait Sensor<const COUNT: usize> {
    /// The type of readings this sensor produces.
    type Readings: SensorReadings<COUNT>;

    /// Bring the sensor online. Called exactly once at startup.
    fn init(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Read the sensor and return typed readings.
    fn read(&mut self) -> impl Future<Output = Result<Self::Readings, SensorError>>;
}

// Type-level index markers
pub struct Idx<const N: usize>;

/// Binds a sensor to the value slots it fills in the per-cycle array.
///
/// Type safety ensures the readings land at the declared START position;
/// on a read failure the same slots are filled with `Unavailable` so the
/// record keeps its positional layout.
pub struct IndexedSensor<S, const START: usize, const COUNT: usize>
where
    S: Sensor<COUNT>,
{
    sensor: S,
    _marker: PhantomData<Idx<START>>,
}

impl<S, const START: usize, const COUNT: usize> From<S> for IndexedSensor<S, START, COUNT>
where
    S: Sensor<COUNT>,
{
    fn from(value: S) -> Self {
        Self::new(value)
    }
}

impl<S, const START: usize, const COUNT: usize> IndexedSensor<S, START, COUNT>
where
    S: Sensor<COUNT>,
{
    pub const fn new(sensor: S) -> Self {
        Self {
            sensor,
            _marker: PhantomData,
        }
    }

    /// Forward to the driver's one-time initialization.
    pub async fn init(&mut self) -> Result<(), SensorError> {
        self.sensor.init().await
    }

    /// Read and write to the values array at the correct indices.
    ///
    /// A failed read fills this sensor's slots with `Unavailable` and
    /// reports the error to the caller; the cycle is never aborted for a
    /// single bad reading.
    pub async fn read_into(
        &mut self,
        values: &mut [Reading; slots::SLOT_COUNT],
    ) -> Result<(), SensorError> {
        match self.sensor.read().await {
            Ok(readings) => {
                let data = readings.to_array();
                for (offset, value) in data.into_iter().enumerate() {
                    values[START + offset] = Reading::from_raw(value);
                }
                Ok(())
            }
            Err(e) => {
                for slot in values.iter_mut().skip(START).take(COUNT) {
                    *slot = Reading::Unavailable;
                }
                Err(e)
            }
        }
    }

    /// Get the starting index where this sensor's data is stored.
    pub const fn start_index() -> usize {
        START
    }

    /// Get the number of values this sensor produces.
    pub const fn value_count() -> usize {
        COUNT
    }
}

pub mod slots {
    //! Slot indices into the per-cycle value array.
    //!
    //! The layout is sensor-major in declaration order. There is no
    //! compile-time checking of slot indices against actual sensor data
    //! except through the `*Indexed` aliases below, so additions must keep
    //! these tables and the aggregation groups in sync.

    use super::IndexedSensor;
    use super::bh1715::Bh1715;
    use super::bme280::Bme280;
    use super::ccs811::Ccs811;
    use super::sht31::Sht31;
    use super::veml6030::Veml6030;

    pub const TEMP_SHT31_LOW: usize = 0;
    pub const HUM_SHT31_LOW: usize = 1;
    pub const TEMP_SHT31_HIGH: usize = 2;
    pub const HUM_SHT31_HIGH: usize = 3;
    pub const LUX_VEML6030: usize = 4;
    pub const ECO2_CCS811: usize = 5;
    pub const TVOC_CCS811: usize = 6;
    pub const TEMP_BME280: usize = 7;
    pub const HUM_BME280: usize = 8;
    pub const PRES_BME280: usize = 9;
    pub const ALT_BME280: usize = 10;
    pub const LUX_BH1715_HIGH: usize = 11;
    pub const LUX_BH1715_LOW: usize = 12;

    /// Number of individual value slots per cycle.
    pub const SLOT_COUNT: usize = 13;

    pub type Sht31LowIndexed<I, D> = IndexedSensor<Sht31<I, D>, { TEMP_SHT31_LOW }, 2>;
    pub type Sht31HighIndexed<I, D> = IndexedSensor<Sht31<I, D>, { TEMP_SHT31_HIGH }, 2>;
    pub type Veml6030Indexed<I, D> = IndexedSensor<Veml6030<I, D>, { LUX_VEML6030 }, 1>;
    pub type Ccs811Indexed<I, D> = IndexedSensor<Ccs811<I, D>, { ECO2_CCS811 }, 2>;
    pub type Bme280Indexed<I, D> = IndexedSensor<Bme280<I, D>, { TEMP_BME280 }, 4>;
    pub type Bh1715HighIndexed<I, D> = IndexedSensor<Bh1715<I, D>, { LUX_BH1715_HIGH }, 1>;
    pub type Bh1715LowIndexed<I, D> = IndexedSensor<Bh1715<I, D>, { LUX_BH1715_LOW }, 1>;
}

pub use bh1715::Bh1715;
pub use bme280::Bme280;
pub use ccs811::Ccs811;
pub use sht31::Sht31;
pub use veml6030::Veml6030;

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted bus and delay fakes shared by the driver tests.

    use std::collections::VecDeque;
    use std::vec::Vec;

    use embedded_hal_async::delay::DelayNs;
    use embedded_hal_async::i2c::{ErrorKind, ErrorType, I2c, Operation};

    /// Records writes and serves queued read responses in order.
    pub struct FakeI2c {
        pub writes: Vec<(u8, Vec<u8>)>,
        pub reads: VecDeque<Vec<u8>>,
        pub fail: bool,
    }

    impl FakeI2c {
        pub fn new() -> Self {
            Self {
                writes: Vec::new(),
                reads: VecDeque::new(),
                fail: false,
            }
        }

        /// A bus on which every transaction errors, as if no device
        /// acknowledged the address.
        pub fn failing() -> Self {
            Self {
                fail: true,
                ..Self::new()
            }
        }

        pub fn queue_read(&mut self, bytes: &[u8]) {
            self.reads.push_back(bytes.to_vec());
        }
    }

    impl ErrorType for FakeI2c {
        type Error = ErrorKind;
    }

    impl I2c for FakeI2c {
        async fn transaction(
            &mut self,
            address: u8,
            operations: &mut [Operation<'_>],
        ) -> Result<(), Self::Error> {
            if self.fail {
                return Err(ErrorKind::Other);
            }
            for op in operations.iter_mut() {
                match op {
                    Operation::Write(bytes) => {
                        self.writes.push((address, bytes.to_vec()));
                    }
                    Operation::Read(buffer) => {
                        let next = self.reads.pop_front().ok_or(ErrorKind::Other)?;
                        buffer.copy_from_slice(&next);
                    }
                }
            }
            Ok(())
        }
    }

    #[derive(Clone, Copy)]
    pub struct NopDelay;

    impl DelayNs for NopDelay {
        async fn delay_ns(&mut self, _ns: u32) {}
    }
}
