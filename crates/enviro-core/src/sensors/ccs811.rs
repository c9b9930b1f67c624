use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::{Sensor, SensorError, SensorReadings};

const REG_STATUS: u8 = 0x00;
const REG_MEAS_MODE: u8 = 0x01;
const REG_ALG_RESULT_DATA: u8 = 0x02;
const REG_HW_ID: u8 = 0x20;
const BOOT_APP_START: u8 = 0xF4;

const HW_ID: u8 = 0x81;
const STATUS_DATA_READY: u8 = 0x08;

/// MEAS_MODE drive mode 1: one measurement per second.
const DRIVE_MODE_1SEC: u8 = 0x10;

const APP_START_DELAY_MS: u32 = 20;

/// Typed readings from the CCS811 air-quality sensor.
///
/// Both values are reported in ppm, matching the record schema.
pub struct Ccs811Readings {
    pub eco2_ppm: f32,
    pub tvoc_ppm: f32,
}

impl SensorReadings<2> for Ccs811Readings {
    fn to_array(self) -> [f32; 2] {
        [self.eco2_ppm, self.tvoc_ppm]
    }
}

/// CCS811 eCO2/tVOC sensor.
///
/// The part boots into its bootloader; `init` validates the hardware ID,
/// starts the application firmware and selects the 1 Hz drive mode. The
/// sensor only produces data once per second, so a cycle that polls before
/// DATA_READY gets `NotReady` and the aggregation layer substitutes zero.
pub struct Ccs811<I, D> {
    i2c: I,
    address: u8,
    delay: D,
}

impl<I: I2c, D: DelayNs> Ccs811<I, D> {
    pub fn new(i2c: I, address: u8, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
        }
    }

    async fn status(&mut self) -> Result<u8, SensorError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_STATUS], &mut buf)
            .await
            .map_err(|_| SensorError::Bus)?;
        Ok(buf[0])
    }

    /// Whether a fresh measurement is waiting in ALG_RESULT_DATA.
    async fn available(&mut self) -> Result<bool, SensorError> {
        Ok(self.status().await? & STATUS_DATA_READY != 0)
    }
}

impl<I: I2c, D: DelayNs> Sensor<2> for Ccs811<I, D> {
    type Readings = Ccs811Readings;

    async fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.i2c
            .write_read(self.address, &[REG_HW_ID], &mut id)
            .await
            .map_err(|_| SensorError::Bus)?;
        if id[0] != HW_ID {
            return Err(SensorError::BadId);
        }

        self.i2c
            .write(self.address, &[BOOT_APP_START])
            .await
            .map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(APP_START_DELAY_MS).await;

        self.i2c
            .write(self.address, &[REG_MEAS_MODE, DRIVE_MODE_1SEC])
            .await
            .map_err(|_| SensorError::Bus)
    }

    async fn read(&mut self) -> Result<Ccs811Readings, SensorError> {
        if !self.available().await? {
            return Err(SensorError::NotReady);
        }

        let mut buf = [0u8; 4];
        self.i2c
            .write_read(self.address, &[REG_ALG_RESULT_DATA], &mut buf)
            .await
            .map_err(|_| SensorError::Bus)?;

        Ok(Ccs811Readings {
            eco2_ppm: u16::from_be_bytes([buf[0], buf[1]]) as f32,
            tvoc_ppm: u16::from_be_bytes([buf[2], buf[3]]) as f32,
        })
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::sensors::testing::{FakeI2c, NopDelay};

    #[test]
    fn test_read_parses_alg_result() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[STATUS_DATA_READY]);
        bus.queue_read(&[0x01, 0x90, 0x00, 0x64]); // eCO2 = 400, tVOC = 100
        let mut sensor = Ccs811::new(bus, 0x5A, NopDelay);

        let readings = block_on(sensor.read()).unwrap();

        assert_eq!(readings.eco2_ppm, 400.0);
        assert_eq!(readings.tvoc_ppm, 100.0);
    }

    #[test]
    fn test_read_without_data_ready_is_not_ready() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0x00]);
        let mut sensor = Ccs811::new(bus, 0x5A, NopDelay);

        assert!(matches!(
            block_on(sensor.read()),
            Err(SensorError::NotReady)
        ));
    }

    #[test]
    fn test_init_rejects_wrong_hardware_id() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0x12]);
        let mut sensor = Ccs811::new(bus, 0x5A, NopDelay);

        assert!(matches!(block_on(sensor.init()), Err(SensorError::BadId)));
    }
}
