use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::{Sensor, SensorError, SensorReadings};

const CMD_SOFT_RESET: [u8; 2] = [0x30, 0xA2];
const CMD_READ_STATUS: [u8; 2] = [0xF3, 0x2D];
const CMD_MEASURE_HIGHREP: [u8; 2] = [0x24, 0x00];

const RESET_DELAY_MS: u32 = 2;
/// High-repeatability measurement duration, rounded up.
const MEASURE_DELAY_MS: u32 = 16;

/// Typed readings from the SHT31 sensor.
pub struct Sht31Readings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
}

impl SensorReadings<2> for Sht31Readings {
    fn to_array(self) -> [f32; 2] {
        [self.temperature_celsius, self.humidity_percent]
    }
}

/// SHT31 temperature/humidity sensor in single-shot mode.
///
/// Two of these share the bus at 0x44 and 0x45 (ADDR pin low/high).
pub struct Sht31<I, D> {
    i2c: I,
    address: u8,
    delay: D,
}

impl<I: I2c, D: DelayNs> Sht31<I, D> {
    pub fn new(i2c: I, address: u8, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
        }
    }

    async fn command(&mut self, command: [u8; 2]) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &command)
            .await
            .map_err(|_| SensorError::Bus)
    }
}

impl<I: I2c, D: DelayNs> Sensor<2> for Sht31<I, D> {
    type Readings = Sht31Readings;

    async fn init(&mut self) -> Result<(), SensorError> {
        self.command(CMD_SOFT_RESET).await?;
        self.delay.delay_ms(RESET_DELAY_MS).await;

        // Status readback proves a device is actually listening here.
        self.command(CMD_READ_STATUS).await?;
        let mut status = [0u8; 3];
        self.i2c
            .read(self.address, &mut status)
            .await
            .map_err(|_| SensorError::Bus)?;
        if crc8(&status[..2]) != status[2] {
            return Err(SensorError::Crc);
        }
        Ok(())
    }

    async fn read(&mut self) -> Result<Sht31Readings, SensorError> {
        self.command(CMD_MEASURE_HIGHREP).await?;
        self.delay.delay_ms(MEASURE_DELAY_MS).await;

        let mut buf = [0u8; 6];
        self.i2c
            .read(self.address, &mut buf)
            .await
            .map_err(|_| SensorError::Bus)?;

        if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
            return Err(SensorError::Crc);
        }

        let raw_temperature = u16::from_be_bytes([buf[0], buf[1]]) as f32;
        let raw_humidity = u16::from_be_bytes([buf[3], buf[4]]) as f32;

        Ok(Sht31Readings {
            temperature_celsius: -45.0 + 175.0 * raw_temperature / 65535.0,
            humidity_percent: 100.0 * raw_humidity / 65535.0,
        })
    }
}

/// Sensirion CRC-8: polynomial 0x31, initial value 0xFF.
fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::sensors::testing::{FakeI2c, NopDelay};

    #[test]
    fn test_crc8_known_vector() {
        // From the Sensirion interface documentation.
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_read_converts_raw_words() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0xBE, 0xEF, 0x92, 0xBE, 0xEF, 0x92]);
        let mut sensor = Sht31::new(bus, 0x44, NopDelay);

        let readings = block_on(sensor.read()).unwrap();

        // raw 0xBEEF: T = -45 + 175 * raw / 65535, RH = 100 * raw / 65535
        assert!((readings.temperature_celsius - 85.52).abs() < 0.01);
        assert!((readings.humidity_percent - 74.58).abs() < 0.01);
    }

    #[test]
    fn test_read_rejects_bad_crc() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0xBE, 0xEF, 0x00, 0xBE, 0xEF, 0x92]);
        let mut sensor = Sht31::new(bus, 0x44, NopDelay);

        assert!(matches!(block_on(sensor.read()), Err(SensorError::Crc)));
    }

    #[test]
    fn test_read_reports_bus_failure() {
        let mut sensor = Sht31::new(FakeI2c::failing(), 0x44, NopDelay);

        assert!(matches!(block_on(sensor.read()), Err(SensorError::Bus)));
    }
}
