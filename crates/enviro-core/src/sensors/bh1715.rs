use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::{Sensor, SensorError, SensorReadings};

const CMD_POWER_ON: u8 = 0x01;
const CMD_CONTINUOUS_HIGH_RES: u8 = 0x10;

/// Wait required after a bus command before the output is valid.
const SETTLING_DELAY_MS: u32 = 300;

pub struct Bh1715Readings {
    pub lux: f32,
}

impl SensorReadings<1> for Bh1715Readings {
    fn to_array(self) -> [f32; 1] {
        [self.lux]
    }
}

/// BH1715 ambient light sensor, driven directly over the bus.
///
/// Two of these share the bus at 0x23 and 0x5C (ADDR pin low/high). The
/// part has no identity register; it is powered on and switched to
/// continuous high-resolution mode, after which a measurement is a plain
/// 2-byte transfer.
pub struct Bh1715<I, D> {
    i2c: I,
    address: u8,
    delay: D,
}

impl<I: I2c, D: DelayNs> Bh1715<I, D> {
    pub fn new(i2c: I, address: u8, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
        }
    }

    async fn command(&mut self, command: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[command])
            .await
            .map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(SETTLING_DELAY_MS).await;
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> Sensor<1> for Bh1715<I, D> {
    type Readings = Bh1715Readings;

    async fn init(&mut self) -> Result<(), SensorError> {
        self.command(CMD_POWER_ON).await?;
        self.command(CMD_CONTINUOUS_HIGH_RES).await
    }

    async fn read(&mut self) -> Result<Bh1715Readings, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .read(self.address, &mut buf)
            .await
            .map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(SETTLING_DELAY_MS).await;

        Ok(Bh1715Readings {
            lux: (buf[0] as f32 * 256.0 + buf[1] as f32) / 1.2,
        })
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::sensors::testing::{FakeI2c, NopDelay};

    #[test]
    fn test_read_combines_bytes_and_scales() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0x12, 0x34]);
        let mut sensor = Bh1715::new(bus, 0x23, NopDelay);

        let readings = block_on(sensor.read()).unwrap();

        // (0x12 * 256 + 0x34) / 1.2
        assert!((readings.lux - 3883.33).abs() < 0.01);
    }

    #[test]
    fn test_init_selects_continuous_mode() {
        let mut sensor = Bh1715::new(FakeI2c::new(), 0x23, NopDelay);

        block_on(sensor.init()).unwrap();

        assert_eq!(
            sensor.i2c.writes,
            vec![
                (0x23, vec![CMD_POWER_ON]),
                (0x23, vec![CMD_CONTINUOUS_HIGH_RES])
            ]
        );
    }
}
