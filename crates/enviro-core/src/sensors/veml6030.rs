use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::{Sensor, SensorError, SensorReadings};

const REG_ALS_CONF: u8 = 0x00;
const REG_ALS: u8 = 0x04;

/// ALS_CONF: gain 1/8 (bits 12:11 = 0b10), 100 ms integration
/// (bits 9:6 = 0b0000), power on (bit 0 = 0).
const ALS_CONF: u16 = 0b10 << 11;

/// Lux per count at gain 1/8 with 100 ms integration.
const LUX_PER_COUNT: f32 = 0.5376;

const POWER_ON_DELAY_MS: u32 = 4;

pub struct Veml6030Readings {
    pub lux: f32,
}

impl SensorReadings<1> for Veml6030Readings {
    fn to_array(self) -> [f32; 1] {
        [self.lux]
    }
}

/// VEML6030 ambient light sensor.
///
/// All registers are 16-bit little-endian; a register write is the
/// register pointer followed by LSB then MSB.
pub struct Veml6030<I, D> {
    i2c: I,
    address: u8,
    delay: D,
}

impl<I: I2c, D: DelayNs> Veml6030<I, D> {
    pub fn new(i2c: I, address: u8, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
        }
    }

    async fn write_register(&mut self, register: u8, value: u16) -> Result<(), SensorError> {
        let bytes = value.to_le_bytes();
        self.i2c
            .write(self.address, &[register, bytes[0], bytes[1]])
            .await
            .map_err(|_| SensorError::Bus)
    }

    async fn read_register(&mut self, register: u8) -> Result<u16, SensorError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await
            .map_err(|_| SensorError::Bus)?;
        Ok(u16::from_le_bytes(buf))
    }
}

impl<I: I2c, D: DelayNs> Sensor<1> for Veml6030<I, D> {
    type Readings = Veml6030Readings;

    async fn init(&mut self) -> Result<(), SensorError> {
        self.write_register(REG_ALS_CONF, ALS_CONF).await?;
        self.delay.delay_ms(POWER_ON_DELAY_MS).await;
        Ok(())
    }

    async fn read(&mut self) -> Result<Veml6030Readings, SensorError> {
        let counts = self.read_register(REG_ALS).await?;
        Ok(Veml6030Readings {
            lux: counts as f32 * LUX_PER_COUNT,
        })
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::sensors::testing::{FakeI2c, NopDelay};

    #[test]
    fn test_read_scales_little_endian_counts() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0x34, 0x12]); // 0x1234 = 4660 counts
        let mut sensor = Veml6030::new(bus, 0x10, NopDelay);

        let readings = block_on(sensor.read()).unwrap();

        assert!((readings.lux - 4660.0 * LUX_PER_COUNT).abs() < 0.01);
    }

    #[test]
    fn test_init_configures_gain_and_integration() {
        let mut sensor = Veml6030::new(FakeI2c::new(), 0x10, NopDelay);

        block_on(sensor.init()).unwrap();

        let conf = ALS_CONF.to_le_bytes();
        assert_eq!(
            sensor.i2c.writes,
            vec![(0x10, vec![REG_ALS_CONF, conf[0], conf[1]])]
        );
    }
}
