use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::{Sensor, SensorError, SensorReadings};
use crate::config::SEA_LEVEL_PRESSURE_HPA;

const REG_CHIP_ID: u8 = 0xD0;
const REG_CALIB_TP: u8 = 0x88;
const REG_CALIB_H1: u8 = 0xA1;
const REG_CALIB_H2: u8 = 0xE1;
const REG_CTRL_HUM: u8 = 0xF2;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_DATA: u8 = 0xF7;

const CHIP_ID: u8 = 0x60;

/// Humidity oversampling x1.
const CTRL_HUM_X1: u8 = 0x01;
/// Temperature x1, pressure x1, normal mode.
const CTRL_MEAS_NORMAL: u8 = 0x27;

const STARTUP_DELAY_MS: u32 = 10;

/// Typed readings from the BME280 combo sensor. The array order matches
/// the sensor's slot layout: temperature, humidity, pressure, altitude.
pub struct Bme280Readings {
    pub temperature_celsius: f32,
    pub humidity_percent: f32,
    pub pressure_hpa: f32,
    pub altitude_meters: f32,
}

impl SensorReadings<4> for Bme280Readings {
    fn to_array(self) -> [f32; 4] {
        [
            self.temperature_celsius,
            self.humidity_percent,
            self.pressure_hpa,
            self.altitude_meters,
        ]
    }
}

/// Factory trimming parameters, stored as floats for the floating-point
/// compensation formulas.
#[derive(Debug, Default, Clone, Copy)]
struct Calibration {
    t1: f32,
    t2: f32,
    t3: f32,
    p1: f32,
    p2: f32,
    p3: f32,
    p4: f32,
    p5: f32,
    p6: f32,
    p7: f32,
    p8: f32,
    p9: f32,
    h1: f32,
    h2: f32,
    h3: f32,
    h4: f32,
    h5: f32,
    h6: f32,
}

impl Calibration {
    /// Returns (temperature in C, t_fine carried into the other formulas).
    fn compensate_temperature(&self, adc_t: f32) -> (f32, f32) {
        let var1 = (adc_t / 16384.0 - self.t1 / 1024.0) * self.t2;
        let var2 = {
            let v = adc_t / 131072.0 - self.t1 / 8192.0;
            v * v * self.t3
        };
        let t_fine = var1 + var2;
        (t_fine / 5120.0, t_fine)
    }

    /// Pressure in Pa. Returns 0 when the trimming would divide by zero.
    fn compensate_pressure(&self, adc_p: f32, t_fine: f32) -> f32 {
        let mut var1 = t_fine / 2.0 - 64000.0;
        let mut var2 = var1 * var1 * self.p6 / 32768.0;
        var2 += var1 * self.p5 * 2.0;
        var2 = var2 / 4.0 + self.p4 * 65536.0;
        var1 = (self.p3 * var1 * var1 / 524288.0 + self.p2 * var1) / 524288.0;
        var1 = (1.0 + var1 / 32768.0) * self.p1;
        if var1 == 0.0 {
            return 0.0;
        }
        let mut pressure = 1048576.0 - adc_p;
        pressure = (pressure - var2 / 4096.0) * 6250.0 / var1;
        var1 = self.p9 * pressure * pressure / 2147483648.0;
        var2 = pressure * self.p8 / 32768.0;
        pressure + (var1 + var2 + self.p7) / 16.0
    }

    /// Relative humidity in %, clamped to 0..=100.
    fn compensate_humidity(&self, adc_h: f32, t_fine: f32) -> f32 {
        let h = t_fine - 76800.0;
        let h = (adc_h - (self.h4 * 64.0 + self.h5 / 16384.0 * h))
            * (self.h2 / 65536.0
                * (1.0 + self.h6 / 67108864.0 * h * (1.0 + self.h3 / 67108864.0 * h)));
        let h = h * (1.0 - self.h1 * h / 524288.0);
        h.clamp(0.0, 100.0)
    }
}

/// BME280 temperature/humidity/pressure combo sensor.
pub struct Bme280<I, D> {
    i2c: I,
    address: u8,
    delay: D,
    calibration: Calibration,
}

impl<I: I2c, D: DelayNs> Bme280<I, D> {
    pub fn new(i2c: I, address: u8, delay: D) -> Self {
        Self {
            i2c,
            address,
            delay,
            calibration: Calibration::default(),
        }
    }

    async fn read_registers(&mut self, start: u8, buf: &mut [u8]) -> Result<(), SensorError> {
        self.i2c
            .write_read(self.address, &[start], buf)
            .await
            .map_err(|_| SensorError::Bus)
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), SensorError> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(|_| SensorError::Bus)
    }

    async fn read_calibration(&mut self) -> Result<(), SensorError> {
        // dig_T1..dig_P9, little-endian words at 0x88.
        let mut tp = [0u8; 24];
        self.read_registers(REG_CALIB_TP, &mut tp).await?;
        // dig_H1 sits alone at 0xA1; dig_H2..dig_H6 at 0xE1 with the
        // shared nibble between H4 and H5.
        let mut h1 = [0u8; 1];
        self.read_registers(REG_CALIB_H1, &mut h1).await?;
        let mut h = [0u8; 7];
        self.read_registers(REG_CALIB_H2, &mut h).await?;

        let u16le = |lo: u8, hi: u8| u16::from_le_bytes([lo, hi]) as f32;
        let i16le = |lo: u8, hi: u8| i16::from_le_bytes([lo, hi]) as f32;

        self.calibration = Calibration {
            t1: u16le(tp[0], tp[1]),
            t2: i16le(tp[2], tp[3]),
            t3: i16le(tp[4], tp[5]),
            p1: u16le(tp[6], tp[7]),
            p2: i16le(tp[8], tp[9]),
            p3: i16le(tp[10], tp[11]),
            p4: i16le(tp[12], tp[13]),
            p5: i16le(tp[14], tp[15]),
            p6: i16le(tp[16], tp[17]),
            p7: i16le(tp[18], tp[19]),
            p8: i16le(tp[20], tp[21]),
            p9: i16le(tp[22], tp[23]),
            h1: h1[0] as f32,
            h2: i16le(h[0], h[1]),
            h3: h[2] as f32,
            h4: (((h[3] as i8 as i16) << 4) | (h[4] & 0x0F) as i16) as f32,
            h5: (((h[5] as i8 as i16) << 4) | (h[4] >> 4) as i16) as f32,
            h6: (h[6] as i8) as f32,
        };
        Ok(())
    }
}

impl<I: I2c, D: DelayNs> Sensor<4> for Bme280<I, D> {
    type Readings = Bme280Readings;

    async fn init(&mut self) -> Result<(), SensorError> {
        let mut id = [0u8; 1];
        self.read_registers(REG_CHIP_ID, &mut id).await?;
        if id[0] != CHIP_ID {
            return Err(SensorError::BadId);
        }

        self.read_calibration().await?;

        // ctrl_hum must be written before ctrl_meas to take effect.
        self.write_register(REG_CTRL_HUM, CTRL_HUM_X1).await?;
        self.write_register(REG_CTRL_MEAS, CTRL_MEAS_NORMAL).await?;
        self.delay.delay_ms(STARTUP_DELAY_MS).await;
        Ok(())
    }

    async fn read(&mut self) -> Result<Bme280Readings, SensorError> {
        let mut buf = [0u8; 8];
        self.read_registers(REG_DATA, &mut buf).await?;

        let adc_p = ((buf[0] as u32) << 12) | ((buf[1] as u32) << 4) | ((buf[2] as u32) >> 4);
        let adc_t = ((buf[3] as u32) << 12) | ((buf[4] as u32) << 4) | ((buf[5] as u32) >> 4);
        let adc_h = ((buf[6] as u32) << 8) | buf[7] as u32;

        let (temperature, t_fine) = self.calibration.compensate_temperature(adc_t as f32);
        let pressure_hpa = self.calibration.compensate_pressure(adc_p as f32, t_fine) / 100.0;
        let humidity = self.calibration.compensate_humidity(adc_h as f32, t_fine);

        Ok(Bme280Readings {
            temperature_celsius: temperature,
            humidity_percent: humidity,
            pressure_hpa,
            altitude_meters: altitude_from_pressure(pressure_hpa),
        })
    }
}

/// Barometric altitude against the fixed sea-level reference.
fn altitude_from_pressure(pressure_hpa: f32) -> f32 {
    44330.0 * (1.0 - libm::powf(pressure_hpa / SEA_LEVEL_PRESSURE_HPA, 0.1903))
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::sensors::testing::{FakeI2c, NopDelay};

    #[test]
    fn test_temperature_compensation_datasheet_vector() {
        let calibration = Calibration {
            t1: 27504.0,
            t2: 26435.0,
            t3: -1000.0,
            ..Calibration::default()
        };

        let (temperature, _) = calibration.compensate_temperature(519888.0);

        assert!((temperature - 25.08).abs() < 0.01);
    }

    #[test]
    fn test_altitude_at_reference_pressure_is_zero() {
        assert!(altitude_from_pressure(SEA_LEVEL_PRESSURE_HPA).abs() < 0.001);
    }

    #[test]
    fn test_init_rejects_wrong_chip_id() {
        let mut bus = FakeI2c::new();
        bus.queue_read(&[0x58]); // a BMP280 answering instead
        let mut sensor = Bme280::new(bus, 0x76, NopDelay);

        assert!(matches!(block_on(sensor.init()), Err(SensorError::BadId)));
    }
}
