//! Registry of the configured sensor fleet.
//!
//! Owns one handle + driver pair per physical sensor, brings the bus up
//! once at startup, and polls every sensor once per cycle. Handles that
//! failed to initialize are still polled; a dead sensor simply reports
//! `Unavailable` every cycle.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::{error, info, warn};

use crate::config::{
    ADDR_BH1715_HIGH, ADDR_BH1715_LOW, ADDR_BME280, ADDR_CCS811, ADDR_SHT31_HIGH, ADDR_SHT31_LOW,
    ADDR_VEML6030,
};
use crate::sensors::slots::{
    Bh1715HighIndexed, Bh1715LowIndexed, Bme280Indexed, Ccs811Indexed, SLOT_COUNT,
    Sht31HighIndexed, Sht31LowIndexed, Veml6030Indexed,
};
use crate::sensors::{
    Bh1715, Bme280, Ccs811, IndexedSensor, Reading, Sensor, Sht31, Veml6030,
};

/// The sensor types on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorKind {
    Sht31,
    Veml6030,
    Ccs811,
    Bme280,
    Bh1715,
}

/// Identity and bring-up state of one physical sensor instance.
///
/// `initialized` is set at most once, during startup, and never reverts.
#[derive(Debug, Clone, Copy)]
pub struct SensorHandle {
    pub kind: SensorKind,
    pub address: u8,
    pub initialized: bool,
    label: &'static str,
}

impl SensorHandle {
    const fn new(kind: SensorKind, address: u8, label: &'static str) -> Self {
        Self {
            kind,
            address,
            initialized: false,
            label,
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }
}

/// One registry entry: the handle plus its slot-bound driver.
struct Slot<S> {
    handle: SensorHandle,
    sensor: S,
}

impl<S> Slot<S> {
    fn new(handle: SensorHandle, sensor: S) -> Self {
        Self { handle, sensor }
    }
}

/// All configured sensors, in declaration order.
pub struct SensorRegistry<I, D>
where
    I: I2c,
    D: DelayNs + Clone,
{
    sht31_low: Slot<Sht31LowIndexed<I, D>>,
    sht31_high: Slot<Sht31HighIndexed<I, D>>,
    veml6030: Slot<Veml6030Indexed<I, D>>,
    ccs811: Slot<Ccs811Indexed<I, D>>,
    bme280: Slot<Bme280Indexed<I, D>>,
    bh1715_low: Slot<Bh1715LowIndexed<I, D>>,
    bh1715_high: Slot<Bh1715HighIndexed<I, D>>,
}

impl<I, D> SensorRegistry<I, D>
where
    I: I2c,
    D: DelayNs + Clone,
{
    /// Build the fleet. `i2c` is called once per sensor to hand each
    /// driver its own device on the shared bus.
    pub fn new(mut i2c: impl FnMut() -> I, delay: D) -> Self {
        Self {
            sht31_low: Slot::new(
                SensorHandle::new(SensorKind::Sht31, ADDR_SHT31_LOW, "SHT31_L"),
                Sht31::new(i2c(), ADDR_SHT31_LOW, delay.clone()).into(),
            ),
            sht31_high: Slot::new(
                SensorHandle::new(SensorKind::Sht31, ADDR_SHT31_HIGH, "SHT31_H"),
                Sht31::new(i2c(), ADDR_SHT31_HIGH, delay.clone()).into(),
            ),
            veml6030: Slot::new(
                SensorHandle::new(SensorKind::Veml6030, ADDR_VEML6030, "VEML6030"),
                Veml6030::new(i2c(), ADDR_VEML6030, delay.clone()).into(),
            ),
            ccs811: Slot::new(
                SensorHandle::new(SensorKind::Ccs811, ADDR_CCS811, "CCS811B"),
                Ccs811::new(i2c(), ADDR_CCS811, delay.clone()).into(),
            ),
            bme280: Slot::new(
                SensorHandle::new(SensorKind::Bme280, ADDR_BME280, "BME280"),
                Bme280::new(i2c(), ADDR_BME280, delay.clone()).into(),
            ),
            bh1715_low: Slot::new(
                SensorHandle::new(SensorKind::Bh1715, ADDR_BH1715_LOW, "BH1715_L"),
                Bh1715::new(i2c(), ADDR_BH1715_LOW, delay.clone()).into(),
            ),
            bh1715_high: Slot::new(
                SensorHandle::new(SensorKind::Bh1715, ADDR_BH1715_HIGH, "BH1715_H"),
                Bh1715::new(i2c(), ADDR_BH1715_HIGH, delay).into(),
            ),
        }
    }

    /// Bring every sensor online, in declaration order, exactly once.
    ///
    /// A failure marks the handle and is reported, but never blocks the
    /// other sensors or the scheduler. There is no retry.
    pub async fn init_all(&mut self) {
        bring_up(&mut self.sht31_low).await;
        bring_up(&mut self.sht31_high).await;
        bring_up(&mut self.veml6030).await;
        bring_up(&mut self.ccs811).await;
        bring_up(&mut self.bme280).await;
        bring_up(&mut self.bh1715_low).await;
        bring_up(&mut self.bh1715_high).await;
    }

    /// Poll the whole fleet once and return the cycle's value vector.
    ///
    /// Reads are strictly sequential in declaration order; the shared bus
    /// carries one transaction at a time. Failed sensors leave
    /// `Unavailable` in their slots.
    pub async fn sample(&mut self) -> [Reading; SLOT_COUNT] {
        let mut values = [Reading::Unavailable; SLOT_COUNT];
        poll(&mut self.sht31_low, &mut values).await;
        poll(&mut self.sht31_high, &mut values).await;
        poll(&mut self.veml6030, &mut values).await;
        poll(&mut self.ccs811, &mut values).await;
        poll(&mut self.bme280, &mut values).await;
        poll(&mut self.bh1715_low, &mut values).await;
        poll(&mut self.bh1715_high, &mut values).await;
        values
    }

    /// Snapshot of every handle, in declaration order.
    pub fn handles(&self) -> [SensorHandle; 7] {
        [
            self.sht31_low.handle,
            self.sht31_high.handle,
            self.veml6030.handle,
            self.ccs811.handle,
            self.bme280.handle,
            self.bh1715_low.handle,
            self.bh1715_high.handle,
        ]
    }
}

async fn bring_up<S, const START: usize, const COUNT: usize>(
    slot: &mut Slot<IndexedSensor<S, START, COUNT>>,
) where
    S: Sensor<COUNT>,
{
    match slot.sensor.init().await {
        Ok(()) => {
            slot.handle.initialized = true;
            info!("{} is loaded", slot.handle.label());
        }
        Err(e) => error!("ERROR while loading {}: {}", slot.handle.label(), e),
    }
}

async fn poll<S, const START: usize, const COUNT: usize>(
    slot: &mut Slot<IndexedSensor<S, START, COUNT>>,
    values: &mut [Reading; SLOT_COUNT],
) where
    S: Sensor<COUNT>,
{
    if let Err(e) = slot.sensor.read_into(values).await {
        warn!("{}: {}", slot.handle.label(), e);
    }
}
