//! The cycle pipeline.
//!
//! `Station` owns the sensor registry and the log store and drives one
//! full read → aggregate → report → build → persist sequence per call.
//! The caller provides the cadence: the firmware sleeps a fixed period
//! after each completed cycle and never stops.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use log::info;

use crate::aggregate::aggregate_cycle;
use crate::record::CycleRecord;
use crate::registry::SensorRegistry;
use crate::report::report_cycle;
use crate::storage::{LogMedium, LogStore};

pub struct Station<I, D, M>
where
    I: I2c,
    D: DelayNs + Clone,
    M: LogMedium,
{
    registry: SensorRegistry<I, D>,
    store: LogStore<M>,
    cycle_id: u32,
}

impl<I, D, M> Station<I, D, M>
where
    I: I2c,
    D: DelayNs + Clone,
    M: LogMedium,
{
    pub fn new(registry: SensorRegistry<I, D>, store: LogStore<M>) -> Self {
        Self {
            registry,
            store,
            cycle_id: 0,
        }
    }

    /// One-time startup: bring every sensor online and make sure the log
    /// header exists. Neither step can abort the node.
    pub async fn start(&mut self) {
        self.registry.init_all().await;
        self.store.ensure_header();
    }

    /// Run one complete cycle.
    ///
    /// The cycle counts as completed no matter how many sensors failed or
    /// whether the append succeeded; the id advances exactly once.
    pub async fn run_cycle(&mut self) {
        let values = self.registry.sample().await;
        let aggregates = aggregate_cycle(&values);

        report_cycle(&aggregates);

        let record = CycleRecord::build(self.cycle_id, &aggregates);
        info!("Save data: {}", record);
        self.store.append_record(&record);

        self.cycle_id = self.cycle_id.wrapping_add(1);
    }

    pub fn cycle_id(&self) -> u32 {
        self.cycle_id
    }

    pub fn store(&self) -> &LogStore<M> {
        &self.store
    }

    pub fn registry(&self) -> &SensorRegistry<I, D> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use embassy_futures::block_on;

    use super::*;
    use crate::record::CSV_HEADER;
    use crate::sensors::testing::{FakeI2c, NopDelay};
    use crate::storage::testing::MemMedium;

    /// A station whose entire bus is dead: every sensor fails to
    /// initialize and every poll comes back unavailable.
    fn dead_bus_station(medium: MemMedium) -> Station<FakeI2c, NopDelay, MemMedium> {
        let registry = SensorRegistry::new(|| FakeI2c::failing(), NopDelay);
        Station::new(registry, LogStore::new(medium, "data.txt"))
    }

    #[test]
    fn test_cycle_id_advances_once_per_cycle() {
        let mut station = dead_bus_station(MemMedium::new());
        block_on(station.start());

        for _ in 0..3 {
            block_on(station.run_cycle());
        }

        assert_eq!(station.cycle_id(), 3);
    }

    #[test]
    fn test_degraded_cycle_still_appends_a_full_record() {
        let mut station = dead_bus_station(MemMedium::new());
        block_on(station.start());

        block_on(station.run_cycle());

        let contents = core::str::from_utf8(station.store().medium().contents()).unwrap();
        let lines: Vec<&str> = contents.split("\r\n").collect();
        assert_eq!(lines[0], CSV_HEADER.trim_end_matches("\r\n"));
        // every sensor is down: the columns carry the NaN sentinel, except
        // the air-quality pair which substitutes zero
        assert_eq!(
            lines[1],
            "0, nan, nan, nan, nan, nan, nan, nan, nan, nan, nan, nan, nan, nan, nan, 0.00, 0.00"
        );
    }

    #[test]
    fn test_records_accumulate_in_cycle_order() {
        let mut station = dead_bus_station(MemMedium::new());
        block_on(station.start());

        for _ in 0..4 {
            block_on(station.run_cycle());
        }

        let contents = core::str::from_utf8(station.store().medium().contents()).unwrap();
        assert_eq!(contents.matches("\r\n").count(), 5); // header + 4 records
        for (index, line) in contents.split("\r\n").skip(1).take(4).enumerate() {
            assert!(line.starts_with(&format!("{index}, ")));
        }
    }

    #[test]
    fn test_storage_failure_does_not_stop_the_scheduler() {
        let mut station = dead_bus_station(MemMedium::failing());
        block_on(station.start());

        for _ in 0..2 {
            block_on(station.run_cycle());
        }

        assert_eq!(station.cycle_id(), 2);
        assert!(station.store().medium().contents().is_empty());
    }

    #[test]
    fn test_uninitialized_sensors_are_still_polled() {
        let mut station = dead_bus_station(MemMedium::new());
        block_on(station.start());

        assert!(station.registry().handles().iter().all(|h| !h.initialized));

        block_on(station.run_cycle());

        // a record was still produced for the cycle
        assert_eq!(station.cycle_id(), 1);
        assert!(!station.store().medium().contents().is_empty());
    }
}
