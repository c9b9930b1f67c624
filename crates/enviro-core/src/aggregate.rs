//! Per-cycle reduction of redundant readings into per-quantity values.
//!
//! Each quantity has a fixed, ordered contributor list. An unavailable
//! reading contributes NaN, which deliberately propagates through the
//! mean: the averaged value goes non-numeric while the per-sensor columns
//! keep whatever each sensor reported. The air-quality quantities are the
//! exception and substitute a literal 0 before both reporting and
//! averaging.

use heapless::Vec;

use crate::sensors::slots::{self, SLOT_COUNT};
use crate::sensors::Reading;

/// Most contributors any quantity has.
pub const MAX_CONTRIBUTORS: usize = 3;

/// Unit suffix attached to reported values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    Celsius,
    Percent,
    HectoPascal,
    Meter,
    Lux,
    PartsPerMillion,
}

impl Unit {
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Celsius => "C",
            Self::Percent => "%",
            Self::HectoPascal => "hPa",
            Self::Meter => "m",
            Self::Lux => "lux",
            Self::PartsPerMillion => "ppm",
        }
    }
}

/// A physical quantity reported by one or more redundant sensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantity {
    Temperature,
    Humidity,
    Pressure,
    Altitude,
    Luminance,
    ECo2,
    Tvoc,
}

impl Quantity {
    pub const fn unit(self) -> Unit {
        match self {
            Self::Temperature => Unit::Celsius,
            Self::Humidity => Unit::Percent,
            Self::Pressure => Unit::HectoPascal,
            Self::Altitude => Unit::Meter,
            Self::Luminance => Unit::Lux,
            Self::ECo2 | Self::Tvoc => Unit::PartsPerMillion,
        }
    }

    /// Contributor slots, in reporting order. Every quantity has at least
    /// one contributor.
    pub const fn contributors(self) -> &'static [usize] {
        match self {
            Self::Temperature => &[
                slots::TEMP_SHT31_LOW,
                slots::TEMP_SHT31_HIGH,
                slots::TEMP_BME280,
            ],
            Self::Humidity => &[
                slots::HUM_SHT31_LOW,
                slots::HUM_SHT31_HIGH,
                slots::HUM_BME280,
            ],
            Self::Pressure => &[slots::PRES_BME280],
            Self::Altitude => &[slots::ALT_BME280],
            Self::Luminance => &[
                slots::LUX_VEML6030,
                slots::LUX_BH1715_HIGH,
                slots::LUX_BH1715_LOW,
            ],
            Self::ECo2 => &[slots::ECO2_CCS811],
            Self::Tvoc => &[slots::TVOC_CCS811],
        }
    }

    /// Air-quality readings substitute a literal 0 when their sensor is
    /// unavailable, instead of the NaN sentinel.
    pub const fn substitutes_zero(self) -> bool {
        matches!(self, Self::ECo2 | Self::Tvoc)
    }
}

/// One quantity's values for one cycle: the individual samples in sensor
/// order and their combined average.
#[derive(Debug, Clone)]
pub struct Aggregate {
    pub samples: Vec<f32, MAX_CONTRIBUTORS>,
    pub average: f32,
}

/// Reduce one quantity's contributor slots.
///
/// The average is `sum / count` unconditionally; a single-contributor
/// quantity passes its value through.
pub fn aggregate(quantity: Quantity, values: &[Reading; SLOT_COUNT]) -> Aggregate {
    let mut samples: Vec<f32, MAX_CONTRIBUTORS> = Vec::new();
    for &slot in quantity.contributors() {
        let value = if quantity.substitutes_zero() {
            values[slot].raw_or(0.0)
        } else {
            values[slot].raw()
        };
        samples.push(value).ok();
    }

    let sum: f32 = samples.iter().sum();
    let average = sum / samples.len() as f32;
    Aggregate { samples, average }
}

/// Every quantity's aggregate for one cycle.
pub struct CycleAggregates {
    pub temperature: Aggregate,
    pub humidity: Aggregate,
    pub pressure: Aggregate,
    pub altitude: Aggregate,
    pub luminance: Aggregate,
    pub eco2: Aggregate,
    pub tvoc: Aggregate,
}

pub fn aggregate_cycle(values: &[Reading; SLOT_COUNT]) -> CycleAggregates {
    CycleAggregates {
        temperature: aggregate(Quantity::Temperature, values),
        humidity: aggregate(Quantity::Humidity, values),
        pressure: aggregate(Quantity::Pressure, values),
        altitude: aggregate(Quantity::Altitude, values),
        luminance: aggregate(Quantity::Luminance, values),
        eco2: aggregate(Quantity::ECo2, values),
        tvoc: aggregate(Quantity::Tvoc, values),
    }
}
