//! Fixed-schema cycle records and their CSV rendering.

use core::fmt::{self, Write};

use heapless::String;

use crate::aggregate::{Aggregate, CycleAggregates};

/// First line of the log file. Written once, never rewritten.
pub const CSV_HEADER: &str = "ID, temp1, temp2, temp3, avgTemp, hum1, hum2, hum3, avgHum, pres, alt, lux1, lux2, lux3, avgLux, eCO2, tVOC \r\n";

/// Upper bound for one rendered record line.
pub const MAX_LINE_LEN: usize = 512;

/// One cycle's complete field set, in schema order.
#[derive(Debug, Clone)]
pub struct CycleRecord {
    pub id: u32,
    pub temperature: [f32; 3],
    pub avg_temperature: f32,
    pub humidity: [f32; 3],
    pub avg_humidity: f32,
    pub pressure: f32,
    pub altitude: f32,
    pub luminance: [f32; 3],
    pub avg_luminance: f32,
    pub eco2: f32,
    pub tvoc: f32,
}

impl CycleRecord {
    /// Assemble the record for one completed cycle.
    pub fn build(id: u32, aggregates: &CycleAggregates) -> Self {
        Self {
            id,
            temperature: three(&aggregates.temperature),
            avg_temperature: aggregates.temperature.average,
            humidity: three(&aggregates.humidity),
            avg_humidity: aggregates.humidity.average,
            pressure: aggregates.pressure.average,
            altitude: aggregates.altitude.average,
            luminance: three(&aggregates.luminance),
            avg_luminance: aggregates.luminance.average,
            eco2: aggregates.eco2.average,
            tvoc: aggregates.tvoc.average,
        }
    }

    /// The sixteen float fields after `ID`, in schema order.
    pub fn values(&self) -> [f32; 16] {
        [
            self.temperature[0],
            self.temperature[1],
            self.temperature[2],
            self.avg_temperature,
            self.humidity[0],
            self.humidity[1],
            self.humidity[2],
            self.avg_humidity,
            self.pressure,
            self.altitude,
            self.luminance[0],
            self.luminance[1],
            self.luminance[2],
            self.avg_luminance,
            self.eco2,
            self.tvoc,
        ]
    }

    /// The record as one complete, CRLF-terminated CSV line.
    pub fn to_csv_line(&self) -> String<MAX_LINE_LEN> {
        let mut line = String::new();
        let _ = write!(line, "{self}\r\n");
        line
    }
}

impl fmt::Display for CycleRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        for value in self.values() {
            write!(f, ", {}", Cell(value))?;
        }
        Ok(())
    }
}

/// A single CSV value: two decimals, or the `nan` sentinel.
struct Cell(f32);

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_nan() {
            f.write_str("nan")
        } else {
            write!(f, "{:.2}", self.0)
        }
    }
}

/// Samples padded to the three-column layout. The redundant quantities
/// always have exactly three contributors; the padding never shows in
/// practice.
fn three(aggregate: &Aggregate) -> [f32; 3] {
    let mut out = [f32::NAN; 3];
    for (column, sample) in out.iter_mut().zip(aggregate.samples.iter()) {
        *column = *sample;
    }
    out
}

#[cfg(test)]
mod tests {
    use heapless::Vec;

    use super::*;

    fn aggregate_of(samples: &[f32]) -> Aggregate {
        let samples = Vec::from_slice(samples).unwrap();
        let average = samples.iter().sum::<f32>() / samples.len() as f32;
        Aggregate { samples, average }
    }

    fn sample_aggregates() -> CycleAggregates {
        CycleAggregates {
            temperature: aggregate_of(&[21.0, 23.0, 22.0]),
            humidity: aggregate_of(&[40.0, f32::NAN, 44.0]),
            pressure: aggregate_of(&[1013.25]),
            altitude: aggregate_of(&[0.0]),
            luminance: aggregate_of(&[100.0, 200.0, 300.0]),
            eco2: aggregate_of(&[0.0]),
            tvoc: aggregate_of(&[0.0]),
        }
    }

    #[test]
    fn test_header_names_all_fields() {
        assert!(CSV_HEADER.starts_with("ID, temp1"));
        assert!(CSV_HEADER.ends_with("\r\n"));
        assert_eq!(CSV_HEADER.split(',').count(), 17);
    }

    #[test]
    fn test_csv_line_field_order_and_rendering() {
        let record = CycleRecord::build(7, &sample_aggregates());

        assert_eq!(
            record.to_csv_line().as_str(),
            "7, 21.00, 23.00, 22.00, 22.00, 40.00, nan, 44.00, nan, 1013.25, \
             0.00, 100.00, 200.00, 300.00, 200.00, 0.00, 0.00\r\n"
        );
    }

    #[test]
    fn test_unavailable_cell_renders_as_nan_sentinel() {
        let record = CycleRecord::build(0, &sample_aggregates());

        assert!(record.avg_humidity.is_nan());
        assert!(record.to_csv_line().contains(", nan, 44.00, nan,"));
    }
}
