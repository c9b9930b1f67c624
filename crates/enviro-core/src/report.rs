//! Human-readable status reporting.
//!
//! One-way observability sink: every cycle's individual and averaged
//! values are echoed as `<Label>: <value-or-ERROR><unit>` lines through
//! the `log` facade. Nothing here is read back by the pipeline.

use log::info;

use crate::aggregate::{Aggregate, CycleAggregates, Quantity, Unit};

/// Emit one status line. Non-numeric values print the `ERROR` sentinel.
pub fn report_value(label: &str, value: f32, unit: Unit) {
    if value.is_nan() {
        info!("{}: ERROR{}", label, unit.suffix());
    } else {
        info!("{}: {:.2}{}", label, value, unit.suffix());
    }
}

fn report_group(labels: &[&str], average_label: &str, aggregate: &Aggregate, quantity: Quantity) {
    let unit = quantity.unit();
    for (label, value) in labels.iter().zip(aggregate.samples.iter()) {
        report_value(label, *value, unit);
    }
    report_value(average_label, aggregate.average, unit);
}

/// Echo a full cycle to the status sink.
pub fn report_cycle(aggregates: &CycleAggregates) {
    info!("------------TEMP--------------");
    report_group(
        &[
            "Temperature (SHT31-L)",
            "Temperature (SHT31-H)",
            "Temperature (BME280)",
        ],
        "Average Temperature",
        &aggregates.temperature,
        Quantity::Temperature,
    );

    info!("------------HUM--------------");
    report_group(
        &[
            "Humidity (SHT31-L)",
            "Humidity (SHT31-H)",
            "Humidity (BME280)",
        ],
        "Average Humidity",
        &aggregates.humidity,
        Quantity::Humidity,
    );

    info!("------------PRES-------------");
    report_value(
        "Pressure (BME280)",
        aggregates.pressure.average,
        Unit::HectoPascal,
    );
    report_value("Altitude (BME280)", aggregates.altitude.average, Unit::Meter);

    info!("-----------LIGHT-------------");
    report_group(
        &[
            "Luminance (VEML6030)",
            "Luminance (BH1715_H)",
            "Luminance (BH1715_L)",
        ],
        "Average Luminance",
        &aggregates.luminance,
        Quantity::Luminance,
    );

    info!("------------AIR--------------");
    report_value(
        "CO2 Level (CCS811B)",
        aggregates.eco2.average,
        Unit::PartsPerMillion,
    );
    report_value(
        "Volatile Organic Compounds Level (CCS811B)",
        aggregates.tvoc.average,
        Unit::PartsPerMillion,
    );
}
