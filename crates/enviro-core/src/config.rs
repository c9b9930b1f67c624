//! Fixed node configuration.
//!
//! The sensor fleet is static: every bus address, the log path and the
//! cycle period are compile-time constants. There is no runtime
//! reconfiguration path.

/// I2C addresses of the configured sensors.
pub const ADDR_SHT31_LOW: u8 = 0x44;
pub const ADDR_SHT31_HIGH: u8 = 0x45;
pub const ADDR_BH1715_LOW: u8 = 0x23;
pub const ADDR_BH1715_HIGH: u8 = 0x5C;
pub const ADDR_VEML6030: u8 = 0x10;
pub const ADDR_CCS811: u8 = 0x5A;
pub const ADDR_BME280: u8 = 0x76;

/// Reference pressure for the altitude conversion, in hPa.
pub const SEA_LEVEL_PRESSURE_HPA: f32 = 1013.25;

/// Log file name on the storage volume (8.3 name).
pub const LOG_FILE: &str = "data.txt";

/// Pause between the end of one cycle and the start of the next.
pub const CYCLE_PERIOD_SECS: u64 = 60;
