#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use embassy_executor::Spawner;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use embassy_time::{Delay, Duration, Timer};
use embedded_hal_bus::spi::ExclusiveDevice;
use embedded_sdmmc::SdCard;
use esp_hal::Async;
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::i2c::master::{Config as I2cConfig, I2c};
use esp_hal::spi::master::{Config as SpiConfig, Spi};
use esp_hal::time::Rate;
use esp_hal::timer::timg::TimerGroup;
use log::{error, info};
use static_cell::StaticCell;

use enviro_core::async_i2c_bus::AsyncI2cDevice;
use enviro_core::config::{CYCLE_PERIOD_SECS, LOG_FILE};
use enviro_core::registry::SensorRegistry;
use enviro_core::sampling::Station;
use enviro_core::storage::LogStore;
use enviro_core::storage::sd_card::{NullTimeSource, SdCardStorage};

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    error!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

#[allow(
    clippy::large_stack_frames,
    reason = "it's not unusual to allocate larger buffers etc. in main"
)]
#[esp_rtos::main]
async fn main(_spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = esp_hal::Config::default().with_cpu_clock(CpuClock::max());
    let peripherals = esp_hal::init(config);

    esp_alloc::heap_allocator!(size: 64 * 1024);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized!");

    // One physical I2C bus, one device handle per sensor driver.
    let i2c = I2c::new(peripherals.I2C0, I2cConfig::default())
        .unwrap()
        .with_sda(peripherals.GPIO8)
        .with_scl(peripherals.GPIO9)
        .into_async();

    static I2C_BUS: StaticCell<Mutex<CriticalSectionRawMutex, I2c<'static, Async>>> =
        StaticCell::new();
    let i2c_bus: &'static Mutex<CriticalSectionRawMutex, I2c<'static, Async>> =
        I2C_BUS.init(Mutex::new(i2c));

    let registry = SensorRegistry::new(|| AsyncI2cDevice::new(i2c_bus), Delay);

    // SD card over SPI. Card initialization needs a slow clock; the log
    // writes are tiny, so there is no reason to shift up afterwards.
    let spi = Spi::new(
        peripherals.SPI2,
        SpiConfig::default().with_frequency(Rate::from_khz(400)),
    )
    .unwrap()
    .with_sck(peripherals.GPIO12)
    .with_mosi(peripherals.GPIO11)
    .with_miso(peripherals.GPIO10);

    let cs = Output::new(peripherals.GPIO13, Level::High, OutputConfig::default());
    let spi_device = ExclusiveDevice::new_no_delay(spi, cs).unwrap();
    let sd_card = SdCard::new(spi_device, Delay);

    match sd_card.num_bytes() {
        Ok(size) => info!("Card Initialized ({} bytes)", size),
        Err(e) => error!("Card Mount Failed: {:?}", e),
    }

    let store = LogStore::new(SdCardStorage::new(sd_card, NullTimeSource), LOG_FILE);

    let mut station = Station::new(registry, store);
    station.start().await;

    loop {
        station.run_cycle().await;
        // The pause runs from the end of one cycle to the start of the
        // next; it is not wall-clock aligned.
        Timer::after(Duration::from_secs(CYCLE_PERIOD_SECS)).await;
    }
}
