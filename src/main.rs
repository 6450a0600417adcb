//! Sensor node firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                    Adapters (outer ring)                     │
//! │                                                              │
//! │  SoftI2c (GPIO)   SpiDeviceDriver   FreeRtos   SleepAdapter  │
//! │  (sensor bus)     (radio)           (delay)    (PowerPort)   │
//! │  LogEventSink     NvsAdapter                                 │
//! │  (EventSink)      (ConfigPort)                               │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │  NodeService: Reset → Measure → Report → Sleep → …     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use log::{info, warn};

use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{Gpio4, Gpio5, InputOutput, PinDriver};
use esp_idf_hal::peripherals::Peripherals as EspPeripherals;
use esp_idf_hal::spi::config::Config as SpiConfig;
use esp_idf_hal::spi::{SpiDeviceDriver, SpiDriver, SpiDriverConfig};
use esp_idf_hal::units::Hertz;

use subghz_node::adapters::log_sink::LogEventSink;
use subghz_node::adapters::nvs::NvsAdapter;
use subghz_node::adapters::power::SleepAdapter;
use subghz_node::app::ports::{Board, ConfigPort, Peripherals};
use subghz_node::app::service::NodeService;
use subghz_node::bus::{I2cMaster, SoftI2c};
use subghz_node::config::NodeConfig;
use subghz_node::pins;

// ── Board binding ─────────────────────────────────────────────

type SdaPin = PinDriver<'static, Gpio4, InputOutput>;
type SclPin = PinDriver<'static, Gpio5, InputOutput>;

struct EspBoard;

impl Board for EspBoard {
    type I2c = I2cMaster<SoftI2c<SdaPin, SclPin, Ets>>;
    type Spi = SpiDeviceDriver<'static, SpiDriver<'static>>;
    type Delay = FreeRtos;
    type Power = SleepAdapter;
    type Sink = LogEventSink;
}

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  Sub-GHz sensor node v{}          ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let config = match NvsAdapter::new().and_then(|nvs| nvs.load()) {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            NodeConfig::default()
        }
    };
    info!(
        "Node 0x{:02X}, sampling every {} s",
        config.node_address, config.sample_interval_secs
    );

    // ── 3. Buses ──────────────────────────────────────────────
    let peripherals = EspPeripherals::take()?;

    // Open-drain lines: writing high releases the line to the pull-up.
    let mut sda = PinDriver::input_output_od(peripherals.pins.gpio4)?;
    let mut scl = PinDriver::input_output_od(peripherals.pins.gpio5)?;
    sda.set_high()?;
    scl.set_high()?;
    let i2c = I2cMaster::new(SoftI2c::new(sda, scl, Ets));
    info!(
        "I2C: bit-banged on SDA={} SCL={}",
        pins::I2C_SDA_GPIO,
        pins::I2C_SCL_GPIO
    );

    let spi_config = SpiConfig::new()
        .baudrate(Hertz(pins::RADIO_SPI_HZ))
        .data_mode(embedded_hal::spi::MODE_0);
    let spi = SpiDeviceDriver::new_single(
        peripherals.spi2,
        peripherals.pins.gpio6,
        peripherals.pins.gpio7,
        Some(peripherals.pins.gpio2),
        Some(peripherals.pins.gpio10),
        &SpiDriverConfig::default(),
        &spi_config,
    )?;
    info!("SPI: radio on CS={}", pins::RADIO_NSS_GPIO);

    // ── 4. Node service ───────────────────────────────────────
    let mut service: NodeService<EspBoard> = NodeService::new(
        Peripherals {
            i2c,
            spi,
            delay: FreeRtos,
            power: SleepAdapter::new(),
            sink: LogEventSink::new(),
        },
        config,
    );

    if !service.bring_up() {
        warn!("Continuing without barometer calibration");
    }
    service.start();
    service.run()
}
