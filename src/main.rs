//! Smart safe firmware entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Adapters (outer ring)                    │
//! │  NvsAdapter   Esp32TimeAdapter   MqttLink   WifiStation      │
//! │  ChannelSink  Lcd1602 / Mpu6050 on SharedBus  Keypad  LEDs   │
//! │                                                              │
//! │  ──────────────── Port Trait Boundary ───────────────────    │
//! │                                                              │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │      ControlService (FSM · PinVerifier · commands)     │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │  TelemetryPublisher (ring buffer, ack tracking, sweep)       │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Boot order: logger, NVS config, shared state, the control task, then
//! network and peripherals.  Each peripheral is initialised inside the
//! task that owns it, so a failure only loses that task.  Without WiFi or
//! MQTT the device runs offline with telemetry buffered.
#![deny(unused_must_use)]

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Result;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::{AnyIOPin, AnyOutputPin, IOPin, Input, Output, OutputPin, PinDriver, Pull};
use esp_idf_svc::hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use log::{error, info, warn};

use smartsafe::adapters::channel_sink::ChannelSink;
use smartsafe::adapters::mqtt::{self, MqttLink};
use smartsafe::adapters::nvs::NvsAdapter;
use smartsafe::adapters::time::{Esp32TimeAdapter, SystemDelay};
use smartsafe::adapters::wifi::{WifiCredentials, WifiStation};
use smartsafe::app::motion::Sensitivity;
use smartsafe::app::ports::ConfigPort;
use smartsafe::app::service::ControlService;
use smartsafe::channels::Channels;
use smartsafe::config::SystemConfig;
use smartsafe::drivers::bus::SharedBus;
use smartsafe::drivers::display::DisplayController;
use smartsafe::drivers::indicator::LedIndicator;
use smartsafe::drivers::keypad::Keypad;
use smartsafe::drivers::lcd::Lcd1602;
use smartsafe::drivers::task_pin::TaskSpec;
use smartsafe::drivers::watchdog::Watchdog;
use smartsafe::error::Error;
use smartsafe::pins;
use smartsafe::tasks::{self, control::ControlTask, input::MotionPoller, telemetry::TelemetryTask};
use smartsafe::telemetry::publisher::{PublisherConfig, TelemetryPublisher};

static CHANNELS: Channels = Channels::new();

fn output(pin: impl OutputPin) -> smartsafe::error::Result<PinDriver<'static, AnyOutputPin, Output>> {
    PinDriver::output(pin.downgrade_output()).map_err(|_| Error::Init("gpio output"))
}

fn pulled_up(pin: impl IOPin) -> smartsafe::error::Result<PinDriver<'static, AnyIOPin, Input>> {
    let mut driver = PinDriver::input(pin.downgrade()).map_err(|_| Error::Init("gpio input"))?;
    driver.set_pull(Pull::Up).map_err(|_| Error::Init("gpio pull-up"))?;
    Ok(driver)
}

/// Spawn a non-critical task.  Failing to start it is logged and the rest
/// of the firmware boots without it.
fn start<F>(handles: &mut Vec<JoinHandle<()>>, spec: TaskSpec, body: F)
where
    F: FnOnce() -> smartsafe::error::Result<()> + Send + 'static,
{
    match tasks::spawn_task(spec, body) {
        Ok(handle) => handles.push(handle),
        Err(e) => error!("{} task not started: {}", spec.name.trim_end_matches('\0'), e),
    }
}

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;
    info!("SmartSafe v{}", env!("CARGO_PKG_VERSION"));

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let nvs_partition = EspDefaultNvsPartition::take()?;

    // ── 2. Config from NVS (or defaults) ──────────────────────
    let nvs = NvsAdapter::new(nvs_partition.clone());
    let config = match nvs.load() {
        Ok(cfg) => {
            info!("Config loaded from NVS");
            cfg
        }
        Err(e) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    };

    // ── 3. Shared state ───────────────────────────────────────
    let channels: &'static Channels = &CHANNELS;
    let clock = Esp32TimeAdapter::new();
    let sensitivity = Arc::new(Sensitivity::new(config.movement_threshold));
    let publisher = Arc::new(TelemetryPublisher::new(
        config.telemetry_topic(),
        PublisherConfig::from_config(&config),
    ));
    let mut handles = Vec::new();

    // ── 4. Control core first: nothing below may keep it from running
    {
        let config = config.clone();
        let clock = clock.clone();
        let publisher = publisher.clone();
        let sensitivity = sensitivity.clone();
        handles.push(tasks::spawn_task(tasks::CONTROL_TASK, move || {
            let watchdog = Watchdog::new(config.watchdog_timeout_ms);
            let service = ControlService::new(&config, nvs, clock.clone(), sensitivity)?;
            let sink = ChannelSink::new(channels, Some(publisher.as_ref()), clock);
            ControlTask::new(service, watchdog, config.control_poll_ms).run(channels, sink)
        })?);
    }

    // ── 5. Network: any failure leaves telemetry buffered ─────
    let _sntp = match (option_env!("SMARTSAFE_WIFI_SSID"), option_env!("SMARTSAFE_WIFI_PASS")) {
        (Some(ssid), pass) => {
            let station = WifiCredentials::new(ssid, pass.unwrap_or_default())
                .and_then(|creds| WifiStation::new(peripherals.modem, sysloop, nvs_partition, &creds));
            match station {
                Ok(station) => {
                    start(&mut handles, tasks::WIFI_TASK, move || {
                        tasks::network::run_wifi(station)
                    });
                    EspSntp::new_default()
                        .map_err(|e| warn!("SNTP not started ({}), timestamps use uptime", e))
                        .ok()
                }
                Err(e) => {
                    error!("WiFi init failed ({}), telemetry stays buffered", e);
                    None
                }
            }
        }
        (None, _) => {
            warn!("No WiFi credentials compiled in, telemetry stays buffered");
            None
        }
    };

    let link = match MqttLink::new(&config) {
        Ok((link, conn)) => {
            match mqtt::spawn_receiver(
                link.clone(),
                conn,
                config.command_topic(),
                channels,
                tasks::MQTT_RX_TASK,
            ) {
                Ok(handle) => handles.push(handle),
                Err(e) => error!("MQTT receiver not started: {}", e),
            }
            Some(link)
        }
        Err(e) => {
            error!("MQTT init failed ({}), telemetry stays buffered", e);
            None
        }
    };

    {
        let clock = clock.clone();
        let publisher = publisher.clone();
        let sweep_interval_ms = config.sweep_interval_ms;
        start(&mut handles, tasks::TELEMETRY_TASK, move || {
            TelemetryTask::new(publisher, link, clock, SystemDelay, sweep_interval_ms).run(channels)
        });
    }

    // ── 6. Peripherals, each inside the task that owns it ─────
    let p = peripherals.pins;
    let (r0, r1, r2, r3) = (p.gpio13, p.gpio12, p.gpio14, p.gpio27);
    let (c0, c1, c2, c3) = (p.gpio26, p.gpio25, p.gpio33, p.gpio32);
    start(&mut handles, tasks::KEYPAD_TASK, move || {
        let keypad = Keypad::new(
            [output(r0)?, output(r1)?, output(r2)?, output(r3)?],
            [pulled_up(c0)?, pulled_up(c1)?, pulled_up(c2)?, pulled_up(c3)?],
        )?;
        tasks::input::run_keypad(keypad, SystemDelay, channels)
    });

    {
        let (red, green) = (p.gpio2, p.gpio4);
        let flash_ms = config.alarm_flash_interval_ms;
        let clock = clock.clone();
        start(&mut handles, tasks::LED_TASK, move || {
            let leds = LedIndicator::new(output(red)?, output(green)?, flash_ms);
            tasks::led::run(leds, channels, clock)
        });
    }

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        p.gpio21,
        p.gpio22,
        &I2cConfig::new().baudrate(Hertz(pins::I2C_BAUD_HZ)),
    );
    match i2c {
        Ok(i2c) => {
            let bus = Arc::new(SharedBus::new(i2c));
            {
                let bus = bus.clone();
                start(&mut handles, tasks::MOTION_TASK, move || {
                    let mut delay = SystemDelay;
                    MotionPoller::init(bus, sensitivity, &mut delay)?.run(delay, channels)
                });
            }
            start(&mut handles, tasks::DISPLAY_TASK, move || {
                let lcd = Lcd1602::init(bus, &mut SystemDelay)?;
                tasks::display::run(DisplayController::new(lcd), channels, clock)
            });
        }
        Err(e) => error!("I2C bus init failed ({}), motion and display disabled", e),
    }

    info!("All tasks started");
    for handle in handles {
        if handle.join().is_err() {
            error!("A task panicked");
        }
    }
    Ok(())
}
