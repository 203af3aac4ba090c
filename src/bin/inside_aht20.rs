#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, delay::Delay, timer::timg::TimerGroup};
use esp_radio::wifi;

use lueften::{
    aht20::Aht20,
    config::NodeConfig,
    hardware::I2cHardware,
    logic::{Latest, Station},
    make_static,
    model::Aht20SensorData,
    net,
};

extern crate alloc;

type Sensor = Aht20<I2cHardware<'static>, Delay>;

/// Re-run the sensor init after this many failed reads in a row
const REINIT_AFTER_FAILURES: u32 = 3;

esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn run_sensor(
    mut station: Station<Sensor>,
    latest: &'static Latest<Aht20SensorData>,
    interval: Duration,
) {
    loop {
        match station.start() {
            Ok(()) => break,
            Err(e) => {
                log::error!("[AHT20] init failed: {}", e);
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    }

    loop {
        if let Ok(record) = station.measure() {
            latest.store(record);
        } else if station.consecutive_failures() % REINIT_AFTER_FAILURES == 0 {
            if let Err(e) = station.start() {
                log::error!("[AHT20] re-init failed: {}", e);
            }
        }
        Timer::after(interval).await;
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 98768);

    log::info!("=== Inside / AHT20 ===");

    // Initialize RTOS timer for embassy
    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    let config = match NodeConfig::from_build_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("invalid build configuration: {}", e);
            loop {
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    };
    let config = &*make_static!(NodeConfig, config);
    log::info!("node {} on port {}", config.node_id, config.udp_port);

    let mut i2c = match I2cHardware::new(peripherals.I2C0, peripherals.GPIO8, peripherals.GPIO9) {
        Ok(i2c) => i2c,
        Err(e) => {
            log::error!("[AHT20] I2C setup failed: {}", e);
            loop {
                Timer::after(Duration::from_secs(1)).await;
            }
        }
    };
    i2c.scan();

    let radio_init = &*make_static!(
        esp_radio::Controller,
        esp_radio::init().expect("Failed to initialize Wi-Fi/BLE controller"),
    );
    let (wifi_controller, interfaces) = wifi::new(radio_init, peripherals.WIFI, Default::default())
        .expect("Failed to initialize Wi-Fi controller");
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        embassy_net::Config::dhcpv4(Default::default()),
        make_static!(
            embassy_net::StackResources::<3>,
            embassy_net::StackResources::<3>::new(),
        ),
        config.node_id as u64,
    );

    if let Err(e) = spawner.spawn(net::wifi_connection(
        wifi_controller,
        config.ssid,
        config.password,
    )) {
        log::error!("Failed to spawn wifi task: {:?}", e);
    }
    if let Err(e) = spawner.spawn(net::net_runner(runner)) {
        log::error!("Failed to spawn net task: {:?}", e);
    }

    let latest = &*make_static!(Latest<Aht20SensorData>, Latest::new());
    let station = Station::new(Aht20::new(i2c, Delay::new()));
    let interval = Duration::from_secs(config.measure_interval.as_secs());
    if let Err(e) = spawner.spawn(run_sensor(station, latest, interval)) {
        log::error!("Failed to spawn sensor task: {:?}", e);
    }

    net::wait_for_dhcp(stack).await;
    net::serve_udp(stack, config, latest).await
}
