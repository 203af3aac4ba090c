#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_time::{Duration, Timer};
use esp_backtrace as _;
use esp_hal::{clock::CpuClock, delay::Delay, gpio::Flex, timer::timg::TimerGroup};
use esp_radio::wifi;

use lueften::{
    config::NodeConfig,
    dht22::Dht22,
    hardware,
    logic::{Latest, Station},
    make_static,
    model::Dht22SensorData,
    net,
};

extern crate alloc;

type Sensor = Dht22<Flex<'static>, Delay>;

esp_bootloader_esp_idf::esp_app_desc!();

#[embassy_executor::task]
async fn run_sensor(
    mut station: Station<Sensor>,
    latest: &'static Latest<Dht22SensorData>,
    interval: Duration,
) {
    if let Err(e) = station.start() {
        log::error!("[DHT22] init failed: {}", e);
    }
    loop {
        if let Ok(record) = station.measure() {
            latest.store(record);
        }
        Timer::after(interval).await;
    }
}

#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    esp_println::logger::init_logger_from_env();
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 98768);

    log::info!("=== UDP server / DHT22 ===");

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

    let latest = &*make_static!(Latest<Dht22SensorData>, Latest::new());
    let dht_pin = hardware::dht22_line(peripherals.GPIO4);
    let station = Station::new(Dht22::new(dht_pin, Delay::new()));
    let interval = Duration::from_secs(config.measure_interval.as_secs());
    if let Err(e) = spawner.spawn(run_sensor(station, latest, interval)) {
        log::error!("Failed to spawn sensor task: {:?}", e);
    }

    net::wait_for_dhcp(stack).await;
    net::serve_udp(stack, config, latest).await
}
