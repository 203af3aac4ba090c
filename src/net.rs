//! Wi-Fi station and the UDP reply server.

use embassy_net::udp::{PacketMetadata, UdpSocket};
use embassy_net::{Runner, Stack};
use embassy_time::{Duration, Timer};
use esp_radio::wifi::{self, WifiController, WifiDevice, WifiEvent, WifiStaState};

use crate::config::NodeConfig;
use crate::logic::{self, Latest};
use crate::model::SensorRecord;
use crate::wire::MAX_REPLY_LEN;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);
const REQUEST_PREFIX_LEN: usize = 64;

#[macro_export]
macro_rules! make_static {
    ($ty:ty, $val:expr $(,)?) => {{
        static CELL: static_cell::StaticCell<$ty> = static_cell::StaticCell::new();
        CELL.uninit().write($val)
    }};
}

/// Keep the station connected, reconnecting after every drop.
#[embassy_executor::task]
pub async fn wifi_connection(
    mut controller: WifiController<'static>,
    ssid: &'static str,
    password: &'static str,
) {
    log::info!("starting wifi connection task...");
    loop {
        if wifi::sta_state() == WifiStaState::Connected {
            controller.wait_for_event(WifiEvent::StaDisconnected).await;
            log::warn!("wifi disconnected");
            Timer::after(RECONNECT_DELAY).await;
        }
        if !matches!(controller.is_started(), Ok(true)) {
            let config = wifi::ModeConfig::Client(
                wifi::ClientConfig::default()
                    .with_ssid(ssid.into())
                    .with_password(password.into()),
            );
            if let Err(e) = controller.set_config(&config) {
                log::warn!("failed to configure wifi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            log::info!("starting wifi...");
            if let Err(e) = controller.start_async().await {
                log::warn!("failed to start wifi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
                continue;
            }
            log::info!("wifi started");
        }
        log::info!("wifi connecting to '{}'...", ssid);
        match controller.connect_async().await {
            Ok(()) => log::info!("wifi connected"),
            Err(e) => {
                log::warn!("failed to connect to wifi: {:?}", e);
                Timer::after(RECONNECT_DELAY).await;
            }
        }
    }
}

#[embassy_executor::task]
pub async fn net_runner(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}

pub async fn wait_for_dhcp(stack: Stack<'_>) {
    stack.wait_link_up().await;

    log::info!("waiting to get IP address...");
    loop {
        stack.wait_config_up().await;
        if let Some(config) = stack.config_v4() {
            log::info!("got IP: {}", config.address);
            break;
        }
    }
}

/// Answer every datagram on the configured port with the latest record.
pub async fn serve_udp<R: SensorRecord>(
    stack: Stack<'_>,
    config: &NodeConfig,
    latest: &Latest<R>,
) -> ! {
    let mut rx_meta = [PacketMetadata::EMPTY; 4];
    let mut rx_buffer = [0u8; 256];
    let mut tx_meta = [PacketMetadata::EMPTY; 4];
    let mut tx_buffer = [0u8; 256];

    let mut socket = UdpSocket::new(
        stack,
        &mut rx_meta,
        &mut rx_buffer,
        &mut tx_meta,
        &mut tx_buffer,
    );

    while let Err(e) = socket.bind(config.udp_port) {
        log::warn!("failed to bind UDP port {}: {:?}", config.udp_port, e);
        Timer::after(RECONNECT_DELAY).await;
    }
    log::info!("listening on UDP port {}", config.udp_port);

    // only the start of a request is kept, any content is a query
    let mut request = [0u8; REQUEST_PREFIX_LEN];
    let mut reply = [0u8; MAX_REPLY_LEN];
    loop {
        let (len, meta) = socket
            .recv_from_with(|datagram: &[u8], meta| {
                let kept = datagram.len().min(request.len());
                request[..kept].copy_from_slice(&datagram[..kept]);
                (datagram.len(), meta)
            })
            .await;
        let endpoint = meta.endpoint;
        log::debug!("{} byte request from {}", len, endpoint);

        let record = latest.load();
        let request = &request[..len.min(REQUEST_PREFIX_LEN)];
        match logic::reply(config.node_id, record.as_ref(), request, &mut reply) {
            Ok(n) => {
                if let Err(e) = socket.send_to(&reply[..n], meta).await {
                    log::warn!("UDP send to {} failed: {:?}", endpoint, e);
                }
            }
            Err(e) => log::warn!("not answering {}: {}", endpoint, e),
        }
    }
}
