//! DHT22 single-wire sensor
//!
//! The bit protocol is done by `dht22_sensor`; this wraps it behind
//! [`HumiditySensor`] for any embedded-hal pin that can both drive and
//! sample the data line (open drain with pull-up).

use core::fmt::Debug;

use dht22_sensor::DhtError;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::error::SensorError;
use crate::model::{Dht22SensorData, RawReading};
use crate::traits::HumiditySensor;

/// Power-up time before the first transfer
const STARTUP_MS: u32 = 1_000;

pub struct Dht22<P, D> {
    pin: P,
    delay: D,
}

impl<P, D> Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    pub fn new(pin: P, delay: D) -> Self {
        Self { pin, delay }
    }
}

fn sensor_error<E: Debug>(err: DhtError<E>) -> SensorError {
    match err {
        DhtError::ChecksumMismatch => SensorError::Checksum,
        DhtError::Timeout => SensorError::Timeout,
        DhtError::PinError(e) => {
            log::debug!("[DHT22] pin error: {:?}", e);
            SensorError::Bus
        }
    }
}

impl<P, D> HumiditySensor for Dht22<P, D>
where
    P: InputPin + OutputPin,
    D: DelayNs,
{
    type Record = Dht22SensorData;

    fn init(&mut self) -> Result<(), SensorError> {
        // idle high
        self.pin.set_high().map_err(|_| SensorError::Bus)?;
        self.delay.delay_ms(STARTUP_MS);
        Ok(())
    }

    fn read(&mut self) -> Result<RawReading, SensorError> {
        let reading = dht22_sensor::Dht22::new(&mut self.pin, &mut self.delay)
            .read()
            .map_err(sensor_error)?;
        log::debug!(
            "[DHT22] {:?} degC, {:?} % rH",
            reading.temperature,
            reading.relative_humidity
        );

        Ok(RawReading {
            temperature: reading.temperature as f64,
            relative_humidity: reading.relative_humidity as f64,
        })
    }
}
