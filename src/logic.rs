//! Business logic layer (hardware-independent)

use core::cell::Cell;
use core::fmt::Write;

use embassy_sync::blocking_mutex::{Mutex, raw::CriticalSectionRawMutex};
use num_traits::Float;

use crate::error::{SensorError, WireError};
use crate::model::SensorRecord;
use crate::traits::HumiditySensor;
use crate::wire;

/// Below this both values count as zero, which is what a failed read
/// looks like on the collector side.
const ZERO_TOLERANCE: f64 = 1e-5;
const MIN_TEMPERATURE: f64 = -40.0;
const MAX_TEMPERATURE: f64 = 80.0;

/// Whether a reading is something the sensors can actually deliver.
pub fn is_plausible(temperature: f64, relative_humidity: f64) -> bool {
    if !temperature.is_finite() || !relative_humidity.is_finite() {
        return false;
    }
    let near_zero = |value: f64| Float::abs(value) < ZERO_TOLERANCE;
    if near_zero(temperature) && near_zero(relative_humidity) {
        return false;
    }
    (0.0..=100.0).contains(&relative_humidity)
        && (MIN_TEMPERATURE..=MAX_TEMPERATURE).contains(&temperature)
}

/// A node's sensor and what it knows about its recent reads.
pub struct Station<S> {
    sensor: S,
    consecutive_failures: u32,
}

impl<S: HumiditySensor> Station<S> {
    pub fn new(sensor: S) -> Self {
        Self {
            sensor,
            consecutive_failures: 0,
        }
    }

    pub fn start(&mut self) -> Result<(), SensorError> {
        self.sensor.init()
    }

    /// Read the sensor and turn the reading into a record.
    pub fn measure(&mut self) -> Result<S::Record, SensorError> {
        match self.try_measure() {
            Ok(record) => {
                self.consecutive_failures = 0;
                log::info!("{}", format_short(&record));
                Ok(record)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                log::warn!(
                    "[{}] read failed ({} in a row): {}",
                    <S::Record as SensorRecord>::SENSOR,
                    self.consecutive_failures,
                    e
                );
                Err(e)
            }
        }
    }

    fn try_measure(&mut self) -> Result<S::Record, SensorError> {
        let raw = self.sensor.read()?;
        if !is_plausible(raw.temperature, raw.relative_humidity) {
            return Err(SensorError::Implausible);
        }
        Ok(<S::Record as SensorRecord>::from_reading(
            raw.temperature,
            raw.relative_humidity,
        ))
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

/// Most recent record, written by the sensor task and read by the
/// network task.
pub struct Latest<R>(Mutex<CriticalSectionRawMutex, Cell<Option<R>>>);

impl<R: Copy> Latest<R> {
    pub const fn new() -> Self {
        Self(Mutex::new(Cell::new(None)))
    }

    pub fn store(&self, record: R) {
        self.0.lock(|cell| cell.set(Some(record)));
    }

    pub fn load(&self) -> Option<R> {
        self.0.lock(|cell| cell.get())
    }
}

impl<R: Copy> Default for Latest<R> {
    fn default() -> Self {
        Self::new()
    }
}

/// Answer a request datagram. Any content is a query, the collector
/// sends "hello" and the app "ping".
pub fn reply<R: SensorRecord>(
    node_id: u8,
    latest: Option<&R>,
    request: &[u8],
    buf: &mut [u8],
) -> Result<usize, WireError> {
    if request.is_empty() {
        return Err(WireError::EmptyRequest);
    }
    let record = latest.ok_or(WireError::NoReading)?;
    wire::encode_reply(node_id, record, buf)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advice {
    /// Outside air carries less water, opening the windows dries the room
    Vent,
    KeepClosed,
}

impl Advice {
    pub fn message(&self) -> &'static str {
        match self {
            Advice::Vent => "Ventilate? Could do...",
            Advice::KeepClosed => "Ventilate? Better not...",
        }
    }
}

pub fn ventilation_advice<O: SensorRecord, I: SensorRecord>(outside: &O, inside: &I) -> Advice {
    let advice = if outside.absolute_humidity() < inside.absolute_humidity() {
        Advice::Vent
    } else {
        Advice::KeepClosed
    };
    log::info!(
        "outside {:.2} g/m³, inside {:.2} g/m³: {}",
        outside.absolute_humidity(),
        inside.absolute_humidity(),
        advice.message()
    );
    advice
}

/// Format a record for the log
pub fn format_short<R: SensorRecord>(record: &R) -> heapless::String<64> {
    let mut buffer = heapless::String::new();
    let _ = write!(
        buffer,
        "{} {:.2}°C, {:.2}% rH, {:.2} g/m³ aH",
        R::SENSOR,
        record.temperature(),
        record.relative_humidity(),
        record.absolute_humidity()
    );
    buffer
}
