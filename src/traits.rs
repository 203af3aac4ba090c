//! Hardware abstraction traits

use crate::error::SensorError;
use crate::model::{RawReading, SensorRecord};

/// Trait for humidity/temperature sensors
pub trait HumiditySensor {
    /// The record this sensor fills
    type Record: SensorRecord;

    /// Initialize the sensor
    fn init(&mut self) -> Result<(), SensorError>;

    /// Read temperature in Celsius and relative humidity in percent
    fn read(&mut self) -> Result<RawReading, SensorError>;
}

/// Trait for I2C operations
pub trait I2cBus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), SensorError>;
    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), SensorError>;
}

/// Trait for busy-wait delays
pub trait Delay {
    fn delay_ms(&mut self, ms: u32);
    fn delay_us(&mut self, us: u32);
}

