// Model of the data read in this app

use crate::humidity::absolute_humidity;

/// Temperature and relative humidity as delivered by a sensor driver,
/// before anything is derived from them.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RawReading {
    /// Degrees Celsius
    pub temperature: f64,
    /// Percent
    pub relative_humidity: f64,
}

/// Snapshot of the UDP server node (DHT22 sensor).
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dht22SensorData {
    pub t_dht22: f64,
    pub rh: f64,
    /// g/m³
    pub ah: f64,
}

/// Snapshot of the inside node (AHT20 sensor).
///
/// The node has no pressure sensor fitted; an LPS22 would add its own
/// temperature and the pressure here.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Aht20SensorData {
    pub t_aht20: f64,
    pub rh: f64,
    /// g/m³
    pub ah: f64,
}

/// Read access shared by the per-node records.
pub trait SensorRecord: Copy + Default {
    /// Name of the sensor the record belongs to
    const SENSOR: &'static str;

    /// Build a record from a raw reading, deriving the absolute humidity.
    fn from_reading(temperature: f64, relative_humidity: f64) -> Self;

    fn temperature(&self) -> f64;
    fn relative_humidity(&self) -> f64;
    fn absolute_humidity(&self) -> f64;
}

impl SensorRecord for Dht22SensorData {
    const SENSOR: &'static str = "DHT22";

    fn from_reading(temperature: f64, relative_humidity: f64) -> Self {
        Self {
            t_dht22: temperature,
            rh: relative_humidity,
            ah: absolute_humidity(relative_humidity, temperature),
        }
    }

    fn temperature(&self) -> f64 {
        self.t_dht22
    }

    fn relative_humidity(&self) -> f64 {
        self.rh
    }

    fn absolute_humidity(&self) -> f64 {
        self.ah
    }
}

impl SensorRecord for Aht20SensorData {
    const SENSOR: &'static str = "AHT20";

    fn from_reading(temperature: f64, relative_humidity: f64) -> Self {
        Self {
            t_aht20: temperature,
            rh: relative_humidity,
            ah: absolute_humidity(relative_humidity, temperature),
        }
    }

    fn temperature(&self) -> f64 {
        self.t_aht20
    }

    fn relative_humidity(&self) -> f64 {
        self.rh
    }

    fn absolute_humidity(&self) -> f64 {
        self.ah
    }
}

impl From<RawReading> for Dht22SensorData {
    fn from(raw: RawReading) -> Self {
        Self::from_reading(raw.temperature, raw.relative_humidity)
    }
}

impl From<RawReading> for Aht20SensorData {
    fn from(raw: RawReading) -> Self {
        Self::from_reading(raw.temperature, raw.relative_humidity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_initialized_records() {
        let a = Dht22SensorData::default();
        assert_eq!((a.t_dht22, a.rh, a.ah), (0.0, 0.0, 0.0));

        let b = Aht20SensorData::default();
        assert_eq!((b.t_aht20, b.rh, b.ah), (0.0, 0.0, 0.0));
    }

    #[test]
    fn from_reading_derives_absolute_humidity() {
        let record = Dht22SensorData::from_reading(9.0, 80.0);
        assert_eq!(record.temperature(), 9.0);
        assert_eq!(record.relative_humidity(), 80.0);
        assert!((record.absolute_humidity() - 7.05446191031343).abs() < 1e-6);
    }

    #[test]
    fn records_convert_from_raw_reading() {
        let raw = RawReading {
            temperature: -9.0,
            relative_humidity: 95.0,
        };
        let record: Aht20SensorData = raw.into();
        assert_eq!(record.t_aht20, -9.0);
        assert!((record.ah - 2.21233063513978).abs() < 1e-6);
    }
}
