//! AHT20 humidity/temperature sensor on I2C

use crate::error::SensorError;
use crate::model::{Aht20SensorData, RawReading};
use crate::traits::{Delay, HumiditySensor, I2cBus};

pub const ADDR: u8 = 0x38;

const CMD_STATUS: u8 = 0x71;
const CMD_CALIBRATE: [u8; 3] = [0xBE, 0x08, 0x00];
const CMD_MEASURE: [u8; 3] = [0xAC, 0x33, 0x00];

const STATUS_BUSY: u8 = 0x80;
const STATUS_CALIBRATED: u8 = 0x08;

const MEASURE_TIME_MS: u32 = 80;
const BUSY_RETRIES: u32 = 5;
const BUSY_RETRY_MS: u32 = 10;

/// 2^20, full scale of the 20 bit raw values
const FULL_SCALE: f64 = 1_048_576.0;

/// CRC-8, polynomial 0x31, init 0xFF
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc: u8 = 0xFF;
    for byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ 0x31
            } else {
                crc << 1
            };
        }
    }
    crc
}

/// Convert a 7 byte measurement frame (status, 5 data bytes, CRC).
pub fn decode_measurement(frame: &[u8; 7]) -> Result<RawReading, SensorError> {
    if crc8(&frame[..6]) != frame[6] {
        return Err(SensorError::Checksum);
    }

    let raw_humidity =
        ((frame[1] as u32) << 12) | ((frame[2] as u32) << 4) | ((frame[3] as u32) >> 4);
    let raw_temperature =
        (((frame[3] & 0x0F) as u32) << 16) | ((frame[4] as u32) << 8) | frame[5] as u32;

    Ok(RawReading {
        temperature: raw_temperature as f64 * 200.0 / FULL_SCALE - 50.0,
        relative_humidity: raw_humidity as f64 * 100.0 / FULL_SCALE,
    })
}

pub struct Aht20<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2cBus, D: Delay> Aht20<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: ADDR,
        }
    }

    pub fn read_status(&mut self) -> Result<u8, SensorError> {
        let mut status = [0u8; 1];
        self.i2c.write(self.address, &[CMD_STATUS])?;
        self.i2c.read(self.address, &mut status)?;
        Ok(status[0])
    }
}

impl<I: I2cBus, D: Delay> HumiditySensor for Aht20<I, D> {
    type Record = Aht20SensorData;

    fn init(&mut self) -> Result<(), SensorError> {
        // power-on time
        self.delay.delay_ms(40);

        if self.read_status()? & STATUS_CALIBRATED == 0 {
            log::info!("[AHT20] loading calibration");
            self.i2c.write(self.address, &CMD_CALIBRATE)?;
            self.delay.delay_ms(10);

            if self.read_status()? & STATUS_CALIBRATED == 0 {
                return Err(SensorError::NotCalibrated);
            }
        }

        log::info!("[AHT20] Initialized - ready to measure");
        Ok(())
    }

    fn read(&mut self) -> Result<RawReading, SensorError> {
        self.i2c.write(self.address, &CMD_MEASURE)?;
        self.delay.delay_ms(MEASURE_TIME_MS);

        let mut frame = [0u8; 7];
        for _ in 0..BUSY_RETRIES {
            self.i2c.read(self.address, &mut frame)?;
            if frame[0] & STATUS_BUSY == 0 {
                return decode_measurement(&frame);
            }
            self.delay.delay_ms(BUSY_RETRY_MS);
        }

        Err(SensorError::Timeout)
    }
}
