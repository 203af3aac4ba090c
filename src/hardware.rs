use esp_hal::gpio::AnyPin;
use esp_hal::{
    delay::Delay,
    gpio::{DriveMode, Flex, InputConfig, OutputConfig, Pull},
    i2c::master::{Config as I2cConfig, I2c},
    peripherals::I2C0,
    time::Rate,
};

use crate::error::SensorError;
use crate::traits::{self, I2cBus};

const I2C_FREQ_KHZ: u32 = 100;

pub struct I2cHardware<'a> {
    i2c: I2c<'a, esp_hal::Blocking>,
}

impl<'a> I2cHardware<'a> {
    pub fn new<SDA, SCL>(i2c_periph: I2C0<'a>, sda: SDA, scl: SCL) -> Result<Self, SensorError>
    where
        SDA: Into<AnyPin<'a>>,
        SCL: Into<AnyPin<'a>>,
    {
        let i2c = I2c::new(
            i2c_periph,
            I2cConfig::default().with_frequency(Rate::from_khz(I2C_FREQ_KHZ)),
        )
        .map_err(|_| SensorError::Bus)?
        .with_sda(sda.into())
        .with_scl(scl.into());

        Ok(Self { i2c })
    }

    pub fn scan(&mut self) {
        log::info!("I2C scan start");
        for addr in 0x03..=0x77 {
            if self.i2c.write(addr, &[]).is_ok() {
                log::info!("Found device at 0x{:02X}", addr);
            }
        }
        log::info!("I2C scan done");
    }
}

impl I2cBus for I2cHardware<'_> {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), SensorError> {
        self.i2c.write(addr, bytes).map_err(|_| SensorError::Bus)
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), SensorError> {
        self.i2c.read(addr, buffer).map_err(|_| SensorError::Bus)
    }
}

impl traits::Delay for Delay {
    fn delay_ms(&mut self, ms: u32) {
        self.delay_millis(ms);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay_micros(us);
    }
}

/// DHT22 data line: open drain with the internal pull-up, input always on
/// so the level can be sampled while not driving.
pub fn dht22_line<'a, P: Into<AnyPin<'a>>>(pin: P) -> Flex<'a> {
    let mut flex = Flex::new(pin.into());
    flex.apply_output_config(
        &OutputConfig::default()
            .with_drive_mode(DriveMode::OpenDrain)
            .with_pull(Pull::Up),
    );
    flex.apply_input_config(&InputConfig::default().with_pull(Pull::Up));
    flex.set_high();
    flex.set_input_enable(true);
    flex.set_output_enable(true);
    flex
}
