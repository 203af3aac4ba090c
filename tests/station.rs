use std::cell::{Cell, RefCell};
use std::convert::Infallible;
use std::rc::Rc;
use std::sync::Once;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{self, ErrorKind, InputPin, OutputPin};
use lueften::aht20::{self, Aht20};
use lueften::dht22::Dht22;
use lueften::error::{SensorError, WireError};
use lueften::logic::{self, Advice, Latest, Station};
use lueften::model::{Aht20SensorData, Dht22SensorData, SensorRecord};
use lueften::traits::{Delay, I2cBus};
use lueften::wire;

static INIT: Once = Once::new();

fn setup() {
    INIT.call_once(|| {
        let _ = env_logger::builder().is_test(true).try_init();
    });
}

/// Nanoseconds since the test started, shared by the fake delay and the
/// fake data line.
#[derive(Clone, Default)]
struct Clock(Rc<Cell<u64>>);

impl Clock {
    fn now(&self) -> u64 {
        self.0.get()
    }

    fn advance(&self, ns: u64) {
        self.0.set(self.0.get() + ns);
    }
}

struct FakeDelay(Clock);

impl Delay for FakeDelay {
    fn delay_ms(&mut self, ms: u32) {
        self.0.advance(ms as u64 * 1_000_000);
    }

    fn delay_us(&mut self, us: u32) {
        self.0.advance(us as u64 * 1_000);
    }
}

impl DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.advance(ns as u64);
    }
}

// ---------------------------------------------------------------------------
// AHT20
// ---------------------------------------------------------------------------

struct FakeAht20Bus {
    calibrated: bool,
    accepts_calibration: bool,
    busy_reads: u32,
    frame: [u8; 7],
    last_command: u8,
    writes: Rc<RefCell<Vec<Vec<u8>>>>,
}

impl FakeAht20Bus {
    fn new(frame: [u8; 7]) -> Self {
        Self {
            calibrated: true,
            accepts_calibration: true,
            busy_reads: 0,
            frame,
            last_command: 0,
            writes: Rc::default(),
        }
    }
}

impl I2cBus for FakeAht20Bus {
    fn write(&mut self, addr: u8, bytes: &[u8]) -> Result<(), SensorError> {
        assert_eq!(addr, aht20::ADDR);
        self.writes.borrow_mut().push(bytes.to_vec());
        self.last_command = bytes[0];
        if bytes[0] == 0xBE && self.accepts_calibration {
            self.calibrated = true;
        }
        Ok(())
    }

    fn read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), SensorError> {
        assert_eq!(addr, aht20::ADDR);
        match self.last_command {
            0x71 => buffer[0] = if self.calibrated { 0x18 } else { 0x10 },
            0xAC if self.busy_reads > 0 => {
                self.busy_reads -= 1;
                buffer[0] = 0x98;
            }
            0xAC => buffer.copy_from_slice(&self.frame),
            _ => return Err(SensorError::Bus),
        }
        Ok(())
    }
}

/// Measurement frame for raw humidity and temperature values.
fn aht20_frame(raw_humidity: u32, raw_temperature: u32) -> [u8; 7] {
    let mut frame = [
        0x18,
        (raw_humidity >> 12) as u8,
        (raw_humidity >> 4) as u8,
        (((raw_humidity & 0x0F) << 4) as u8) | ((raw_temperature >> 16) & 0x0F) as u8,
        (raw_temperature >> 8) as u8,
        raw_temperature as u8,
        0,
    ];
    frame[6] = aht20::crc8(&frame[..6]);
    frame
}

#[test]
fn aht20_station_measures_record() {
    setup();
    // 45 % and 21.5 degC
    let frame = aht20_frame(471_859, 374_866);
    let sensor = Aht20::new(FakeAht20Bus::new(frame), FakeDelay(Clock::default()));
    let mut station = Station::new(sensor);
    station.start().unwrap();

    let record = station.measure().unwrap();
    assert!((record.rh - 45.0).abs() < 1e-3);
    assert!((record.t_aht20 - 21.5).abs() < 1e-3);
    let expected = Aht20SensorData::from_reading(record.t_aht20, record.rh);
    assert_eq!(record.ah, expected.ah);
    assert!(record.ah > 8.0 && record.ah < 9.0, "{}", record.ah);
}

#[test]
fn aht20_loads_calibration_when_missing() {
    setup();
    let mut bus = FakeAht20Bus::new(aht20_frame(0x80000, 0x60000));
    bus.calibrated = false;
    let writes = bus.writes.clone();

    let mut station = Station::new(Aht20::new(bus, FakeDelay(Clock::default())));
    station.start().unwrap();

    assert!(writes.borrow().contains(&vec![0xBE, 0x08, 0x00]));
}

#[test]
fn aht20_refusing_calibration_fails_init() {
    setup();
    let mut bus = FakeAht20Bus::new(aht20_frame(0x80000, 0x60000));
    bus.calibrated = false;
    bus.accepts_calibration = false;

    let mut station = Station::new(Aht20::new(bus, FakeDelay(Clock::default())));
    assert_eq!(station.start(), Err(SensorError::NotCalibrated));
}

#[test]
fn aht20_waits_while_busy() {
    setup();
    let mut bus = FakeAht20Bus::new(aht20_frame(0x80000, 0x60000));
    bus.busy_reads = 2;
    let mut station = Station::new(Aht20::new(bus, FakeDelay(Clock::default())));

    let record = station.measure().unwrap();
    assert!((record.t_aht20 - 25.0).abs() < 1e-9);
}

#[test]
fn aht20_stuck_busy_times_out() {
    setup();
    let mut bus = FakeAht20Bus::new(aht20_frame(0x80000, 0x60000));
    bus.busy_reads = u32::MAX;
    let mut station = Station::new(Aht20::new(bus, FakeDelay(Clock::default())));

    assert_eq!(station.measure(), Err(SensorError::Timeout));
    assert_eq!(station.consecutive_failures(), 1);
}

#[test]
fn implausible_readings_are_rejected_and_counted() {
    setup();
    // all zero raw values: 0 % at -50 degC
    let bus = FakeAht20Bus::new(aht20_frame(0, 0));
    let mut station = Station::new(Aht20::new(bus, FakeDelay(Clock::default())));

    assert_eq!(station.measure(), Err(SensorError::Implausible));
    assert_eq!(station.measure(), Err(SensorError::Implausible));
    assert_eq!(station.consecutive_failures(), 2);
}

// ---------------------------------------------------------------------------
// DHT22
// ---------------------------------------------------------------------------

/// Data line answered by a simulated DHT22 once the host releases it.
struct FakeDht22Line {
    clock: Clock,
    driven_low: bool,
    released_at: Option<u64>,
    /// (level, duration in us) after release
    waveform: Vec<(bool, u64)>,
}

impl FakeDht22Line {
    fn answering(clock: Clock, frame: [u8; 5]) -> Self {
        let mut waveform = vec![(true, 30), (false, 80), (true, 80)];
        for byte in frame {
            for bit in (0..8).rev() {
                let one = byte & (1 << bit) != 0;
                waveform.push((false, 50));
                waveform.push((true, if one { 70 } else { 26 }));
            }
        }
        waveform.push((false, 50));
        Self::with_waveform(clock, waveform)
    }

    fn with_waveform(clock: Clock, waveform: Vec<(bool, u64)>) -> Self {
        Self {
            clock,
            driven_low: false,
            released_at: None,
            waveform,
        }
    }

    fn level(&self) -> bool {
        if self.driven_low {
            return false;
        }
        let Some(released_at) = self.released_at else {
            return true;
        };
        let mut elapsed = (self.clock.now() - released_at) / 1_000;
        for (level, duration) in &self.waveform {
            if elapsed < *duration {
                return *level;
            }
            elapsed -= duration;
        }
        true
    }
}

impl digital::ErrorType for FakeDht22Line {
    type Error = Infallible;
}

impl OutputPin for FakeDht22Line {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.driven_low = true;
        self.released_at = None;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        // open drain: high means not driving
        if self.driven_low {
            self.released_at = Some(self.clock.now());
        }
        self.driven_low = false;
        Ok(())
    }
}

impl InputPin for FakeDht22Line {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.level())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.level())
    }
}

/// A data line whose GPIO refuses every operation.
struct BrokenPin;

impl digital::ErrorType for BrokenPin {
    type Error = ErrorKind;
}

impl OutputPin for BrokenPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Err(ErrorKind::Other)
    }
}

impl InputPin for BrokenPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Err(ErrorKind::Other)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Err(ErrorKind::Other)
    }
}

fn dht22_station(frame: [u8; 5]) -> Station<Dht22<FakeDht22Line, FakeDelay>> {
    let clock = Clock::default();
    let line = FakeDht22Line::answering(clock.clone(), frame);
    Station::new(Dht22::new(line, FakeDelay(clock)))
}

#[test]
fn dht22_station_reads_frame_from_line() {
    setup();
    // 65.2 %, 35.1 degC
    let mut station = dht22_station([0x02, 0x8C, 0x01, 0x5F, 0xEE]);
    station.start().unwrap();

    let record = station.measure().unwrap();
    assert!((record.rh - 65.2).abs() < 1e-3);
    assert!((record.t_dht22 - 35.1).abs() < 1e-3);
    let expected = Dht22SensorData::from_reading(record.t_dht22, record.rh);
    assert_eq!(record.ah, expected.ah);
}

#[test]
fn dht22_reads_frame_bits_in_order() {
    setup();
    // 50.0 %, 20.0 degC
    let mut station = dht22_station([0x01, 0xF4, 0x00, 0xC8, 0xBD]);

    let record = station.measure().unwrap();
    assert!((record.rh - 50.0).abs() < 1e-3);
    assert!((record.t_dht22 - 20.0).abs() < 1e-3);
}

#[test]
fn dht22_checksum_error_is_reported() {
    setup();
    let mut station = dht22_station([0x02, 0x8C, 0x01, 0x5F, 0xEF]);
    assert_eq!(station.measure(), Err(SensorError::Checksum));
    assert_eq!(station.consecutive_failures(), 1);
}

#[test]
fn dht22_silent_line_times_out() {
    setup();
    let clock = Clock::default();
    let line = FakeDht22Line::with_waveform(clock.clone(), Vec::new());
    let mut station = Station::new(Dht22::new(line, FakeDelay(clock)));

    assert_eq!(station.measure(), Err(SensorError::Timeout));
}

#[test]
fn dht22_pin_failure_is_a_bus_error() {
    setup();
    let mut station = Station::new(Dht22::new(BrokenPin, FakeDelay(Clock::default())));

    assert_eq!(station.start(), Err(SensorError::Bus));
    assert_eq!(station.measure(), Err(SensorError::Bus));
}

// ---------------------------------------------------------------------------
// Node flow
// ---------------------------------------------------------------------------

#[test]
fn node_answers_queries_with_latest_record() {
    setup();
    let latest = Latest::new();
    let mut station = dht22_station([0x02, 0x8C, 0x01, 0x5F, 0xEE]);
    let mut buf = [0u8; wire::MAX_REPLY_LEN];

    assert_eq!(
        logic::reply(7, latest.load().as_ref(), b"hello", &mut buf),
        Err(WireError::NoReading)
    );

    latest.store(station.measure().unwrap());

    let len = logic::reply(7, latest.load().as_ref(), b"hello", &mut buf).unwrap();
    let reply = wire::decode_reply(&buf[..len]).unwrap();
    let record: Dht22SensorData = latest.load().unwrap();
    assert_eq!(reply.id, 7);
    assert_eq!(reply.temperature, record.temperature());
    assert_eq!(reply.relative_humidity, record.relative_humidity());
    assert_eq!(reply.absolute_humidity, record.absolute_humidity());
    assert_eq!(reply.pressure, None);

    assert_eq!(
        logic::reply(7, latest.load().as_ref(), b"", &mut buf),
        Err(WireError::EmptyRequest)
    );
}

#[test]
fn advice_from_two_nodes() {
    setup();
    // cold, damp outside air still carries less water than a warm room
    let mut outside = dht22_station([0x03, 0x52, 0x00, 0x32, 0x87]);
    let inside_frame = aht20_frame(629_146, 374_866);
    let mut inside = Station::new(Aht20::new(
        FakeAht20Bus::new(inside_frame),
        FakeDelay(Clock::default()),
    ));

    let outside = outside.measure().unwrap();
    let inside = inside.measure().unwrap();
    assert_eq!(logic::ventilation_advice(&outside, &inside), Advice::Vent);
    assert_eq!(logic::ventilation_advice(&inside, &outside), Advice::KeepClosed);
}
