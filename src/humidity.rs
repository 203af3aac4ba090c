//! Absolute humidity from temperature and relative humidity.

use num_traits::Float;

/// g/mol
const H2O_MOLAR_WEIGHT: f64 = 18.01528;
/// J/(K*mol)
const IDEAL_GAS_R: f64 = 8.31446261815324;
/// K
const CELSIUS_ZERO: f64 = 273.15;

/// Water vapour partial pressure in Pa, over water for `T >= 0` and over
/// ice below.
///
/// Parametrisation after Huang (2018), DOI 10.1175/JAMC-D-17-0334.1
fn vapour_pressure(relative_humidity: f64, temperature: f64) -> f64 {
    let saturation = if temperature >= 0.0 {
        Float::exp(34.494 - 4924.99 / (temperature + 237.1))
            / Float::powf(temperature + 105.0, 1.57)
    } else {
        Float::exp(43.494 - 6545.8 / (temperature + 278.0))
            / Float::powi(temperature + 868.0, 2)
    };
    saturation * (relative_humidity / 100.0)
}

/// Absolute humidity in g/m³ for `relative_humidity` in percent and
/// `temperature` in degrees Celsius.
pub fn absolute_humidity(relative_humidity: f64, temperature: f64) -> f64 {
    // mols of water per m³ from the ideal gas law, n = pV / RT
    let n = vapour_pressure(relative_humidity, temperature)
        / (IDEAL_GAS_R * (CELSIUS_ZERO + temperature));
    n * H2O_MOLAR_WEIGHT
}
