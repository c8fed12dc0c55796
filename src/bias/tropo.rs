use crate::bias::{Bias, BiasRuntime};

use log::debug;
use std::f64::consts::PI;

const K_1: f64 = 77.604;
const K_2: f64 = 382000.0;
const R_D: f64 = 287.054;
const G: f64 = 9.80665;
const G_M: f64 = 9.784;

/// Meteorological parameters: pressure (mBar), temperature (K),
/// water vapour pressure (mBar), temperature lapse rate (K/m), water vapour lapse rate.
type Meteo = [f64; 5];

const ANNUAL_AVERAGE: [(f64, Meteo); 5] = [
    (15.0, [1013.25, 299.65, 26.31, 6.30E-3, 2.77]),
    (30.0, [1017.25, 294.15, 21.79, 6.05E-3, 3.15]),
    (45.0, [1015.75, 283.15, 11.66, 5.58E-3, 2.57]),
    (60.0, [1011.75, 272.15, 6.78, 5.39E-3, 1.81]),
    (75.0, [1013.00, 263.65, 4.11, 4.53E-3, 1.55]),
];

const SEASONAL_VARIATION: [(f64, Meteo); 5] = [
    (15.0, [0.0, 0.0, 0.0, 0.0, 0.0]),
    (30.0, [-3.75, 7.0, 8.85, 0.25E-3, 0.33]),
    (45.0, [-2.25, 11.0, 7.24, 0.32E-3, 0.46]),
    (60.0, [-1.75, 15.0, 5.36, 0.81E-3, 0.74]),
    (75.0, [-0.50, 14.5, 3.39, 0.62E-3, 0.30]),
];

/// Linear interpolation of the meteorological table, for given absolute latitude
fn interpolate(table: &[(f64, Meteo); 5], abs_lat_deg: f64) -> Meteo {
    if abs_lat_deg <= table[0].0 {
        return table[0].1;
    }
    if abs_lat_deg >= table[4].0 {
        return table[4].1;
    }

    let upper = table
        .iter()
        .position(|(lat, _)| *lat > abs_lat_deg)
        .unwrap_or(4);

    let (lat_0, values_0) = table[upper - 1];
    let (lat_1, values_1) = table[upper];
    let k = (abs_lat_deg - lat_0) / (lat_1 - lat_0);

    let mut values = [0.0; 5];
    for (i, value) in values.iter_mut().enumerate() {
        *value = values_0[i] + (values_1[i] - values_0[i]) * k;
    }
    values
}

/// EGNOS (RTCA MOPS) tropospheric model. Zenith delays are obtained from
/// seasonal meteorological averages, scaled to receiver height and
/// projected with the MOPS mapping function.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct TropoModel;

impl TropoModel {
    fn meteo(lat_deg: f64, day_of_year: u16) -> Meteo {
        let d_min = if lat_deg.is_sign_positive() {
            28.0
        } else {
            211.0
        };

        let average = interpolate(&ANNUAL_AVERAGE, lat_deg.abs());
        let seasonal = interpolate(&SEASONAL_VARIATION, lat_deg.abs());
        let cos = ((day_of_year as f64 - d_min) * 2.0 * PI / 365.25).cos();

        let mut meteo = [0.0; 5];
        for (i, value) in meteo.iter_mut().enumerate() {
            *value = average[i] - seasonal[i] * cos;
        }
        meteo
    }

    /// Returns (dry, wet) zenith delays (in meters) at given height above sea level.
    pub(crate) fn zenith_delays(lat_deg: f64, height_m: f64, day_of_year: u16) -> (f64, f64) {
        let [p, t, e, beta, lambda] = Self::meteo(lat_deg, day_of_year);

        let z_dry = 1.0E-6 * K_1 * R_D * p / G_M;
        let z_wet = 1.0E-6 * K_2 * R_D / (G_M * (lambda + 1.0) - beta * R_D) * e / t;

        let scale = (1.0 - beta * height_m / t).max(0.0);
        let d_dry = scale.powf(G / (R_D * beta)) * z_dry;
        let d_wet = scale.powf((lambda + 1.0) * G / (R_D * beta) - 1.0) * z_wet;

        (d_dry, d_wet)
    }

    /// MOPS elevation mapping function
    pub(crate) fn mapping(elevation_rad: f64) -> f64 {
        let m = 1.001 / (0.002001 + elevation_rad.sin().powi(2)).sqrt();
        let below_4deg = (4.0 - elevation_rad.to_degrees()).max(0.0);
        m * (1.0 + 0.015 * below_4deg.powi(2))
    }
}

impl Bias for TropoModel {
    fn bias_m(&self, rtm: &BiasRuntime) -> f64 {
        let lat_deg = rtm.rx_lat_rad.to_degrees();
        let (d_dry, d_wet) =
            Self::zenith_delays(lat_deg, rtm.height_above_sea_level_m, rtm.day_of_year);

        debug!(
            "tropo - lat={:.3}° h={:.1}m doy={} - dry={:.3}m wet={:.3}m",
            lat_deg, rtm.height_above_sea_level_m, rtm.day_of_year, d_dry, d_wet
        );

        (d_dry + d_wet) * Self::mapping(rtm.elevation_rad)
    }
}

#[cfg(test)]
mod test {
    use super::TropoModel;

    #[test]
    fn zenith_delays() {
        let (dry, wet) = TropoModel::zenith_delays(45.0, 0.0, 180);
        assert!((dry - 2.31).abs() < 0.05, "dry={}", dry);
        assert!(wet > 0.05 && wet < 0.4, "wet={}", wet);

        // delays decrease with height
        let (dry_1km, wet_1km) = TropoModel::zenith_delays(45.0, 1000.0, 180);
        assert!(dry_1km < dry);
        assert!(wet_1km < wet);
    }

    #[test]
    fn mapping() {
        assert!((TropoModel::mapping(90.0_f64.to_radians()) - 1.0).abs() < 1.0E-3);
        let m_15 = TropoModel::mapping(15.0_f64.to_radians());
        assert!(m_15 > 3.5 && m_15 < 4.0, "{}", m_15);
    }
}
