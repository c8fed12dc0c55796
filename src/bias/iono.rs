use crate::{
    bias::{Bias, BiasRuntime},
    constants::SPEED_OF_LIGHT_M_S,
};

use std::f64::consts::PI;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Klobuchar Model, as broadcast in the GPS navigation message.
/// Coefficients are expressed in seconds and semi-circles (ICD-GPS-200).
#[derive(Clone, Copy, Default, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct KbModel {
    /// alpha coefficients
    pub alpha: (f64, f64, f64, f64),
    /// beta coefficients
    pub beta: (f64, f64, f64, f64),
}

impl KbModel {
    /// L1 ionospheric delay (in seconds)
    pub(crate) fn delay_s(&self, rtm: &BiasRuntime) -> f64 {
        // semi circles
        let elev = rtm.elevation_rad / PI;
        let (phi_u, lambda_u) = (rtm.rx_lat_rad / PI, rtm.rx_lon_rad / PI);

        let psi = 0.0137 / (elev + 0.11) - 0.022;

        let phi_i = (phi_u + psi * rtm.azimuth_rad.cos()).clamp(-0.416, 0.416);
        let lambda_i = lambda_u + psi * rtm.azimuth_rad.sin() / (phi_i * PI).cos();
        let phi_m = phi_i + 0.064 * ((lambda_i - 1.617) * PI).cos();

        let t = (4.32E4 * lambda_i + rtm.time.tow_s).rem_euclid(86400.0);

        let f = 1.0 + 16.0 * (0.53 - elev).powi(3);

        let amp = (self.alpha.0
            + self.alpha.1 * phi_m
            + self.alpha.2 * phi_m.powi(2)
            + self.alpha.3 * phi_m.powi(3))
        .max(0.0);

        let per = (self.beta.0
            + self.beta.1 * phi_m
            + self.beta.2 * phi_m.powi(2)
            + self.beta.3 * phi_m.powi(3))
        .max(72000.0);

        let x = 2.0 * PI * (t - 50400.0) / per;

        if x.abs() < 1.57 {
            f * (5.0E-9 + amp * (1.0 - x.powi(2) / 2.0 + x.powi(4) / 24.0))
        } else {
            f * 5.0E-9
        }
    }
}

impl Bias for KbModel {
    fn bias_m(&self, rtm: &BiasRuntime) -> f64 {
        self.delay_s(rtm) * SPEED_OF_LIGHT_M_S
    }
}

#[cfg(test)]
mod test {
    use super::KbModel;
    use crate::{bias::BiasRuntime, time::GpsTime};

    fn model() -> KbModel {
        KbModel {
            alpha: (1.676E-8, 2.235E-8, -1.192E-7, -1.192E-7),
            beta: (112640.0, 0.0, -262100.0, -131100.0),
        }
    }

    fn runtime(tow_s: f64, elevation_deg: f64) -> BiasRuntime {
        BiasRuntime {
            time: GpsTime::new(2300, tow_s),
            day_of_year: 180,
            elevation_rad: elevation_deg.to_radians(),
            azimuth_rad: 0.0,
            rx_lat_rad: 37.4_f64.to_radians(),
            rx_lon_rad: -122.1_f64.to_radians(),
            height_above_sea_level_m: 0.0,
        }
    }

    #[test]
    fn klobuchar_night_floor() {
        // night time: constant 5 ns vertical delay, scaled by the slant factor
        let delay = model().delay_s(&runtime(10.0 * 3600.0, 90.0));
        assert!((delay - 5.0E-9).abs() < 0.5E-9, "{}", delay);
    }

    #[test]
    fn klobuchar_slant() {
        // lower elevation: longer path through the ionosphere
        let zenith = model().delay_s(&runtime(70000.0, 90.0));
        let slant = model().delay_s(&runtime(70000.0, 15.0));
        assert!(slant > zenith);
        // a few meters at most
        assert!(slant * 299792458.0 < 50.0);
        assert!(zenith > 0.0);
    }
}
