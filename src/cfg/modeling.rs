#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

fn default_sv_clock() -> bool {
    true
}

fn default_iono_delay() -> bool {
    true
}

fn default_tropo_delay() -> bool {
    true
}

fn default_elevation_above_sea_level() -> f64 {
    0.0
}

/// Atmospherical and clock modeling applied to the predicted pseudo ranges
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Modeling {
    /// Compensate for onboard clock offset to system time (+/- 100km)
    #[cfg_attr(feature = "serde", serde(default = "default_sv_clock"))]
    pub sv_clock_bias: bool,

    /// Compensate for ionosphere delay (+/- 10m), using
    /// the broadcast Klobuchar coefficients when available.
    #[cfg_attr(feature = "serde", serde(default = "default_iono_delay"))]
    pub iono_delay: bool,

    /// Compensate for troposphere delay (+/- 10m)
    #[cfg_attr(feature = "serde", serde(default = "default_tropo_delay"))]
    pub tropo_delay: bool,

    /// Terrain elevation above mean sea level at the first fix (in meters).
    /// Used once, to latch the geoid height the tropospheric model relies on.
    #[cfg_attr(
        feature = "serde",
        serde(default = "default_elevation_above_sea_level")
    )]
    pub elevation_above_sea_level_m: f64,
}

impl Default for Modeling {
    fn default() -> Self {
        Self {
            sv_clock_bias: default_sv_clock(),
            iono_delay: default_iono_delay(),
            tropo_delay: default_tropo_delay(),
            elevation_above_sea_level_m: default_elevation_above_sea_level(),
        }
    }
}

impl Modeling {
    /// Returns true if any atmospheric delay is to be compensated
    pub(crate) fn atmosphere(&self) -> bool {
        self.iono_delay || self.tropo_delay
    }
}
