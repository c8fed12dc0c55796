use crate::{cfg::Modeling, position::Position, prelude::Vector3, time::GpsTime};

pub(crate) mod iono;
pub use iono::KbModel;

pub(crate) mod tropo;
pub use tropo::TropoModel;

/// Parameters the delay models are evaluated with
#[derive(Debug, Clone, Copy)]
pub(crate) struct BiasRuntime {
    /// Receiver time
    pub time: GpsTime,
    /// Day of year (1..=366)
    pub day_of_year: u16,
    /// Satellite elevation (in radians)
    pub elevation_rad: f64,
    /// Satellite azimuth (in radians)
    pub azimuth_rad: f64,
    /// Receiver geodetic latitude (in radians)
    pub rx_lat_rad: f64,
    /// Receiver longitude (in radians)
    pub rx_lon_rad: f64,
    /// Receiver height above sea level (in meters)
    pub height_above_sea_level_m: f64,
}

/// Signal propagation delay model
pub(crate) trait Bias {
    /// Delay (in meters) for this [BiasRuntime]
    fn bias_m(&self, rtm: &BiasRuntime) -> f64;
}

/// Atmospheric delays applied during one epoch
#[derive(Debug, Clone, Copy)]
pub(crate) struct Atmosphere {
    pub modeling: Modeling,
    pub klobuchar: Option<KbModel>,
    /// Latched geoid height (in meters)
    pub geoid_height_m: Option<f64>,
    pub time: GpsTime,
    pub day_of_year: u16,
}

impl Atmosphere {
    pub fn new(
        modeling: Modeling,
        klobuchar: Option<KbModel>,
        geoid_height_m: Option<f64>,
        time: GpsTime,
    ) -> Self {
        Self {
            modeling,
            klobuchar,
            geoid_height_m,
            time,
            day_of_year: time.day_of_year(),
        }
    }

    /// Receiver height above sea level (in meters)
    fn height_above_sea_level_m(&self, rx: &Position) -> f64 {
        match self.geoid_height_m {
            Some(geoid) => rx.geodetic()[2] - geoid,
            None => self.modeling.elevation_above_sea_level_m,
        }
    }

    /// Returns (ionospheric, tropospheric) delays (in meters) between
    /// receiver and satellite.
    pub fn delays_m(&self, rx: &Position, sat_ecef: &Vector3<f64>) -> (f64, f64) {
        let (elevation_rad, azimuth_rad) = rx.elevation_azimuth_rad(sat_ecef);
        let geodetic = rx.geodetic();

        let rtm = BiasRuntime {
            time: self.time,
            day_of_year: self.day_of_year,
            elevation_rad,
            azimuth_rad,
            rx_lat_rad: geodetic[0],
            rx_lon_rad: geodetic[1],
            height_above_sea_level_m: self.height_above_sea_level_m(rx),
        };

        let iono = match (self.modeling.iono_delay, &self.klobuchar) {
            (true, Some(kb)) => kb.bias_m(&rtm),
            _ => 0.0,
        };

        let tropo = if self.modeling.tropo_delay {
            TropoModel.bias_m(&rtm)
        } else {
            0.0
        };

        (iono, tropo)
    }
}
