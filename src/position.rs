use crate::prelude::Vector3;
use map_3d::{ecef2geodetic, geodetic2ecef, Ellipsoid};
use nalgebra::Matrix3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 3D Position, both as ECEF and geodetic coordinates.
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Position {
    /// ECEF coordinates in meters
    ecef: Vector3<f64>,
    /// Geodetic coordinates: latitude [rad], longitude [rad], altitude [m]
    geodetic: Vector3<f64>,
}

impl Position {
    /// Builds new [Position] from ECEF coordinates expressed in meter.
    pub fn from_ecef(ecef: Vector3<f64>) -> Self {
        let (lat, lon, h) = ecef2geodetic(ecef[0], ecef[1], ecef[2], Ellipsoid::WGS84);
        Self {
            ecef,
            geodetic: Vector3::new(lat, lon, h),
        }
    }

    /// Builds new [Position] from Geodetic coordinates
    /// - latitude [rad]
    /// - longitude [rad]
    /// - altitude above WGS84 ellipsoid [m]
    pub fn from_geo(geodetic: Vector3<f64>) -> Self {
        let (x, y, z) = geodetic2ecef(geodetic[0], geodetic[1], geodetic[2], Ellipsoid::WGS84);
        Self {
            geodetic,
            ecef: Vector3::new(x, y, z),
        }
    }

    /// Builds new [Position] from latitude and longitude in decimal degrees,
    /// altitude in meters.
    pub fn from_lat_long_alt(lat_deg: f64, long_deg: f64, alt_m: f64) -> Self {
        Self::from_geo(Vector3::new(lat_deg.to_radians(), long_deg.to_radians(), alt_m))
    }

    /// Builds new [Position] from fixed point coordinates (1E-7 degrees, 1E-7 meters)
    pub fn from_e7(lat_e7: i64, long_e7: i64, alt_e7: i64) -> Self {
        Self::from_lat_long_alt(
            lat_e7 as f64 * 1.0E-7,
            long_e7 as f64 * 1.0E-7,
            alt_e7 as f64 * 1.0E-7,
        )
    }

    /// Returns ECEF coordinates.
    pub fn ecef(&self) -> Vector3<f64> {
        self.ecef
    }

    /// Returns Geodetic coordinates
    /// - latitude [rad]
    /// - longitude [rad]
    /// - altitude above WGS84 ellipsoid [m]
    pub fn geodetic(&self) -> Vector3<f64> {
        self.geodetic
    }

    /// Returns latitude [°], longitude [°] and altitude [m]
    pub fn lat_long_alt_deg_deg_m(&self) -> (f64, f64, f64) {
        (
            self.geodetic[0].to_degrees(),
            self.geodetic[1].to_degrees(),
            self.geodetic[2],
        )
    }

    /// ECEF to local ENU rotation, at this [Position]
    pub fn enu_rotation(&self) -> Matrix3<f64> {
        enu_rotation(self.geodetic[0], self.geodetic[1])
    }

    /// Expresses ECEF coordinates as ENU offset from this [Position] (in meters).
    pub fn enu(&self, ecef: &Vector3<f64>) -> Vector3<f64> {
        self.enu_rotation() * (ecef - self.ecef)
    }

    /// Returns (elevation, azimuth) in radians of this ECEF target, seen from [Position].
    pub fn elevation_azimuth_rad(&self, target_ecef: &Vector3<f64>) -> (f64, f64) {
        let enu = self.enu(target_ecef);
        let horizontal = (enu[0].powi(2) + enu[1].powi(2)).sqrt();
        let elevation = enu[2].atan2(horizontal);
        let azimuth = enu[0].atan2(enu[1]).rem_euclid(2.0 * std::f64::consts::PI);
        (elevation, azimuth)
    }
}

/// ECEF to local ENU rotation at given geodetic latitude and longitude (in radians)
pub(crate) fn enu_rotation(lat_rad: f64, lon_rad: f64) -> Matrix3<f64> {
    let (sin_lat, cos_lat) = lat_rad.sin_cos();
    let (sin_lon, cos_lon) = lon_rad.sin_cos();
    Matrix3::<f64>::new(
        -sin_lon,
        cos_lon,
        0.0,
        -sin_lat * cos_lon,
        -sin_lat * sin_lon,
        cos_lat,
        cos_lat * cos_lon,
        cos_lat * sin_lon,
        sin_lat,
    )
}

/// Origin of a [ReferencePosition]
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ReferenceSource {
    /// Defined by the operator
    Operator,
    /// Averaged from the first converged fixes
    Survey,
}

/// Trusted position spoofing residuals are evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReferencePosition {
    pub position: Position,
    pub source: ReferenceSource,
}

impl ReferencePosition {
    /// Operator defined [ReferencePosition], from fixed point coordinates
    /// (1E-7 degrees, 1E-7 meters).
    pub fn from_e7(lat_e7: i64, long_e7: i64, alt_e7: i64) -> Self {
        Self {
            position: Position::from_e7(lat_e7, long_e7, alt_e7),
            source: ReferenceSource::Operator,
        }
    }

    /// Operator defined [ReferencePosition], from ECEF coordinates (in meters)
    pub fn from_ecef(ecef: Vector3<f64>) -> Self {
        Self {
            position: Position::from_ecef(ecef),
            source: ReferenceSource::Operator,
        }
    }

    pub(crate) fn surveyed(ecef: Vector3<f64>) -> Self {
        Self {
            position: Position::from_ecef(ecef),
            source: ReferenceSource::Survey,
        }
    }

    pub fn ecef(&self) -> Vector3<f64> {
        self.position.ecef()
    }
}

#[cfg(test)]
mod test {
    use super::Position;
    use crate::prelude::Vector3;

    #[test]
    fn e7_coordinates() {
        let pos = Position::from_e7(374_219_999, -1_220_840_575, 100_000_000);
        let (lat, lon, alt) = pos.lat_long_alt_deg_deg_m();
        assert!((lat - 37.4219999).abs() < 1.0E-9);
        assert!((lon + 122.0840575).abs() < 1.0E-9);
        assert!((alt - 10.0).abs() < 1.0E-9);

        let back = Position::from_ecef(pos.ecef());
        let (lat, lon, alt) = back.lat_long_alt_deg_deg_m();
        assert!((lat - 37.4219999).abs() < 1.0E-7);
        assert!((lon + 122.0840575).abs() < 1.0E-7);
        assert!((alt - 10.0).abs() < 1.0E-3);
    }

    #[test]
    fn enu_offsets() {
        let origin = Position::from_lat_long_alt(45.0, 5.0, 0.0);
        let rot = origin.enu_rotation();

        // orthonormal
        let identity = rot * rot.transpose();
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((identity[(i, j)] - expected).abs() < 1.0E-12);
            }
        }

        // 100 m above the origin
        let up = origin.geodetic() + Vector3::new(0.0, 0.0, 100.0);
        let enu = origin.enu(&Position::from_geo(up).ecef());
        assert!(enu[0].abs() < 1.0E-6);
        assert!(enu[1].abs() < 1.0E-6);
        assert!((enu[2] - 100.0).abs() < 1.0E-6);

        let (elev, _) = origin.elevation_azimuth_rad(&Position::from_geo(up).ecef());
        assert!((elev.to_degrees() - 90.0).abs() < 1.0E-6);
    }
}
