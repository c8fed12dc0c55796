use nalgebra::{DMatrix, Matrix4};

use crate::{position::enu_rotation, prelude::Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Position and velocity uncertainties (1 sigma) in the local ENU frame
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnuUncertainty {
    /// East, North, Up position uncertainty (in meters)
    pub position_m: Vector3<f64>,
    /// East, North, Up velocity uncertainty (in m/s)
    pub velocity_m_s: Vector3<f64>,
}

impl Default for EnuUncertainty {
    fn default() -> Self {
        Self {
            position_m: Vector3::repeat(f64::NAN),
            velocity_m_s: Vector3::repeat(f64::NAN),
        }
    }
}

/// Rotates a (Gᵀ.W.G)⁻¹ matrix, expressed in ECEF + clock, to ENU + clock.
pub(crate) fn h_enu(h: &Matrix4<f64>, lat_rad: f64, lon_rad: f64) -> Matrix4<f64> {
    let mut r = Matrix4::<f64>::zeros();
    r.fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&enu_rotation(lat_rad, lon_rad));
    r[(3, 3)] = 1.0;
    r * h * r.transpose()
}

pub(crate) fn to_matrix4(h: &DMatrix<f64>) -> Matrix4<f64> {
    h.fixed_view::<4, 4>(0, 0).into_owned()
}

impl EnuUncertainty {
    /// Builds [EnuUncertainty] from position and velocity (Gᵀ.W.G)⁻¹ matrices,
    /// at given geodetic latitude and longitude (in radians).
    pub(crate) fn new(
        h_position: &Matrix4<f64>,
        h_velocity: &Matrix4<f64>,
        lat_rad: f64,
        lon_rad: f64,
    ) -> Self {
        let pos = h_enu(h_position, lat_rad, lon_rad);
        let vel = h_enu(h_velocity, lat_rad, lon_rad);
        Self {
            position_m: Vector3::new(pos[(0, 0)].sqrt(), pos[(1, 1)].sqrt(), pos[(2, 2)].sqrt()),
            velocity_m_s: Vector3::new(vel[(0, 0)].sqrt(), vel[(1, 1)].sqrt(), vel[(2, 2)].sqrt()),
        }
    }
}

#[cfg(test)]
mod test {
    use super::{h_enu, EnuUncertainty};
    use nalgebra::Matrix4;

    #[test]
    fn isotropic_uncertainty() {
        // isotropic ECEF covariance remains isotropic in ENU
        let h = Matrix4::from_diagonal(&nalgebra::Vector4::new(4.0, 4.0, 4.0, 9.0));
        let unc = EnuUncertainty::new(&h, &h, 0.7, -2.1);
        for i in 0..3 {
            assert!((unc.position_m[i] - 2.0).abs() < 1.0E-9);
            assert!((unc.velocity_m_s[i] - 2.0).abs() < 1.0E-9);
        }
        assert_eq!(h_enu(&h, 0.7, -2.1)[(3, 3)], 9.0);
    }

    #[test]
    fn vertical_at_pole() {
        // at north pole, ECEF Z is the local up axis
        let h = Matrix4::from_diagonal(&nalgebra::Vector4::new(1.0, 1.0, 25.0, 1.0));
        let unc = EnuUncertainty::new(&h, &h, std::f64::consts::FRAC_PI_2, 0.0);
        assert!((unc.position_m[2] - 5.0).abs() < 1.0E-9);
        assert!((unc.position_m[0] - 1.0).abs() < 1.0E-9);
    }
}
