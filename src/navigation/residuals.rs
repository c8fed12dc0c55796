use nalgebra::DMatrix;

use crate::{constants::MAX_PRN, ephemeris::SatelliteState, prelude::Vector3};

/// Pseudo range predicted at an evaluation position
#[derive(Debug, Clone, Copy)]
pub(crate) struct Prediction {
    /// Geometric range (in meters)
    pub range_m: f64,
    /// Receiver minus satellite, normalized
    pub line_of_sight: Vector3<f64>,
    /// Predicted pseudo range (in meters)
    pub pseudorange_m: f64,
}

impl Prediction {
    /// Measured minus predicted pseudo range (in meters)
    pub fn residual_m(&self, pseudorange_m: f64) -> f64 {
        pseudorange_m - self.pseudorange_m
    }
}

/// Predicts the pseudo range observed at `position_ecef_m`:
/// geometric range, minus satellite clock offset, plus atmospheric delays,
/// plus receiver clock bias.
///
/// Used both iteratively, at the estimated position,
/// and once per epoch at the fixed reference position.
pub(crate) fn predict(
    position_ecef_m: &Vector3<f64>,
    satellite: &SatelliteState,
    clock_bias_m: f64,
    iono_m: f64,
    tropo_m: f64,
) -> Prediction {
    let delta = position_ecef_m - satellite.position_ecef_m;
    let range_m = delta.norm();

    Prediction {
        range_m,
        line_of_sight: delta / range_m,
        pseudorange_m: range_m - satellite.clock_correction_m + iono_m + tropo_m + clock_bias_m,
    }
}

/// Post-fit residuals of a WLS solution. Immutable snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct SolutionResidualSet {
    /// PRN of each contributing satellite
    pub prns: Vec<u8>,
    /// ECEF position (in meters) of each contributing satellite
    pub satellite_positions_ecef_m: Vec<Vector3<f64>>,
    /// Measured minus predicted pseudo range (in meters)
    pub residuals_m: Vec<f64>,
    /// Measurement covariance (diagonal, in m²)
    pub covariance: DMatrix<f64>,
}

impl SolutionResidualSet {
    /// Residual (in meters) of this satellite, if it contributed.
    pub fn residual_m(&self, prn: u8) -> Option<f64> {
        let index = self.prns.iter().position(|p| *p == prn)?;
        Some(self.residuals_m[index])
    }

    /// (PRN, residual) of the satellite with largest absolute residual
    pub fn worst(&self) -> Option<(u8, f64)> {
        self.prns
            .iter()
            .zip(self.residuals_m.iter())
            .map(|(prn, res)| (*prn, *res))
            .max_by(|(_, a), (_, b)| a.abs().total_cmp(&b.abs()))
    }

    /// Dense per-PRN residuals, NaN for satellites that did not contribute.
    pub fn to_array(&self) -> [f64; MAX_PRN] {
        let mut array = [f64::NAN; MAX_PRN];
        for (prn, res) in self.prns.iter().zip(self.residuals_m.iter()) {
            array[*prn as usize - 1] = *res;
        }
        array
    }

    pub fn len(&self) -> usize {
        self.prns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prns.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::{predict, SolutionResidualSet};
    use crate::{ephemeris::SatelliteState, prelude::Vector3};
    use nalgebra::DMatrix;

    #[test]
    fn prediction() {
        let sat = SatelliteState::new(Vector3::new(0.0, 0.0, 20.0E6), Vector3::zeros())
            .with_clock_correction_m(10.0);

        let rx = Vector3::new(0.0, 0.0, 6.4E6);
        let p = predict(&rx, &sat, 100.0, 2.0, 3.0);

        assert_eq!(p.range_m, 13.6E6);
        assert_eq!(p.pseudorange_m, 13.6E6 - 10.0 + 2.0 + 3.0 + 100.0);
        assert_eq!(p.line_of_sight, Vector3::new(0.0, 0.0, -1.0));
        assert_eq!(p.residual_m(13.6E6 + 100.0), 5.0);
    }

    #[test]
    fn residual_set() {
        let set = SolutionResidualSet {
            prns: vec![2, 5, 9],
            satellite_positions_ecef_m: vec![Vector3::zeros(); 3],
            residuals_m: vec![1.0, -30.0, 4.0],
            covariance: DMatrix::identity(3, 3),
        };

        assert_eq!(set.worst(), Some((5, -30.0)));
        assert_eq!(set.residual_m(9), Some(4.0));
        assert_eq!(set.residual_m(1), None);

        let dense = set.to_array();
        assert_eq!(dense[1], 1.0);
        assert_eq!(dense[4], -30.0);
        assert!(dense[0].is_nan());
    }
}
