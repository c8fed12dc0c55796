//! Per epoch solutions
use crate::{
    constants::MAX_PRN,
    navigation::{EnuUncertainty, WlsSolution},
    prelude::{Epoch, Vector3},
    time::GpsTime,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Solution reported once per epoch. Skipped epochs are reported
/// as [EpochSolution::invalid], all values being NaN.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EpochSolution {
    /// Reception [Epoch], in GPST. None for skipped epochs
    /// that did not even resolve a reception time.
    pub epoch: Option<Epoch>,
    /// Reception time
    pub time: Option<GpsTime>,
    /// Latitude (in decimal degrees)
    pub latitude_deg: f64,
    /// Longitude (in decimal degrees)
    pub longitude_deg: f64,
    /// Altitude above WGS84 ellipsoid (in meters)
    pub altitude_m: f64,
    /// ECEF position (in meters)
    pub position_ecef_m: Vector3<f64>,
    /// Receiver clock bias (in meters)
    pub clock_bias_m: f64,
    /// Receiver clock drift (in m/s)
    pub clock_drift_m_s: f64,
    /// ECEF velocity (in m/s)
    pub velocity_ecef_m_s: Vector3<f64>,
    /// ENU velocity (in m/s)
    pub velocity_enu_m_s: Vector3<f64>,
    /// Position and velocity uncertainties, in the ENU frame
    pub uncertainty: EnuUncertainty,
    /// Post-fit pseudo range residuals (in meters), indexed by PRN - 1.
    /// NaN for satellites that did not contribute.
    pub pseudorange_residuals_m: [f64; MAX_PRN],
    /// Reference residuals (in meters), indexed by PRN - 1.
    /// NaN when not evaluated.
    pub reference_residuals_m: [f64; MAX_PRN],
    /// Satellites that contributed to the solution
    pub used: Vec<u8>,
    /// Satellites excluded by the reference residual check
    pub excluded: Vec<u8>,
    /// Satellites rejected as post-fit outliers
    pub rejected: Vec<u8>,
    /// Total number of Gauss-Newton iterations
    pub iterations: usize,
    /// True if a week rollover was corrected during preprocessing
    pub week_rollover_corrected: bool,
}

impl Default for EpochSolution {
    fn default() -> Self {
        Self::invalid()
    }
}

impl EpochSolution {
    /// NaN filled [EpochSolution], reported for skipped epochs.
    pub fn invalid() -> Self {
        let nan3 = Vector3::new(f64::NAN, f64::NAN, f64::NAN);
        Self {
            epoch: None,
            time: None,
            latitude_deg: f64::NAN,
            longitude_deg: f64::NAN,
            altitude_m: f64::NAN,
            position_ecef_m: nan3,
            clock_bias_m: f64::NAN,
            clock_drift_m_s: f64::NAN,
            velocity_ecef_m_s: nan3,
            velocity_enu_m_s: nan3,
            uncertainty: EnuUncertainty::default(),
            pseudorange_residuals_m: [f64::NAN; MAX_PRN],
            reference_residuals_m: [f64::NAN; MAX_PRN],
            used: Vec::new(),
            excluded: Vec::new(),
            rejected: Vec::new(),
            iterations: 0,
            week_rollover_corrected: false,
        }
    }

    /// Copies and returns [EpochSolution] stamped at this reception time
    pub(crate) fn with_time(mut self, time: GpsTime) -> Self {
        self.epoch = Some(time.to_epoch());
        self.time = Some(time);
        self
    }

    /// True if this [EpochSolution] carries an actual fix
    pub fn is_valid(&self) -> bool {
        self.latitude_deg.is_finite()
            && self.longitude_deg.is_finite()
            && self.altitude_m.is_finite()
    }

    pub(crate) fn from_wls(
        time: GpsTime,
        solution: &WlsSolution,
        reference_residuals_m: [f64; MAX_PRN],
        excluded: Vec<u8>,
        week_rollover_corrected: bool,
    ) -> Self {
        let (latitude_deg, longitude_deg, altitude_m) = solution.position.lat_long_alt_deg_deg_m();
        let velocity_enu_m_s = solution.position.enu_rotation() * solution.state.velocity_ecef_m_s;

        Self {
            epoch: Some(time.to_epoch()),
            time: Some(time),
            latitude_deg,
            longitude_deg,
            altitude_m,
            position_ecef_m: solution.state.position_ecef_m,
            clock_bias_m: solution.state.clock_bias_m,
            clock_drift_m_s: solution.state.clock_drift_m_s,
            velocity_ecef_m_s: solution.state.velocity_ecef_m_s,
            velocity_enu_m_s,
            uncertainty: solution.uncertainty,
            pseudorange_residuals_m: solution.residuals.to_array(),
            reference_residuals_m,
            used: solution.residuals.prns.clone(),
            excluded,
            rejected: solution.rejected.clone(),
            iterations: solution.iterations,
            week_rollover_corrected,
        }
    }
}
