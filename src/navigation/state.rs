use crate::prelude::Vector3;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Receiver state the WLS solver iterates on. It is also the
/// a-priori of the following epoch.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceiverState {
    /// ECEF position (in meters)
    pub position_ecef_m: Vector3<f64>,
    /// Receiver clock bias, expressed in meters of range
    pub clock_bias_m: f64,
    /// ECEF velocity (in m/s)
    pub velocity_ecef_m_s: Vector3<f64>,
    /// Receiver clock drift, expressed in m/s
    pub clock_drift_m_s: f64,
}

impl ReceiverState {
    /// Builds a [ReceiverState] located at this ECEF position (in meters)
    pub fn from_position(position_ecef_m: Vector3<f64>) -> Self {
        Self {
            position_ecef_m,
            ..Default::default()
        }
    }

    /// Applies a [position, clock] correction vector
    pub(crate) fn correct(&mut self, dx: &[f64; 4]) {
        self.position_ecef_m += Vector3::new(dx[0], dx[1], dx[2]);
        self.clock_bias_m += dx[3];
    }
}
