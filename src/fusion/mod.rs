//! GNSS / inertial fusion
use log::{debug, info};
use nalgebra::{Matrix6, Vector6, U6};

use crate::{
    cfg::{AnchorPolicy, FusionOpts},
    error::Error,
    position::Position,
    prelude::Vector3,
};

mod imu;
pub(crate) mod kalman;

pub use imu::{DeadReckoning, ImuSample};

use kalman::{KfModel, Kalman};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Fused position and velocity, in the local ENU frame
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FusedState {
    /// ENU position with respect to the anchor (in meters)
    pub position_enu_m: Vector3<f64>,
    /// ENU velocity (in m/s)
    pub velocity_enu_m_s: Vector3<f64>,
}

impl FusedState {
    pub(crate) fn from_dead_reckoning(dr: &DeadReckoning) -> Self {
        Self {
            position_enu_m: dr.position_m,
            velocity_enu_m_s: dr.velocity_m_s,
        }
    }
}

/// [E, N, U, vE, vN, vU] estimate and its error covariance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FusionState {
    pub x: Vector6<f64>,
    pub p: Matrix6<f64>,
}

/// Fuses GNSS fixes with the dead reckoning accumulators. The dead reckoned
/// state is the state being corrected, the GNSS fix the measurement.
#[derive(Debug, Clone)]
pub struct SensorFusionKalmanFilter {
    kf: Kalman<U6>,
    policy: AnchorPolicy,
    anchor: Option<Position>,
    x: Vector6<f64>,
}

impl SensorFusionKalmanFilter {
    /// Builds new [SensorFusionKalmanFilter]
    pub fn new(opts: &FusionOpts) -> Self {
        let q = Matrix6::from_diagonal(&Vector6::new(
            opts.position_process_noise_m2,
            opts.position_process_noise_m2,
            opts.position_process_noise_m2,
            opts.velocity_process_noise_m2_s2,
            opts.velocity_process_noise_m2_s2,
            opts.velocity_process_noise_m2_s2,
        ));

        let model = KfModel {
            a: Matrix6::identity(),
            c: Matrix6::identity(),
            q,
            r: Matrix6::identity() * opts.measurement_noise,
        };

        Self {
            kf: Kalman::new(model, Matrix6::identity() * opts.initial_covariance),
            policy: opts.anchor,
            anchor: None,
            x: Vector6::zeros(),
        }
    }

    /// ENU frame origin, once latched
    pub fn anchor(&self) -> Option<&Position> {
        self.anchor.as_ref()
    }

    /// Current [FusionState]
    pub fn state(&self) -> FusionState {
        FusionState {
            x: self.x,
            p: *self.kf.covariance(),
        }
    }

    /// Diagonal of the latest Kalman gain
    pub fn gain(&self) -> Vector6<f64> {
        self.kf.gain().diagonal()
    }

    /// Processes one GNSS fix: ECEF position and ENU velocity (in m/s).
    ///
    /// The first fix latches the ENU anchor and resets the dead reckoning
    /// accumulators: the filter does not run. Following fixes correct the
    /// dead reckoned state, which is overwritten with the fused estimate.
    pub fn update(
        &mut self,
        fix: &Position,
        velocity_enu_m_s: &Vector3<f64>,
        reference: Option<&Position>,
        dr: &mut DeadReckoning,
    ) -> Result<FusedState, Error> {
        let anchor = match &self.anchor {
            Some(anchor) => *anchor,
            None => {
                let anchor = match (self.policy, reference) {
                    (AnchorPolicy::ReferencePosition, Some(reference)) => *reference,
                    _ => *fix,
                };

                let (lat, lon, alt) = anchor.lat_long_alt_deg_deg_m();
                info!("fusion anchor latched: {:.7}°, {:.7}°, {:.3} m", lat, lon, alt);

                self.anchor = Some(anchor);
                dr.reset();
                self.x = Vector6::zeros();
                return Ok(FusedState::from_dead_reckoning(dr));
            },
        };

        let offset = anchor.enu(&fix.ecef());

        let z = Vector6::new(
            offset[0],
            offset[1],
            offset[2],
            velocity_enu_m_s[0],
            velocity_enu_m_s[1],
            velocity_enu_m_s[2],
        );

        let x_k = Vector6::new(
            dr.position_m[0],
            dr.position_m[1],
            dr.position_m[2],
            dr.velocity_m_s[0],
            dr.velocity_m_s[1],
            dr.velocity_m_s[2],
        );

        let x = self.kf.run(&x_k, &z)?;

        debug!(
            "fusion - gnss ({:.3}, {:.3}, {:.3}) dr ({:.3}, {:.3}, {:.3}) fused ({:.3}, {:.3}, {:.3})",
            z[0], z[1], z[2], x_k[0], x_k[1], x_k[2], x[0], x[1], x[2]
        );

        dr.position_m = Vector3::new(x[0], x[1], x[2]);
        dr.velocity_m_s = Vector3::new(x[3], x[4], x[5]);
        self.x = x;

        Ok(FusedState::from_dead_reckoning(dr))
    }
}
