use log::debug;
use nalgebra::{DMatrix, DVector, Matrix4};

use crate::{
    error::Error,
    navigation::{uncertainty::to_matrix4, wls::Linearization},
    prelude::Vector3,
};

/// Pseudo range rate uncertainty floor (m/s)
const MIN_RATE_SIGMA_M_S: f64 = 1.0E-3;

/// Closed form velocity solution
#[derive(Debug, Clone, Copy)]
pub(crate) struct VelocitySolution {
    /// ECEF velocity (in m/s)
    pub velocity_ecef_m_s: Vector3<f64>,
    /// Receiver clock drift (in m/s)
    pub clock_drift_m_s: f64,
    /// (Gᵀ.W.G)⁻¹
    pub h: Matrix4<f64>,
}

/// Solves velocity and clock drift from the converged geometry,
/// given the a-priori clock drift (in m/s).
///
/// Range rate residuals are weighted by their uncertainty and the
/// weighted system is solved by QR decomposition.
pub(crate) fn solve(lin: &Linearization, clock_drift_m_s: f64) -> Result<VelocitySolution, Error> {
    let n = lin.len();

    let mut weights = DMatrix::<f64>::zeros(n, n);
    let mut delta = DVector::<f64>::zeros(n);

    for (i, sat) in lin.satellites.iter().enumerate() {
        let los = lin.g.fixed_view::<1, 3>(i, 0).transpose();

        let range_rate = -sat.satellite.velocity_ecef_m_s.dot(&los);

        delta[i] = sat.measurement.pseudorange_rate_mps - range_rate
            + sat.satellite.clock_drift_m_s
            - clock_drift_m_s;

        let sigma = sat
            .measurement
            .pseudorange_rate_sigma_mps
            .max(MIN_RATE_SIGMA_M_S);

        weights[(i, i)] = 1.0 / sigma;
    }

    let weighted_g = &weights * &lin.g;
    let weighted_delta = &weights * &delta;

    let qr = weighted_g.clone().qr();
    let q_t_b = qr.q().transpose() * weighted_delta;
    let x = qr
        .r()
        .solve_upper_triangular(&q_t_b)
        .ok_or(Error::VelocitySolve)?;

    let w = &weights * &weights;
    let h = (lin.g.transpose() * w * &lin.g)
        .try_inverse()
        .ok_or(Error::MatrixInversion)?;

    let velocity_ecef_m_s = Vector3::new(x[0], x[1], x[2]);

    debug!(
        "velocity - ({:.3}, {:.3}, {:.3}) m/s, drift correction {:.3} m/s",
        x[0], x[1], x[2], x[3]
    );

    Ok(VelocitySolution {
        velocity_ecef_m_s,
        clock_drift_m_s: clock_drift_m_s + x[3],
        h: to_matrix4(&h),
    })
}
