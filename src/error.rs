use thiserror::Error;

use crate::prelude::SV;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// Week rollover correction still leaves a large time drift between
    /// reception and transmission times: the receiver time base is not trustworthy.
    #[error("time base error: {0:.3} s drift after week rollover correction")]
    TimeBase(f64),

    /// The receiver clock does not carry GPS time (full bias is zero or positive).
    #[error("invalid receiver clock: gps time is not known")]
    InvalidReceiverClock,

    /// Not enough satellites left to form a solution.
    /// Four of them are always needed (3D position + clock bias).
    #[error("not enough satellites: {0}")]
    InsufficientSatellites(usize),

    /// WLS iterations did not converge within the iteration budget.
    #[error("failed to converge within {0} iterations")]
    Convergence(usize),

    /// Measurement covariance is (numerically) singular.
    /// Solver falls back to unweighted normal equations when this happens.
    #[error("singular measurement covariance")]
    SingularCovariance,

    #[error("failed to invert matrix")]
    MatrixInversion,

    #[error("velocity solve: rank deficient geometry")]
    VelocitySolve,

    /// No ephemeris was provided for this satellite: it does not
    /// contribute to this epoch.
    #[error("{0}: ephemeris not found")]
    EphemerisNotFound(SV),

    #[error("invalid satellite prn #{0}")]
    InvalidSatellite(u8),

    /// IMU samples must be presented in chronological order.
    #[error("imu sample is not in chronological order")]
    ImuOutOfOrder,
}

impl Error {
    /// True when this [Error] simply means "nothing to compute for this epoch",
    /// as opposed to a time base or numerical fault.
    pub fn is_epoch_skip(&self) -> bool {
        matches!(self, Self::InsufficientSatellites(_))
    }
}
