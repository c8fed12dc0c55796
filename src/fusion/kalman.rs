use crate::error::Error;
use nalgebra::{allocator::Allocator, DefaultAllocator, DimName, OMatrix, OVector};

/// Linear [Kalman] filter model
#[derive(Clone, Debug)]
pub(crate) struct KfModel<S>
where
    S: DimName,
    DefaultAllocator: Allocator<S, S>,
{
    /// State transition
    pub a: OMatrix<f64, S, S>,
    /// Observation
    pub c: OMatrix<f64, S, S>,
    /// Process noise
    pub q: OMatrix<f64, S, S>,
    /// Measurement noise
    pub r: OMatrix<f64, S, S>,
}

#[derive(Clone, Debug)]
pub(crate) struct Kalman<S>
where
    S: DimName,
    DefaultAllocator: Allocator<S, S>,
    DefaultAllocator: Allocator<S>,
{
    model: KfModel<S>,

    /// Error covariance
    p: OMatrix<f64, S, S>,

    /// Latest gain
    k: OMatrix<f64, S, S>,
}

impl<S> Kalman<S>
where
    S: DimName,
    DefaultAllocator: Allocator<S, S>,
    DefaultAllocator: Allocator<S>,
{
    /// Create a new [Kalman] filter
    pub fn new(model: KfModel<S>, p_0: OMatrix<f64, S, S>) -> Self {
        Self {
            model,
            p: p_0,
            k: OMatrix::<f64, S, S>::zeros(),
        }
    }

    /// Error covariance
    pub fn covariance(&self) -> &OMatrix<f64, S, S> {
        &self.p
    }

    /// Latest gain
    pub fn gain(&self) -> &OMatrix<f64, S, S> {
        &self.k
    }

    /// Run this [Kalman] filter, correcting state `x_k` with measurement `z_k`.
    /// Error covariance and gain are only updated on success.
    pub fn run(
        &mut self,
        x_k: &OVector<f64, S>,
        z_k: &OVector<f64, S>,
    ) -> Result<OVector<f64, S>, Error> {
        let (a, c) = (&self.model.a, &self.model.c);

        let p_pred = a * self.p.transpose() * a.transpose() + &self.model.q;

        let s = c * &p_pred * c.transpose() + &self.model.r;
        let s_inv = s.try_inverse().ok_or(Error::MatrixInversion)?;

        let k = &p_pred * c.transpose() * s_inv;

        let innovation = z_k - c * x_k;
        let x = x_k + &k * innovation;

        let identity = OMatrix::<f64, S, S>::identity();
        self.p = (identity - &k * c) * p_pred;
        self.k = k;

        Ok(x)
    }
}
