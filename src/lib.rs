#![doc = include_str!("../README.md")]
#![cfg_attr(docrs, feature(doc_cfg))]

extern crate gnss_rs as gnss;

// private modules
mod averager;
mod bias;
mod cfg;
mod constants;
mod context;
mod ephemeris;
mod error;
mod fusion;
mod measurement;
mod navigation;
mod position;
mod smoothing;
mod solutions;
mod time;

#[cfg(test)]
mod tests;

// prelude
pub mod prelude {
    pub use crate::bias::{KbModel, TropoModel};
    pub use crate::cfg::{
        AnchorPolicy, Config, FusionOpts, Modeling, PreprocessingOpts, SolverOpts, SpoofingOpts,
    };
    pub use crate::context::PositioningContext;
    pub use crate::ephemeris::{EphemerisProvider, SatelliteState};
    pub use crate::error::Error;
    pub use crate::fusion::{
        DeadReckoning, FusedState, FusionState, ImuSample, SensorFusionKalmanFilter,
    };
    pub use crate::measurement::{
        MeasurementPreprocessor, PseudorangeMeasurement, PseudorangeSet, RawBatch,
        RawMeasurement, ReceiverClock, SatelliteSlots,
    };
    pub use crate::navigation::{
        EnuUncertainty, ReceiverState, SolutionResidualSet, SpoofingReport,
        SpoofingResidualFilter, WeightedLeastSquaresSolver, WlsSolution,
    };
    pub use crate::position::{Position, ReferencePosition, ReferenceSource};
    pub use crate::smoothing::CodeSmoother;
    pub use crate::solutions::EpochSolution;
    pub use crate::time::GpsTime;
    // re-export
    pub use gnss::prelude::{Constellation, SV};
    pub use hifitime::{Duration, Epoch, TimeScale};
    pub use nalgebra::Vector3;
}

// pub export
pub use constants::{MAX_PRN, SPEED_OF_LIGHT_M_S};
pub use error::Error;
