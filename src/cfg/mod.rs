#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod modeling;
pub use modeling::Modeling;

fn default_max_tow_uncertainty() -> f64 {
    500.0
}

fn default_max_prr_uncertainty() -> f64 {
    10.0
}

fn default_min_cn0() -> Option<f64> {
    Some(18.0)
}

fn default_travel_time() -> f64 {
    70.0E-3
}

fn default_convergence_tolerance() -> f64 {
    4.0E-8
}

fn default_atmospheric_threshold() -> f64 {
    1000.0
}

fn default_min_satellites() -> usize {
    4
}

fn default_outlier_threshold() -> Option<f64> {
    Some(20.0)
}

fn default_max_iterations() -> usize {
    100
}

fn default_determinant_tolerance() -> f64 {
    1.0E-10
}

fn default_warmup_epochs() -> u32 {
    10
}

fn default_residual_limit() -> f64 {
    200.0
}

fn default_fusion() -> bool {
    true
}

fn default_position_process_noise() -> f64 {
    100.0
}

fn default_velocity_process_noise() -> f64 {
    0.5
}

fn default_measurement_noise() -> f64 {
    0.1
}

fn default_initial_covariance() -> f64 {
    1.0
}

fn default_imu_warmup() -> usize {
    200
}

/// Raw measurements validation and pseudo range formation
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PreprocessingOpts {
    /// Measurements with a larger received time uncertainty (in nanoseconds) are dropped.
    #[cfg_attr(feature = "serde", serde(default = "default_max_tow_uncertainty"))]
    pub max_tow_uncertainty_ns: f64,

    /// Measurements with a larger pseudo range rate uncertainty (in m/s) are dropped.
    #[cfg_attr(feature = "serde", serde(default = "default_max_prr_uncertainty"))]
    pub max_prr_uncertainty_mps: f64,

    /// Minimal C/N0 (in dB-Hz) for one measurement to contribute.
    #[cfg_attr(feature = "serde", serde(default = "default_min_cn0"))]
    pub min_cn0_dbhz: Option<f64>,

    /// Assumed travel time (in seconds) of the latest transmitted signal,
    /// which serves as the common reception time reference.
    #[cfg_attr(feature = "serde", serde(default = "default_travel_time"))]
    pub reference_travel_time_s: f64,

    /// Doppler aided code smoothing window length (in epochs).
    /// Smoothing is disabled when undefined.
    #[cfg_attr(feature = "serde", serde(default))]
    pub code_smoothing: Option<usize>,
}

impl Default for PreprocessingOpts {
    fn default() -> Self {
        Self {
            max_tow_uncertainty_ns: default_max_tow_uncertainty(),
            max_prr_uncertainty_mps: default_max_prr_uncertainty(),
            min_cn0_dbhz: default_min_cn0(),
            reference_travel_time_s: default_travel_time(),
            code_smoothing: None,
        }
    }
}

/// Weighted Least Squares iteration control
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SolverOpts {
    /// Iteration stops once the position correction is smaller than this (in meters).
    #[cfg_attr(feature = "serde", serde(default = "default_convergence_tolerance"))]
    pub convergence_tolerance_m: f64,

    /// Atmospheric corrections are only applied once the position
    /// correction dropped below this value (in meters).
    #[cfg_attr(feature = "serde", serde(default = "default_atmospheric_threshold"))]
    pub atmospheric_threshold_m: f64,

    /// Minimal number of satellites to form a solution.
    #[cfg_attr(feature = "serde", serde(default = "default_min_satellites"))]
    pub min_satellites: usize,

    /// Post-fit residual (in meters) above which one satellite is
    /// rejected and the solution computed again. No rejection when undefined.
    #[cfg_attr(feature = "serde", serde(default = "default_outlier_threshold"))]
    pub outlier_threshold_m: Option<f64>,

    /// Maximal number of Gauss-Newton iterations
    #[cfg_attr(feature = "serde", serde(default = "default_max_iterations"))]
    pub max_iterations: usize,

    /// Covariance determinant below which we fall back to unweighted equations
    #[cfg_attr(feature = "serde", serde(default = "default_determinant_tolerance"))]
    pub determinant_tolerance: f64,
}

impl Default for SolverOpts {
    fn default() -> Self {
        Self {
            convergence_tolerance_m: default_convergence_tolerance(),
            atmospheric_threshold_m: default_atmospheric_threshold(),
            min_satellites: default_min_satellites(),
            outlier_threshold_m: default_outlier_threshold(),
            max_iterations: default_max_iterations(),
            determinant_tolerance: default_determinant_tolerance(),
        }
    }
}

/// Reference residual based spoofing rejection
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpoofingOpts {
    /// Exclude satellites whose reference residual exceeds [Self::residual_limit_m].
    /// Residuals are always evaluated (and reported) once a reference exists.
    #[cfg_attr(feature = "serde", serde(default))]
    pub enabled: bool,

    /// Number of converged epochs before exclusion may happen.
    #[cfg_attr(feature = "serde", serde(default = "default_warmup_epochs"))]
    pub warmup_epochs: u32,

    /// Reference residual limit (in meters)
    #[cfg_attr(feature = "serde", serde(default = "default_residual_limit"))]
    pub residual_limit_m: f64,

    /// When defined and no operator reference was set, the first N
    /// converged fixes are averaged to form the reference position.
    #[cfg_attr(feature = "serde", serde(default))]
    pub reference_survey_epochs: Option<usize>,
}

impl Default for SpoofingOpts {
    fn default() -> Self {
        Self {
            enabled: false,
            warmup_epochs: default_warmup_epochs(),
            residual_limit_m: default_residual_limit(),
            reference_survey_epochs: None,
        }
    }
}

/// Local ENU frame origin of the fusion filter
#[derive(Default, Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum AnchorPolicy {
    /// Anchored on the first GNSS fix
    #[default]
    FirstFix,
    /// Anchored on the [ReferencePosition](crate::prelude::ReferencePosition)
    /// when it is known at the time of the first fix.
    ReferencePosition,
}

/// GNSS / inertial fusion filter
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FusionOpts {
    /// Run the fusion filter on each converged fix
    #[cfg_attr(feature = "serde", serde(default = "default_fusion"))]
    pub enabled: bool,

    /// Process noise on position states (in m²)
    #[cfg_attr(feature = "serde", serde(default = "default_position_process_noise"))]
    pub position_process_noise_m2: f64,

    /// Process noise on velocity states (in (m/s)²)
    #[cfg_attr(feature = "serde", serde(default = "default_velocity_process_noise"))]
    pub velocity_process_noise_m2_s2: f64,

    /// Measurement noise, identical on all axes
    #[cfg_attr(feature = "serde", serde(default = "default_measurement_noise"))]
    pub measurement_noise: f64,

    /// Initial error covariance diagonal
    #[cfg_attr(feature = "serde", serde(default = "default_initial_covariance"))]
    pub initial_covariance: f64,

    /// Number of IMU samples discarded while the sensor settles
    #[cfg_attr(feature = "serde", serde(default = "default_imu_warmup"))]
    pub imu_warmup_samples: usize,

    /// ENU origin
    #[cfg_attr(feature = "serde", serde(default))]
    pub anchor: AnchorPolicy,
}

impl Default for FusionOpts {
    fn default() -> Self {
        Self {
            enabled: default_fusion(),
            position_process_noise_m2: default_position_process_noise(),
            velocity_process_noise_m2_s2: default_velocity_process_noise(),
            measurement_noise: default_measurement_noise(),
            initial_covariance: default_initial_covariance(),
            imu_warmup_samples: default_imu_warmup(),
            anchor: AnchorPolicy::default(),
        }
    }
}

/// [PositioningContext](crate::prelude::PositioningContext) configuration
#[derive(Default, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Config {
    /// Raw measurements preprocessing
    #[cfg_attr(feature = "serde", serde(default))]
    pub preprocessing: PreprocessingOpts,

    /// Solver customization
    #[cfg_attr(feature = "serde", serde(default))]
    pub solver: SolverOpts,

    /// Spoofing rejection
    #[cfg_attr(feature = "serde", serde(default))]
    pub spoofing: SpoofingOpts,

    /// Inertial fusion
    #[cfg_attr(feature = "serde", serde(default))]
    pub fusion: FusionOpts,

    /// Atmospherical and clock [Modeling]
    #[cfg_attr(feature = "serde", serde(default))]
    pub modeling: Modeling,
}

impl Config {
    /// Returns [Config] with spoofing rejection turned on.
    /// You can then customize [Self] as you will.
    pub fn anti_spoofing_preset() -> Self {
        Self::default().with_anti_spoofing(true)
    }

    /// Copies and returns [Config] with spoofing rejection turned on or off.
    pub fn with_anti_spoofing(&self, enabled: bool) -> Self {
        let mut s = self.clone();
        s.spoofing.enabled = enabled;
        s
    }

    /// Copies and returns [Config] without any atmospheric delay compensation.
    pub fn without_atmosphere(&self) -> Self {
        let mut s = self.clone();
        s.modeling.iono_delay = false;
        s.modeling.tropo_delay = false;
        s
    }

    /// Copies and returns [Config] without inertial fusion.
    pub fn without_fusion(&self) -> Self {
        let mut s = self.clone();
        s.fusion.enabled = false;
        s
    }
}
