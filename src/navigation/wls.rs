use itertools::Itertools;
use log::{debug, warn};
use nalgebra::{DMatrix, DVector};

use crate::{
    bias::Atmosphere,
    cfg::{Modeling, SolverOpts},
    ephemeris::{resolve, EphemerisProvider, SatelliteState},
    error::Error,
    measurement::{PseudorangeMeasurement, PseudorangeSet, SatelliteSlots},
    navigation::{
        residuals::{predict, Prediction, SolutionResidualSet},
        state::ReceiverState,
        uncertainty::{to_matrix4, EnuUncertainty},
        velocity,
    },
    position::Position,
    time::GpsTime,
};

/// One satellite contribution to the linearized system
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinearizedSatellite {
    pub measurement: PseudorangeMeasurement,
    pub satellite: SatelliteState,
    pub prediction: Prediction,
}

/// Pseudo range equations linearized at the current state
#[derive(Debug, Clone)]
pub(crate) struct Linearization {
    pub satellites: Vec<LinearizedSatellite>,
    /// Geometry matrix (n x 4)
    pub g: DMatrix<f64>,
    /// Pre-fit residuals (in meters)
    pub residuals: DVector<f64>,
    /// Diagonal measurement covariance (in m²)
    pub covariance: DMatrix<f64>,
}

impl Linearization {
    fn new(satellites: Vec<LinearizedSatellite>) -> Self {
        let n = satellites.len();

        let mut g = DMatrix::<f64>::zeros(n, 4);
        let mut residuals = DVector::<f64>::zeros(n);
        let mut covariance = DMatrix::<f64>::zeros(n, n);

        for (i, sat) in satellites.iter().enumerate() {
            let los = sat.prediction.line_of_sight;
            g[(i, 0)] = los[0];
            g[(i, 1)] = los[1];
            g[(i, 2)] = los[2];
            g[(i, 3)] = 1.0;

            residuals[i] = sat.prediction.residual_m(sat.measurement.pseudorange_m);
            covariance[(i, i)] = sat.measurement.pseudorange_sigma_m.powi(2);
        }

        Self {
            satellites,
            g,
            residuals,
            covariance,
        }
    }

    pub fn len(&self) -> usize {
        self.satellites.len()
    }

    fn prns(&self) -> Vec<u8> {
        self.satellites.iter().map(|s| s.measurement.sv.prn).collect()
    }

    fn residual_set(&self) -> SolutionResidualSet {
        SolutionResidualSet {
            prns: self.prns(),
            satellite_positions_ecef_m: self
                .satellites
                .iter()
                .map(|s| s.satellite.position_ecef_m)
                .collect(),
            residuals_m: self.residuals.iter().copied().collect(),
            covariance: self.covariance.clone(),
        }
    }
}

/// Converged WLS solution
#[derive(Debug, Clone)]
pub struct WlsSolution {
    /// Solved [ReceiverState]
    pub state: ReceiverState,
    /// Solved [Position]
    pub position: Position,
    /// Post-fit residuals
    pub residuals: SolutionResidualSet,
    /// ENU uncertainties
    pub uncertainty: EnuUncertainty,
    /// PRNs rejected as post-fit outliers
    pub rejected: Vec<u8>,
    /// PRNs dropped for lack of ephemeris
    pub missing_ephemeris: Vec<u8>,
    /// Total number of iterations, all fits included
    pub iterations: usize,
}

/// Solving process
enum Phase {
    /// (Re)start fitting the active satellites
    Restart,
    /// Gauss-Newton iterations
    Converging { iteration: usize, atmosphere: bool },
    /// Position correction fell below tolerance
    Converged(Linearization),
    /// Post-fit residuals verification
    OutlierCheck(Linearization),
    Done(Linearization),
}

/// Iterative, weighted least squares position, velocity and clock solver.
pub struct WeightedLeastSquaresSolver<'a> {
    opts: &'a SolverOpts,
    modeling: &'a Modeling,
}

impl<'a> WeightedLeastSquaresSolver<'a> {
    /// Builds new [WeightedLeastSquaresSolver]
    pub fn new(opts: &'a SolverOpts, modeling: &'a Modeling) -> Self {
        Self { opts, modeling }
    }

    fn linearize<E: EphemerisProvider>(
        &self,
        time: GpsTime,
        active: &SatelliteSlots<PseudorangeMeasurement>,
        state: &ReceiverState,
        ephemeris: &E,
        atmosphere: Option<&Atmosphere>,
        missing: &mut Vec<u8>,
    ) -> Linearization {
        let rx = atmosphere.map(|_| Position::from_ecef(state.position_ecef_m));

        let mut satellites = Vec::with_capacity(active.len());

        for (prn, m) in active.iter() {
            let satellite = match resolve(
                ephemeris,
                m.sv,
                time,
                state.clock_bias_m,
                m.pseudorange_m,
                self.modeling.sv_clock_bias,
            ) {
                Some(satellite) => satellite,
                None => {
                    warn!("{} - {}", time, Error::EphemerisNotFound(m.sv));
                    missing.push(prn);
                    continue;
                },
            };

            let (iono_m, tropo_m) = match (atmosphere, &rx) {
                (Some(atmosphere), Some(rx)) => {
                    atmosphere.delays_m(rx, &satellite.position_ecef_m)
                },
                _ => (0.0, 0.0),
            };

            let prediction = predict(
                &state.position_ecef_m,
                &satellite,
                state.clock_bias_m,
                iono_m,
                tropo_m,
            );

            satellites.push(LinearizedSatellite {
                measurement: *m,
                satellite,
                prediction,
            });
        }

        Linearization::new(satellites)
    }

    /// Inverse of the measurement covariance, unless it is singular.
    fn weights(&self, lin: &Linearization) -> Result<DMatrix<f64>, Error> {
        let diagonal = lin.covariance.diagonal();
        let determinant: f64 = diagonal.iter().product();

        if determinant <= self.opts.determinant_tolerance {
            return Err(Error::SingularCovariance);
        }

        Ok(DMatrix::from_diagonal(&diagonal.map(|var| 1.0 / var)))
    }

    /// Returns the state correction
    fn step(&self, lin: &Linearization) -> Result<[f64; 4], Error> {
        let g_t = lin.g.transpose();

        let (h, g_t_w) = match self.weights(lin) {
            Ok(w) => {
                let g_t_w = &g_t * w;
                let h = (&g_t_w * &lin.g)
                    .try_inverse()
                    .ok_or(Error::MatrixInversion)?;
                (h, g_t_w)
            },
            Err(Error::SingularCovariance) => {
                debug!("singular covariance: unweighted solution");
                let h = (&g_t * &lin.g)
                    .try_inverse()
                    .ok_or(Error::MatrixInversion)?;
                (h, g_t)
            },
            Err(e) => return Err(e),
        };

        let dx = h * g_t_w * &lin.residuals;
        Ok([dx[0], dx[1], dx[2], dx[3]])
    }

    /// (Gᵀ.W.G)⁻¹ with W the inverse measurement covariance
    fn position_h(&self, lin: &Linearization) -> Result<DMatrix<f64>, Error> {
        let w = DMatrix::from_diagonal(&lin.covariance.diagonal().map(|var| 1.0 / var));
        (lin.g.transpose() * w * &lin.g)
            .try_inverse()
            .ok_or(Error::MatrixInversion)
    }

    /// Solves for position, velocity and clock, starting from a-priori [ReceiverState].
    /// The a-priori state is never modified: a new state is returned on success.
    ///
    /// Ionospheric delay uses the Klobuchar model of the [EphemerisProvider], when known.
    /// Tropospheric delay needs the receiver height above sea level: it is derived from the
    /// geoid height (in meters) when provided, from [Modeling] otherwise.
    pub fn solve<E: EphemerisProvider>(
        &self,
        set: &PseudorangeSet,
        ephemeris: &E,
        apriori: &ReceiverState,
        geoid_height_m: Option<f64>,
    ) -> Result<WlsSolution, Error> {
        let atmosphere = Atmosphere::new(
            *self.modeling,
            ephemeris.klobuchar(),
            geoid_height_m,
            set.time,
        );
        self.solve_with_atmosphere(set, ephemeris, apriori, &atmosphere)
    }

    pub(crate) fn solve_with_atmosphere<E: EphemerisProvider>(
        &self,
        set: &PseudorangeSet,
        ephemeris: &E,
        apriori: &ReceiverState,
        atmosphere: &Atmosphere,
    ) -> Result<WlsSolution, Error> {
        let min_satellites = self.opts.min_satellites.max(4);

        let mut active = set.measurements.clone();
        let mut state = *apriori;
        let mut rejected = Vec::new();
        let mut missing = Vec::new();
        let mut iterations = 0;

        let mut phase = Phase::Restart;

        let lin = loop {
            phase = match phase {
                Phase::Restart => {
                    if active.len() < min_satellites {
                        return Err(Error::InsufficientSatellites(active.len()));
                    }
                    Phase::Converging {
                        iteration: 0,
                        atmosphere: false,
                    }
                },
                Phase::Converging {
                    iteration,
                    atmosphere: with_atmosphere,
                } => {
                    if iteration >= self.opts.max_iterations {
                        return Err(Error::Convergence(iteration));
                    }

                    let with_atmosphere = with_atmosphere && self.modeling.atmosphere();

                    let mut dropped = Vec::new();
                    let lin = self.linearize(
                        set.time,
                        &active,
                        &state,
                        ephemeris,
                        with_atmosphere.then_some(atmosphere),
                        &mut dropped,
                    );

                    for prn in dropped {
                        active.remove(prn);
                        missing.push(prn);
                    }

                    if lin.len() < min_satellites {
                        return Err(Error::InsufficientSatellites(lin.len()));
                    }

                    let dx = self.step(&lin)?;
                    state.correct(&dx);
                    iterations += 1;

                    let norm = (dx[0].powi(2) + dx[1].powi(2) + dx[2].powi(2)).sqrt();

                    debug!(
                        "{} - iteration #{} |dx|={:.3E} m (atmosphere={})",
                        set.time, iteration, norm, with_atmosphere
                    );

                    let atmosphere_ready = with_atmosphere || !self.modeling.atmosphere();

                    if norm < self.opts.convergence_tolerance_m && atmosphere_ready {
                        Phase::Converged(lin)
                    } else {
                        Phase::Converging {
                            iteration: iteration + 1,
                            atmosphere: with_atmosphere
                                || norm < self.opts.atmospheric_threshold_m,
                        }
                    }
                },
                Phase::Converged(lin) => {
                    debug!(
                        "{} - converged with {} satellites: {}",
                        set.time,
                        lin.len(),
                        lin.prns().iter().map(|prn| format!("G{:02}", prn)).join(", ")
                    );
                    Phase::OutlierCheck(lin)
                },
                Phase::OutlierCheck(lin) => match self.opts.outlier_threshold_m {
                    Some(threshold) if lin.len() > min_satellites => {
                        match lin.residual_set().worst() {
                            Some((prn, residual)) if residual.abs() > threshold => {
                                warn!(
                                    "{} (G{:02}) - rejected: {:.3} m post-fit residual",
                                    set.time, prn, residual
                                );
                                active.remove(prn);
                                rejected.push(prn);
                                Phase::Restart
                            },
                            _ => Phase::Done(lin),
                        }
                    },
                    _ => Phase::Done(lin),
                },
                Phase::Done(lin) => break lin,
            };
        };

        let velocity = velocity::solve(&lin, apriori.clock_drift_m_s)?;

        state.velocity_ecef_m_s = velocity.velocity_ecef_m_s;
        state.clock_drift_m_s = velocity.clock_drift_m_s;

        let position = Position::from_ecef(state.position_ecef_m);
        let geodetic = position.geodetic();

        let h_position = to_matrix4(&self.position_h(&lin)?);
        let uncertainty = EnuUncertainty::new(&h_position, &velocity.h, geodetic[0], geodetic[1]);

        Ok(WlsSolution {
            state,
            position,
            residuals: lin.residual_set(),
            uncertainty,
            rejected,
            missing_ephemeris: missing,
            iterations,
        })
    }
}
