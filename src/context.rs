use std::sync::{
    atomic::{AtomicBool, Ordering},
    Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use log::{debug, error, info, warn};

use crate::{
    averager::Averager,
    bias::Atmosphere,
    cfg::Config,
    constants::MAX_PRN,
    ephemeris::EphemerisProvider,
    error::Error,
    fusion::{DeadReckoning, FusedState, FusionState, ImuSample, SensorFusionKalmanFilter},
    measurement::{MeasurementPreprocessor, PseudorangeSet, RawBatch},
    navigation::{ReceiverState, SpoofingResidualFilter, WeightedLeastSquaresSolver},
    position::ReferencePosition,
    smoothing::CodeSmoother,
    solutions::EpochSolution,
};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

/// State carried from one epoch to the next
#[derive(Debug, Clone, Default)]
struct Session {
    /// Latest converged state, a-priori of the next epoch
    state: ReceiverState,
    /// Number of converged epochs
    converged_epochs: u32,
    /// Geoid height (in meters), latched on first fix
    geoid_height_m: Option<f64>,
    smoother: Option<CodeSmoother>,
    survey: Averager,
}

/// [PositioningContext] gathers all the state of one positioning session:
/// receiver state, reference position, fusion filter and dead reckoning.
/// It is [Send] and [Sync]: GNSS epochs and IMU samples may be delivered
/// from different threads.
///
/// Locks are always acquired in this order:
/// reference position, session, fusion filter, dead reckoning.
pub struct PositioningContext {
    cfg: Config,
    preprocessor: MeasurementPreprocessor,
    anti_spoof: AtomicBool,
    reference: RwLock<Option<ReferencePosition>>,
    session: Mutex<Session>,
    fusion: Mutex<SensorFusionKalmanFilter>,
    dead_reckoning: Mutex<DeadReckoning>,
    latest: Mutex<EpochSolution>,
}

impl Default for PositioningContext {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

impl PositioningContext {
    /// Creates a new [PositioningContext] from this [Config]
    pub fn new(cfg: Config) -> Self {
        let session = Session {
            smoother: cfg.preprocessing.code_smoothing.map(CodeSmoother::new),
            ..Default::default()
        };

        Self {
            preprocessor: MeasurementPreprocessor::new(cfg.preprocessing.clone()),
            anti_spoof: AtomicBool::new(cfg.spoofing.enabled),
            reference: RwLock::new(None),
            session: Mutex::new(session),
            fusion: Mutex::new(SensorFusionKalmanFilter::new(&cfg.fusion)),
            dead_reckoning: Mutex::new(DeadReckoning::new(cfg.fusion.imu_warmup_samples)),
            latest: Mutex::new(EpochSolution::invalid()),
            cfg,
        }
    }

    /// [Config] this [PositioningContext] was built with
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Defines the [ReferencePosition] from fixed point coordinates
    /// (1E-7 degrees, 1E-7 meters).
    pub fn set_reference_position(&self, lat_e7: i64, long_e7: i64, alt_e7: i64) {
        self.set_reference(ReferencePosition::from_e7(lat_e7, long_e7, alt_e7));
    }

    /// Defines the [ReferencePosition]
    pub fn set_reference(&self, reference: ReferencePosition) {
        let (lat, lon, alt) = reference.position.lat_long_alt_deg_deg_m();
        info!("reference position: {:.7}°, {:.7}°, {:.3} m", lat, lon, alt);
        *write(&self.reference) = Some(reference);
    }

    /// Forgets the [ReferencePosition]: reference residuals are no longer evaluated.
    pub fn clear_reference_position(&self) {
        info!("reference position cleared");
        *write(&self.reference) = None;
    }

    /// Current [ReferencePosition], if any
    pub fn reference_position(&self) -> Option<ReferencePosition> {
        *read(&self.reference)
    }

    /// Turns satellite exclusion based on reference residuals on or off
    pub fn set_anti_spoof_enabled(&self, enabled: bool) {
        info!("anti-spoofing {}", if enabled { "enabled" } else { "disabled" });
        self.anti_spoof.store(enabled, Ordering::SeqCst);
    }

    pub fn anti_spoof_enabled(&self) -> bool {
        self.anti_spoof.load(Ordering::SeqCst)
    }

    /// Solution of the latest epoch, NaN filled if it was skipped.
    pub fn latest_solution(&self) -> EpochSolution {
        lock(&self.latest).clone()
    }

    /// Latest converged [ReceiverState]
    pub fn receiver_state(&self) -> ReceiverState {
        lock(&self.session).state
    }

    /// Number of converged epochs so far
    pub fn converged_epochs(&self) -> u32 {
        lock(&self.session).converged_epochs
    }

    /// Fused (or dead reckoned) position and velocity
    pub fn fused_state(&self) -> FusedState {
        FusedState::from_dead_reckoning(&lock(&self.dead_reckoning))
    }

    /// Fusion filter state and error covariance
    pub fn fusion_state(&self) -> FusionState {
        lock(&self.fusion).state()
    }

    /// Integrates one [ImuSample] into the dead reckoning accumulators.
    pub fn process_imu(&self, sample: &ImuSample) -> Result<(), Error> {
        lock(&self.dead_reckoning).integrate(sample)
    }

    /// Processes one [RawBatch]: preprocessing, then [Self::process_pseudoranges].
    pub fn process_epoch<E: EphemerisProvider>(
        &self,
        batch: &RawBatch,
        ephemeris: &E,
    ) -> Result<EpochSolution, Error> {
        match self.preprocessor.filter(batch) {
            Ok(set) => self.process_pseudoranges(set, ephemeris),
            Err(e) => {
                error!("preprocessing failed: {}", e);
                *lock(&self.latest) = EpochSolution::invalid();
                Err(e)
            },
        }
    }

    /// Resolves one epoch from this [PseudorangeSet].
    ///
    /// On failure, the session is left untouched and the latest solution
    /// is NaN filled: the next epoch is processed independently.
    pub fn process_pseudoranges<E: EphemerisProvider>(
        &self,
        set: PseudorangeSet,
        ephemeris: &E,
    ) -> Result<EpochSolution, Error> {
        let time = set.time;

        let result = self.resolve(set, ephemeris);

        match &result {
            Ok(solution) => {
                *lock(&self.latest) = solution.clone();
            },
            Err(e) => {
                if e.is_epoch_skip() {
                    warn!("{} - epoch skipped: {}", time, e);
                } else {
                    error!("{} - epoch failed: {}", time, e);
                }
                *lock(&self.latest) = EpochSolution::invalid().with_time(time);
            },
        }

        result
    }

    fn resolve<E: EphemerisProvider>(
        &self,
        mut set: PseudorangeSet,
        ephemeris: &E,
    ) -> Result<EpochSolution, Error> {
        let time = set.time;
        let reference = self.reference_position();

        let mut session = lock(&self.session);

        let mut smoother = session.smoother.clone();
        if let Some(smoother) = smoother.as_mut() {
            smoother.smooth(&mut set);
        }

        let atmosphere = Atmosphere::new(
            self.cfg.modeling,
            ephemeris.klobuchar(),
            session.geoid_height_m,
            time,
        );

        let mut spoofing = self.cfg.spoofing.clone();
        spoofing.enabled = self.anti_spoof_enabled();

        let filter = SpoofingResidualFilter::new(&spoofing, &self.cfg.modeling);
        let armed = filter.armed(session.converged_epochs);

        let report = reference.as_ref().map(|reference| {
            filter.evaluate_with_atmosphere(
                &set,
                ephemeris,
                reference,
                session.state.clock_bias_m,
                &atmosphere,
                armed,
            )
        });

        if let Some(report) = &report {
            filter.apply(&mut set, report);
        }

        let solver = WeightedLeastSquaresSolver::new(&self.cfg.solver, &self.cfg.modeling);
        let solution =
            solver.solve_with_atmosphere(&set, ephemeris, &session.state, &atmosphere)?;

        let (lat, lon, alt) = solution.position.lat_long_alt_deg_deg_m();
        debug!(
            "{} - fix {:.7}°, {:.7}°, {:.3} m ({} satellites)",
            time,
            lat,
            lon,
            alt,
            solution.residuals.len()
        );

        if self.cfg.fusion.enabled {
            let velocity_enu = solution.position.enu_rotation() * solution.state.velocity_ecef_m_s;

            let mut fusion = lock(&self.fusion);
            let mut dr = lock(&self.dead_reckoning);

            fusion.update(
                &solution.position,
                &velocity_enu,
                reference.as_ref().map(|r| &r.position),
                &mut dr,
            )?;
        }

        // commit
        session.state = solution.state;
        session.smoother = smoother;
        session.converged_epochs = session.converged_epochs.saturating_add(1);

        if session.geoid_height_m.is_none() {
            let geoid = alt - self.cfg.modeling.elevation_above_sea_level_m;
            info!("{} - geoid height latched: {:.3} m", time, geoid);
            session.geoid_height_m = Some(geoid);
        }

        let surveyed = match (reference, self.cfg.spoofing.reference_survey_epochs) {
            (None, Some(epochs)) => {
                session.survey.add(&solution.state.position_ecef_m);
                if session.survey.count >= epochs {
                    let surveyed = ReferencePosition::surveyed(session.survey.mean);
                    session.survey.reset();
                    Some(surveyed)
                } else {
                    None
                }
            },
            _ => None,
        };

        drop(session);

        if let Some(surveyed) = surveyed {
            let mut reference = write(&self.reference);
            // an operator reference may have been defined meanwhile
            if reference.is_none() {
                let (lat, lon, alt) = surveyed.position.lat_long_alt_deg_deg_m();
                info!("{} - surveyed reference: {:.7}°, {:.7}°, {:.3} m", time, lat, lon, alt);
                *reference = Some(surveyed);
            }
        }

        let (reference_residuals_m, excluded) = match report {
            Some(report) => (
                report.residuals_m.to_array(f64::NAN, |res| *res),
                report.excluded,
            ),
            None => ([f64::NAN; MAX_PRN], Vec::new()),
        };

        Ok(EpochSolution::from_wls(
            time,
            &solution,
            reference_residuals_m,
            excluded,
            set.week_rollover_corrected,
        ))
    }
}
