use itertools::Itertools;
use log::{debug, warn};

use crate::{
    bias::Atmosphere,
    cfg::{Modeling, SpoofingOpts},
    ephemeris::{resolve, EphemerisProvider},
    measurement::{PseudorangeSet, SatelliteSlots},
    navigation::residuals::predict,
    position::ReferencePosition,
};

/// Reference residuals evaluated for one epoch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpoofingReport {
    /// Measured minus predicted pseudo range (in meters), the prediction being
    /// evaluated at the reference position.
    pub residuals_m: SatelliteSlots<f64>,
    /// Satellites excluded from this epoch
    pub excluded: Vec<u8>,
}

/// Compares each pseudo range to the range predicted from a trusted
/// [ReferencePosition]. The receiver clock offset is the one shared by the largest
/// group of satellites, the latest clock estimate arbitrating between groups of equal
/// size. Satellites that disagree with it are excluded from the epoch.
pub struct SpoofingResidualFilter<'a> {
    opts: &'a SpoofingOpts,
    modeling: &'a Modeling,
}

impl<'a> SpoofingResidualFilter<'a> {
    pub fn new(opts: &'a SpoofingOpts, modeling: &'a Modeling) -> Self {
        Self { opts, modeling }
    }

    /// True once exclusion may happen, given the number of converged epochs so far
    pub fn armed(&self, converged_epochs: u32) -> bool {
        self.opts.enabled && converged_epochs >= self.opts.warmup_epochs
    }

    /// Evaluates reference residuals for this [PseudorangeSet], `clock_bias_m` being the
    /// latest receiver clock estimate (in meters). Atmospheric delays are evaluated at the
    /// reference position, using the broadcast Klobuchar model when available and
    /// the latched geoid height (if any).
    pub fn evaluate<E: EphemerisProvider>(
        &self,
        set: &PseudorangeSet,
        ephemeris: &E,
        reference: &ReferencePosition,
        clock_bias_m: f64,
        geoid_height_m: Option<f64>,
        armed: bool,
    ) -> SpoofingReport {
        let atmosphere = Atmosphere::new(
            *self.modeling,
            ephemeris.klobuchar(),
            geoid_height_m,
            set.time,
        );
        self.evaluate_with_atmosphere(set, ephemeris, reference, clock_bias_m, &atmosphere, armed)
    }

    /// Evaluates reference residuals. `clock_bias_m` resolves the transmission times
    /// and arbitrates between groups of satellites that agree on a clock offset.
    /// Satellites without ephemeris are simply not evaluated.
    pub(crate) fn evaluate_with_atmosphere<E: EphemerisProvider>(
        &self,
        set: &PseudorangeSet,
        ephemeris: &E,
        reference: &ReferencePosition,
        clock_bias_m: f64,
        atmosphere: &Atmosphere,
        armed: bool,
    ) -> SpoofingReport {
        let mut report = SpoofingReport::default();
        let reference_ecef = reference.ecef();

        let mut differences = Vec::with_capacity(set.len());

        for (prn, m) in set.measurements.iter() {
            let satellite = match resolve(
                ephemeris,
                m.sv,
                set.time,
                clock_bias_m,
                m.pseudorange_m,
                self.modeling.sv_clock_bias,
            ) {
                Some(satellite) => satellite,
                None => continue,
            };

            let (iono_m, tropo_m) = if self.modeling.atmosphere() {
                atmosphere.delays_m(&reference.position, &satellite.position_ecef_m)
            } else {
                (0.0, 0.0)
            };

            let difference = predict(&reference_ecef, &satellite, 0.0, iono_m, tropo_m)
                .residual_m(m.pseudorange_m);

            differences.push((prn, difference));
        }

        let candidates = differences.iter().map(|(_, diff)| *diff).collect::<Vec<_>>();

        let clock_m =
            match consensus_offset(&candidates, self.opts.residual_limit_m, clock_bias_m) {
                Some(clock_m) => clock_m,
                None => return report,
            };

        debug!("{} - reference clock offset {:.3} m", set.time, clock_m);

        for (prn, difference) in differences {
            let residual = difference - clock_m;

            debug!("{} (G{:02}) - reference residual {:.3} m", set.time, prn, residual);

            if armed && residual.abs() > self.opts.residual_limit_m {
                warn!(
                    "{} (G{:02}) - excluded: {:.3} m reference residual",
                    set.time, prn, residual
                );
                report.excluded.push(prn);
            }

            if let Err(e) = report.residuals_m.insert(prn, residual) {
                warn!("{} - {}", set.time, e);
            }
        }

        report
    }

    /// Removes the excluded satellites from this [PseudorangeSet]
    pub fn apply(&self, set: &mut PseudorangeSet, report: &SpoofingReport) {
        for prn in report.excluded.iter() {
            set.measurements.remove(*prn);
        }
    }
}

/// Receiver clock offset (in meters) shared by the largest group of reference
/// differences. Each difference is a candidate offset, supported by every difference
/// lying within `limit_m` of it. Equal support goes to the candidate closest to `prior_m`.
/// The offset is the median of the winning group.
fn consensus_offset(differences: &[f64], limit_m: f64, prior_m: f64) -> Option<f64> {
    let (_, support) = differences
        .iter()
        .map(|candidate| {
            let support = differences
                .iter()
                .copied()
                .filter(|diff| (diff - candidate).abs() <= limit_m)
                .collect::<Vec<_>>();
            (*candidate, support)
        })
        .max_by(|(a, a_support), (b, b_support)| {
            a_support
                .len()
                .cmp(&b_support.len())
                .then_with(|| (b - prior_m).abs().total_cmp(&(a - prior_m).abs()))
        })?;

    median(support.into_iter())
}

fn median<I: Iterator<Item = f64>>(values: I) -> Option<f64> {
    let sorted = values.sorted_by(|a, b| a.total_cmp(b)).collect::<Vec<_>>();
    let n = sorted.len();
    match n {
        0 => None,
        _ if n % 2 == 1 => Some(sorted[n / 2]),
        _ => Some((sorted[n / 2 - 1] + sorted[n / 2]) / 2.0),
    }
}
