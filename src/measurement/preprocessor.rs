use log::debug;

use crate::{
    cfg::PreprocessingOpts,
    constants::{
        CHIP_DURATION_S, COHERENT_INTEGRATION_S, CORRELATOR_SPACING_CHIPS, HALF_WEEK_SECONDS,
        MAX_ROLLOVER_DRIFT_S, SECONDS_IN_WEEK, SPEED_OF_LIGHT_M_S, WEEK_NANOS,
    },
    error::Error,
    measurement::{PseudorangeMeasurement, PseudorangeSet, RawBatch, RawMeasurement},
    prelude::{Constellation, SV},
    time::{rollover_weeks, GpsTime},
};

/// Validates raw measurements and forms pseudo ranges at a common reception time.
/// [MeasurementPreprocessor] is stateless: the same batch always
/// results in the same [PseudorangeSet].
#[derive(Debug, Clone, Default)]
pub struct MeasurementPreprocessor {
    opts: PreprocessingOpts,
}

/// Pseudo range uncertainty (in meters) of a code tracking loop,
/// for given C/N0 (in dB-Hz).
pub(crate) fn pseudorange_sigma_m(cn0_dbhz: f64) -> f64 {
    let cn0_linear = 10.0_f64.powf(cn0_dbhz / 10.0);
    SPEED_OF_LIGHT_M_S
        * CHIP_DURATION_S
        * (CORRELATOR_SPACING_CHIPS / (4.0 * COHERENT_INTEGRATION_S * cn0_linear)).sqrt()
}

impl MeasurementPreprocessor {
    /// Builds new [MeasurementPreprocessor]
    pub fn new(opts: PreprocessingOpts) -> Self {
        Self { opts }
    }

    fn is_valid(&self, m: &RawMeasurement) -> bool {
        if !m.is_gps() {
            debug!("svid #{} (constellation {}) - not supported", m.svid, m.constellation);
            return false;
        }

        if !m.is_tow_decoded() {
            debug!("G{:02} - tow not decoded (state=0x{:x})", m.svid, m.state);
            return false;
        }

        if m.received_sv_time_uncertainty_nanos > self.opts.max_tow_uncertainty_ns {
            debug!(
                "G{:02} - time uncertainty too large ({} ns)",
                m.svid, m.received_sv_time_uncertainty_nanos
            );
            return false;
        }

        if m.pseudorange_rate_uncertainty_mps > self.opts.max_prr_uncertainty_mps {
            debug!(
                "G{:02} - rate uncertainty too large ({} m/s)",
                m.svid, m.pseudorange_rate_uncertainty_mps
            );
            return false;
        }

        if let Some(min_cn0) = self.opts.min_cn0_dbhz {
            if m.cn0_dbhz < min_cn0 {
                debug!("G{:02} - weak signal ({:.1} dB-Hz)", m.svid, m.cn0_dbhz);
                return false;
            }
        }

        true
    }

    /// Transmission time (in nanoseconds) of this measurement, expressed in the
    /// receiver week. Returns true when a week rollover had to be canceled.
    fn transmission_nanos(
        &self,
        m: &RawMeasurement,
        t_rx_nanos: i64,
        bias_nanos: f64,
    ) -> Result<(i64, bool), Error> {
        let t_rx_s = (t_rx_nanos as f64 - m.time_offset_nanos - bias_nanos) * 1.0E-9;
        let t_tx_s = m.received_sv_time_nanos as f64 * 1.0E-9;
        let dt_s = t_rx_s - t_tx_s;

        if dt_s.abs() <= HALF_WEEK_SECONDS {
            return Ok((m.received_sv_time_nanos, false));
        }

        let weeks = rollover_weeks(dt_s);
        let drift_s = dt_s - weeks as f64 * SECONDS_IN_WEEK;

        if drift_s.abs() > MAX_ROLLOVER_DRIFT_S {
            return Err(Error::TimeBase(drift_s));
        }

        debug!("G{:02} - week rollover corrected ({} week)", m.svid, weeks);
        Ok((m.received_sv_time_nanos + weeks * WEEK_NANOS, true))
    }

    /// Filters this [RawBatch] and forms one [PseudorangeMeasurement] per valid satellite.
    /// The satellite with the latest transmission time serves as common reference,
    /// its travel time being assumed.
    pub fn filter(&self, batch: &RawBatch) -> Result<PseudorangeSet, Error> {
        if !batch.clock.has_gps_time() {
            return Err(Error::InvalidReceiverClock);
        }

        let gps_nanos = batch.clock.gps_nanos();
        let time = GpsTime::from_gps_nanos(gps_nanos);
        let t_rx_nanos = gps_nanos.rem_euclid(WEEK_NANOS);

        let mut rollover = false;
        let mut valid = Vec::with_capacity(batch.measurements.len());

        for m in batch.measurements.iter().filter(|m| self.is_valid(m)) {
            let (tx_nanos, corrected) =
                self.transmission_nanos(m, t_rx_nanos, batch.clock.bias_nanos)?;
            rollover |= corrected;
            valid.push((m, tx_nanos));
        }

        let mut set = PseudorangeSet::new(time);
        set.week_rollover_corrected = rollover;

        let max_tx_nanos = match valid.iter().map(|(_, tx)| *tx).max() {
            Some(max) => max,
            None => return Ok(set),
        };

        for (m, tx_nanos) in valid {
            let travel_s =
                self.opts.reference_travel_time_s + (max_tx_nanos - tx_nanos) as f64 * 1.0E-9;

            let sigma = pseudorange_sigma_m(m.cn0_dbhz);
            if !(sigma.is_finite() && sigma > 0.0) {
                debug!("G{:02} - invalid uncertainty", m.svid);
                continue;
            }

            let sv = SV::new(Constellation::GPS, m.svid);

            set.measurements.insert(
                m.svid,
                PseudorangeMeasurement {
                    sv,
                    pseudorange_m: travel_s * SPEED_OF_LIGHT_M_S,
                    pseudorange_sigma_m: sigma,
                    pseudorange_rate_mps: m.pseudorange_rate_mps,
                    pseudorange_rate_sigma_mps: m.pseudorange_rate_uncertainty_mps,
                    cn0_dbhz: m.cn0_dbhz,
                },
            )?;
        }

        debug!(
            "week {} tow {:.3} - {} valid pseudo ranges",
            time.week,
            time.tow_s,
            set.len()
        );

        Ok(set)
    }
}

#[cfg(test)]
mod test {
    use super::pseudorange_sigma_m;

    #[test]
    fn cn0_sigma() {
        // 40 dB-Hz: ~3.35 m
        let sigma = pseudorange_sigma_m(40.0);
        assert!((sigma - 3.3518).abs() < 1.0E-3, "{}", sigma);
        // stronger signal, smaller uncertainty
        assert!(pseudorange_sigma_m(45.0) < sigma);
    }
}
