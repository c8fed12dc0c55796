use log::{debug, warn};

use crate::{
    constants::SECONDS_IN_WEEK,
    measurement::{PseudorangeSet, SatelliteSlots},
    time::GpsTime,
};

/// Longest tolerated gap between two smoothed epochs (in seconds)
const MAX_GAP_S: f64 = 10.0;

#[derive(Debug, Clone, Copy)]
struct Hatch {
    /// Number of accumulated epochs
    n: usize,
    /// Smoothed pseudo range (in meters)
    smoothed_m: f64,
    /// Previous pseudo range rate (in m/s)
    rate_mps: f64,
}

impl Hatch {
    fn new(pseudorange_m: f64, rate_mps: f64) -> Self {
        Self {
            n: 1,
            smoothed_m: pseudorange_m,
            rate_mps,
        }
    }

    fn add(&mut self, window: usize, pseudorange_m: f64, rate_mps: f64, dt_s: f64) -> f64 {
        self.n += 1;

        let alpha = 1.0 / self.n.min(window) as f64;
        let propagated = self.smoothed_m + 0.5 * (self.rate_mps + rate_mps) * dt_s;

        self.smoothed_m = alpha * pseudorange_m + (1.0 - alpha) * propagated;
        self.rate_mps = rate_mps;
        self.smoothed_m
    }
}

/// Doppler aided code smoothing (Hatch filter), applied to consecutive
/// [PseudorangeSet]s. Each satellite restarts when it disappears from one epoch.
#[derive(Debug, Clone)]
pub struct CodeSmoother {
    window: usize,
    last_time: Option<GpsTime>,
    inner: SatelliteSlots<Hatch>,
}

impl CodeSmoother {
    /// Builds new [CodeSmoother] with given window length (in epochs)
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            last_time: None,
            inner: SatelliteSlots::new(),
        }
    }

    /// Restarts all satellites
    pub fn reset(&mut self) {
        self.last_time = None;
        self.inner = SatelliteSlots::new();
    }

    /// Smoothes the pseudo ranges of this [PseudorangeSet], in place.
    pub fn smooth(&mut self, set: &mut PseudorangeSet) {
        let dt_s = self.last_time.map(|last| {
            (set.time.week as f64 - last.week as f64) * SECONDS_IN_WEEK
                + set.time.tow_s
                - last.tow_s
        });

        let continuous = matches!(dt_s, Some(dt) if dt > 0.0 && dt <= MAX_GAP_S);

        if !continuous && self.last_time.is_some() {
            debug!("{} - code smoothing restarted", set.time);
            self.inner = SatelliteSlots::new();
        }

        self.inner.retain(|prn, _| set.measurements.contains(prn));
        self.last_time = Some(set.time);

        let dt_s = dt_s.unwrap_or_default();

        for (prn, m) in set.measurements.iter_mut() {
            match self.inner.get_mut(prn) {
                Some(hatch) => {
                    m.pseudorange_m =
                        hatch.add(self.window, m.pseudorange_m, m.pseudorange_rate_mps, dt_s);
                },
                None => {
                    let hatch = Hatch::new(m.pseudorange_m, m.pseudorange_rate_mps);
                    if let Err(e) = self.inner.insert(prn, hatch) {
                        warn!("{} - code smoothing: {}", set.time, e);
                    }
                },
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::CodeSmoother;
    use crate::{
        measurement::{PseudorangeMeasurement, PseudorangeSet},
        prelude::{Constellation, SV},
        time::GpsTime,
    };

    fn set(tow_s: f64, pseudorange_m: f64, rate_mps: f64) -> PseudorangeSet {
        PseudorangeSet::new(GpsTime::new(2300, tow_s))
            .with_measurement(PseudorangeMeasurement {
                sv: SV::new(Constellation::GPS, 5),
                pseudorange_m,
                pseudorange_sigma_m: 3.0,
                pseudorange_rate_mps: rate_mps,
                pseudorange_rate_sigma_mps: 0.1,
                cn0_dbhz: 40.0,
            })
            .unwrap()
    }

    #[test]
    fn hatch_filter() {
        let mut smoother = CodeSmoother::new(100);

        // range increases by 100 m/s, code noise alternates by +/- 10 m
        let mut last = 0.0;
        for k in 0..50 {
            let noise = if k % 2 == 0 { 10.0 } else { -10.0 };
            let truth = 20.0E6 + 100.0 * k as f64;

            let mut s = set(1000.0 + k as f64, truth + noise, 100.0);
            smoother.smooth(&mut s);

            last = s.measurements.get(5).unwrap().pseudorange_m - truth;
        }

        assert!(last.abs() < 1.0, "residual noise {}", last);

        // gap: restart
        let mut s = set(2000.0, 20.0E6 + 10.0, 100.0);
        smoother.smooth(&mut s);
        assert_eq!(s.measurements.get(5).unwrap().pseudorange_m, 20.0E6 + 10.0);
    }

    #[test]
    fn satellite_joining() {
        let mut smoother = CodeSmoother::new(10);

        let mut s = set(1000.0, 20.0E6, 0.0);
        smoother.smooth(&mut s);

        // G07 joins: starts from its raw pseudo range
        let mut s = set(1001.0, 20.0E6 + 10.0, 0.0)
            .with_measurement(PseudorangeMeasurement {
                sv: SV::new(Constellation::GPS, 7),
                pseudorange_m: 21.0E6,
                pseudorange_sigma_m: 3.0,
                pseudorange_rate_mps: 0.0,
                pseudorange_rate_sigma_mps: 0.1,
                cn0_dbhz: 40.0,
            })
            .unwrap();

        smoother.smooth(&mut s);

        assert_eq!(s.measurements.get(5).unwrap().pseudorange_m, 20.0E6 + 5.0);
        assert_eq!(s.measurements.get(7).unwrap().pseudorange_m, 21.0E6);

        // G07 is now smoothed as well
        let mut s = set(1002.0, 20.0E6, 0.0)
            .with_measurement(PseudorangeMeasurement {
                sv: SV::new(Constellation::GPS, 7),
                pseudorange_m: 21.0E6 + 10.0,
                pseudorange_sigma_m: 3.0,
                pseudorange_rate_mps: 0.0,
                pseudorange_rate_sigma_mps: 0.1,
                cn0_dbhz: 40.0,
            })
            .unwrap();

        smoother.smooth(&mut s);
        assert_eq!(s.measurements.get(7).unwrap().pseudorange_m, 21.0E6 + 5.0);
    }
}
