use crate::{
    bias::KbModel,
    constants::SPEED_OF_LIGHT_M_S,
    prelude::{Vector3, SV},
    time::GpsTime,
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Satellite state at transmission time
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SatelliteState {
    /// Antenna phase center position, ECEF (in meters)
    pub position_ecef_m: Vector3<f64>,
    /// Velocity, ECEF (in m/s)
    pub velocity_ecef_m_s: Vector3<f64>,
    /// Onboard clock offset to GPS time, expressed in meters of range.
    pub clock_correction_m: f64,
    /// Onboard clock drift, expressed in m/s. Zero when unknown.
    pub clock_drift_m_s: f64,
}

impl SatelliteState {
    /// Builds new [SatelliteState]
    pub fn new(position_ecef_m: Vector3<f64>, velocity_ecef_m_s: Vector3<f64>) -> Self {
        Self {
            position_ecef_m,
            velocity_ecef_m_s,
            clock_correction_m: 0.0,
            clock_drift_m_s: 0.0,
        }
    }

    /// Copies and returns [SatelliteState] with onboard clock offset (in meters)
    pub fn with_clock_correction_m(mut self, clock_correction_m: f64) -> Self {
        self.clock_correction_m = clock_correction_m;
        self
    }

    /// Copies and returns [SatelliteState] with onboard clock drift (in m/s)
    pub fn with_clock_drift_m_s(mut self, clock_drift_m_s: f64) -> Self {
        self.clock_drift_m_s = clock_drift_m_s;
        self
    }
}

/// Any ephemeris source should implement the [EphemerisProvider] trait
/// to contribute to the solving process. Orbit propagation and navigation message
/// decoding happen behind this interface.
///
/// Requests are synchronous: any ephemeris download must be resolved (or fail)
/// before the measurements are handed to the solver.
pub trait EphemerisProvider {
    /// Provide [SatelliteState] for this GPS satellite (PRN) at transmission time,
    /// expressed as time of week (in seconds) and week number.
    ///
    /// Return None when no ephemeris is known for this satellite:
    /// it will simply not contribute to this epoch.
    fn lookup(&self, prn: u8, tow_s: f64, week: u32) -> Option<SatelliteState>;

    /// Provide the broadcast Klobuchar coefficients, if known.
    /// Ionospheric delay is not compensated otherwise.
    fn klobuchar(&self) -> Option<KbModel> {
        None
    }
}

/// Resolves the satellite state at transmission time, for given reception time,
/// receiver clock bias (in meters) and pseudo range (in meters).
///
/// The transmission time is first corrected for travel time, then for
/// onboard clock offset, satellite state being re-evaluated at that instant.
pub(crate) fn resolve<E: EphemerisProvider>(
    ephemeris: &E,
    sv: SV,
    reception: GpsTime,
    clock_bias_m: f64,
    pseudorange_m: f64,
    sv_clock_bias: bool,
) -> Option<SatelliteState> {
    let rx = reception.shifted(-clock_bias_m / SPEED_OF_LIGHT_M_S);
    let tx = rx.shifted(-pseudorange_m / SPEED_OF_LIGHT_M_S);

    let transmission = if sv_clock_bias {
        let uncorrected = ephemeris.lookup(sv.prn, tx.tow_s, tx.week)?;
        tx.shifted(uncorrected.clock_correction_m / SPEED_OF_LIGHT_M_S)
    } else {
        tx
    };

    let mut state = ephemeris.lookup(sv.prn, transmission.tow_s, transmission.week)?;

    if !sv_clock_bias {
        state.clock_correction_m = 0.0;
        state.clock_drift_m_s = 0.0;
    }

    Some(state)
}
