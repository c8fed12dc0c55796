//! Raw receiver measurements and their conversion to pseudo ranges.
use crate::constants::{CONSTELLATION_GPS, MAX_PRN, STATE_CODE_LOCK, STATE_TOW_DECODED};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

mod preprocessor;
mod pseudorange;

pub use preprocessor::MeasurementPreprocessor;
pub use pseudorange::{PseudorangeMeasurement, PseudorangeSet, SatelliteSlots};

/// Receiver clock snapshot, captured along one batch of [RawMeasurement]s.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReceiverClock {
    /// Receiver hardware clock (in nanoseconds)
    pub time_nanos: i64,
    /// Difference between hardware clock and GPS time since January 6th 1980
    /// (in nanoseconds). Negative when GPS time is known.
    pub full_bias_nanos: i64,
    /// Sub-nanosecond part of the clock bias (in nanoseconds)
    pub bias_nanos: f64,
    /// Clock drift (in nanoseconds per second)
    pub drift_nanos_per_second: f64,
    /// Hardware clock discontinuity counter
    pub hw_clock_discontinuity_count: u32,
}

impl ReceiverClock {
    /// True when this clock carries GPS time
    pub fn has_gps_time(&self) -> bool {
        self.full_bias_nanos < 0
    }

    /// Total number of nanoseconds since the GPS origin, at capture time.
    pub(crate) fn gps_nanos(&self) -> i64 {
        self.time_nanos - self.full_bias_nanos
    }
}

/// One measurement, as reported by the GNSS receiver for one satellite.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawMeasurement {
    /// Satellite identifier (PRN for GPS)
    pub svid: u8,
    /// Constellation code (1 = GPS)
    pub constellation: u8,
    /// Carrier to noise density (in dB-Hz)
    pub cn0_dbhz: f64,
    /// Tracking state bitmask
    pub state: u32,
    /// Measurement time offset with respect to [ReceiverClock::time_nanos]
    pub time_offset_nanos: f64,
    /// Received satellite time of week (in nanoseconds)
    pub received_sv_time_nanos: i64,
    /// Received satellite time uncertainty (1 sigma, in nanoseconds)
    pub received_sv_time_uncertainty_nanos: f64,
    /// Pseudo range rate (in m/s)
    pub pseudorange_rate_mps: f64,
    /// Pseudo range rate uncertainty (1 sigma, in m/s)
    pub pseudorange_rate_uncertainty_mps: f64,
    /// Accumulated delta range (in meters)
    pub accumulated_delta_range_m: f64,
    /// Accumulated delta range state bitmask
    pub accumulated_delta_range_state: u32,
    /// Tracked carrier frequency (in Hz), when reported
    pub carrier_frequency_hz: Option<f64>,
}

impl RawMeasurement {
    /// True if this measurement comes from a GPS satellite we can address
    pub fn is_gps(&self) -> bool {
        self.constellation == CONSTELLATION_GPS && self.svid >= 1 && self.svid as usize <= MAX_PRN
    }

    /// True if both code lock and time of week are decoded
    pub fn is_tow_decoded(&self) -> bool {
        let mask = STATE_CODE_LOCK | STATE_TOW_DECODED;
        self.state & mask == mask
    }
}

/// Atomic batch of [RawMeasurement]s and [ReceiverClock] snapshot,
/// delivered once per epoch.
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawBatch {
    pub clock: ReceiverClock,
    pub measurements: Vec<RawMeasurement>,
}
