use crate::{
    constants::{SECONDS_IN_WEEK, WEEK_NANOS},
    prelude::{Epoch, TimeScale},
};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// GPS time expressed as week counter and time of week
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GpsTime {
    /// GPS week counter (continuous, no 1024 rollover)
    pub week: u32,
    /// Time of week in seconds
    pub tow_s: f64,
}

impl GpsTime {
    /// Builds new [GpsTime]
    pub fn new(week: u32, tow_s: f64) -> Self {
        Self { week, tow_s }.normalized()
    }

    /// Builds [GpsTime] from a total number of nanoseconds elapsed since the GPS origin.
    pub fn from_gps_nanos(nanos: i64) -> Self {
        let week = nanos.div_euclid(WEEK_NANOS);
        let tow_ns = nanos.rem_euclid(WEEK_NANOS);
        Self {
            week: week.max(0) as u32,
            tow_s: tow_ns as f64 * 1.0E-9,
        }
    }

    /// Shifts this [GpsTime] by given amount of seconds, handling week rollover.
    pub fn shifted(&self, dt_s: f64) -> Self {
        Self {
            week: self.week,
            tow_s: self.tow_s + dt_s,
        }
        .normalized()
    }

    /// Returns this [GpsTime] as [Epoch] in [TimeScale::GPST]
    pub fn to_epoch(&self) -> Epoch {
        let nanos = (self.tow_s * 1.0E9).round().max(0.0) as u64;
        Epoch::from_time_of_week(self.week, nanos, TimeScale::GPST)
    }

    /// Returns day of year, starting at 1 on January 1st.
    pub fn day_of_year(&self) -> u16 {
        self.to_epoch().day_of_year().floor() as u16 + 1
    }

    fn normalized(mut self) -> Self {
        while self.tow_s < 0.0 && self.week > 0 {
            self.tow_s += SECONDS_IN_WEEK;
            self.week -= 1;
        }
        while self.tow_s >= SECONDS_IN_WEEK {
            self.tow_s -= SECONDS_IN_WEEK;
            self.week += 1;
        }
        self
    }
}

impl std::fmt::Display for GpsTime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}:{:.3}", self.week, self.tow_s)
    }
}

/// Number of whole weeks to remove from a reception/transmission time difference (in seconds),
/// to cancel a week rollover between both instants.
pub(crate) fn rollover_weeks(dt_s: f64) -> i64 {
    (dt_s / SECONDS_IN_WEEK).round() as i64
}
