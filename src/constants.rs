/// Speed of light in m.s⁻¹
pub const SPEED_OF_LIGHT_M_S: f64 = 299_792_458.0;

/// Number of seconds in one GPS week
pub const SECONDS_IN_WEEK: f64 = 604_800.0;

/// Half a GPS week in seconds, the week rollover detection limit
pub const HALF_WEEK_SECONDS: f64 = SECONDS_IN_WEEK / 2.0;

/// Number of nanoseconds in one GPS week
pub const WEEK_NANOS: i64 = 604_800 * 1_000_000_000;

/// Highest GPS PRN we address
pub const MAX_PRN: usize = 32;

/// Raw measurement state bit: code lock
pub const STATE_CODE_LOCK: u32 = 0x1;

/// Raw measurement state bit: time of week decoded
pub const STATE_TOW_DECODED: u32 = 0x8;

/// Raw measurement constellation code for GPS
pub const CONSTELLATION_GPS: u8 = 1;

/// Maximal residual drift tolerated after a week rollover correction (s)
pub const MAX_ROLLOVER_DRIFT_S: f64 = 10.0;

/// GPS C/A chip duration (s)
pub const CHIP_DURATION_S: f64 = 1.0E-6;

/// Early/late correlator spacing (chips)
pub const CORRELATOR_SPACING_CHIPS: f64 = 0.1;

/// Coherent integration period (s)
pub const COHERENT_INTEGRATION_S: f64 = 0.020;
