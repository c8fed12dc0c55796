use crate::{error::Error, prelude::Vector3};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One inertial sample, already expressed in the local ENU frame.
#[derive(Debug, Default, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ImuSample {
    /// Sampling instant (in seconds, any monotonic origin)
    pub timestamp_s: f64,
    /// Velocity increment over the sampling period (in m/s)
    pub delta_velocity_m_s: Vector3<f64>,
    /// Sampling period (in seconds)
    pub delta_time_s: f64,
}

impl ImuSample {
    /// Builds [ImuSample] from linear acceleration (in m/s²) held over `dt_s`.
    pub fn from_acceleration(timestamp_s: f64, acceleration_m_s2: Vector3<f64>, dt_s: f64) -> Self {
        Self {
            timestamp_s,
            delta_velocity_m_s: acceleration_m_s2 * dt_s,
            delta_time_s: dt_s,
        }
    }
}

/// Dead reckoning accumulators, in the local ENU frame
#[derive(Debug, Clone, PartialEq)]
pub struct DeadReckoning {
    /// ENU position (in meters)
    pub position_m: Vector3<f64>,
    /// ENU velocity (in m/s)
    pub velocity_m_s: Vector3<f64>,
    warmup: usize,
    samples: usize,
    last_timestamp_s: Option<f64>,
}

impl DeadReckoning {
    /// Builds new [DeadReckoning], ignoring the first `warmup` samples.
    pub fn new(warmup: usize) -> Self {
        Self {
            position_m: Vector3::zeros(),
            velocity_m_s: Vector3::zeros(),
            warmup,
            samples: 0,
            last_timestamp_s: None,
        }
    }

    /// Integrates one [ImuSample]. Samples must be strictly chronological.
    pub fn integrate(&mut self, sample: &ImuSample) -> Result<(), Error> {
        if let Some(last) = self.last_timestamp_s {
            if sample.timestamp_s <= last {
                return Err(Error::ImuOutOfOrder);
            }
        }

        self.last_timestamp_s = Some(sample.timestamp_s);
        self.samples += 1;

        if self.samples <= self.warmup {
            return Ok(());
        }

        self.velocity_m_s += sample.delta_velocity_m_s;
        self.position_m += self.velocity_m_s * sample.delta_time_s;
        Ok(())
    }

    /// Resets both accumulators to zero, the sample ordering being preserved.
    pub fn reset(&mut self) {
        self.position_m = Vector3::zeros();
        self.velocity_m_s = Vector3::zeros();
    }
}

#[cfg(test)]
mod test {
    use super::{DeadReckoning, ImuSample};
    use crate::{error::Error, prelude::Vector3};

    #[test]
    fn warmup_and_integration() {
        let mut dr = DeadReckoning::new(2);
        let accel = Vector3::new(1.0, 0.0, 0.0);

        for i in 0..12 {
            let sample = ImuSample::from_acceleration(i as f64 * 0.1, accel, 0.1);
            dr.integrate(&sample).unwrap();
        }

        // 10 effective samples: v = 1 m/s, p = sum(0.1 * k * 0.1)
        assert!((dr.velocity_m_s[0] - 1.0).abs() < 1.0E-9);
        assert!((dr.position_m[0] - 0.55).abs() < 1.0E-9);
        assert_eq!(dr.position_m[1], 0.0);
    }

    #[test]
    fn chronological_order() {
        let mut dr = DeadReckoning::new(0);
        dr.integrate(&ImuSample::from_acceleration(1.0, Vector3::zeros(), 0.1))
            .unwrap();
        assert_eq!(
            dr.integrate(&ImuSample::from_acceleration(1.0, Vector3::zeros(), 0.1)),
            Err(Error::ImuOutOfOrder)
        );
    }
}
