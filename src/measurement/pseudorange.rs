use crate::{constants::MAX_PRN, error::Error, prelude::SV, time::GpsTime};

/// Per satellite storage, addressed by PRN (1..=32).
/// A satellite identity is stable whatever the number of satellites
/// present, which outlier and spoofing rejection rely on.
#[derive(Debug, Clone, PartialEq)]
pub struct SatelliteSlots<T> {
    slots: [Option<T>; MAX_PRN],
}

impl<T> Default for SatelliteSlots<T> {
    fn default() -> Self {
        Self {
            slots: std::array::from_fn(|_| None),
        }
    }
}

impl<T> SatelliteSlots<T> {
    /// Builds new empty [SatelliteSlots]
    pub fn new() -> Self {
        Self::default()
    }

    fn index(prn: u8) -> Result<usize, Error> {
        if prn == 0 || prn as usize > MAX_PRN {
            Err(Error::InvalidSatellite(prn))
        } else {
            Ok(prn as usize - 1)
        }
    }

    /// Stores value for this PRN, returning the previous value if any.
    pub fn insert(&mut self, prn: u8, value: T) -> Result<Option<T>, Error> {
        let index = Self::index(prn)?;
        Ok(self.slots[index].replace(value))
    }

    /// Releases the value stored for this PRN.
    pub fn remove(&mut self, prn: u8) -> Option<T> {
        let index = Self::index(prn).ok()?;
        self.slots[index].take()
    }

    pub fn get(&self, prn: u8) -> Option<&T> {
        let index = Self::index(prn).ok()?;
        self.slots[index].as_ref()
    }

    pub fn get_mut(&mut self, prn: u8) -> Option<&mut T> {
        let index = Self::index(prn).ok()?;
        self.slots[index].as_mut()
    }

    pub fn contains(&self, prn: u8) -> bool {
        self.get(prn).is_some()
    }

    /// Number of occupied slots
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates occupied slots in increasing PRN order
    pub fn iter(&self) -> impl Iterator<Item = (u8, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|value| ((i + 1) as u8, value)))
    }

    /// Mutable iteration over occupied slots, in increasing PRN order
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (u8, &mut T)> + '_ {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|value| ((i + 1) as u8, value)))
    }

    /// PRNs of occupied slots, in increasing order
    pub fn prns(&self) -> Vec<u8> {
        self.iter().map(|(prn, _)| prn).collect()
    }

    /// Only keeps slots for which the predicate holds
    pub fn retain<F: FnMut(u8, &T) -> bool>(&mut self, mut f: F) {
        for (i, slot) in self.slots.iter_mut().enumerate() {
            let keep = match slot {
                Some(value) => f((i + 1) as u8, value),
                None => true,
            };
            if !keep {
                *slot = None;
            }
        }
    }

    /// Converts to a dense per-PRN array, using `default` for empty slots.
    pub fn to_array<U: Copy, F: Fn(&T) -> U>(&self, default: U, f: F) -> [U; MAX_PRN] {
        let mut array = [default; MAX_PRN];
        for (i, slot) in self.slots.iter().enumerate() {
            if let Some(value) = slot {
                array[i] = f(value);
            }
        }
        array
    }
}

/// Pseudo range and pseudo range rate for one satellite
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PseudorangeMeasurement {
    /// Satellite
    pub sv: SV,
    /// Pseudo range (in meters)
    pub pseudorange_m: f64,
    /// Pseudo range uncertainty (1 sigma, in meters). Always positive.
    pub pseudorange_sigma_m: f64,
    /// Pseudo range rate (in m/s)
    pub pseudorange_rate_mps: f64,
    /// Pseudo range rate uncertainty (1 sigma, in m/s)
    pub pseudorange_rate_sigma_mps: f64,
    /// Carrier to noise density (in dB-Hz)
    pub cn0_dbhz: f64,
}

/// Pseudo ranges sampled at a common reception time
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PseudorangeSet {
    /// Receiver time at reception
    pub time: GpsTime,
    /// Per satellite measurements
    pub measurements: SatelliteSlots<PseudorangeMeasurement>,
    /// True if at least one satellite required a week rollover correction
    pub week_rollover_corrected: bool,
}

impl PseudorangeSet {
    /// Builds new empty [PseudorangeSet] at reception time
    pub fn new(time: GpsTime) -> Self {
        Self {
            time,
            measurements: SatelliteSlots::new(),
            week_rollover_corrected: false,
        }
    }

    /// Adds one [PseudorangeMeasurement], addressed by its PRN.
    pub fn with_measurement(mut self, m: PseudorangeMeasurement) -> Result<Self, Error> {
        self.measurements.insert(m.sv.prn, m)?;
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

#[cfg(test)]
mod test {
    use super::SatelliteSlots;
    use crate::error::Error;

    #[test]
    fn sparse_slots() {
        let mut slots = SatelliteSlots::<f64>::new();
        assert!(slots.is_empty());

        slots.insert(3, 3.0).unwrap();
        slots.insert(32, 32.0).unwrap();
        slots.insert(7, 7.0).unwrap();

        assert_eq!(slots.insert(0, 0.0), Err(Error::InvalidSatellite(0)));
        assert_eq!(slots.insert(33, 0.0), Err(Error::InvalidSatellite(33)));

        assert_eq!(slots.prns(), vec![3, 7, 32]);
        assert_eq!(slots.get(7), Some(&7.0));

        if let Some(value) = slots.get_mut(7) {
            *value = 70.0;
        }
        assert_eq!(slots.get(7), Some(&70.0));
        assert!(slots.get_mut(33).is_none());

        for (prn, value) in slots.iter_mut() {
            *value += prn as f64;
        }
        assert_eq!(slots.get(3), Some(&6.0));
        assert_eq!(slots.get(7), Some(&77.0));

        slots.retain(|prn, _| prn != 7);
        assert_eq!(slots.prns(), vec![3, 32]);
        assert_eq!(slots.remove(32), Some(32.0));
        assert_eq!(slots.len(), 1);

        let dense = slots.to_array(f64::NAN, |v| *v);
        assert_eq!(dense[2], 6.0);
        assert!(dense[31].is_nan());
    }
}
