use crate::prelude::Vector3;

/// Running mean of ECEF coordinates, used to survey the reference position.
#[derive(Debug, Clone, Default)]
pub(crate) struct Averager {
    pub mean: Vector3<f64>,
    pub count: usize,
}

impl Averager {
    /// Builds new [Averager]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push new coordinates into [Averager]
    pub fn add(&mut self, x: &Vector3<f64>) {
        self.count += 1;
        let k = self.count as f64;
        self.mean = x / k + self.mean * (k - 1.0) / k;
    }

    /// Reset [Averager]
    pub fn reset(&mut self) {
        self.count = 0;
        self.mean = Vector3::zeros();
    }
}

#[cfg(test)]
mod test {
    use super::Averager;
    use crate::prelude::Vector3;

    #[test]
    fn test_averager() {
        let mut avg = Averager::new();

        for (x_i, mean) in [
            (Vector3::new(1.0, 2.0, 4.0), Vector3::new(1.0, 2.0, 4.0)),
            (Vector3::new(0.5, 4.0, -4.0), Vector3::new(0.75, 3.0, 0.0)),
        ] {
            avg.add(&x_i);
            assert_eq!(avg.mean, mean);
        }

        assert_eq!(avg.count, 2);
        avg.reset();
        assert_eq!(avg.count, 0);
    }
}
