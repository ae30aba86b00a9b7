/// Incremental running mean, used for the per-point territory accumulators.
#[derive(Clone, Debug, Default)]
pub struct Statistics {
    count: u64,
    mean: f32,
}

impl Statistics {
    pub fn new() -> Self {
        Statistics::default()
    }

    pub fn add(&mut self, value: f32) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f32;
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn is_defined(&self) -> bool {
        self.count > 0
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.mean = 0.0;
    }

    /// Folds another accumulator into this one, weighting both means by
    /// their sample counts.
    pub fn merge(&mut self, other: &Statistics) {
        if other.count == 0 {
            return;
        }
        let total = self.count + other.count;
        self.mean = (self.mean * self.count as f32 + other.mean * other.count as f32)
            / total as f32;
        self.count = total;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_mean() {
        let mut s = Statistics::new();
        assert!(!s.is_defined());
        s.add(1.0);
        s.add(0.0);
        s.add(0.5);
        assert_eq!(s.count(), 3);
        assert!((s.mean() - 0.5).abs() < 1e-6);
        s.clear();
        assert_eq!(s.count(), 0);
        assert_eq!(s.mean(), 0.0);
    }

    #[test]
    fn test_merge_weights_by_count() {
        let mut a = Statistics::new();
        a.add(1.0);
        a.add(1.0);
        a.add(1.0);
        let mut b = Statistics::new();
        b.add(0.0);
        a.merge(&b);
        assert_eq!(a.count(), 4);
        assert!((a.mean() - 0.75).abs() < 1e-6);
        // Merging an empty accumulator changes nothing.
        a.merge(&Statistics::new());
        assert_eq!(a.count(), 4);
    }
}
