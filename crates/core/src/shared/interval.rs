/// A half-open span of time `[start, end)` in seconds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeInterval {
    pub start: f64,
    pub end: f64,
}

impl TimeInterval {
    pub fn new(start: f64, end: f64) -> Self {
        Self { start, end }
    }

    pub fn duration(&self) -> f64 {
        (self.end - self.start).max(0.0)
    }

    pub fn midpoint(&self) -> f64 {
        (self.start + self.end) / 2.0
    }

    /// True when `t` lies in `[start, end)`. Zero-length intervals contain nothing.
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t < self.end
    }

    /// Distance from `t` to the nearer boundary, or 0.0 when `t` is inside.
    pub fn distance_to(&self, t: f64) -> f64 {
        if self.contains(t) {
            0.0
        } else if t < self.start {
            self.start - t
        } else {
            t - self.end
        }
    }

    /// Length of the intersection with `other`; 0.0 when disjoint.
    pub fn overlap(&self, other: &TimeInterval) -> f64 {
        let lo = self.start.max(other.start);
        let hi = self.end.min(other.end);
        (hi - lo).max(0.0)
    }

    pub fn is_finite(&self) -> bool {
        self.start.is_finite() && self.end.is_finite()
    }
}
