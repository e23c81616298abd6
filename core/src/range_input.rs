use crate::catalog::Unit;
use crate::facets::Bounds;
use crate::format::format_unit;

/// Two-handle numeric range picker.
///
/// Every accepted edit returns the new interval right away; callers that need
/// to coalesce slider drags debounce the emitted values themselves (the
/// session does this with its 500ms window).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeInput {
    bounds: Bounds,
    value: Bounds,
    unit: Unit,
}

impl RangeInput {
    pub fn new(bounds: Bounds, value: Bounds, unit: Unit) -> Self {
        RangeInput { bounds, value: bounds.clamp_bounds(value), unit }
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn value(&self) -> Bounds {
        self.value
    }

    /// Move the lower handle. Rejected (returns `None`) when it would pass
    /// the upper handle.
    pub fn set_min(&mut self, min: i64) -> Option<Bounds> {
        let min = self.bounds.clamp(min);
        if min > self.value.max {
            return None;
        }
        self.value.min = min;
        Some(self.value)
    }

    /// Move the upper handle. Rejected when it would pass the lower handle.
    pub fn set_max(&mut self, max: i64) -> Option<Bounds> {
        let max = self.bounds.clamp(max);
        if max < self.value.min {
            return None;
        }
        self.value.max = max;
        Some(self.value)
    }

    /// Positions of both handles along the track, in percent.
    pub fn track_percentages(&self) -> (f64, f64) {
        let span = (self.bounds.max - self.bounds.min) as f64;
        if span <= 0.0 {
            return (0.0, 100.0);
        }
        let pct = |v: i64| (v - self.bounds.min) as f64 / span * 100.0;
        (pct(self.value.min), pct(self.value.max))
    }

    pub fn labels(&self) -> (String, String) {
        (format_unit(self.unit, self.value.min), format_unit(self.unit, self.value.max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input() -> RangeInput {
        RangeInput::new(Bounds { min: 0, max: 1000 }, Bounds { min: 200, max: 800 }, Unit::Dollar)
    }

    #[test]
    fn handles_cannot_cross() {
        let mut r = input();
        assert_eq!(r.set_min(900), None);
        assert_eq!(r.set_max(100), None);
        assert_eq!(r.value(), Bounds { min: 200, max: 800 });
        assert_eq!(r.set_min(800), Some(Bounds { min: 800, max: 800 }));
    }

    #[test]
    fn edits_are_clamped() {
        let mut r = input();
        assert_eq!(r.set_min(-50), Some(Bounds { min: 0, max: 800 }));
        assert_eq!(r.set_max(5000), Some(Bounds { min: 0, max: 1000 }));
    }

    #[test]
    fn percentages_and_labels() {
        let r = input();
        assert_eq!(r.track_percentages(), (20.0, 80.0));
        assert_eq!(r.labels(), ("$200".to_string(), "$800".to_string()));
        let flat = RangeInput::new(Bounds { min: 5, max: 5 }, Bounds { min: 5, max: 5 }, Unit::Dollar);
        assert_eq!(flat.track_percentages(), (0.0, 100.0));
    }
}
