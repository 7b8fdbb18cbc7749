use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyState {
    pub count_a: u64,
    pub count_b: u64,
}

/// Running up/down count across every frame of a session.
///
/// Both counters start at 1 so the split is defined before anything is seen.
/// Owned by the render context; not shared.
#[derive(Debug, Clone)]
pub struct Tally {
    label_a: String,
    label_b: String,
    state: TallyState,
}

impl Default for Tally {
    fn default() -> Self {
        Self::new()
    }
}

impl Tally {
    pub fn new() -> Self {
        Self::with_labels("up", "down")
    }

    pub fn with_labels(label_a: impl Into<String>, label_b: impl Into<String>) -> Self {
        Self {
            label_a: label_a.into(),
            label_b: label_b.into(),
            state: TallyState { count_a: 1, count_b: 1 },
        }
    }

    /// Count one detection. Labels outside the pair are ignored.
    pub fn observe(&mut self, label: &str) -> bool {
        if label == self.label_a {
            self.state.count_a += 1;
            true
        } else if label == self.label_b {
            self.state.count_b += 1;
            true
        } else {
            false
        }
    }

    pub fn percentages(&self) -> (f64, f64) {
        let a = self.state.count_a as f64;
        let b = self.state.count_b as f64;
        let total = a + b;
        (a / total, b / total)
    }

    /// Split a bar of `total_width` into the two proportional segments.
    pub fn bar_widths(&self, total_width: f64) -> (f64, f64) {
        let (pa, _) = self.percentages();
        let a = total_width * pa;
        (a, total_width - a)
    }

    pub fn state(&self) -> TallyState {
        self.state
    }

    pub fn labels(&self) -> (&str, &str) {
        (&self.label_a, &self.label_b)
    }
}
