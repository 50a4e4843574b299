/// Shortest idle interval (seconds) between siblings that counts as missing
/// instrumentation.
pub const MIN_GAP_SECONDS: f64 = 0.1;

/// Slack for subtraction noise on decimal timestamps (`0.3 - 0.2 < 0.1`).
const GAP_EPSILON: f64 = 1e-9;

/// Decides whether a gap row goes in front of a span.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapPolicy {
    pub min_duration: f64,
    /// Set for traces from browser JavaScript SDKs.
    pub suppressed: bool,
}

impl GapPolicy {
    pub fn new(suppressed: bool) -> Self {
        Self {
            min_duration: MIN_GAP_SECONDS,
            suppressed,
        }
    }

    pub fn with_min_duration(mut self, min_duration: f64) -> Self {
        self.min_duration = min_duration;
        self
    }

    /// A gap exists when the previous sibling ended strictly before
    /// `current_start` and at least `min_duration` earlier.
    pub fn is_valid(&self, previous_sibling_end: Option<f64>, current_start: f64) -> bool {
        if self.suppressed {
            return false;
        }
        let Some(previous_end) = previous_sibling_end else {
            return false;
        };
        previous_end < current_start
            && current_start - previous_end + GAP_EPSILON >= self.min_duration
    }
}

impl Default for GapPolicy {
    fn default() -> Self {
        Self::new(false)
    }
}

/// [`GapPolicy::is_valid`] with the default threshold.
pub fn is_valid_gap(
    previous_sibling_end: Option<f64>,
    current_start: f64,
    suppress_gaps: bool,
) -> bool {
    GapPolicy::new(suppress_gaps).is_valid(previous_sibling_end, current_start)
}
