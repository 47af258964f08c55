//! Delay ranges, distributions, and per-event delay computation.

use crate::event::EventCategory;
use rand::Rng;

/// Cap on truncated-normal redraws before falling back to the clamped mean.
///
/// A mean/std configuration that puts almost no probability mass inside the
/// range would otherwise spin forever in the rejection loop.
const MAX_REDRAWS: u32 = 4096;

/// An inclusive-min delay interval in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayRange {
    /// Minimum delay in milliseconds.
    pub min: u64,
    /// Maximum delay in milliseconds.
    pub max: u64,
}

impl DelayRange {
    /// Build a range, clamping `max` up to `min` if needed.
    pub fn new(min: u64, max: u64) -> Self {
        Self {
            min,
            max: max.max(min),
        }
    }

    /// True when the range pins the delay to a single constant.
    pub fn is_constant(&self) -> bool {
        self.min == self.max
    }
}

/// How per-event delays are drawn from a range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Distribution {
    /// Uniform draw over `[min, max)`.
    Uniform,
    /// Normal draw around `mean`/`std_dev`, redrawn until inside `[min, max]`.
    TruncatedNormal { mean: f64, std_dev: f64 },
}

/// The live delay configuration.
///
/// Replaced wholesale by the control channel; never mutated in place.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayConfig {
    /// Delay range for key and button events.
    pub click: DelayRange,
    /// Delay range for relative-motion events.
    pub motion: DelayRange,
    /// Sampling distribution, shared by both ranges.
    pub distribution: Distribution,
}

impl DelayConfig {
    /// Delay range for an event category, if the category has one.
    pub fn range_for(&self, category: EventCategory) -> Option<DelayRange> {
        match category {
            EventCategory::Key => Some(self.click),
            EventCategory::Motion => Some(self.motion),
            EventCategory::Other => None,
        }
    }

    /// Copy of this config with both ranges replaced and the distribution kept.
    pub fn with_ranges(&self, click: DelayRange, motion: DelayRange) -> Self {
        Self {
            click,
            motion,
            distribution: self.distribution,
        }
    }
}

/// Compute the delay for one event of the given category.
///
/// A category with no configured range (anything that is not a key or
/// relative-motion event) gets zero delay. Using the same value for min and
/// max disables jitter and returns that constant.
pub fn compute_delay<R: Rng + ?Sized>(
    category: EventCategory,
    config: &DelayConfig,
    rng: &mut R,
) -> u64 {
    let Some(range) = config.range_for(category) else {
        return 0;
    };

    if range.is_constant() {
        return range.min;
    }

    match config.distribution {
        Distribution::Uniform => rng.gen_range(range.min..range.max),
        Distribution::TruncatedNormal { mean, std_dev } => {
            truncated_normal(range, mean, std_dev, rng)
        }
    }
}

/// Draw from a normal distribution, rejecting samples outside the range.
///
/// Redraws are capped; on exhaustion the mean clamped into the range is
/// returned so the call terminates for any finite mean/std.
fn truncated_normal<R: Rng + ?Sized>(
    range: DelayRange,
    mean: f64,
    std_dev: f64,
    rng: &mut R,
) -> u64 {
    for _ in 0..MAX_REDRAWS {
        let sample = polar_normal(mean, std_dev, rng).round();
        if sample >= range.min as f64 && sample <= range.max as f64 {
            return sample as u64;
        }
    }

    log::debug!(
        "truncated normal (mean {mean}, std {std_dev}) exhausted redraws for [{}, {}], using clamped mean",
        range.min,
        range.max
    );
    (mean.round() as i64).clamp(range.min as i64, range.max as i64) as u64
}

/// One normally distributed sample via the polar (Marsaglia) transform.
fn polar_normal<R: Rng + ?Sized>(mean: f64, std_dev: f64, rng: &mut R) -> f64 {
    loop {
        let u1: f64 = rng.gen_range(-1.0..1.0);
        let u2: f64 = rng.gen_range(-1.0..1.0);
        let w = u1 * u1 + u2 * u2;
        if w >= 1.0 || w == 0.0 {
            continue;
        }
        let mult = (-2.0 * w.ln() / w).sqrt();
        return mean + std_dev * u1 * mult;
    }
}
