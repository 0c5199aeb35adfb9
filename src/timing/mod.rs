//! Duration normalization
//!
//! The duration model leaves a seconds value in each segment's `d`
//! attribute. Normalization rewrites it as rounded milliseconds and adds the
//! cumulative end time in seconds as `end`. The work is split in three steps
//! so the arithmetic can be tested without a tree:
//!
//! 1. [`DurationNormalizer::read_durations`] parses the seconds values
//! 2. [`compute_timings`] derives [`SegmentTiming`] records
//! 3. [`materialize`] writes the records back onto the segments

use crate::markup::{MarkupTree, NodeId, ATTR_DURATION, ATTR_DURATION_UNIT, ATTR_END};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Value of the unit tag on normalized segments
pub const UNIT_MILLISECONDS: &str = "ms";

/// Tie-break policy when converting seconds to whole milliseconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RoundingMode {
    /// 0.5 ms -> 1 ms, 2.5 ms -> 3 ms
    #[default]
    HalfAwayFromZero,
    /// 0.5 ms -> 0 ms, 2.5 ms -> 2 ms
    HalfToEven,
}

impl RoundingMode {
    pub fn round(self, value: f64) -> f64 {
        match self {
            RoundingMode::HalfAwayFromZero => value.round(),
            RoundingMode::HalfToEven => {
                if (value - value.trunc()).abs() == 0.5 {
                    2.0 * (value / 2.0).round()
                } else {
                    value.round()
                }
            }
        }
    }
}

/// Timing of one segment after normalization
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SegmentTiming {
    /// Predicted duration in seconds
    pub seconds: f64,
    /// Duration rounded to whole milliseconds
    pub duration_ms: u64,
    /// Cumulative end time in seconds
    pub end_seconds: f64,
}

impl SegmentTiming {
    /// `d` attribute text
    pub fn duration_text(&self) -> String {
        format!("{:.0}", self.duration_ms as f64)
    }

    /// `end` attribute text: shortest round-trip form at single precision
    pub fn end_text(&self) -> String {
        format!("{:?}", self.end_seconds as f32)
    }
}

/// Seconds to milliseconds, snapped to whole microseconds so decimal ties
/// such as 0.5005 s reach the tie-break as exactly 500.5 ms
fn to_milliseconds(seconds: f64) -> f64 {
    (seconds * 1e6).round() / 1e3
}

/// Derive cumulative timings from per-segment durations in seconds
pub fn compute_timings(seconds: &[f64], rounding: RoundingMode) -> Vec<SegmentTiming> {
    let mut cumulative = 0.0f64;
    seconds
        .iter()
        .map(|&s| {
            cumulative += s;
            SegmentTiming {
                seconds: s,
                duration_ms: rounding.round(to_milliseconds(s)) as u64,
                end_seconds: cumulative,
            }
        })
        .collect()
}

/// Write timings onto their segments, tagging each as normalized
pub fn materialize(tree: &mut MarkupTree, segments: &[NodeId], timings: &[SegmentTiming]) {
    debug_assert_eq!(segments.len(), timings.len());
    for (&segment, timing) in segments.iter().zip(timings) {
        tree.set_attribute(segment, ATTR_END, timing.end_text());
        tree.set_attribute(segment, ATTR_DURATION, timing.duration_text());
        tree.set_attribute(segment, ATTR_DURATION_UNIT, UNIT_MILLISECONDS);
    }
}

/// Converts seconds-valued segment durations to the millisecond form
#[derive(Debug, Clone, Copy, Default)]
pub struct DurationNormalizer {
    rounding: RoundingMode,
}

impl DurationNormalizer {
    pub fn new(rounding: RoundingMode) -> Self {
        Self { rounding }
    }

    pub fn rounding(&self) -> RoundingMode {
        self.rounding
    }

    /// Parse the seconds value of every segment.
    ///
    /// Fails on segments that were already normalized and on missing,
    /// non-numeric, negative or non-finite durations.
    pub fn read_durations(&self, tree: &MarkupTree, segments: &[NodeId]) -> Result<Vec<f64>> {
        segments
            .iter()
            .map(|&segment| {
                if tree.attribute(segment, ATTR_DURATION_UNIT) == Some(UNIT_MILLISECONDS) {
                    return Err(Error::AlreadyNormalized(segment.index()));
                }

                let invalid = |message: String| Error::InvalidAttribute {
                    node: segment.index(),
                    attribute: ATTR_DURATION.to_string(),
                    message,
                };

                let text = tree
                    .attribute(segment, ATTR_DURATION)
                    .ok_or_else(|| invalid("missing duration".into()))?;
                let seconds: f64 = text
                    .trim()
                    .parse()
                    .map_err(|_| invalid(format!("'{}' is not a number", text)))?;
                if !seconds.is_finite() || seconds < 0.0 {
                    return Err(invalid(format!("'{}' is not a valid duration", text)));
                }
                Ok(seconds)
            })
            .collect()
    }

    /// Normalize all segments in place and return their timings
    pub fn normalize(
        &self,
        tree: &mut MarkupTree,
        segments: &[NodeId],
    ) -> Result<Vec<SegmentTiming>> {
        let seconds = self.read_durations(tree, segments)?;
        let timings = compute_timings(&seconds, self.rounding);
        materialize(tree, segments, &timings);

        if let Some(last) = timings.last() {
            log::debug!(
                "Normalized {} segment durations, total {:.3}s",
                timings.len(),
                last.end_seconds
            );
        }
        Ok(timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::NodeKind;

    fn tree_with_durations(durations: &[&str]) -> (MarkupTree, Vec<NodeId>) {
        let mut tree = MarkupTree::document("en");
        let root = tree.root();
        let syl = tree.append(root, NodeKind::Syllable);
        let segments = durations
            .iter()
            .map(|d| {
                let ph = tree.append(syl, NodeKind::Phone);
                tree.set_attribute(ph, ATTR_DURATION, *d);
                ph
            })
            .collect();
        (tree, segments)
    }

    #[test]
    fn test_rounding_half_away_from_zero() {
        let mode = RoundingMode::HalfAwayFromZero;
        assert_eq!(mode.round(0.5), 1.0);
        assert_eq!(mode.round(1.5), 2.0);
        assert_eq!(mode.round(2.5), 3.0);
        assert_eq!(mode.round(123.4), 123.0);
    }

    #[test]
    fn test_rounding_half_to_even() {
        let mode = RoundingMode::HalfToEven;
        assert_eq!(mode.round(0.5), 0.0);
        assert_eq!(mode.round(1.5), 2.0);
        assert_eq!(mode.round(2.5), 2.0);
        assert_eq!(mode.round(2.6), 3.0);
    }

    #[test]
    fn test_millisecond_ties() {
        let seconds = [0.0005, 0.0015, 0.0025, 0.1234];

        let up: Vec<u64> = compute_timings(&seconds, RoundingMode::HalfAwayFromZero)
            .iter()
            .map(|t| t.duration_ms)
            .collect();
        assert_eq!(up, vec![1, 2, 3, 123]);

        let even: Vec<u64> = compute_timings(&seconds, RoundingMode::HalfToEven)
            .iter()
            .map(|t| t.duration_ms)
            .collect();
        assert_eq!(even, vec![0, 2, 2, 123]);
    }

    #[test]
    fn test_decimal_ties_follow_rounding_mode() {
        for k in 0..1000u64 {
            let text = format!("0.{:03}5", k);
            let seconds: f64 = text.parse().unwrap();

            let up = compute_timings(&[seconds], RoundingMode::HalfAwayFromZero)[0].duration_ms;
            assert_eq!(up, k + 1, "{} half away from zero", text);

            let even = compute_timings(&[seconds], RoundingMode::HalfToEven)[0].duration_ms;
            let expected = if k % 2 == 0 { k } else { k + 1 };
            assert_eq!(even, expected, "{} half to even", text);
        }
    }

    #[test]
    fn test_cumulative_end_is_monotonic() {
        let seconds: Vec<f64> = (0..200).map(|i| ((i * 37) % 11) as f64 * 0.013).collect();
        let timings = compute_timings(&seconds, RoundingMode::default());

        for pair in timings.windows(2) {
            assert!(pair[1].end_seconds >= pair[0].end_seconds);
        }
        let total: f64 = seconds.iter().sum();
        let last = timings.last().unwrap();
        assert!((last.end_seconds - total).abs() < 1e-9);
        let rendered: f64 = last.end_text().parse().unwrap();
        assert!((rendered - total).abs() < 1e-4);
    }

    #[test]
    fn test_attribute_text() {
        let timings = compute_timings(&[0.05, 0.12], RoundingMode::default());
        assert_eq!(timings[0].duration_text(), "50");
        assert_eq!(timings[0].end_text(), "0.05");
        assert_eq!(timings[1].duration_text(), "120");
        assert_eq!(timings[1].end_text(), "0.17");
    }

    #[test]
    fn test_normalize_rewrites_in_place() {
        let (mut tree, segments) = tree_with_durations(&["0.05", "0.12"]);
        let normalizer = DurationNormalizer::default();
        let timings = normalizer.normalize(&mut tree, &segments).unwrap();

        assert_eq!(timings.len(), 2);
        assert_eq!(tree.attribute(segments[0], ATTR_DURATION), Some("50"));
        assert_eq!(tree.attribute(segments[0], ATTR_END), Some("0.05"));
        assert_eq!(tree.attribute(segments[1], ATTR_DURATION), Some("120"));
        assert_eq!(tree.attribute(segments[1], ATTR_END), Some("0.17"));
    }

    #[test]
    fn test_normalize_twice_is_rejected() {
        let (mut tree, segments) = tree_with_durations(&["0.05"]);
        let normalizer = DurationNormalizer::default();
        normalizer.normalize(&mut tree, &segments).unwrap();

        let err = normalizer.normalize(&mut tree, &segments).unwrap_err();
        assert!(matches!(err, Error::AlreadyNormalized(_)));
        assert_eq!(tree.attribute(segments[0], ATTR_DURATION), Some("50"));
    }

    #[test]
    fn test_bad_duration_is_fatal() {
        for bad in ["fast", "-0.1", "NaN", "inf"] {
            let (mut tree, segments) = tree_with_durations(&["0.05", bad]);
            let err = DurationNormalizer::default()
                .normalize(&mut tree, &segments)
                .unwrap_err();
            assert!(matches!(err, Error::InvalidAttribute { .. }), "{}", bad);
            // nothing is written when any segment is bad
            assert_eq!(tree.attribute(segments[0], ATTR_DURATION), Some("0.05"));
        }
    }

    #[test]
    fn test_missing_duration_is_fatal() {
        let mut tree = MarkupTree::document("en");
        let root = tree.root();
        let ph = tree.append(root, NodeKind::Phone);
        let err = DurationNormalizer::default()
            .normalize(&mut tree, &[ph])
            .unwrap_err();
        assert!(matches!(err, Error::InvalidAttribute { .. }));
    }

    #[test]
    fn test_empty_segments() {
        let mut tree = MarkupTree::document("en");
        let timings = DurationNormalizer::default().normalize(&mut tree, &[]).unwrap();
        assert!(timings.is_empty());
    }
}
