//! Rule-based acoustic models
//!
//! Lightweight stand-ins for trained duration, F0 and boundary models.
//! They make a voice usable without model files and give the pipeline a
//! predictable reference behaviour.

use super::{Model, ModelInput};
use crate::markup::{
    MarkupTree, NodeId, ATTR_BOUNDARY_DURATION, ATTR_BREAKINDEX, ATTR_DURATION, ATTR_F0,
    ATTR_PHONE,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

fn element_targets<'a>(
    model: &str,
    input: ModelInput<'a>,
) -> Result<(&'a [NodeId], Option<&'a [NodeId]>)> {
    match input {
        ModelInput::Elements { target, context } => Ok((target, context)),
        ModelInput::Document => Err(Error::model(
            model,
            "element model cannot be applied to the whole document",
        )),
    }
}

/// Per-phone duration table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DurationRules {
    /// Duration for phones not in the table, seconds
    pub default_seconds: f64,
    /// Durations by phone symbol, seconds
    #[serde(default)]
    pub phones: HashMap<String, f64>,
}

impl Default for DurationRules {
    fn default() -> Self {
        Self {
            default_seconds: 0.08,
            phones: HashMap::new(),
        }
    }
}

/// Duration model writing a seconds value into each segment's `d`
#[derive(Debug, Clone)]
pub struct PhoneDurationModel {
    rules: DurationRules,
}

impl PhoneDurationModel {
    pub fn new(rules: DurationRules) -> Result<Self> {
        let invalid = |v: f64| !v.is_finite() || v < 0.0;
        if invalid(rules.default_seconds) || rules.phones.values().any(|&v| invalid(v)) {
            return Err(Error::Config(
                "Phone durations must be finite and non-negative".into(),
            ));
        }
        Ok(Self { rules })
    }

    pub fn seconds_for(&self, symbol: &str) -> f64 {
        self.rules
            .phones
            .get(symbol)
            .copied()
            .unwrap_or(self.rules.default_seconds)
    }
}

impl Model for PhoneDurationModel {
    fn apply(&self, tree: &mut MarkupTree, input: ModelInput<'_>) -> Result<()> {
        let (segments, _) = element_targets("duration", input)?;
        for &segment in segments {
            let seconds = self.seconds_for(tree.attribute(segment, ATTR_PHONE).unwrap_or_default());
            tree.set_attribute(segment, ATTR_DURATION, seconds.to_string());
        }
        Ok(())
    }
}

/// F0 contour parameters shared by the left/mid/right models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct F0Rules {
    /// Mid-syllable F0 at the start of the utterance, Hz
    pub start_hz: f64,
    /// Mid-syllable F0 at the end of the utterance, Hz
    pub end_hz: f64,
    /// Offset of the syllable-initial target relative to the mid target
    #[serde(default)]
    pub left_offset_hz: f64,
    /// Offset of the syllable-final target relative to the mid target
    #[serde(default)]
    pub right_offset_hz: f64,
}

impl Default for F0Rules {
    fn default() -> Self {
        Self {
            start_hz: 130.0,
            end_hz: 95.0,
            left_offset_hz: -8.0,
            right_offset_hz: -12.0,
        }
    }
}

impl F0Rules {
    pub fn left(&self) -> F0TargetModel {
        F0TargetModel::new(
            "leftF0",
            0,
            self.start_hz + self.left_offset_hz,
            self.end_hz + self.left_offset_hz,
        )
    }

    pub fn mid(&self) -> F0TargetModel {
        F0TargetModel::new("midF0", 50, self.start_hz, self.end_hz)
    }

    pub fn right(&self) -> F0TargetModel {
        F0TargetModel::new(
            "rightF0",
            100,
            self.start_hz + self.right_offset_hz,
            self.end_hz + self.right_offset_hz,
        )
    }
}

/// Declining F0 target placed at a fixed percentage of each target segment.
///
/// Targets are appended to the segment's `f0` attribute as `(position,hz)`
/// pairs, so a segment that serves as several anchors collects all of them.
#[derive(Debug, Clone)]
pub struct F0TargetModel {
    name: &'static str,
    position: u8,
    start_hz: f64,
    end_hz: f64,
}

impl F0TargetModel {
    pub fn new(name: &'static str, position: u8, start_hz: f64, end_hz: f64) -> Self {
        Self {
            name,
            position: position.min(100),
            start_hz,
            end_hz,
        }
    }

    /// Target frequency for the i-th of n targets
    pub fn hz_at(&self, index: usize, count: usize) -> f64 {
        if count <= 1 {
            return self.start_hz;
        }
        let progress = index as f64 / (count - 1) as f64;
        self.start_hz + (self.end_hz - self.start_hz) * progress
    }
}

impl Model for F0TargetModel {
    fn apply(&self, tree: &mut MarkupTree, input: ModelInput<'_>) -> Result<()> {
        let (targets, context) = element_targets(self.name, input)?;
        if let Some(context) = context {
            if context.len() != targets.len() {
                return Err(Error::model(
                    self.name,
                    format!(
                        "{} targets but {} context elements",
                        targets.len(),
                        context.len()
                    ),
                ));
            }
        }

        for (i, &segment) in targets.iter().enumerate() {
            let pair = format!("({},{:.0})", self.position, self.hz_at(i, targets.len()));
            let value = match tree.attribute(segment, ATTR_F0) {
                Some(existing) if !existing.is_empty() => format!("{} {}", existing, pair),
                _ => pair,
            };
            tree.set_attribute(segment, ATTR_F0, value);
        }
        Ok(())
    }
}

/// Pause durations by break index
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundaryRules {
    /// Pause for break indices not in the table, milliseconds
    pub default_ms: u32,
    #[serde(default)]
    pub by_breakindex: BTreeMap<u8, u32>,
}

impl Default for BoundaryRules {
    fn default() -> Self {
        Self {
            default_ms: 0,
            by_breakindex: [(3, 100), (4, 200), (5, 400), (6, 400)].into_iter().collect(),
        }
    }
}

/// Boundary model writing pause durations
#[derive(Debug, Clone)]
pub struct BreakDurationModel {
    rules: BoundaryRules,
}

impl BreakDurationModel {
    pub fn new(rules: BoundaryRules) -> Self {
        Self { rules }
    }

    pub fn pause_ms(&self, breakindex: Option<u8>) -> u32 {
        breakindex
            .and_then(|bi| self.rules.by_breakindex.get(&bi).copied())
            .unwrap_or(self.rules.default_ms)
    }
}

impl Model for BreakDurationModel {
    fn apply(&self, tree: &mut MarkupTree, input: ModelInput<'_>) -> Result<()> {
        let (boundaries, _) = element_targets("boundary", input)?;
        for &boundary in boundaries {
            let breakindex = match tree.attribute(boundary, ATTR_BREAKINDEX) {
                Some(text) => Some(text.trim().parse::<u8>().map_err(|_| Error::InvalidAttribute {
                    node: boundary.index(),
                    attribute: ATTR_BREAKINDEX.to_string(),
                    message: format!("'{}' is not a break index", text),
                })?),
                None => None,
            };
            tree.set_attribute(
                boundary,
                ATTR_BOUNDARY_DURATION,
                self.pause_ms(breakindex).to_string(),
            );
        }
        Ok(())
    }
}
