//! Per-syllable traversal outcomes

use crate::markup::NodeId;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Positional F0 anchors of one well-formed syllable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnchorSet {
    /// First voiced phone
    pub first_voiced: NodeId,
    /// First phone that is both voiced and a vowel
    pub first_vowel: NodeId,
    /// Last voiced phone
    pub last_voiced: NodeId,
}

/// Why a syllable contributed no anchors
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "kebab-case")]
pub enum SkipReason {
    /// No feature set could be resolved for the syllable's locale
    FeatureSetUnavailable(String),
    /// No voiced phone at all
    NoVoicedPhone,
    /// Voiced phones but none of them a vowel
    NoVowel,
}

impl SkipReason {
    /// Short stable label, used as aggregation key
    pub fn label(&self) -> &'static str {
        match self {
            SkipReason::FeatureSetUnavailable(_) => "feature-set-unavailable",
            SkipReason::NoVoicedPhone => "no-voiced-phone",
            SkipReason::NoVowel => "no-vowel",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::FeatureSetUnavailable(e) => write!(f, "feature set unavailable ({})", e),
            SkipReason::NoVoicedPhone => f.write_str("no voiced phone"),
            SkipReason::NoVowel => f.write_str("no voiced vowel"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SyllableOutcome {
    Anchored { syllable: NodeId, anchors: AnchorSet },
    Skipped { syllable: NodeId, reason: SkipReason },
}

impl SyllableOutcome {
    pub fn syllable(&self) -> NodeId {
        match self {
            SyllableOutcome::Anchored { syllable, .. }
            | SyllableOutcome::Skipped { syllable, .. } => *syllable,
        }
    }

    pub fn is_anchored(&self) -> bool {
        matches!(self, SyllableOutcome::Anchored { .. })
    }
}

/// Phone whose symbol the feature set does not know; it counts as unvoiced
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnknownPhone {
    pub syllable: NodeId,
    pub phone: NodeId,
    pub symbol: String,
}

/// Aggregated outcome of one traversal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TraversalReport {
    syllables: Vec<SyllableOutcome>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    unknown_phones: Vec<UnknownPhone>,
    boundaries: usize,
}

impl TraversalReport {
    pub(crate) fn push(&mut self, outcome: SyllableOutcome) {
        self.syllables.push(outcome);
    }

    pub(crate) fn push_boundary(&mut self) {
        self.boundaries += 1;
    }

    pub(crate) fn push_unknown_phone(&mut self, unknown: UnknownPhone) {
        self.unknown_phones.push(unknown);
    }

    /// Phones with unknown symbols, in document order
    pub fn unknown_phones(&self) -> &[UnknownPhone] {
        &self.unknown_phones
    }

    /// Outcomes in syllable document order
    pub fn outcomes(&self) -> &[SyllableOutcome] {
        &self.syllables
    }

    pub fn syllable_count(&self) -> usize {
        self.syllables.len()
    }

    pub fn boundary_count(&self) -> usize {
        self.boundaries
    }

    pub fn anchored_count(&self) -> usize {
        self.syllables.iter().filter(|o| o.is_anchored()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.syllable_count() - self.anchored_count()
    }

    /// Skipped syllables with their reasons
    pub fn skipped(&self) -> impl Iterator<Item = (NodeId, &SkipReason)> + '_ {
        self.syllables.iter().filter_map(|outcome| match outcome {
            SyllableOutcome::Skipped { syllable, reason } => Some((*syllable, reason)),
            SyllableOutcome::Anchored { .. } => None,
        })
    }

    /// Number of skipped syllables per reason label
    pub fn skip_counts(&self) -> BTreeMap<&'static str, usize> {
        let mut counts = BTreeMap::new();
        for (_, reason) in self.skipped() {
            *counts.entry(reason.label()).or_insert(0) += 1;
        }
        counts
    }
}
