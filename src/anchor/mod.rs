//! F0 anchor extraction
//!
//! Walks the markup tree once in document order and sorts its elements into
//! the named collections the acoustic models are applied to:
//!
//! - `segments`: every phone
//! - `voicedSegments`: every voiced phone
//! - `firstVoicedSegments`, `firstVowels`, `lastVoicedSegments`: one entry
//!   per well-formed syllable, the positional F0 anchors of that syllable
//! - `boundaries`: every phrase boundary
//!
//! The three anchor collections are filled in lockstep, so index `i` of each
//! refers to the same syllable.

mod report;

pub use report::{AnchorSet, SkipReason, SyllableOutcome, TraversalReport, UnknownPhone};

use crate::markup::{MarkupTree, NodeId, NodeKind, ATTR_PHONE, ATTR_SYLLABLE_PH};
use crate::phonology::FeatureResolver;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Names of the element collections built by the extractor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CollectionName {
    Segments,
    VoicedSegments,
    FirstVoicedSegments,
    FirstVowels,
    LastVoicedSegments,
    Boundaries,
}

impl CollectionName {
    pub const ALL: [CollectionName; 6] = [
        CollectionName::Segments,
        CollectionName::VoicedSegments,
        CollectionName::FirstVoicedSegments,
        CollectionName::FirstVowels,
        CollectionName::LastVoicedSegments,
        CollectionName::Boundaries,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CollectionName::Segments => "segments",
            CollectionName::VoicedSegments => "voicedSegments",
            CollectionName::FirstVoicedSegments => "firstVoicedSegments",
            CollectionName::FirstVowels => "firstVowels",
            CollectionName::LastVoicedSegments => "lastVoicedSegments",
            CollectionName::Boundaries => "boundaries",
        }
    }
}

impl fmt::Display for CollectionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CollectionName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| Error::UnknownCollection(s.to_string()))
    }
}

/// Ordered element collections for one pipeline run.
///
/// Every collection is always present; a collection with nothing in it is
/// empty, never missing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementCollections {
    segments: Vec<NodeId>,
    voiced_segments: Vec<NodeId>,
    first_voiced_segments: Vec<NodeId>,
    first_vowels: Vec<NodeId>,
    last_voiced_segments: Vec<NodeId>,
    boundaries: Vec<NodeId>,
}

impl ElementCollections {
    pub fn get(&self, name: CollectionName) -> &[NodeId] {
        match name {
            CollectionName::Segments => &self.segments,
            CollectionName::VoicedSegments => &self.voiced_segments,
            CollectionName::FirstVoicedSegments => &self.first_voiced_segments,
            CollectionName::FirstVowels => &self.first_vowels,
            CollectionName::LastVoicedSegments => &self.last_voiced_segments,
            CollectionName::Boundaries => &self.boundaries,
        }
    }

    pub fn segments(&self) -> &[NodeId] {
        &self.segments
    }

    pub fn voiced_segments(&self) -> &[NodeId] {
        &self.voiced_segments
    }

    pub fn first_voiced_segments(&self) -> &[NodeId] {
        &self.first_voiced_segments
    }

    pub fn first_vowels(&self) -> &[NodeId] {
        &self.first_vowels
    }

    pub fn last_voiced_segments(&self) -> &[NodeId] {
        &self.last_voiced_segments
    }

    pub fn boundaries(&self) -> &[NodeId] {
        &self.boundaries
    }

    fn push_anchors(&mut self, anchors: &AnchorSet) {
        self.first_voiced_segments.push(anchors.first_voiced);
        self.first_vowels.push(anchors.first_vowel);
        self.last_voiced_segments.push(anchors.last_voiced);
    }
}

/// Result of one extraction pass
#[derive(Debug, Clone)]
pub struct AnchorExtraction {
    pub collections: ElementCollections,
    pub report: TraversalReport,
}

/// Single-pass anchor extractor over a markup tree
pub struct AnchorExtractor<'r> {
    resolver: &'r dyn FeatureResolver,
}

impl<'r> AnchorExtractor<'r> {
    pub fn new(resolver: &'r dyn FeatureResolver) -> Self {
        Self { resolver }
    }

    /// Build the element collections for `tree`.
    ///
    /// Malformed syllables never fail the pass: they are recorded in the
    /// report and left out of the three anchor collections only.
    pub fn extract(&self, tree: &MarkupTree) -> AnchorExtraction {
        let mut collections = ElementCollections::default();
        let mut report = TraversalReport::default();
        let kinds = [NodeKind::Syllable, NodeKind::Boundary];

        for node in tree.walk(&kinds) {
            if *tree.kind(node) == NodeKind::Boundary {
                collections.boundaries.push(node);
                report.push_boundary();
                continue;
            }

            let outcome = self.visit_syllable(tree, node, &mut collections, &mut report);
            match &outcome {
                SyllableOutcome::Anchored { anchors, .. } => collections.push_anchors(anchors),
                SyllableOutcome::Skipped { reason, .. } => {
                    log::warn!(
                        "Could not identify F0 anchors in malformed syllable {} '{}': {}",
                        node,
                        tree.attribute(node, ATTR_SYLLABLE_PH).unwrap_or_default(),
                        reason
                    );
                }
            }
            report.push(outcome);
        }

        log::debug!(
            "Extracted {} segments, {} voiced, {} anchored syllables, {} boundaries",
            collections.segments.len(),
            collections.voiced_segments.len(),
            collections.first_vowels.len(),
            collections.boundaries.len()
        );

        AnchorExtraction {
            collections,
            report,
        }
    }

    fn visit_syllable(
        &self,
        tree: &MarkupTree,
        syllable: NodeId,
        collections: &mut ElementCollections,
        report: &mut TraversalReport,
    ) -> SyllableOutcome {
        let (features, reason) = match self.resolver.resolve(tree, syllable) {
            Ok(features) => (Some(features), None),
            Err(e) => (None, Some(SkipReason::FeatureSetUnavailable(e.to_string()))),
        };

        let mut first_voiced = None;
        let mut first_vowel = None;
        let mut last_voiced = None;

        for phone in tree.descendants_of_kind(syllable, &NodeKind::Phone) {
            collections.segments.push(phone);

            let Some(features) = features else {
                continue;
            };
            let symbol = tree.attribute(phone, ATTR_PHONE).unwrap_or_default();
            let Some(class) = features.classify(symbol) else {
                log::warn!(
                    "Unknown phone '{}' in syllable {} treated as unvoiced ({})",
                    symbol,
                    syllable,
                    features.name()
                );
                report.push_unknown_phone(UnknownPhone {
                    syllable,
                    phone,
                    symbol: symbol.to_string(),
                });
                continue;
            };

            // only voiced phones can carry F0
            if class.voiced {
                collections.voiced_segments.push(phone);
                first_voiced.get_or_insert(phone);
                if first_vowel.is_none() && class.vowel {
                    first_vowel = Some(phone);
                }
                last_voiced = Some(phone);
            }
        }

        if let Some(reason) = reason {
            return SyllableOutcome::Skipped { syllable, reason };
        }

        match (first_voiced, first_vowel, last_voiced) {
            (Some(first_voiced), Some(first_vowel), Some(last_voiced)) => {
                SyllableOutcome::Anchored {
                    syllable,
                    anchors: AnchorSet {
                        first_voiced,
                        first_vowel,
                        last_voiced,
                    },
                }
            }
            (None, _, _) => SyllableOutcome::Skipped {
                syllable,
                reason: SkipReason::NoVoicedPhone,
            },
            _ => SyllableOutcome::Skipped {
                syllable,
                reason: SkipReason::NoVowel,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::NodeSpec;
    use crate::phonology::LocaleFeatureResolver;

    fn extract(spec: &NodeSpec) -> (MarkupTree, AnchorExtraction) {
        let resolver = LocaleFeatureResolver::with_builtin_sets();
        let tree = MarkupTree::from_spec(spec);
        let extraction = AnchorExtractor::new(&resolver).extract(&tree);
        (tree, extraction)
    }

    fn symbols(tree: &MarkupTree, ids: &[NodeId]) -> Vec<String> {
        ids.iter()
            .map(|&id| tree.attribute(id, ATTR_PHONE).unwrap_or_default().to_string())
            .collect()
    }

    #[test]
    fn test_collection_names_roundtrip() {
        for name in CollectionName::ALL {
            assert_eq!(name.as_str().parse::<CollectionName>().unwrap(), name);
        }
        assert!(matches!(
            "vowels".parse::<CollectionName>(),
            Err(Error::UnknownCollection(_))
        ));
    }

    #[test]
    fn test_single_syllable_anchors() {
        let spec = NodeSpec::document(
            "de",
            vec![NodeSpec::syllable(vec![NodeSpec::phone("k"), NodeSpec::phone("a")])],
        );
        let (tree, extraction) = extract(&spec);
        let c = &extraction.collections;

        assert_eq!(symbols(&tree, c.segments()), vec!["k", "a"]);
        assert_eq!(symbols(&tree, c.voiced_segments()), vec!["a"]);
        assert_eq!(symbols(&tree, c.first_voiced_segments()), vec!["a"]);
        assert_eq!(symbols(&tree, c.first_vowels()), vec!["a"]);
        assert_eq!(symbols(&tree, c.last_voiced_segments()), vec!["a"]);
        assert_eq!(extraction.report.anchored_count(), 1);
    }

    #[test]
    fn test_first_and_last_are_positional() {
        // m (voiced) a (vowel) n (voiced) t (unvoiced)
        let spec = NodeSpec::document(
            "de",
            vec![NodeSpec::syllable(vec![
                NodeSpec::phone("m"),
                NodeSpec::phone("a"),
                NodeSpec::phone("n"),
                NodeSpec::phone("t"),
            ])],
        );
        let (tree, extraction) = extract(&spec);
        let c = &extraction.collections;

        assert_eq!(symbols(&tree, c.first_voiced_segments()), vec!["m"]);
        assert_eq!(symbols(&tree, c.first_vowels()), vec!["a"]);
        assert_eq!(symbols(&tree, c.last_voiced_segments()), vec!["n"]);
        assert_eq!(symbols(&tree, c.voiced_segments()), vec!["m", "a", "n"]);
    }

    #[test]
    fn test_unvoiced_syllable_keeps_segments() {
        let spec = NodeSpec::document(
            "de",
            vec![
                NodeSpec::syllable(vec![NodeSpec::phone("p"), NodeSpec::phone("s")]),
                NodeSpec::syllable(vec![NodeSpec::phone("d"), NodeSpec::phone("u:")]),
            ],
        );
        let (tree, extraction) = extract(&spec);
        let c = &extraction.collections;

        assert_eq!(symbols(&tree, c.segments()), vec!["p", "s", "d", "u:"]);
        assert_eq!(c.first_vowels().len(), 1);
        assert_eq!(c.first_voiced_segments().len(), 1);
        assert_eq!(c.last_voiced_segments().len(), 1);
        assert_eq!(extraction.report.skipped_count(), 1);
        assert_eq!(
            extraction.report.skipped().next().map(|(_, r)| r.clone()),
            Some(SkipReason::NoVoicedPhone)
        );
    }

    #[test]
    fn test_voiced_syllable_without_vowel() {
        let spec = NodeSpec::document(
            "de",
            vec![NodeSpec::syllable(vec![NodeSpec::phone("m"), NodeSpec::phone("n")])],
        );
        let (_, extraction) = extract(&spec);

        assert_eq!(extraction.collections.voiced_segments().len(), 2);
        assert!(extraction.collections.first_voiced_segments().is_empty());
        assert_eq!(extraction.report.skip_counts().get("no-vowel"), Some(&1));
    }

    #[test]
    fn test_unresolvable_syllable_still_contributes_segments() {
        let spec = NodeSpec::document(
            "tlh",
            vec![NodeSpec::syllable(vec![NodeSpec::phone("a")])],
        );
        let (_, extraction) = extract(&spec);

        assert_eq!(extraction.collections.segments().len(), 1);
        assert!(extraction.collections.voiced_segments().is_empty());
        assert!(matches!(
            extraction.report.skipped().next(),
            Some((_, SkipReason::FeatureSetUnavailable(_)))
        ));
    }

    #[test]
    fn test_unknown_phone_is_unvoiced_and_keeps_anchors() {
        let spec = NodeSpec::document(
            "de",
            vec![NodeSpec::syllable(vec![
                NodeSpec::phone("m"),
                NodeSpec::phone("a"),
                NodeSpec::phone("%%"),
            ])],
        );
        let (tree, extraction) = extract(&spec);
        let collections = &extraction.collections;

        assert_eq!(collections.segments().len(), 3);
        assert_eq!(symbols(&tree, collections.voiced_segments()), vec!["m", "a"]);
        assert_eq!(symbols(&tree, collections.first_voiced_segments()), vec!["m"]);
        assert_eq!(symbols(&tree, collections.first_vowels()), vec!["a"]);
        assert_eq!(symbols(&tree, collections.last_voiced_segments()), vec!["a"]);

        assert_eq!(extraction.report.anchored_count(), 1);
        assert_eq!(extraction.report.skipped_count(), 0);
        let unknown = extraction.report.unknown_phones();
        assert_eq!(unknown.len(), 1);
        assert_eq!(unknown[0].symbol, "%%");
        assert_eq!(unknown[0].phone, collections.segments()[2]);
    }

    #[test]
    fn test_unknown_phones_alone_leave_no_voiced_phone() {
        let spec = NodeSpec::document(
            "de",
            vec![NodeSpec::syllable(vec![NodeSpec::phone("%%"), NodeSpec::phone("##")])],
        );
        let (_, extraction) = extract(&spec);

        assert_eq!(extraction.report.unknown_phones().len(), 2);
        assert_eq!(
            extraction.report.skipped().next().map(|(_, r)| r.clone()),
            Some(SkipReason::NoVoicedPhone)
        );
    }

    #[test]
    fn test_boundaries_in_document_order() {
        let spec = NodeSpec::document(
            "de",
            vec![
                NodeSpec::new(NodeKind::Phrase).with_children(vec![
                    NodeSpec::new(NodeKind::Token).with_children(vec![NodeSpec::syllable(vec![
                        NodeSpec::phone("a"),
                    ])]),
                    NodeSpec::boundary(3),
                ]),
                NodeSpec::new(NodeKind::Phrase).with_children(vec![
                    NodeSpec::new(NodeKind::Token).with_children(vec![NodeSpec::syllable(vec![
                        NodeSpec::phone("o:"),
                    ])]),
                    NodeSpec::boundary(4),
                ]),
            ],
        );
        let (tree, extraction) = extract(&spec);
        let boundaries = extraction.collections.boundaries();

        assert_eq!(boundaries.len(), 2);
        assert!(boundaries[0] < boundaries[1]);
        assert_eq!(tree.attribute(boundaries[1], "breakindex"), Some("4"));
        assert_eq!(extraction.report.boundary_count(), 2);
        assert_eq!(symbols(&tree, extraction.collections.first_vowels()), vec!["a", "o:"]);
    }

    #[test]
    fn test_empty_tree_has_empty_collections() {
        let (_, extraction) = extract(&NodeSpec::document("en", vec![]));
        for name in CollectionName::ALL {
            assert!(extraction.collections.get(name).is_empty());
        }
        assert_eq!(extraction.report.syllable_count(), 0);
    }
}
