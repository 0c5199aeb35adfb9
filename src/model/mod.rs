//! Predictive acoustic models
//!
//! A model writes its predictions as attributes onto the elements it is
//! given. The pipeline never inspects what a model writes; it only decides
//! which collection each model sees and in which order models run.

mod bundle;
mod rules;

pub use bundle::{ExtensionSpec, ModelTarget, OtherModel, VoiceModelBundle};
pub use rules::{
    BoundaryRules, BreakDurationModel, DurationRules, F0Rules, F0TargetModel, PhoneDurationModel,
};

use crate::markup::{MarkupTree, NodeId};
use crate::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// What a model is applied to
#[derive(Debug, Clone, Copy)]
pub enum ModelInput<'a> {
    /// An ordered element sequence, optionally with a parallel context
    /// sequence (for F0 models: the first vowel of each target's syllable)
    Elements {
        target: &'a [NodeId],
        context: Option<&'a [NodeId]>,
    },
    /// The whole document, for models editing prosodic structure
    Document,
}

impl<'a> ModelInput<'a> {
    pub fn elements(target: &'a [NodeId]) -> Self {
        ModelInput::Elements {
            target,
            context: None,
        }
    }

    pub fn with_context(target: &'a [NodeId], context: &'a [NodeId]) -> Self {
        ModelInput::Elements {
            target,
            context: Some(context),
        }
    }
}

/// A predictive model applied by the pipeline
pub trait Model: Send + Sync {
    /// Write predictions for `input` onto `tree`
    fn apply(&self, tree: &mut MarkupTree, input: ModelInput<'_>) -> Result<()>;
}

/// Role a model plays for a voice
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelRole {
    Duration,
    LeftF0,
    MidF0,
    RightF0,
    Boundary,
    /// Extension model, identified by name
    Other(String),
}

impl ModelRole {
    /// Fixed roles in application order
    pub const FIXED: [ModelRole; 5] = [
        ModelRole::Duration,
        ModelRole::LeftF0,
        ModelRole::MidF0,
        ModelRole::RightF0,
        ModelRole::Boundary,
    ];

    pub fn name(&self) -> &str {
        match self {
            ModelRole::Duration => "duration",
            ModelRole::LeftF0 => "leftF0",
            ModelRole::MidF0 => "midF0",
            ModelRole::RightF0 => "rightF0",
            ModelRole::Boundary => "boundary",
            ModelRole::Other(name) => name,
        }
    }

    /// Map a model name to its role; unknown names are extension roles
    pub fn from_name(name: &str) -> Self {
        match name {
            "duration" => ModelRole::Duration,
            "leftF0" => ModelRole::LeftF0,
            "midF0" => ModelRole::MidF0,
            "rightF0" => ModelRole::RightF0,
            "boundary" => ModelRole::Boundary,
            other => ModelRole::Other(other.to_string()),
        }
    }

    pub fn is_fixed(&self) -> bool {
        !matches!(self, ModelRole::Other(_))
    }
}

impl fmt::Display for ModelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ModelRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ModelRole {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(ModelRole::from_name(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_roundtrip() {
        for role in ModelRole::FIXED {
            assert!(role.is_fixed());
            assert_eq!(ModelRole::from_name(role.name()), role);
        }
        let other = ModelRole::from_name("hmmF0");
        assert_eq!(other, ModelRole::Other("hmmF0".into()));
        assert!(!other.is_fixed());
    }

    #[test]
    fn test_role_serde() {
        let roles: Vec<ModelRole> = serde_json::from_str(r#"["leftF0","prosody"]"#).unwrap();
        assert_eq!(roles, vec![ModelRole::LeftF0, ModelRole::Other("prosody".into())]);
        assert_eq!(serde_json::to_string(&roles).unwrap(), r#"["leftF0","prosody"]"#);
    }
}
