//! Per-voice model bundles

use super::{Model, ModelRole};
use crate::anchor::CollectionName;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Where an extension model is applied.
///
/// Written in configuration as a collection name or `document`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTarget {
    Collection(CollectionName),
    Document,
}

impl Default for ModelTarget {
    fn default() -> Self {
        ModelTarget::Collection(CollectionName::Segments)
    }
}

impl fmt::Display for ModelTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelTarget::Collection(name) => write!(f, "{}", name),
            ModelTarget::Document => f.write_str("document"),
        }
    }
}

impl Serialize for ModelTarget {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelTarget {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        if name == "document" {
            return Ok(ModelTarget::Document);
        }
        name.parse()
            .map(ModelTarget::Collection)
            .map_err(serde::de::Error::custom)
    }
}

/// Target and ordering declaration of an extension model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSpec {
    #[serde(default)]
    pub target: ModelTarget,
    /// Roles this model must run after. Fixed roles always precede
    /// extensions; only extension roles affect the relative order.
    #[serde(default)]
    pub runs_after: Vec<ModelRole>,
}

impl ExtensionSpec {
    /// Applied to a named collection
    pub fn collection(name: CollectionName) -> Self {
        Self {
            target: ModelTarget::Collection(name),
            runs_after: Vec::new(),
        }
    }

    /// Applied to the whole document
    pub fn document() -> Self {
        Self {
            target: ModelTarget::Document,
            runs_after: Vec::new(),
        }
    }

    pub fn after(mut self, role: ModelRole) -> Self {
        if !self.runs_after.contains(&role) {
            self.runs_after.push(role);
        }
        self
    }

    /// Implicit declarations of the two extension names every voice
    /// configuration has historically understood: spectral/F0 prediction
    /// over segments, and whole-document prosody editing after it.
    pub fn legacy(name: &str) -> Option<Self> {
        match name {
            "hmmF0" => Some(Self::collection(CollectionName::Segments)),
            "prosody" => Some(Self::document().after(ModelRole::Other("hmmF0".into()))),
            _ => None,
        }
    }
}

/// An extension model registered in a bundle
pub struct OtherModel {
    name: String,
    model: Box<dyn Model>,
    spec: Option<ExtensionSpec>,
}

impl OtherModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model(&self) -> &dyn Model {
        self.model.as_ref()
    }

    /// Explicit declaration, or the legacy one for well-known names
    pub fn spec(&self) -> Option<ExtensionSpec> {
        self.spec
            .clone()
            .or_else(|| ExtensionSpec::legacy(&self.name))
    }

    /// Name of the collection this model targets; `segments` unless
    /// declared otherwise, `None` for document-scope models
    pub fn target_collection_name(&self) -> Option<&'static str> {
        match self.spec().map(|spec| spec.target).unwrap_or_default() {
            ModelTarget::Collection(name) => Some(name.as_str()),
            ModelTarget::Document => None,
        }
    }
}

impl fmt::Debug for OtherModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtherModel")
            .field("name", &self.name)
            .field("spec", &self.spec)
            .finish_non_exhaustive()
    }
}

/// The acoustic models of one voice.
///
/// Any model may be absent. Without a duration model the voice provides no
/// acoustic annotation at all.
#[derive(Default)]
pub struct VoiceModelBundle {
    name: String,
    locale: String,
    duration: Option<Box<dyn Model>>,
    left_f0: Option<Box<dyn Model>>,
    mid_f0: Option<Box<dyn Model>>,
    right_f0: Option<Box<dyn Model>>,
    boundary: Option<Box<dyn Model>>,
    others: Vec<OtherModel>,
}

impl VoiceModelBundle {
    pub fn new(name: &str, locale: &str) -> Self {
        Self {
            name: name.to_string(),
            locale: locale.to_string(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    /// Register a model under a role. Extension roles registered this way
    /// carry no declaration of their own.
    pub fn with_model(mut self, role: ModelRole, model: impl Model + 'static) -> Self {
        self.set_model(role, Box::new(model));
        self
    }

    /// Register an extension model with its target and ordering declaration
    pub fn with_extension(
        mut self,
        name: &str,
        model: impl Model + 'static,
        spec: ExtensionSpec,
    ) -> Self {
        self.set_other(name, Box::new(model), Some(spec));
        self
    }

    /// Register or replace the model for a role
    pub fn set_model(&mut self, role: ModelRole, model: Box<dyn Model>) {
        match role {
            ModelRole::Duration => self.duration = Some(model),
            ModelRole::LeftF0 => self.left_f0 = Some(model),
            ModelRole::MidF0 => self.mid_f0 = Some(model),
            ModelRole::RightF0 => self.right_f0 = Some(model),
            ModelRole::Boundary => self.boundary = Some(model),
            ModelRole::Other(name) => self.set_other(&name, model, None),
        }
    }

    fn set_other(&mut self, name: &str, model: Box<dyn Model>, spec: Option<ExtensionSpec>) {
        let entry = OtherModel {
            name: name.to_string(),
            model,
            spec,
        };
        // replacing keeps the original registration position
        match self.others.iter_mut().find(|other| other.name == name) {
            Some(existing) => *existing = entry,
            None => self.others.push(entry),
        }
    }

    /// Model playing a role, if present
    pub fn model(&self, role: &ModelRole) -> Option<&dyn Model> {
        let slot = match role {
            ModelRole::Duration => &self.duration,
            ModelRole::LeftF0 => &self.left_f0,
            ModelRole::MidF0 => &self.mid_f0,
            ModelRole::RightF0 => &self.right_f0,
            ModelRole::Boundary => &self.boundary,
            ModelRole::Other(name) => {
                return self.other(name).map(OtherModel::model);
            }
        };
        slot.as_deref()
    }

    /// Model by name, fixed names (`duration`, `leftF0`, ...) included
    pub fn get_model(&self, name: &str) -> Option<&dyn Model> {
        self.model(&ModelRole::from_name(name))
    }

    pub fn has_model(&self, role: &ModelRole) -> bool {
        self.model(role).is_some()
    }

    pub fn other(&self, name: &str) -> Option<&OtherModel> {
        self.others.iter().find(|other| other.name == name)
    }

    /// Extension models in registration order
    pub fn others(&self) -> &[OtherModel] {
        &self.others
    }

    /// Roles with a model present, fixed roles first
    pub fn roles(&self) -> Vec<ModelRole> {
        ModelRole::FIXED
            .into_iter()
            .filter(|role| self.has_model(role))
            .chain(
                self.others
                    .iter()
                    .map(|other| ModelRole::Other(other.name.clone())),
            )
            .collect()
    }

    /// True when the voice defines no model at all
    pub fn is_empty(&self) -> bool {
        self.roles().is_empty()
    }
}

impl fmt::Debug for VoiceModelBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VoiceModelBundle")
            .field("name", &self.name)
            .field("locale", &self.locale)
            .field("roles", &self.roles())
            .finish()
    }
}
