//! Voice lookup

use crate::markup::{MarkupTree, NodeKind, ATTR_VOICE_NAME};
use crate::model::VoiceModelBundle;
use crate::phonology::{language_of, normalize_locale};
use crate::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;

/// Registered voices and the default voice of each locale
#[derive(Debug, Default)]
pub struct VoiceRegistry {
    voices: Vec<Arc<VoiceModelBundle>>,
    defaults: HashMap<String, String>,
}

impl VoiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a voice. Names are unique.
    pub fn register(&mut self, bundle: VoiceModelBundle) -> Result<Arc<VoiceModelBundle>> {
        if self.get(bundle.name()).is_some() {
            return Err(Error::Config(format!(
                "Voice '{}' is registered twice",
                bundle.name()
            )));
        }
        log::debug!(
            "Registered voice {} ({}) with models: {:?}",
            bundle.name(),
            bundle.locale(),
            bundle.roles()
        );
        let bundle = Arc::new(bundle);
        self.voices.push(Arc::clone(&bundle));
        Ok(bundle)
    }

    /// Make a registered voice the default for its locale
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        let voice = self
            .get(name)
            .ok_or_else(|| Error::VoiceNotFound(name.to_string()))?;
        let locale = normalize_locale(voice.locale());
        if let Some(previous) = self.defaults.insert(locale.clone(), name.to_string()) {
            if previous != name {
                log::warn!(
                    "Default voice for {} changed from {} to {}",
                    locale,
                    previous,
                    name
                );
            }
        }
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<Arc<VoiceModelBundle>> {
        self.voices
            .iter()
            .find(|voice| voice.name() == name)
            .cloned()
    }

    /// Voice names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.voices.iter().map(|voice| voice.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Default voice for a locale.
    ///
    /// An explicit default wins; otherwise the first voice registered for
    /// the locale. Both are tried for the full tag, then its language.
    pub fn default_for_locale(&self, locale: &str) -> Option<Arc<VoiceModelBundle>> {
        let normalized = normalize_locale(locale);
        let language = language_of(&normalized);

        for key in [&normalized, &language] {
            if let Some(voice) = self.defaults.get(key.as_str()).and_then(|name| self.get(name)) {
                return Some(voice);
            }
        }
        for key in [&normalized, &language] {
            if let Some(voice) = self
                .voices
                .iter()
                .find(|voice| normalize_locale(voice.locale()) == *key)
            {
                return Some(Arc::clone(voice));
            }
        }
        None
    }

    /// Pick the voice for a document.
    ///
    /// Tried in turn: the `name` of the first voice element, the caller's
    /// default voice, the default voice of the document locale. A voice
    /// element naming an unknown voice falls through to the next step; an
    /// unknown caller default is an error.
    pub fn resolve(
        &self,
        tree: &MarkupTree,
        default_voice: Option<&str>,
    ) -> Result<Arc<VoiceModelBundle>> {
        let named = tree
            .first_of_kind(&NodeKind::Voice)
            .and_then(|voice| tree.attribute(voice, ATTR_VOICE_NAME));
        if let Some(name) = named {
            match self.get(name) {
                Some(voice) => return Ok(voice),
                None => log::warn!("Document requests unknown voice '{}'", name),
            }
        }

        if let Some(name) = default_voice {
            return self
                .get(name)
                .ok_or_else(|| Error::VoiceNotFound(name.to_string()));
        }

        let locale = tree
            .locale()
            .ok_or_else(|| Error::VoiceNotFound("<document has no locale>".into()))?;
        self.default_for_locale(locale)
            .ok_or_else(|| Error::VoiceNotFound(format!("no voice for locale {}", locale)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::NodeSpec;

    fn registry() -> VoiceRegistry {
        let mut registry = VoiceRegistry::new();
        registry.register(VoiceModelBundle::new("anna", "de")).unwrap();
        registry.register(VoiceModelBundle::new("cmu-slt", "en-US")).unwrap();
        registry.register(VoiceModelBundle::new("obadiah", "en-GB")).unwrap();
        registry
    }

    fn document(locale: &str, voice: Option<&str>) -> MarkupTree {
        let children = match voice {
            Some(name) => vec![NodeSpec::new(NodeKind::Voice).with_attr(ATTR_VOICE_NAME, name)],
            None => Vec::new(),
        };
        MarkupTree::from_spec(&NodeSpec::document(locale, children))
    }

    #[test]
    fn test_duplicate_voice_rejected() {
        let mut registry = registry();
        assert!(registry.register(VoiceModelBundle::new("anna", "de")).is_err());
        assert_eq!(registry.names(), vec!["anna", "cmu-slt", "obadiah"]);
    }

    #[test]
    fn test_locale_default() {
        let mut registry = registry();
        assert_eq!(registry.default_for_locale("en_US").unwrap().name(), "cmu-slt");
        assert_eq!(registry.default_for_locale("de-AT").unwrap().name(), "anna");
        assert!(registry.default_for_locale("fr").is_none());

        registry.set_default("obadiah").unwrap();
        assert_eq!(registry.default_for_locale("en-GB").unwrap().name(), "obadiah");
        assert_eq!(registry.default_for_locale("en-US").unwrap().name(), "cmu-slt");
        assert!(registry.set_default("nobody").is_err());
    }

    #[test]
    fn test_resolve_cascade() {
        let registry = registry();

        let tree = document("en-US", Some("anna"));
        assert_eq!(registry.resolve(&tree, Some("obadiah")).unwrap().name(), "anna");

        let tree = document("en-US", Some("unknown"));
        assert_eq!(registry.resolve(&tree, Some("obadiah")).unwrap().name(), "obadiah");
        assert_eq!(registry.resolve(&tree, None).unwrap().name(), "cmu-slt");

        let tree = document("de", None);
        assert_eq!(registry.resolve(&tree, None).unwrap().name(), "anna");
    }

    #[test]
    fn test_resolve_failures() {
        let registry = registry();
        let tree = document("fr", None);
        assert!(matches!(registry.resolve(&tree, None), Err(Error::VoiceNotFound(_))));
        assert!(matches!(
            registry.resolve(&tree, Some("nobody")),
            Err(Error::VoiceNotFound(_))
        ));
    }
}
