//! Phonological features for F0 anchor selection
//!
//! The anchor extractor only needs to know, per phone symbol, whether the
//! phone is voiced and whether it is a vowel. Feature sets are resolved per
//! syllable from the locale in effect at that point of the document.

mod allophones;

pub use allophones::{builtin_set, AllophoneSet, BUILTIN_LOCALES};

use crate::markup::{MarkupTree, NodeId, ATTR_LANG};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Voicing and vowel status of a phone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PhoneClass {
    pub voiced: bool,
    #[serde(default)]
    pub vowel: bool,
}

impl PhoneClass {
    pub const VOWEL: PhoneClass = PhoneClass {
        voiced: true,
        vowel: true,
    };
    pub const VOICED: PhoneClass = PhoneClass {
        voiced: true,
        vowel: false,
    };
    pub const UNVOICED: PhoneClass = PhoneClass {
        voiced: false,
        vowel: false,
    };
}

/// Phone inventory able to classify symbols
pub trait FeatureSet: Send + Sync {
    /// Inventory name, used in diagnostics
    fn name(&self) -> &str;

    /// Classification of a phone symbol, `None` if the symbol is unknown
    fn classify(&self, symbol: &str) -> Option<PhoneClass>;
}

/// Resolves the feature set applicable at a syllable
pub trait FeatureResolver: Send + Sync {
    fn resolve(&self, tree: &MarkupTree, syllable: NodeId) -> Result<&dyn FeatureSet>;
}

/// Normalize a locale tag: lowercase, `_` replaced by `-`
pub fn normalize_locale(locale: &str) -> String {
    locale.trim().replace('_', "-").to_lowercase()
}

/// Language part of a locale tag (`en-US` -> `en`)
pub fn language_of(locale: &str) -> String {
    let normalized = normalize_locale(locale);
    normalized
        .split('-')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Feature resolver keyed by the `xml:lang` in effect at each syllable.
///
/// Lookup tries the full locale first and then its language part, so a set
/// registered for `en` serves `en-US` and `en-GB` documents alike.
#[derive(Debug, Clone, Default)]
pub struct LocaleFeatureResolver {
    sets: HashMap<String, Arc<AllophoneSet>>,
    default_locale: Option<String>,
}

impl LocaleFeatureResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver preloaded with every built-in allophone set
    pub fn with_builtin_sets() -> Self {
        let mut resolver = Self::new();
        for locale in BUILTIN_LOCALES {
            if let Some(set) = builtin_set(locale) {
                resolver.register(set);
            }
        }
        resolver
    }

    /// Locale used when a syllable has no `xml:lang` in scope
    pub fn with_default_locale(mut self, locale: &str) -> Self {
        self.default_locale = Some(normalize_locale(locale));
        self
    }

    /// Register a set under its own locale, replacing any previous one
    pub fn register(&mut self, set: Arc<AllophoneSet>) {
        let key = normalize_locale(set.locale());
        if self.sets.insert(key.clone(), set).is_some() {
            log::debug!("Replaced allophone set for locale {}", key);
        }
    }

    /// Load a YAML allophone set file and register it
    pub fn register_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let set = AllophoneSet::load(path)?;
        log::info!(
            "Loaded allophone set '{}' ({} phones) for {}",
            set.name(),
            set.len(),
            set.locale()
        );
        self.register(Arc::new(set));
        Ok(())
    }

    /// Registered locales, sorted
    pub fn locales(&self) -> Vec<&str> {
        let mut locales: Vec<&str> = self.sets.keys().map(String::as_str).collect();
        locales.sort_unstable();
        locales
    }

    /// Feature set for a locale tag
    pub fn for_locale(&self, locale: &str) -> Option<&AllophoneSet> {
        let normalized = normalize_locale(locale);
        self.sets
            .get(&normalized)
            .or_else(|| self.sets.get(&language_of(&normalized)))
            .map(Arc::as_ref)
    }
}

impl FeatureResolver for LocaleFeatureResolver {
    fn resolve(&self, tree: &MarkupTree, syllable: NodeId) -> Result<&dyn FeatureSet> {
        let locale = tree
            .inherited_attribute(syllable, ATTR_LANG)
            .map(str::to_string)
            .or_else(|| self.default_locale.clone())
            .ok_or_else(|| Error::FeatureSetNotFound("<no locale in scope>".into()))?;

        self.for_locale(&locale)
            .map(|set| set as &dyn FeatureSet)
            .ok_or(Error::FeatureSetNotFound(locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::NodeKind;

    #[test]
    fn test_locale_normalization() {
        assert_eq!(normalize_locale("en_US"), "en-us");
        assert_eq!(language_of("de_DE"), "de");
        assert_eq!(language_of("fr"), "fr");
    }

    #[test]
    fn test_resolver_falls_back_to_language() {
        let resolver = LocaleFeatureResolver::with_builtin_sets();
        assert!(resolver.for_locale("en_GB").is_some());
        assert!(resolver.for_locale("de-AT").is_some());
        assert!(resolver.for_locale("xx").is_none());
    }

    #[test]
    fn test_resolve_uses_inherited_lang() {
        let resolver = LocaleFeatureResolver::with_builtin_sets();
        let mut tree = MarkupTree::document("de");
        let root = tree.root();
        let syl = tree.append(root, NodeKind::Syllable);

        let set = resolver.resolve(&tree, syl).unwrap();
        assert_eq!(set.classify("a"), Some(PhoneClass::VOWEL));
        assert_eq!(set.classify("k"), Some(PhoneClass::UNVOICED));
    }

    #[test]
    fn test_resolve_without_locale_fails() {
        let resolver = LocaleFeatureResolver::with_builtin_sets();
        let mut tree = MarkupTree::new(NodeKind::Document);
        let root = tree.root();
        let syl = tree.append(root, NodeKind::Syllable);

        let err = resolver.resolve(&tree, syl).err().unwrap();
        assert!(matches!(err, Error::FeatureSetNotFound(_)));

        let resolver = resolver.with_default_locale("en_US");
        assert!(resolver.resolve(&tree, syl).is_ok());
    }

    #[test]
    fn test_resolve_unknown_locale_fails() {
        let resolver = LocaleFeatureResolver::with_builtin_sets();
        let mut tree = MarkupTree::document("tlh");
        let root = tree.root();
        let syl = tree.append(root, NodeKind::Syllable);
        assert!(resolver.resolve(&tree, syl).is_err());
    }
}
