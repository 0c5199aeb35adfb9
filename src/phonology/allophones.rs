//! Allophone inventories
//!
//! Table-driven phone inventories in SAMPA notation. Built-in sets cover
//! English and German; further sets are loaded from YAML files of the form
//!
//! ```yaml
//! name: it-sampa
//! locale: it
//! phones:
//!   a: { voiced: true, vowel: true }
//!   k: { voiced: false }
//! ```

use super::{FeatureSet, PhoneClass};
use crate::{Error, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Locales with a built-in allophone set
pub const BUILTIN_LOCALES: [&str; 2] = ["en", "de"];

lazy_static! {
    /// English (US) SAMPA inventory
    static ref ENGLISH: Arc<AllophoneSet> = Arc::new(AllophoneSet::from_lists(
        "en-sampa",
        "en",
        &[
            "A", "O", "u", "i", "{", "V", "E", "I", "U", "@", "r=", "aI", "aU", "OI", "@U", "EI",
        ],
        &["b", "d", "g", "v", "D", "z", "Z", "dZ", "m", "n", "N", "l", "r", "w", "j"],
        &["p", "t", "k", "f", "T", "s", "S", "tS", "h", "_"],
    ));

    /// German SAMPA inventory
    static ref GERMAN: Arc<AllophoneSet> = Arc::new(AllophoneSet::from_lists(
        "de-sampa",
        "de",
        &[
            "a", "a:", "e:", "E", "E:", "i:", "I", "o:", "O", "u:", "U", "y:", "Y", "2:", "9",
            "@", "6", "aI", "aU", "OY",
        ],
        &["b", "d", "g", "v", "z", "Z", "m", "n", "N", "l", "j", "R", "r"],
        &["p", "t", "k", "f", "s", "S", "x", "C", "h", "ts", "pf", "tS", "?", "_"],
    ));
}

/// Built-in set for a language code
pub fn builtin_set(language: &str) -> Option<Arc<AllophoneSet>> {
    match language {
        "en" => Some(Arc::clone(&ENGLISH)),
        "de" => Some(Arc::clone(&GERMAN)),
        _ => None,
    }
}

/// A named phone inventory for one locale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllophoneSet {
    name: String,
    locale: String,
    phones: HashMap<String, PhoneClass>,
}

impl AllophoneSet {
    pub fn new(name: &str, locale: &str, phones: HashMap<String, PhoneClass>) -> Self {
        Self {
            name: name.to_string(),
            locale: locale.to_string(),
            phones,
        }
    }

    /// Build from separate vowel, voiced-consonant and unvoiced lists
    pub fn from_lists(
        name: &str,
        locale: &str,
        vowels: &[&str],
        voiced: &[&str],
        unvoiced: &[&str],
    ) -> Self {
        let phones = vowels
            .iter()
            .map(|p| (p.to_string(), PhoneClass::VOWEL))
            .chain(voiced.iter().map(|p| (p.to_string(), PhoneClass::VOICED)))
            .chain(unvoiced.iter().map(|p| (p.to_string(), PhoneClass::UNVOICED)))
            .collect();
        Self::new(name, locale, phones)
    }

    /// Load from a YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        let set: AllophoneSet = serde_yaml::from_str(content)?;
        set.validate()?;
        Ok(set)
    }

    pub fn validate(&self) -> Result<()> {
        if self.locale.trim().is_empty() {
            return Err(Error::Config(format!(
                "Allophone set '{}' has no locale",
                self.name
            )));
        }
        if self.phones.is_empty() {
            return Err(Error::Config(format!(
                "Allophone set '{}' defines no phones",
                self.name
            )));
        }
        for (symbol, class) in &self.phones {
            if class.vowel && !class.voiced {
                log::warn!(
                    "Allophone set '{}': vowel '{}' is unvoiced and can never be an F0 anchor",
                    self.name,
                    symbol
                );
            }
        }
        Ok(())
    }

    pub fn locale(&self) -> &str {
        &self.locale
    }

    pub fn len(&self) -> usize {
        self.phones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phones.is_empty()
    }

    /// Phone symbols, sorted
    pub fn symbols(&self) -> Vec<&str> {
        let mut symbols: Vec<&str> = self.phones.keys().map(String::as_str).collect();
        symbols.sort_unstable();
        symbols
    }
}

impl FeatureSet for AllophoneSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn classify(&self, symbol: &str) -> Option<PhoneClass> {
        self.phones.get(symbol).copied()
    }
}
