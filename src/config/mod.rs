//! Configuration management for the acoustic modeller

use crate::model::{
    BoundaryRules, BreakDurationModel, DurationRules, F0Rules, ModelRole, PhoneDurationModel,
    VoiceModelBundle,
};
use crate::pipeline::PipelineConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Main configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Scheduling and normalization settings
    #[serde(default)]
    pub pipeline: PipelineConfig,
    /// Allophone sets
    #[serde(default)]
    pub phonology: PhonologyConfig,
    /// Voices and their rule models
    #[serde(default)]
    pub voices: Vec<VoiceConfig>,
}

/// Phonological feature configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhonologyConfig {
    /// Locale assumed for syllables without `xml:lang` in scope
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_locale: Option<String>,
    /// Extra allophone set files (YAML)
    #[serde(default)]
    pub allophone_sets: Vec<PathBuf>,
    /// Register the built-in English and German sets
    #[serde(default = "default_true")]
    pub builtin_sets: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PhonologyConfig {
    fn default() -> Self {
        Self {
            default_locale: None,
            allophone_sets: Vec::new(),
            builtin_sets: true,
        }
    }
}

/// One voice assembled from rule models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    pub name: String,
    pub locale: String,
    /// Default voice for its locale
    #[serde(default)]
    pub default: bool,
    /// Without a duration model the voice passes documents through
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<DurationRules>,
    /// Enables the left, mid and right F0 models
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub f0: Option<F0Rules>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryRules>,
}

impl VoiceConfig {
    pub fn new(name: &str, locale: &str) -> Self {
        Self {
            name: name.to_string(),
            locale: locale.to_string(),
            default: false,
            duration: None,
            f0: None,
            boundary: None,
        }
    }

    /// Voice with every rule model at its defaults
    pub fn with_rule_models(mut self) -> Self {
        self.duration = Some(DurationRules::default());
        self.f0 = Some(F0Rules::default());
        self.boundary = Some(BoundaryRules::default());
        self
    }

    /// Instantiate the configured models
    pub fn build_bundle(&self) -> Result<VoiceModelBundle> {
        let mut bundle = VoiceModelBundle::new(&self.name, &self.locale);

        if let Some(rules) = &self.duration {
            bundle.set_model(
                ModelRole::Duration,
                Box::new(PhoneDurationModel::new(rules.clone())?),
            );
        }
        if let Some(rules) = &self.f0 {
            bundle.set_model(ModelRole::LeftF0, Box::new(rules.left()));
            bundle.set_model(ModelRole::MidF0, Box::new(rules.mid()));
            bundle.set_model(ModelRole::RightF0, Box::new(rules.right()));
        }
        if let Some(rules) = &self.boundary {
            bundle.set_model(
                ModelRole::Boundary,
                Box::new(BreakDurationModel::new(rules.clone())),
            );
        }

        if bundle.is_empty() {
            log::warn!("Voice {} defines no models", self.name);
        }
        Ok(bundle)
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load configuration from JSON file
    pub fn load_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound(path.display().to_string()));
        }

        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Configuration with one rule-based voice per built-in language
    pub fn with_builtin_voices() -> Self {
        let mut english = VoiceConfig::new("en-rules", "en").with_rule_models();
        english.default = true;
        let mut german = VoiceConfig::new("de-rules", "de").with_rule_models();
        german.default = true;

        Self {
            voices: vec![english, german],
            ..Default::default()
        }
    }

    /// Create default configuration and save to file
    pub fn create_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::with_builtin_voices();
        config.save(path)?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;

        if let Some(locale) = &self.phonology.default_locale {
            if locale.trim().is_empty() {
                return Err(Error::Config("default_locale must not be empty".into()));
            }
        }
        for path in &self.phonology.allophone_sets {
            if !path.exists() {
                return Err(Error::FileNotFound(path.display().to_string()));
            }
        }
        if !self.phonology.builtin_sets && self.phonology.allophone_sets.is_empty() {
            log::warn!("No allophone sets configured; no syllable will receive F0 anchors");
        }

        let mut names = HashSet::new();
        for voice in &self.voices {
            if voice.name.trim().is_empty() {
                return Err(Error::Config("Voice name must not be empty".into()));
            }
            if voice.locale.trim().is_empty() {
                return Err(Error::Config(format!(
                    "Voice {} has no locale",
                    voice.name
                )));
            }
            if !names.insert(voice.name.as_str()) {
                return Err(Error::Config(format!(
                    "Voice {} is defined twice",
                    voice.name
                )));
            }
            if let Some(f0) = &voice.f0 {
                if f0.start_hz <= 0.0 || f0.end_hz <= 0.0 {
                    return Err(Error::Config(format!(
                        "Voice {}: F0 targets must be > 0 Hz",
                        voice.name
                    )));
                }
            }
        }

        Ok(())
    }
}
