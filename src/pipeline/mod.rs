//! Acoustic annotation pipeline
//!
//! Resolves the voice, plans its model schedule, extracts anchors, then runs
//! the models in schedule order with duration normalization after the
//! duration model.

mod modeller;
mod schedule;
mod voices;

pub use modeller::{AcousticModeller, AcousticParams, PipelineReport};
pub use schedule::{Invocation, Schedule, ScheduleRun, ScheduledStep, SkippedModel};
pub use voices::VoiceRegistry;

use crate::timing::RoundingMode;
use crate::Result;
use serde::{Deserialize, Serialize};

/// Pipeline stage enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    VoiceResolution,
    Scheduling,
    AnchorExtraction,
    ModelApplication,
    DurationNormalization,
}

impl PipelineStage {
    /// Get stage name
    pub fn name(&self) -> &'static str {
        match self {
            PipelineStage::VoiceResolution => "Voice Resolution",
            PipelineStage::AnchorExtraction => "Anchor Extraction",
            PipelineStage::Scheduling => "Scheduling",
            PipelineStage::ModelApplication => "Model Application",
            PipelineStage::DurationNormalization => "Duration Normalization",
        }
    }

    /// Get all stages in order
    pub fn all() -> Vec<PipelineStage> {
        vec![
            PipelineStage::VoiceResolution,
            PipelineStage::Scheduling,
            PipelineStage::AnchorExtraction,
            PipelineStage::ModelApplication,
            PipelineStage::DurationNormalization,
        ]
    }
}

/// What to do with an extension model that declares neither a target nor
/// an ordering and has no well-known name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrecognizedModelPolicy {
    /// Refuse to plan the voice
    #[default]
    Fail,
    /// Warn and leave the model out
    Ignore,
}

/// Pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Millisecond rounding of normalized durations
    #[serde(default)]
    pub rounding: RoundingMode,
    #[serde(default)]
    pub unrecognized_models: UnrecognizedModelPolicy,
    /// Voice used when neither the document nor the request names one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_voice: Option<String>,
}

impl PipelineConfig {
    pub fn with_rounding(mut self, rounding: RoundingMode) -> Self {
        self.rounding = rounding;
        self
    }

    pub fn with_unrecognized_models(mut self, policy: UnrecognizedModelPolicy) -> Self {
        self.unrecognized_models = policy;
        self
    }

    pub fn with_default_voice(mut self, voice: &str) -> Self {
        self.default_voice = Some(voice.to_string());
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(voice) = &self.default_voice {
            if voice.trim().is_empty() {
                return Err(crate::Error::Config("default_voice must not be empty".into()));
            }
        }
        if self.unrecognized_models == UnrecognizedModelPolicy::Ignore {
            log::warn!("Unrecognized extension models will be ignored");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_order() {
        // schedule is planned before extraction so unconfigured voices skip it
        assert_eq!(
            PipelineStage::all(),
            vec![
                PipelineStage::VoiceResolution,
                PipelineStage::Scheduling,
                PipelineStage::AnchorExtraction,
                PipelineStage::ModelApplication,
                PipelineStage::DurationNormalization,
            ]
        );
        assert_eq!(PipelineStage::Scheduling.name(), "Scheduling");
    }

    #[test]
    fn test_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.rounding, RoundingMode::HalfAwayFromZero);
        assert_eq!(config.unrecognized_models, UnrecognizedModelPolicy::Fail);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_yaml() {
        let yaml = "rounding: half-to-even\nunrecognized_models: ignore\n";
        let config: PipelineConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(
            config,
            PipelineConfig::default()
                .with_rounding(RoundingMode::HalfToEven)
                .with_unrecognized_models(UnrecognizedModelPolicy::Ignore)
        );
    }

    #[test]
    fn test_empty_default_voice_rejected() {
        let config = PipelineConfig::default().with_default_voice(" ");
        assert!(config.validate().is_err());
    }
}
