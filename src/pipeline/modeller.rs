//! Acoustic modeller: the pipeline entry point

use super::{PipelineConfig, PipelineStage, Schedule, SkippedModel, VoiceRegistry};
use crate::anchor::{AnchorExtractor, TraversalReport};
use crate::config::Config;
use crate::markup::MarkupTree;
use crate::model::{ModelRole, VoiceModelBundle};
use crate::phonology::{FeatureResolver, LocaleFeatureResolver};
use crate::timing::DurationNormalizer;
use crate::{Error, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Summary of one annotation run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineReport {
    pub voice: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
    /// False when the voice has no duration model and the document was
    /// passed through unchanged
    pub configured: bool,
    /// Models in the order they were applied
    pub applied: Vec<ModelRole>,
    pub skipped: Vec<SkippedModel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traversal: Option<TraversalReport>,
    pub segment_count: usize,
    /// End time of the last segment, seconds
    pub total_seconds: f64,
    pub processing_ms: f64,
}

/// Annotated document with the locale it was processed in
#[derive(Debug, Clone)]
pub struct AcousticParams {
    pub tree: MarkupTree,
    pub locale: Option<String>,
    pub voice: String,
    pub report: PipelineReport,
}

/// Adds acoustic parameters (durations, F0 targets, pauses) to markup
pub struct AcousticModeller {
    config: PipelineConfig,
    resolver: Arc<dyn FeatureResolver>,
    voices: VoiceRegistry,
}

impl AcousticModeller {
    pub fn new(
        config: PipelineConfig,
        resolver: Arc<dyn FeatureResolver>,
        voices: VoiceRegistry,
    ) -> Self {
        Self {
            config,
            resolver,
            voices,
        }
    }

    /// Build allophone sets and voices from configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        log::info!("Initializing acoustic modeller...");

        let phonology = &config.phonology;
        let mut resolver = if phonology.builtin_sets {
            LocaleFeatureResolver::with_builtin_sets()
        } else {
            LocaleFeatureResolver::new()
        };
        for path in &phonology.allophone_sets {
            resolver.register_file(path)?;
        }
        if let Some(locale) = &phonology.default_locale {
            resolver = resolver.with_default_locale(locale);
        }

        let mut voices = VoiceRegistry::new();
        for voice in &config.voices {
            let bundle = voice.build_bundle()?;
            // surface scheduling problems at startup rather than per document
            Schedule::plan(&bundle, config.pipeline.unrecognized_models)?;
            voices.register(bundle)?;
            if voice.default {
                voices.set_default(&voice.name)?;
            }
        }
        if let Some(name) = &config.pipeline.default_voice {
            if voices.get(name).is_none() {
                return Err(Error::VoiceNotFound(name.clone()));
            }
        }

        log::info!(
            "Acoustic modeller ready: {} voice(s), allophone sets for {:?}",
            voices.len(),
            resolver.locales()
        );

        Ok(Self::new(config.pipeline.clone(), Arc::new(resolver), voices))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn voices(&self) -> &VoiceRegistry {
        &self.voices
    }

    pub fn resolver(&self) -> &dyn FeatureResolver {
        self.resolver.as_ref()
    }

    /// Schedule the voice's models would run with
    pub fn plan(&self, voice: &VoiceModelBundle) -> Result<Schedule> {
        Schedule::plan(voice, self.config.unrecognized_models)
    }

    /// Annotate a document.
    ///
    /// The voice comes from the document's voice element, then
    /// `default_voice`, then the configured default, then the default voice
    /// of the document locale. A voice without a duration model leaves the
    /// document untouched.
    pub fn process(
        &self,
        mut tree: MarkupTree,
        default_voice: Option<&str>,
    ) -> Result<AcousticParams> {
        let start = Instant::now();
        let locale = tree.locale().map(str::to_string);

        log::debug!("Stage: {}", PipelineStage::VoiceResolution.name());
        let requested = default_voice.or(self.config.default_voice.as_deref());
        let voice = self.voices.resolve(&tree, requested)?;

        let mut report = self.annotate(&mut tree, &voice)?;
        report.locale = locale.clone();
        report.processing_ms = start.elapsed().as_secs_f64() * 1000.0;

        Ok(AcousticParams {
            tree,
            locale,
            voice: voice.name().to_string(),
            report,
        })
    }

    /// Run extraction, models and normalization for a resolved voice
    pub fn annotate(
        &self,
        tree: &mut MarkupTree,
        voice: &VoiceModelBundle,
    ) -> Result<PipelineReport> {
        let mut report = PipelineReport {
            voice: voice.name().to_string(),
            ..Default::default()
        };

        log::debug!("Stage: {}", PipelineStage::Scheduling.name());
        let schedule = self.plan(voice)?;
        report.skipped = schedule.skipped().to_vec();

        if !schedule.is_configured() {
            log::debug!(
                "No acoustic models defined in {}; passing document through unmodified",
                voice.name()
            );
            return Ok(report);
        }

        log::debug!("Stage: {}", PipelineStage::AnchorExtraction.name());
        let extraction = AnchorExtractor::new(self.resolver.as_ref()).extract(tree);

        log::debug!("Stage: {}", PipelineStage::ModelApplication.name());
        let normalizer = DurationNormalizer::new(self.config.rounding);
        let run = schedule.run(voice, tree, &extraction.collections, &normalizer)?;

        report.configured = true;
        report.applied = run.applied;
        report.segment_count = run.timings.len();
        report.total_seconds = run.timings.last().map_or(0.0, |t| t.end_seconds);
        if extraction.report.skipped_count() > 0 {
            log::info!(
                "{} of {} syllables had no F0 anchors: {:?}",
                extraction.report.skipped_count(),
                extraction.report.syllable_count(),
                extraction.report.skip_counts()
            );
        }
        if !extraction.report.unknown_phones().is_empty() {
            log::info!(
                "{} phone(s) not in the allophone set were treated as unvoiced",
                extraction.report.unknown_phones().len()
            );
        }
        report.traversal = Some(extraction.report);

        log::info!(
            "Annotated {} segments with voice {} ({:.3}s)",
            report.segment_count,
            voice.name(),
            report.total_seconds
        );
        Ok(report)
    }
}
