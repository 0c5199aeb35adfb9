//! Model application scheduling
//!
//! Turns the set of models a voice defines into an ordered list of steps:
//!
//! 1. duration over `segments`
//! 2. duration normalization over `segments`
//! 3. the F0 group, only when a left-F0 model is present: left, mid, right,
//!    boundary, each skipped if absent
//! 4. extension models, ordered by their `runs_after` declarations

use super::{PipelineStage, UnrecognizedModelPolicy};
use crate::anchor::{CollectionName, ElementCollections};
use crate::markup::MarkupTree;
use crate::model::{ModelInput, ModelRole, ModelTarget, VoiceModelBundle};
use crate::timing::{DurationNormalizer, SegmentTiming};
use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// One model invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invocation {
    pub role: ModelRole,
    pub target: ModelTarget,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<CollectionName>,
}

impl Invocation {
    fn fixed(role: ModelRole, target: CollectionName, context: Option<CollectionName>) -> Self {
        Self {
            role,
            target: ModelTarget::Collection(target),
            context,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "kebab-case")]
pub enum ScheduledStep {
    Apply(Invocation),
    NormalizeDurations,
}

/// A model the voice defines that will not run, and why
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedModel {
    pub role: ModelRole,
    pub reason: String,
}

/// What running a schedule did
#[derive(Debug, Clone, Default)]
pub struct ScheduleRun {
    pub applied: Vec<ModelRole>,
    pub timings: Vec<SegmentTiming>,
}

/// Ordered plan of model applications for one voice
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Schedule {
    steps: Vec<ScheduledStep>,
    skipped: Vec<SkippedModel>,
}

impl Schedule {
    /// Plan the steps for `bundle`.
    ///
    /// A bundle without a duration model yields an empty schedule. Cyclic
    /// extension declarations, and unrecognized extensions under
    /// [`UnrecognizedModelPolicy::Fail`], are errors.
    pub fn plan(bundle: &VoiceModelBundle, policy: UnrecognizedModelPolicy) -> Result<Self> {
        let mut schedule = Schedule::default();

        if !bundle.has_model(&ModelRole::Duration) {
            log::debug!(
                "Voice {} defines no duration model; nothing to schedule",
                bundle.name()
            );
            return Ok(schedule);
        }

        schedule.push(Invocation::fixed(
            ModelRole::Duration,
            CollectionName::Segments,
            None,
        ));
        // normalized durations must be in place before anything reads them
        schedule.steps.push(ScheduledStep::NormalizeDurations);

        if bundle.has_model(&ModelRole::LeftF0) {
            let f0_group = [
                Invocation::fixed(
                    ModelRole::LeftF0,
                    CollectionName::FirstVoicedSegments,
                    Some(CollectionName::FirstVowels),
                ),
                Invocation::fixed(ModelRole::MidF0, CollectionName::FirstVowels, None),
                Invocation::fixed(
                    ModelRole::RightF0,
                    CollectionName::LastVoicedSegments,
                    Some(CollectionName::FirstVowels),
                ),
                Invocation::fixed(ModelRole::Boundary, CollectionName::Boundaries, None),
            ];
            for invocation in f0_group {
                if bundle.has_model(&invocation.role) {
                    schedule.push(invocation);
                } else {
                    schedule.skip(invocation.role, "not defined by voice");
                }
            }
        } else {
            for role in [ModelRole::MidF0, ModelRole::RightF0, ModelRole::Boundary] {
                if bundle.has_model(&role) {
                    schedule.skip(role, "F0 group disabled: no leftF0 model");
                }
            }
        }

        for invocation in order_extensions(bundle, policy, &mut schedule.skipped)? {
            schedule.push(invocation);
        }

        Ok(schedule)
    }

    fn push(&mut self, invocation: Invocation) {
        self.steps.push(ScheduledStep::Apply(invocation));
    }

    fn skip(&mut self, role: ModelRole, reason: &str) {
        log::debug!("Not applying {}: {}", role, reason);
        self.skipped.push(SkippedModel {
            role,
            reason: reason.to_string(),
        });
    }

    pub fn steps(&self) -> &[ScheduledStep] {
        &self.steps
    }

    pub fn skipped(&self) -> &[SkippedModel] {
        &self.skipped
    }

    /// False when the voice provides no annotation at all
    pub fn is_configured(&self) -> bool {
        !self.steps.is_empty()
    }

    /// Roles in application order
    pub fn roles(&self) -> Vec<&ModelRole> {
        self.steps
            .iter()
            .filter_map(|step| match step {
                ScheduledStep::Apply(invocation) => Some(&invocation.role),
                ScheduledStep::NormalizeDurations => None,
            })
            .collect()
    }

    /// Execute the plan against `tree`.
    ///
    /// Model failures propagate immediately; steps after a failing model are
    /// not run.
    pub fn run(
        &self,
        bundle: &VoiceModelBundle,
        tree: &mut MarkupTree,
        collections: &ElementCollections,
        normalizer: &DurationNormalizer,
    ) -> Result<ScheduleRun> {
        let mut run = ScheduleRun::default();

        for step in &self.steps {
            match step {
                ScheduledStep::NormalizeDurations => {
                    log::debug!("Stage: {}", PipelineStage::DurationNormalization.name());
                    run.timings = normalizer.normalize(tree, collections.segments())?;
                }
                ScheduledStep::Apply(invocation) => {
                    let model = bundle.model(&invocation.role).ok_or_else(|| {
                        Error::Schedule(format!(
                            "scheduled model {} is missing from voice {}",
                            invocation.role,
                            bundle.name()
                        ))
                    })?;

                    let input = match invocation.target {
                        ModelTarget::Document => ModelInput::Document,
                        ModelTarget::Collection(target) => ModelInput::Elements {
                            target: collections.get(target),
                            context: invocation.context.map(|c| collections.get(c)),
                        },
                    };

                    log::debug!("Applying {} model to {}", invocation.role, invocation.target);
                    model.apply(tree, input)?;
                    run.applied.push(invocation.role.clone());
                }
            }
        }

        Ok(run)
    }
}

/// Order extension models so each runs after the extensions it declares.
///
/// Kahn's algorithm, always picking the earliest-registered ready model, so
/// independent extensions keep their registration order. Dependencies on
/// fixed roles are satisfied by construction; dependencies on extensions the
/// voice does not define are ignored.
fn order_extensions(
    bundle: &VoiceModelBundle,
    policy: UnrecognizedModelPolicy,
    skipped: &mut Vec<SkippedModel>,
) -> Result<Vec<Invocation>> {
    let mut pending = Vec::new();
    for other in bundle.others() {
        match other.spec() {
            Some(spec) => pending.push((other.name(), spec)),
            None => match policy {
                UnrecognizedModelPolicy::Fail => {
                    return Err(Error::UnrecognizedModel(other.name().to_string()));
                }
                UnrecognizedModelPolicy::Ignore => {
                    log::warn!(
                        "Ignoring model '{}' of voice {}: no target or ordering declared",
                        other.name(),
                        bundle.name()
                    );
                    skipped.push(SkippedModel {
                        role: ModelRole::Other(other.name().to_string()),
                        reason: "unrecognized model without declaration".into(),
                    });
                }
            },
        }
    }

    let present: HashSet<&str> = pending.iter().map(|(name, _)| *name).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let ready = pending.iter().position(|(_, spec)| {
            spec.runs_after.iter().all(|dep| match dep {
                ModelRole::Other(dep) => {
                    !present.contains(dep.as_str()) || placed.contains(dep.as_str())
                }
                _ => true,
            })
        });

        let Some(index) = ready else {
            let names: Vec<&str> = pending.iter().map(|(name, _)| *name).collect();
            return Err(Error::Schedule(format!(
                "cyclic ordering between models: {}",
                names.join(", ")
            )));
        };

        let (name, spec) = pending.remove(index);
        placed.insert(name);
        ordered.push(Invocation {
            role: ModelRole::Other(name.to_string()),
            target: spec.target,
            context: None,
        });
    }

    Ok(ordered)
}
