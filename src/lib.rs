//! Acoustic Modeller - prosody annotation for speech synthesis markup
//!
//! Takes a linguistic markup tree (syllables, phones, phrase boundaries),
//! finds the anchor elements acoustic models need, applies a voice's
//! duration, F0 and boundary models in a fixed order, and converts predicted
//! durations into cumulative millisecond timing.
//!
//! # Example
//! ```no_run
//! use acoustic_modeller::{AcousticModeller, Config, MarkupTree};
//!
//! let config = Config::load("config.yaml").unwrap();
//! let modeller = AcousticModeller::from_config(&config).unwrap();
//!
//! let json = std::fs::read_to_string("utterance.json").unwrap();
//! let tree = MarkupTree::from_json(&json).unwrap();
//! let params = modeller.process(tree, None).unwrap();
//! println!("{}", params.tree.to_json_pretty().unwrap());
//! ```

pub mod anchor;
pub mod config;
pub mod error;
pub mod markup;
pub mod model;
pub mod phonology;
pub mod pipeline;
pub mod timing;

pub use anchor::{AnchorExtractor, CollectionName, ElementCollections, TraversalReport};
pub use config::Config;
pub use error::{Error, Result};
pub use markup::{MarkupTree, NodeId, NodeKind, NodeSpec};
pub use model::{Model, ModelInput, ModelRole, VoiceModelBundle};
pub use pipeline::{AcousticModeller, AcousticParams, PipelineReport};
pub use timing::{DurationNormalizer, RoundingMode, SegmentTiming};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
