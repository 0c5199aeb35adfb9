//! Acoustic Modeller CLI
//!
//! Annotates JSON markup trees with durations, F0 targets and pauses

use acoustic_modeller::{
    markup::MarkupTree,
    phonology::{FeatureSet, LocaleFeatureResolver},
    pipeline::ScheduledStep,
    AcousticModeller, Config, Error, Result,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "acoustic-modeller",
    about = "Prosody annotation for speech synthesis markup",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Annotate a markup tree (JSON) with acoustic parameters
    Annotate {
        /// Input tree (JSON)
        #[arg(short, long)]
        input: PathBuf,

        /// Output path; stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Voice to use when the document does not name one
        #[arg(short = 'v', long)]
        voice: Option<String>,

        /// Write the run report (JSON) to this path
        #[arg(short, long)]
        report: Option<PathBuf>,
    },

    /// Generate default configuration file
    InitConfig {
        /// Output path for config file
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },

    /// Show configured voices and their model schedules
    Info {
        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// List the phone inventory of a locale
    Phones {
        /// Locale tag, e.g. en-US
        #[arg(short, long, default_value = "en")]
        locale: String,

        /// Configuration file path
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<Config> {
    match path {
        Some(path) => {
            log::info!("Loading configuration from {}", path.display());
            Config::load(path)
        }
        None => Ok(Config::with_builtin_voices()),
    }
}

fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Annotate {
            input,
            output,
            config,
            voice,
            report,
        } => {
            let cfg = load_config(config)?;
            let modeller = AcousticModeller::from_config(&cfg)?;

            log::info!("Input: {}", input.display());
            let json = std::fs::read_to_string(&input)?;
            let tree = MarkupTree::from_json(&json)?;

            let params = modeller.process(tree, voice.as_deref())?;
            let annotated = params.tree.to_json_pretty()?;

            match &output {
                Some(path) => {
                    std::fs::write(path, annotated)?;
                    println!("✓ Annotated with voice {}: {}", params.voice, path.display());
                }
                None => println!("{}", annotated),
            }

            if let Some(path) = report {
                let content = serde_json::to_string_pretty(&params.report)?;
                std::fs::write(&path, content)?;
                log::info!("Report written to {}", path.display());
            }

            log::info!(
                "Voice: {}, segments: {}, duration: {:.3}s, processing time: {:.2}ms",
                params.voice,
                params.report.segment_count,
                params.report.total_seconds,
                params.report.processing_ms
            );
        }

        Commands::InitConfig { output } => {
            log::info!("Creating default configuration...");

            Config::create_default(&output)?;

            println!("✓ Configuration saved to: {}", output.display());
        }

        Commands::Info { config } => {
            let cfg = load_config(config)?;
            let modeller = AcousticModeller::from_config(&cfg)?;

            println!("Acoustic Modeller - prosody annotation for TTS markup");
            println!("=====================================================");
            println!("Version: {}", acoustic_modeller::VERSION);
            println!("Rounding: {:?}", modeller.config().rounding);
            println!("Unrecognized models: {:?}", modeller.config().unrecognized_models);
            println!();

            for name in modeller.voices().names() {
                let Some(voice) = modeller.voices().get(name) else {
                    continue;
                };
                let schedule = modeller.plan(&voice)?;
                println!("Voice {} ({})", voice.name(), voice.locale());
                if !schedule.is_configured() {
                    println!("  no duration model; documents pass through unchanged");
                }
                for step in schedule.steps() {
                    match step {
                        ScheduledStep::Apply(invocation) => match invocation.context {
                            Some(context) => println!(
                                "  {} -> {} (context {})",
                                invocation.role, invocation.target, context
                            ),
                            None => println!("  {} -> {}", invocation.role, invocation.target),
                        },
                        ScheduledStep::NormalizeDurations => println!("  normalize durations"),
                    }
                }
                for skipped in schedule.skipped() {
                    println!("  skipped {}: {}", skipped.role, skipped.reason);
                }
            }
        }

        Commands::Phones { locale, config } => {
            let cfg = load_config(config)?;
            let mut resolver = if cfg.phonology.builtin_sets {
                LocaleFeatureResolver::with_builtin_sets()
            } else {
                LocaleFeatureResolver::new()
            };
            for path in &cfg.phonology.allophone_sets {
                resolver.register_file(path)?;
            }

            let set = resolver
                .for_locale(&locale)
                .ok_or_else(|| Error::FeatureSetNotFound(locale.clone()))?;

            println!("{} ({} phones)", set.name(), set.len());
            for symbol in set.symbols() {
                if let Some(class) = set.classify(symbol) {
                    let voicing = if class.voiced { "voiced" } else { "unvoiced" };
                    let kind = if class.vowel { "vowel" } else { "consonant" };
                    println!("  {:<4} {:<9} {}", symbol, voicing, kind);
                }
            }
        }
    }

    Ok(())
}
