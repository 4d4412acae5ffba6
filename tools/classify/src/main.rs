/// Gate identification tool: reads a JSON field store for one radar volume,
/// runs the fuzzy classifier with overrides and melting-layer correction,
/// and writes the gate-id record as JSON.
///
/// Field store format:
///   {"rays": R, "gates": G, "fields": {"velocity_texture": [..R*G values..], ...}}
/// `null` values are read as missing data.
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use gate_id_core::presets::PRESET_NAMES;
use gate_id_core::{ClassifierConfig, FieldStore, FreezingLevelConfig, GateIdPipeline, GateIdResult};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI ──────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(
    name = "classify",
    about = "Classify radar gates by dominant scatterer and write a gate_id record"
)]
struct Args {
    /// Field store JSON for one volume
    #[arg(short, long)]
    fields: PathBuf,

    /// Classifier configuration JSON (overrides --preset)
    #[arg(short, long, conflicts_with = "preset")]
    config: Option<PathBuf>,

    /// Named site preset
    #[arg(short, long, default_value = "default")]
    preset: String,

    /// Velocity-texture breakpoints (start end) for the default table
    #[arg(long, num_args = 2, value_names = ["START", "END"], conflicts_with = "config")]
    texture: Option<Vec<f32>>,

    /// Output path (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Include the constrained per-category scores in the output
    #[arg(long)]
    scores: bool,

    /// Estimate the freezing level from height and sounding_temperature
    #[arg(long)]
    freezing_level: bool,

    /// More log output (-v info, -vv debug, -vvv trace). RUST_LOG wins if set.
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn load_config(args: &Args) -> Result<ClassifierConfig> {
    if let Some(path) = &args.config {
        return ClassifierConfig::from_json_file(path)
            .with_context(|| format!("Cannot load config {}", path.display()));
    }
    if let Some(tex) = &args.texture {
        if args.preset != "default" {
            bail!("--texture only applies to the default preset");
        }
        let config = ClassifierConfig::with_texture_thresholds(tex[0], tex[1]);
        config.validate().context("Invalid texture breakpoints")?;
        return Ok(config);
    }
    ClassifierConfig::preset(&args.preset).with_context(|| {
        format!(
            "Unknown preset `{}` (available: {})",
            args.preset,
            PRESET_NAMES.join(", ")
        )
    })
}

fn print_summary(result: &GateIdResult) {
    let labels = &result.labels;
    let total = labels.data.len().max(1);
    eprintln!("[classify] {} rays × {} gates", labels.rays, labels.gates);
    for (name, count) in labels.categories.iter().zip(labels.counts()) {
        eprintln!(
            "  {:<18} {:>9}  ({:5.1}%)",
            name,
            count,
            100.0 * count as f64 / total as f64
        );
    }
    if let Some(fzl) = result.freezing_level {
        eprintln!("  freezing level     {fzl:.0} m");
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = load_config(&args)?;

    let fields_text = fs::read_to_string(&args.fields)
        .with_context(|| format!("Cannot read {}", args.fields.display()))?;
    let store = FieldStore::from_json_str(&fields_text)
        .with_context(|| format!("Failed to parse field store {}", args.fields.display()))?;
    info!(fields = store.len(), shape = ?store.shape(), "loaded field store");

    let mut pipeline = GateIdPipeline::new(config).with_scores(args.scores);
    if args.freezing_level {
        pipeline = pipeline.with_freezing_level(FreezingLevelConfig::default());
    }
    let result = pipeline
        .run(&store)
        .with_context(|| format!("Classification failed for {}", args.fields.display()))?;

    let json = serde_json::to_string_pretty(&result.output())?;
    match &args.output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Cannot write {}", path.display()))?;
            eprintln!("[classify] Wrote {}", path.display());
        }
        None => {
            let mut out = io::stdout().lock();
            out.write_all(json.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }

    print_summary(&result);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preset_and_config_conflict() {
        let err = Args::try_parse_from([
            "classify", "--fields", "v.json", "--config", "c.json", "--preset", "nsa_xsapr_ppi",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn texture_takes_two_values() {
        let args =
            Args::try_parse_from(["classify", "-f", "v.json", "--texture", "1.5", "1.8"]).unwrap();
        assert_eq!(args.texture, Some(vec![1.5, 1.8]));
        let config = load_config(&args).unwrap();
        assert_eq!(config, ClassifierConfig::with_texture_thresholds(1.5, 1.8));
    }

    #[test]
    fn unknown_preset_lists_available() {
        let args = Args::try_parse_from(["classify", "-f", "v.json", "-p", "nowhere"]).unwrap();
        let msg = format!("{:#}", load_config(&args).unwrap_err());
        assert!(msg.contains("default"), "{msg}");
    }

    #[test]
    fn verbosity_counts() {
        let args = Args::try_parse_from(["classify", "-f", "v.json", "-vv"]).unwrap();
        assert_eq!(args.verbose, 2);
    }
}
