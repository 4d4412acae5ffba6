//! Pipeline orchestrator: classify, merge overrides, correct, and package
//! the result as a gate-id record.

use serde::Serialize;
use tracing::{debug, info};

use crate::classify::{classify_with_scores, ScoreStack};
use crate::config::ClassifierConfig;
use crate::error::Result;
use crate::fields::FieldStore;
use crate::labels::{GateIdRecord, LabelField};
use crate::melting::{
    correct_rain_above_melting, estimate_freezing_level, FreezingLevelConfig, MeltingLayerClasses,
};
use crate::overrides::apply_override_rules;
use crate::presets::{HEIGHT, SOUNDING_TEMPERATURE};

// ── Output ────────────────────────────────────────────────────────────────────

/// Everything one pipeline run produces for a volume.
#[derive(Debug, Clone)]
pub struct GateIdResult {
    pub labels: LabelField,
    pub record: GateIdRecord,
    /// Constrained fuzzy scores, when requested.
    pub scores: Option<ScoreStack>,
    /// Freezing level in metres, when requested and a sounding is present.
    pub freezing_level: Option<f32>,
    /// Whether the rain-above-melting correction ran.
    pub corrected: bool,
}

/// Serialisable subset of [`GateIdResult`].
#[derive(Debug, Serialize)]
pub struct GateIdOutput<'a> {
    pub gate_id: &'a GateIdRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freezing_level: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreExport<'a>>,
}

/// Scores keyed by category name, row-major per category.
#[derive(Debug, Serialize)]
pub struct ScoreExport<'a> {
    pub rays: usize,
    pub gates: usize,
    pub categories: Vec<CategoryScores<'a>>,
}

#[derive(Debug, Serialize)]
pub struct CategoryScores<'a> {
    pub name: &'a str,
    pub data: &'a [f32],
}

impl GateIdResult {
    pub fn output(&self) -> GateIdOutput<'_> {
        GateIdOutput {
            gate_id: &self.record,
            freezing_level: self.freezing_level,
            scores: self.scores.as_ref().map(|s| ScoreExport {
                rays: s.rays,
                gates: s.gates,
                categories: s
                    .categories
                    .iter()
                    .zip(&s.scores)
                    .map(|(name, f)| CategoryScores {
                        name,
                        data: &f.data,
                    })
                    .collect(),
            }),
        }
    }
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct GateIdPipeline {
    config: ClassifierConfig,
    keep_scores: bool,
    freezing_level: Option<FreezingLevelConfig>,
}

impl GateIdPipeline {
    pub fn new(config: ClassifierConfig) -> Self {
        Self {
            config,
            keep_scores: false,
            freezing_level: None,
        }
    }

    /// Keep the score stack in the result.
    pub fn with_scores(mut self, keep: bool) -> Self {
        self.keep_scores = keep;
        self
    }

    /// Also estimate the freezing level from `height` and
    /// `sounding_temperature`.
    pub fn with_freezing_level(mut self, cfg: FreezingLevelConfig) -> Self {
        self.freezing_level = Some(cfg);
        self
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Run every stage on one volume.
    ///
    /// Stage order:
    ///   1. Fuzzy classification
    ///   2. Override detectors named in the configuration
    ///   3. Rain-above-melting correction (when rain, melting and snow exist)
    ///   4. Freezing-level estimate (optional)
    pub fn run(&self, store: &FieldStore) -> Result<GateIdResult> {
        // ── 1. Fuzzy classification ─────────────────────────────────────────
        let classification = classify_with_scores(store, &self.config)?;
        let mut labels = classification.labels;

        // ── 2. Overrides ────────────────────────────────────────────────────
        apply_override_rules(&mut labels, store, &self.config.overrides, self.config.overlap)?;

        // ── 3. Physical correction ──────────────────────────────────────────
        let classes = MeltingLayerClasses::resolve(&labels).ok();
        let corrected = classes.is_some();
        match classes {
            Some(c) => labels = correct_rain_above_melting(&labels, c),
            None => debug!("rain/melting/snow not all present, skipping correction"),
        }

        // ── 4. Freezing level ───────────────────────────────────────────────
        let freezing_level = match (self.freezing_level, classes) {
            (Some(cfg), Some(c)) => match (store.get(HEIGHT), store.get(SOUNDING_TEMPERATURE)) {
                (Some(h), Some(t)) => estimate_freezing_level(&labels, c.melting, h, t, cfg)?,
                _ => {
                    debug!("no height/sounding fields, skipping freezing level");
                    None
                }
            },
            _ => None,
        };

        let record = GateIdRecord::from(&labels);
        info!(
            notes = %record.notes,
            valid_max = record.valid_max,
            corrected,
            ?freezing_level,
            "gate id complete"
        );

        Ok(GateIdResult {
            labels,
            record,
            scores: self.keep_scores.then_some(classification.scores),
            freezing_level,
            corrected,
        })
    }
}

impl Default for GateIdPipeline {
    fn default() -> Self {
        Self::new(ClassifierConfig::default())
    }
}
