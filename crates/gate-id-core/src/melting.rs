//! Melting-layer physics applied after classification.
//!
//! Rain cannot sit above the melting layer, so any rain gate at or beyond the
//! farthest melting gate of its ray is relabelled as snow. The same labels
//! also give a freezing-level estimate when combined with a sounding.

use tracing::debug;

use crate::error::{GateIdError, Result};
use crate::fields::Field;
use crate::labels::LabelField;
use crate::rows::for_each_row_mut;

/// Indices of the three categories the corrector needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeltingLayerClasses {
    pub rain: i32,
    pub melting: i32,
    pub snow: i32,
}

impl MeltingLayerClasses {
    /// Look up `rain`, `melting` and `snow` by name.
    pub fn resolve(labels: &LabelField) -> Result<Self> {
        Ok(Self {
            rain: labels.require("rain")?,
            melting: labels.require("melting")?,
            snow: labels.require("snow")?,
        })
    }
}

/// Return a copy of `labels` where, per ray, every rain gate at index
/// `>= m` (the farthest melting gate) is snow. Rays without a melting gate
/// are copied unchanged.
pub fn correct_rain_above_melting(labels: &LabelField, classes: MeltingLayerClasses) -> LabelField {
    let mut out = labels.clone();
    let gates = out.gates;
    for_each_row_mut(&mut out.data, gates, |_, row| {
        let Some(m) = row.iter().rposition(|&l| l == classes.melting) else {
            return;
        };
        for label in &mut row[m..] {
            if *label == classes.rain {
                *label = classes.snow;
            }
        }
    });

    let changed = labels
        .data
        .iter()
        .zip(&out.data)
        .filter(|(a, b)| a != b)
        .count();
    debug!(changed, "rain above melting layer relabelled as snow");
    out
}

// ── Freezing level ────────────────────────────────────────────────────────────

/// Bounds for [`estimate_freezing_level`], in metres.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FreezingLevelConfig {
    /// Estimates above this are treated as implausible.
    pub ceiling_m: f32,
    /// Returned instead of an implausible estimate.
    pub fallback_m: f32,
}

impl Default for FreezingLevelConfig {
    fn default() -> Self {
        Self {
            ceiling_m: 5000.0,
            fallback_m: 3500.0,
        }
    }
}

/// Freezing level from the sounding, nudged toward the lowest melting gate.
///
/// The sounding level is the lowest height with temperature below 0 °C.
/// When any gate is labelled `melting_index` the estimate is the mean of
/// that level and the lowest melting-gate height. Estimates above
/// `cfg.ceiling_m` become `cfg.fallback_m`. `None` when no gate is below
/// freezing.
pub fn estimate_freezing_level(
    labels: &LabelField,
    melting_index: i32,
    height: &Field,
    temperature: &Field,
    cfg: FreezingLevelConfig,
) -> Result<Option<f32>> {
    for (name, field) in [("height", height), ("sounding_temperature", temperature)] {
        if field.shape() != labels.shape() {
            return Err(GateIdError::ShapeMismatch {
                field: name.to_string(),
                expected: labels.shape(),
                found: field.shape(),
            });
        }
    }

    let Some(sounding) = lowest(
        height
            .data
            .iter()
            .zip(&temperature.data)
            .filter(|&(_, &t)| t < 0.0)
            .map(|(&h, _)| h),
    ) else {
        return Ok(None);
    };

    let melting = lowest(
        height
            .data
            .iter()
            .zip(&labels.data)
            .filter(|&(_, &l)| l == melting_index)
            .map(|(&h, _)| h),
    );

    let fzl = match melting {
        Some(m) => (m + sounding) / 2.0,
        None => sounding,
    };
    debug!(sounding, ?melting, fzl, "freezing level");
    Ok(Some(if fzl > cfg.ceiling_m { cfg.fallback_m } else { fzl }))
}

fn lowest(heights: impl Iterator<Item = f32>) -> Option<f32> {
    heights.filter(|h| h.is_finite()).min_by(f32::total_cmp)
}
