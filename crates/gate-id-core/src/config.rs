//! Classifier configuration: categories, hard constraints, smoothing window
//! and override rules.
//!
//! Category order is significant. It fixes each category's label index and
//! the argmax tie-break, so categories live in a `Vec`, never a map.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GateIdError, Result};
use crate::membership::MembershipSpec;
use crate::presets;

/// One weighted membership term of a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub field: String,
    #[serde(flatten)]
    pub spec: MembershipSpec,
}

/// In JSON, `terms` is either a list of `{"field", "breakpoints", "weight"}`
/// objects or a `{field: [[a, b, c, d], weight]}` table. Table terms are
/// taken in field-name order; term order never changes a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(deserialize_with = "terms_list_or_table")]
    pub terms: Vec<Term>,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            terms: Vec::new(),
        }
    }

    /// Append a term; builder style.
    pub fn term(mut self, field: impl Into<String>, breakpoints: [f32; 4], weight: f32) -> Self {
        self.terms.push(Term {
            field: field.into(),
            spec: MembershipSpec::new(breakpoints, weight),
        });
        self
    }
}

/// Forces `category`'s score to 0 wherever `range.0 <= field <= range.1`.
/// Also reads from a `[category, field, [low, high]]` triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "HardConstraintRepr")]
pub struct HardConstraint {
    pub category: String,
    pub field: String,
    pub range: (f32, f32),
}

impl HardConstraint {
    pub fn new(category: impl Into<String>, field: impl Into<String>, low: f32, high: f32) -> Self {
        Self {
            category: category.into(),
            field: field.into(),
            range: (low, high),
        }
    }
}

// ── Serde helpers ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
#[serde(untagged)]
enum TermsRepr {
    List(Vec<Term>),
    Table(BTreeMap<String, ([f32; 4], f32)>),
}

fn terms_list_or_table<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<Term>, D::Error> {
    Ok(match TermsRepr::deserialize(d)? {
        TermsRepr::List(terms) => terms,
        TermsRepr::Table(table) => table
            .into_iter()
            .map(|(field, (breakpoints, weight))| Term {
                field,
                spec: MembershipSpec::new(breakpoints, weight),
            })
            .collect(),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum HardConstraintRepr {
    Named {
        category: String,
        field: String,
        range: (f32, f32),
    },
    Triple(String, String, (f32, f32)),
}

impl From<HardConstraintRepr> for HardConstraint {
    fn from(repr: HardConstraintRepr) -> Self {
        match repr {
            HardConstraintRepr::Named {
                category,
                field,
                range,
            }
            | HardConstraintRepr::Triple(category, field, range) => Self {
                category,
                field,
                range,
            },
        }
    }
}

/// Median-filter window in rays × gates. 1×1 disables smoothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmoothingWindow {
    pub rays: usize,
    pub gates: usize,
}

impl SmoothingWindow {
    pub const NONE: SmoothingWindow = SmoothingWindow { rays: 1, gates: 1 };

    pub fn is_identity(&self) -> bool {
        self.rays == 1 && self.gates == 1
    }
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self { rays: 3, gates: 4 }
    }
}

/// How an override treats gates already claimed by an earlier override.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Later detectors relabel gates claimed by earlier ones.
    #[default]
    Overwrite,
    /// Gates claimed by an earlier override keep that label.
    KeepEarlier,
}

/// An externally detected binary field merged in as a new category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverrideRule {
    /// Category name appended to the label mapping, e.g. `clutter`.
    pub name: String,
    /// Field-store name of the 0/1 detector field.
    pub field: String,
    /// Categories at which the detector is ignored.
    #[serde(default)]
    pub suppress_on: Vec<String>,
}

impl OverrideRule {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            suppress_on: Vec::new(),
        }
    }

    pub fn suppress_on<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.suppress_on.extend(categories.into_iter().map(Into::into));
        self
    }
}

/// Full classifier configuration for one radar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    pub categories: Vec<Category>,
    #[serde(default)]
    pub hard_constraints: Vec<HardConstraint>,
    #[serde(default)]
    pub smoothing: SmoothingWindow,
    #[serde(default)]
    pub overrides: Vec<OverrideRule>,
    #[serde(default)]
    pub overlap: OverlapPolicy,
}

impl Default for ClassifierConfig {
    /// Default five-category table with texture breakpoints 2.0 / 2.1.
    fn default() -> Self {
        presets::default_config()
    }
}

impl ClassifierConfig {
    /// Default table with custom velocity-texture breakpoints.
    pub fn with_texture_thresholds(tex_start: f32, tex_end: f32) -> Self {
        presets::texture_config(tex_start, tex_end)
    }

    /// Look up a named site preset.
    pub fn preset(name: &str) -> Result<Self> {
        presets::by_name(name).ok_or_else(|| GateIdError::UnknownPreset(name.to_string()))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: ClassifierConfig = serde_json::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn category_names(&self) -> Vec<String> {
        self.categories.iter().map(|c| c.name.clone()).collect()
    }

    pub fn category_index(&self, name: &str) -> Option<usize> {
        self.categories.iter().position(|c| c.name == name)
    }

    /// Every field name a classification run will read, deduplicated, in
    /// first-use order.
    pub fn required_fields(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.categories
            .iter()
            .flat_map(|c| c.terms.iter().map(|t| t.field.as_str()))
            .chain(self.hard_constraints.iter().map(|h| h.field.as_str()))
            .filter(|f| seen.insert(*f))
            .collect()
    }

    /// Structural checks that need no field data.
    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(GateIdError::NoCategories);
        }

        let mut names = HashSet::new();
        for cat in &self.categories {
            if !names.insert(cat.name.as_str()) {
                return Err(GateIdError::DuplicateCategory(cat.name.clone()));
            }
            for term in &cat.terms {
                term.spec.validate(&cat.name, &term.field)?;
            }
        }

        for hc in &self.hard_constraints {
            if !names.contains(hc.category.as_str()) {
                return Err(GateIdError::UnknownCategory {
                    context: format!("hard constraint on `{}`", hc.field),
                    category: hc.category.clone(),
                });
            }
            let (low, high) = hc.range;
            if !(low <= high) {
                return Err(GateIdError::InvertedRange {
                    category: hc.category.clone(),
                    field: hc.field.clone(),
                    low,
                    high,
                });
            }
        }

        if self.smoothing.rays == 0 || self.smoothing.gates == 0 {
            return Err(GateIdError::ZeroWindow {
                rays: self.smoothing.rays,
                gates: self.smoothing.gates,
            });
        }

        // Override names extend the category namespace in application order.
        for rule in &self.overrides {
            for s in &rule.suppress_on {
                if !names.contains(s.as_str()) {
                    return Err(GateIdError::UnknownCategory {
                        context: format!("override `{}`", rule.name),
                        category: s.clone(),
                    });
                }
            }
            if !names.insert(rule.name.as_str()) {
                return Err(GateIdError::OverrideConflict(rule.name.clone()));
            }
        }

        Ok(())
    }
}
