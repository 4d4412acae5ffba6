//! Fuzzy-logic gate identification for polarimetric radar volumes.
//!
//! Every gate of a ray × gate grid is assigned the scatterer category
//! (rain, snow, melting layer, multi-trip echo, no scatter, …) whose weighted
//! trapezoidal membership score is highest, after median smoothing and hard
//! physical constraints. External clutter / blockage masks can then be merged
//! in as extra categories, and rain above the melting layer is relabelled as
//! snow.

pub mod classify;
pub mod config;
pub mod error;
pub mod fields;
pub mod gate_filter;
pub mod labels;
pub mod melting;
pub mod membership;
pub mod overrides;
pub mod pipeline;
pub mod presets;
pub mod scoring;

mod rows;

pub use classify::{classify, classify_with_scores, Classification, ScoreStack};
pub use config::{
    Category, ClassifierConfig, HardConstraint, OverlapPolicy, OverrideRule, SmoothingWindow, Term,
};
pub use error::{GateIdError, Result};
pub use fields::{Field, FieldStore};
pub use gate_filter::GateFilter;
pub use labels::{parse_notes, GateIdRecord, LabelField};
pub use melting::{
    correct_rain_above_melting, estimate_freezing_level, FreezingLevelConfig, MeltingLayerClasses,
};
pub use membership::{trapezoid, MembershipSpec};
pub use overrides::{apply_override_rules, Detector, OverrideLayer};
pub use pipeline::{GateIdOutput, GateIdPipeline, GateIdResult};
