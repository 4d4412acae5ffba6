//! Built-in membership tables for the radars the classifier ships tuned for.
//!
//! Each term is `field: [a, b, c, d], weight`. Zero-weight terms are kept so
//! every category reads the same feature set; a missing field still fails
//! the run even when its weight is 0.

use crate::config::{
    Category, ClassifierConfig, HardConstraint, OverlapPolicy, OverrideRule, SmoothingWindow,
};

pub const VELOCITY_TEXTURE: &str = "velocity_texture";
pub const CROSS_CORRELATION_RATIO: &str = "cross_correlation_ratio";
pub const NORMALIZED_COHERENT_POWER: &str = "normalized_coherent_power";
pub const HEIGHT: &str = "height";
pub const SOUNDING_TEMPERATURE: &str = "sounding_temperature";
pub const SIGNAL_TO_NOISE_RATIO: &str = "signal_to_noise_ratio";
/// Clutter mask name in generic exports.
pub const CLUTTER: &str = "clutter";
/// Clutter mask name in the ARM site exports (CSAPR2, XSAPR).
pub const GROUND_CLUTTER: &str = "ground_clutter";

/// Preset names accepted by [`by_name`].
pub const PRESET_NAMES: [&str; 4] = [
    "default",
    "cacti_csapr2_ppi",
    "tracer_csapr2_ppi",
    "nsa_xsapr_ppi",
];

pub fn by_name(name: &str) -> Option<ClassifierConfig> {
    match name {
        "default" => Some(default_config()),
        "cacti_csapr2_ppi" | "tracer_csapr2_ppi" => Some(csapr2_config()),
        "nsa_xsapr_ppi" => Some(nsa_xsapr_config()),
        _ => None,
    }
}

pub fn default_config() -> ClassifierConfig {
    texture_config(2.0, 2.1)
}

/// Constraints shared by every shipped table.
fn default_hard_constraints() -> Vec<HardConstraint> {
    vec![
        HardConstraint::new("melting", SOUNDING_TEMPERATURE, 10.0, 100.0),
        HardConstraint::new("multi_trip", HEIGHT, 10_000.0, 1_000_000.0),
        HardConstraint::new("melting", SOUNDING_TEMPERATURE, -10_000.0, -2.0),
        HardConstraint::new("rain", SOUNDING_TEMPERATURE, -1_000.0, -5.0),
        HardConstraint::new("melting", VELOCITY_TEXTURE, 3.0, 300.0),
    ]
}

/// Clutter then terrain blockage. `clutter_field` is the store name of the
/// clutter mask, which differs between exports.
fn overrides_reading(clutter_field: &str) -> Vec<OverrideRule> {
    vec![
        OverrideRule::new("clutter", clutter_field).suppress_on(["multi_trip", "no_scatter"]),
        OverrideRule::new("terrain_blockage", "terrain_blockage"),
    ]
}

/// Five-category table parameterised on the velocity-texture edge.
/// Texture below `tex_start` favours meteorological echo; above `tex_end`
/// favours multi-trip and no-scatter.
pub fn texture_config(tex_start: f32, tex_end: f32) -> ClassifierConfig {
    let multi_trip = Category::new("multi_trip")
        .term(VELOCITY_TEXTURE, [tex_start, tex_end, 130.0, 130.0], 4.0)
        .term(CROSS_CORRELATION_RATIO, [0.5, 0.7, 1.0, 1.0], 0.0)
        .term(NORMALIZED_COHERENT_POWER, [0.0, 0.0, 0.5, 0.6], 1.0)
        .term(HEIGHT, [0.0, 0.0, 5000.0, 8000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [-100.0, -100.0, 100.0, 100.0], 0.0)
        .term(SIGNAL_TO_NOISE_RATIO, [5.0, 10.0, 1000.0, 1000.0], 1.0);

    let rain = Category::new("rain")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, tex_start, tex_end], 1.0)
        .term(CROSS_CORRELATION_RATIO, [0.97, 0.98, 1.0, 1.0], 1.0)
        .term(NORMALIZED_COHERENT_POWER, [0.4, 0.5, 1.0, 1.0], 1.0)
        .term(HEIGHT, [0.0, 0.0, 5000.0, 6000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [2.0, 5.0, 100.0, 100.0], 2.0)
        .term(SIGNAL_TO_NOISE_RATIO, [8.0, 10.0, 1000.0, 1000.0], 1.0);

    let snow = Category::new("snow")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, tex_start, tex_end], 1.0)
        .term(CROSS_CORRELATION_RATIO, [0.65, 0.9, 1.0, 1.0], 1.0)
        .term(NORMALIZED_COHERENT_POWER, [0.4, 0.5, 1.0, 1.0], 1.0)
        .term(HEIGHT, [0.0, 0.0, 25_000.0, 25_000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [-100.0, -100.0, 0.5, 4.0], 2.0)
        .term(SIGNAL_TO_NOISE_RATIO, [8.0, 10.0, 1000.0, 1000.0], 1.0);

    let no_scatter = Category::new("no_scatter")
        .term(VELOCITY_TEXTURE, [tex_start, tex_end, 330.0, 330.0], 2.0)
        .term(CROSS_CORRELATION_RATIO, [0.0, 0.0, 0.1, 0.2], 0.0)
        .term(NORMALIZED_COHERENT_POWER, [0.0, 0.0, 0.1, 0.2], 0.0)
        .term(HEIGHT, [0.0, 0.0, 25_000.0, 25_000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [-100.0, -100.0, 100.0, 100.0], 0.0)
        .term(SIGNAL_TO_NOISE_RATIO, [-100.0, -100.0, 5.0, 10.0], 4.0);

    let melting = Category::new("melting")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, tex_start, tex_end], 0.0)
        .term(CROSS_CORRELATION_RATIO, [0.6, 0.65, 0.9, 0.96], 2.0)
        .term(NORMALIZED_COHERENT_POWER, [0.4, 0.5, 1.0, 1.0], 0.0)
        .term(HEIGHT, [0.0, 0.0, 25_000.0, 25_000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [0.0, 0.1, 2.0, 4.0], 4.0)
        .term(SIGNAL_TO_NOISE_RATIO, [8.0, 10.0, 1000.0, 1000.0], 0.0);

    ClassifierConfig {
        categories: vec![multi_trip, rain, snow, no_scatter, melting],
        hard_constraints: default_hard_constraints(),
        smoothing: SmoothingWindow::default(),
        overrides: overrides_reading(CLUTTER),
        overlap: OverlapPolicy::Overwrite,
    }
}

/// C-band scanning radar table (CACTI and TRACER deployments). Uses the
/// `copol_correlation_coeff` and `ground_clutter` names and a higher SNR
/// floor.
pub fn csapr2_config() -> ClassifierConfig {
    const RHOHV: &str = "copol_correlation_coeff";

    let multi_trip = Category::new("multi_trip")
        .term(VELOCITY_TEXTURE, [7.7, 10.0, 130.0, 130.0], 4.0)
        .term(RHOHV, [0.7, 0.8, 1.0, 1.0], 0.0)
        .term(NORMALIZED_COHERENT_POWER, [0.0, 0.0, 0.3, 0.35], 1.0)
        .term(HEIGHT, [0.0, 0.0, 5000.0, 8000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [-100.0, -100.0, 100.0, 100.0], 0.0)
        .term(SIGNAL_TO_NOISE_RATIO, [20.0, 22.0, 1000.0, 1000.0], 1.0);

    let rain = Category::new("rain")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, 2.4, 2.5], 1.0)
        .term(RHOHV, [0.97, 0.98, 1.0, 1.0], 1.0)
        .term(NORMALIZED_COHERENT_POWER, [0.4, 0.5, 1.0, 1.0], 1.0)
        .term(HEIGHT, [0.0, 0.0, 5000.0, 6000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [2.0, 5.0, 100.0, 100.0], 2.0)
        .term(SIGNAL_TO_NOISE_RATIO, [20.0, 22.0, 1000.0, 1000.0], 1.0);

    let snow = Category::new("snow")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, 2.4, 2.5], 1.0)
        .term(RHOHV, [0.65, 0.9, 1.0, 1.0], 1.0)
        .term(NORMALIZED_COHERENT_POWER, [0.4, 0.5, 1.0, 1.0], 1.0)
        .term(HEIGHT, [0.0, 0.0, 25_000.0, 25_000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [-100.0, -100.0, 0.5, 4.0], 2.0)
        .term(SIGNAL_TO_NOISE_RATIO, [20.0, 22.0, 1000.0, 1000.0], 1.0);

    let no_scatter = Category::new("no_scatter")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, 330.0, 330.0], 2.0)
        .term(RHOHV, [0.0, 0.0, 0.1, 0.2], 0.0)
        .term(NORMALIZED_COHERENT_POWER, [0.0, 0.0, 0.1, 0.2], 0.0)
        .term(HEIGHT, [0.0, 0.0, 25_000.0, 25_000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [-100.0, -100.0, 100.0, 100.0], 0.0)
        .term(SIGNAL_TO_NOISE_RATIO, [-100.0, -100.0, 20.0, 22.0], 4.0);

    let melting = Category::new("melting")
        .term(VELOCITY_TEXTURE, [0.0, 0.0, 2.4, 2.5], 0.0)
        .term(RHOHV, [0.6, 0.65, 0.9, 0.96], 2.0)
        .term(NORMALIZED_COHERENT_POWER, [0.4, 0.5, 1.0, 1.0], 0.0)
        .term(HEIGHT, [0.0, 0.0, 25_000.0, 25_000.0], 0.0)
        .term(SOUNDING_TEMPERATURE, [0.0, 0.1, 2.0, 4.0], 4.0)
        .term(SIGNAL_TO_NOISE_RATIO, [20.0, 22.0, 1000.0, 1000.0], 0.0);

    ClassifierConfig {
        categories: vec![multi_trip, rain, snow, no_scatter, melting],
        hard_constraints: default_hard_constraints(),
        smoothing: SmoothingWindow::default(),
        overrides: overrides_reading(GROUND_CLUTTER),
        overlap: OverlapPolicy::Overwrite,
    }
}

/// X-band table for the North Slope site, which exports rhohv as
/// `cross_correlation_ratio_hv` and clutter as `ground_clutter`.
pub fn nsa_xsapr_config() -> ClassifierConfig {
    let mut config = texture_config(2.0, 2.1);
    config.overrides = overrides_reading(GROUND_CLUTTER);
    for cat in &mut config.categories {
        for term in &mut cat.terms {
            if term.field == CROSS_CORRELATION_RATIO {
                term.field = "cross_correlation_ratio_hv".to_string();
            }
        }
    }
    config
}
