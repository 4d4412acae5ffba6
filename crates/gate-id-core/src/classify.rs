//! Classification engine: score every category, apply hard constraints,
//! and label each gate with its highest-scoring category.
//!
//! Steps:
//!   1. Validate the configuration and bind every referenced field.
//!   2. Score categories in configuration order.
//!   3. Zero constrained scores, constraint by constraint.
//!   4. Argmax per gate; ties go to the lowest category index.
//!
//! Any failure in step 1 aborts the run before a single score is computed.

use tracing::{debug, info, warn};

use crate::config::{ClassifierConfig, HardConstraint};
use crate::error::{GateIdError, Result};
use crate::fields::{Field, FieldStore};
use crate::labels::LabelField;
use crate::rows::for_each_row_mut;
use crate::scoring::{score_category, ResolvedCategory};

/// Smoothed (and possibly constrained) score per category, in
/// configuration order.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreStack {
    pub categories: Vec<String>,
    pub scores: Vec<Field>,
    pub rays: usize,
    pub gates: usize,
}

impl ScoreStack {
    pub fn get(&self, category: &str) -> Option<&Field> {
        self.categories
            .iter()
            .position(|c| c == category)
            .map(|i| &self.scores[i])
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rays, self.gates)
    }
}

/// Labels together with the scores that produced them.
#[derive(Debug, Clone)]
pub struct Classification {
    pub labels: LabelField,
    pub scores: ScoreStack,
}

/// A hard constraint bound to its category index and field.
struct ResolvedConstraint<'a> {
    category: usize,
    field: &'a Field,
    range: (f32, f32),
    source: &'a HardConstraint,
}

fn store_shape(store: &FieldStore, config: &ClassifierConfig) -> Result<(usize, usize)> {
    match store.shape() {
        Some(shape) => Ok(shape),
        None => {
            // Nothing to read from; report the first field the config needs.
            let cat = &config.categories[0];
            let field = config
                .required_fields()
                .first()
                .map(|f| f.to_string())
                .unwrap_or_default();
            Err(GateIdError::MissingField {
                category: cat.name.clone(),
                field,
            })
        }
    }
}

fn resolve_constraints<'a>(
    config: &'a ClassifierConfig,
    store: &'a FieldStore,
    shape: (usize, usize),
) -> Result<Vec<ResolvedConstraint<'a>>> {
    config
        .hard_constraints
        .iter()
        .map(|hc| {
            let category = config.category_index(&hc.category).ok_or_else(|| {
                GateIdError::UnknownCategory {
                    context: format!("hard constraint on `{}`", hc.field),
                    category: hc.category.clone(),
                }
            })?;
            let field = store.require(&hc.category, &hc.field)?;
            if field.shape() != shape {
                return Err(GateIdError::ShapeMismatch {
                    field: hc.field.clone(),
                    expected: shape,
                    found: field.shape(),
                });
            }
            Ok(ResolvedConstraint {
                category,
                field,
                range: hc.range,
                source: hc,
            })
        })
        .collect()
}

/// Zero `scores` wherever `low <= field <= high`. `NaN` never matches.
pub fn apply_constraint(scores: &mut Field, field: &Field, (low, high): (f32, f32)) {
    let gates = scores.gates;
    for_each_row_mut(&mut scores.data, gates, |ray, row| {
        for (s, &v) in row.iter_mut().zip(field.row(ray)) {
            if low <= v && v <= high {
                *s = 0.0;
            }
        }
    });
}

/// Index of the highest score at every gate. Ties and all-`NaN` gates go to
/// the lowest index.
pub fn argmax_labels(stack: &ScoreStack) -> LabelField {
    let (rays, gates) = stack.shape();
    let mut data = vec![0i32; rays * gates];
    for_each_row_mut(&mut data, gates, |ray, row| {
        let base = ray * gates;
        for (gate, slot) in row.iter_mut().enumerate() {
            let mut best = 0usize;
            let mut best_score = f32::NEG_INFINITY;
            for (c, scores) in stack.scores.iter().enumerate() {
                let s = scores.data[base + gate];
                if s > best_score {
                    best = c;
                    best_score = s;
                }
            }
            *slot = best as i32;
        }
    });

    let undefined = (0..rays * gates)
        .filter(|&i| stack.scores.iter().all(|f| f.data[i].is_nan()))
        .count();
    if undefined > 0 {
        warn!(gates = undefined, "gates with no defined score labelled as category 0");
    }

    LabelField::new(rays, gates, data, stack.categories.clone())
}

/// Steps 1–3: validated, smoothed and constrained scores.
pub fn compute_scores(store: &FieldStore, config: &ClassifierConfig) -> Result<ScoreStack> {
    config.validate()?;
    let shape = store_shape(store, config)?;

    let resolved = config
        .categories
        .iter()
        .map(|c| ResolvedCategory::resolve(c, store, shape))
        .collect::<Result<Vec<_>>>()?;
    let constraints = resolve_constraints(config, store, shape)?;

    let mut scores: Vec<Field> = resolved
        .iter()
        .map(|cat| score_category(cat, shape, config.smoothing))
        .collect();

    for rc in &constraints {
        apply_constraint(&mut scores[rc.category], rc.field, rc.range);
        debug!(
            category = rc.source.category.as_str(),
            field = rc.source.field.as_str(),
            low = rc.range.0,
            high = rc.range.1,
            "applied hard constraint"
        );
    }

    Ok(ScoreStack {
        categories: config.category_names(),
        scores,
        rays: shape.0,
        gates: shape.1,
    })
}

/// Classify every gate. Fails without a label field on any configuration
/// or shape error.
pub fn classify(store: &FieldStore, config: &ClassifierConfig) -> Result<LabelField> {
    Ok(classify_with_scores(store, config)?.labels)
}

/// [`classify`], also returning the constrained score stack.
pub fn classify_with_scores(store: &FieldStore, config: &ClassifierConfig) -> Result<Classification> {
    let scores = compute_scores(store, config)?;
    let labels = argmax_labels(&scores);
    info!(
        rays = labels.rays,
        gates = labels.gates,
        categories = %labels.notes(),
        valid_max = labels.valid_max,
        "fuzzy classification complete"
    );
    Ok(Classification { labels, scores })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Category, HardConstraint, OverlapPolicy, SmoothingWindow};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// One indicator field per category: category `i` scores `weight_i`
    /// wherever `sel == i`.
    fn selector_config(names: &[&str], weights: &[f32]) -> ClassifierConfig {
        let categories = names
            .iter()
            .zip(weights)
            .enumerate()
            .map(|(i, (n, &w))| {
                let v = i as f32;
                Category::new(*n).term("sel", [v - 0.5, v, v, v + 0.5], w)
            })
            .collect();
        ClassifierConfig {
            categories,
            hard_constraints: vec![],
            smoothing: SmoothingWindow::NONE,
            overrides: vec![],
            overlap: OverlapPolicy::Overwrite,
        }
    }

    fn store_from(fields: Vec<(&str, Vec<Vec<f32>>)>) -> FieldStore {
        let mut store = FieldStore::new();
        for (name, rows) in fields {
            store.insert(name, Field::from_rows(&rows).unwrap()).unwrap();
        }
        store
    }

    #[test]
    fn labels_follow_the_winning_category() {
        let cfg = selector_config(&["a", "b", "c"], &[1.0, 1.0, 1.0]);
        let store = store_from(vec![("sel", vec![vec![0.0, 1.0, 2.0, 1.0]])]);
        let labels = classify(&store, &cfg).unwrap();
        assert_eq!(labels.data, vec![0, 1, 2, 1]);
        assert_eq!(labels.notes(), "0:a,1:b,2:c");
        assert_eq!(labels.valid_max, 2);
    }

    #[test]
    fn ties_go_to_the_lowest_index() {
        // Four categories; b (index 1) and d (index 3) both score 3.5.
        let cfg = ClassifierConfig {
            categories: vec![
                Category::new("a").term("x", [0.0, 0.0, 10.0, 10.0], 1.0),
                Category::new("b").term("x", [0.0, 0.0, 10.0, 10.0], 3.5),
                Category::new("c").term("x", [0.0, 0.0, 10.0, 10.0], 2.0),
                Category::new("d").term("x", [0.0, 0.0, 10.0, 10.0], 3.5),
            ],
            ..selector_config(&["a"], &[1.0])
        };
        let store = store_from(vec![("x", vec![vec![5.0; 6]; 3])]);
        let cls = classify_with_scores(&store, &cfg).unwrap();
        assert_eq!(cls.scores.get("b").unwrap().get(1, 1), 3.5);
        assert_eq!(cls.scores.get("d").unwrap().get(1, 1), 3.5);
        for _ in 0..5 {
            let labels = classify(&store, &cfg).unwrap();
            assert!(labels.data.iter().all(|&l| l == 1), "{:?}", labels.data);
        }
    }

    #[test]
    fn hard_constraint_zeroes_a_winning_score() {
        // melting would win everywhere on its own.
        let mut cfg = ClassifierConfig {
            categories: vec![
                Category::new("rain").term("sounding_temperature", [-100.0, -100.0, 100.0, 100.0], 1.0),
                Category::new("melting").term("sounding_temperature", [-100.0, -100.0, 100.0, 100.0], 4.0),
            ],
            ..selector_config(&["a"], &[1.0])
        };
        cfg.hard_constraints
            .push(HardConstraint::new("melting", "sounding_temperature", 10.0, 100.0));
        let store = store_from(vec![("sounding_temperature", vec![vec![50.0, 5.0, 10.0, 100.0, -3.0]])]);

        let cls = classify_with_scores(&store, &cfg).unwrap();
        let melt = cls.scores.get("melting").unwrap();
        assert_eq!(melt.row(0), &[0.0, 4.0, 0.0, 0.0, 4.0][..]);
        assert_eq!(cls.labels.data, vec![0, 1, 0, 0, 1]);
    }

    #[test]
    fn constraints_are_idempotent() {
        let mut cfg = selector_config(&["a", "b"], &[1.0, 2.0]);
        let store = store_from(vec![("sel", vec![vec![1.0, 1.0, 0.0]])]);
        cfg.hard_constraints.push(HardConstraint::new("b", "sel", 0.5, 1.5));
        let once = compute_scores(&store, &cfg).unwrap();
        cfg.hard_constraints.push(HardConstraint::new("b", "sel", 0.5, 1.5));
        let twice = compute_scores(&store, &cfg).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn nan_values_never_match_a_constraint() {
        let mut f = Field::new(1, 2, 3.0);
        apply_constraint(&mut f, &Field::from_rows(&[vec![f32::NAN, 1.0]]).unwrap(), (0.0, 2.0));
        assert_eq!(f.data, vec![3.0, 0.0]);
    }

    #[test]
    fn missing_field_produces_no_labels() {
        let mut cfg = selector_config(&["a", "b"], &[1.0, 1.0]);
        cfg.categories[1] = Category::new("b").term("velocity_texture", [0.0, 0.0, 2.0, 2.1], 1.0);
        let store = store_from(vec![("sel", vec![vec![0.0, 1.0]])]);
        assert_eq!(
            classify(&store, &cfg).unwrap_err(),
            GateIdError::MissingField {
                category: "b".into(),
                field: "velocity_texture".into()
            }
        );
    }

    #[test]
    fn missing_constraint_field_fails() {
        let mut cfg = selector_config(&["a", "b"], &[1.0, 1.0]);
        cfg.hard_constraints.push(HardConstraint::new("a", "height", 0.0, 1.0));
        let store = store_from(vec![("sel", vec![vec![0.0, 1.0]])]);
        assert!(matches!(
            classify(&store, &cfg),
            Err(GateIdError::MissingField { .. })
        ));
    }

    #[test]
    fn empty_store_fails() {
        let cfg = selector_config(&["a"], &[1.0]);
        assert!(matches!(
            classify(&FieldStore::new(), &cfg),
            Err(GateIdError::MissingField { .. })
        ));
    }

    #[test]
    fn all_nan_gate_gets_index_zero() {
        let cfg = selector_config(&["a", "b"], &[1.0, 1.0]);
        let store = store_from(vec![("sel", vec![vec![f32::NAN, 1.0]])]);
        let labels = classify(&store, &cfg).unwrap();
        assert_eq!(labels.data, vec![0, 1]);
    }

    #[test]
    fn random_scores_label_is_valid_argmax() {
        let mut rng = StdRng::seed_from_u64(0x6a7e_1d);
        let (rays, gates) = (7, 13);
        let names = ["a", "b", "c", "d"];
        let mut store = FieldStore::new();
        let mut categories = Vec::new();
        for n in names {
            let data: Vec<f32> = (0..rays * gates).map(|_| rng.gen_range(0.0f32..1.0)).collect();
            store.insert(n, Field::from_vec(rays, gates, data).unwrap()).unwrap();
            categories.push(Category::new(n).term(n, [0.0, 1.0, 1.0, 1.0], rng.gen_range(0.5..3.0)));
        }
        let cfg = ClassifierConfig {
            categories,
            smoothing: SmoothingWindow::default(),
            ..selector_config(&["a"], &[1.0])
        };

        let cls = classify_with_scores(&store, &cfg).unwrap();
        let max_index = (names.len() - 1) as i32;
        for r in 0..rays {
            for g in 0..gates {
                let l = cls.labels.get(r, g);
                assert!((0..=max_index).contains(&l));
                let won = cls.scores.scores[l as usize].get(r, g);
                for (c, s) in cls.scores.scores.iter().enumerate() {
                    assert!(won >= s.get(r, g), "gate ({r},{g}): {l} lost to {c}");
                }
            }
        }
    }
}
