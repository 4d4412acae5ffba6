//! Override layer: externally detected clutter / terrain-blockage masks are
//! merged into the label field as new categories appended after the fuzzy
//! ones.
//!
//! Each detector, in application order:
//!   - gets the next unused index `k`,
//!   - relabels every flagged gate to `k` unless the gate's current category
//!     is one the detector is suppressed on (or, under
//!     [`OverlapPolicy::KeepEarlier`], an earlier override's category),
//!   - appends `k:name` to the mapping and raises `valid_max` to `k`.

use tracing::{debug, info, warn};

use crate::config::{OverlapPolicy, OverrideRule};
use crate::error::{GateIdError, Result};
use crate::fields::{Field, FieldStore};
use crate::labels::LabelField;

/// A binary detector field (1 = flagged) with its target category name.
#[derive(Debug, Clone, Copy)]
pub struct Detector<'a> {
    pub name: &'a str,
    pub mask: &'a Field,
    pub suppress_on: &'a [String],
}

impl<'a> Detector<'a> {
    pub fn new(name: &'a str, mask: &'a Field) -> Self {
        Self {
            name,
            mask,
            suppress_on: &[],
        }
    }

    pub fn suppressed_on(mut self, categories: &'a [String]) -> Self {
        self.suppress_on = categories;
        self
    }
}

/// Applies detectors to one label field.
#[derive(Debug, Clone, Copy)]
pub struct OverrideLayer {
    policy: OverlapPolicy,
    /// Labels below this index came from the fuzzy classifier.
    fuzzy_categories: i32,
}

impl OverrideLayer {
    /// Snapshot the fuzzy category count of `labels` before any override.
    pub fn new(labels: &LabelField, policy: OverlapPolicy) -> Self {
        Self {
            policy,
            fuzzy_categories: labels.categories.len() as i32,
        }
    }

    /// Merge one detector. Returns its new category index. Nothing is
    /// mutated when an error is returned.
    pub fn apply(&self, labels: &mut LabelField, detector: &Detector<'_>) -> Result<i32> {
        if detector.mask.shape() != labels.shape() {
            return Err(GateIdError::ShapeMismatch {
                field: detector.name.to_string(),
                expected: labels.shape(),
                found: detector.mask.shape(),
            });
        }
        if labels.index_of(detector.name).is_some() {
            return Err(GateIdError::OverrideConflict(detector.name.to_string()));
        }
        let suppressed = detector
            .suppress_on
            .iter()
            .map(|name| {
                labels.index_of(name).ok_or_else(|| GateIdError::UnknownCategory {
                    context: format!("override `{}`", detector.name),
                    category: name.clone(),
                })
            })
            .collect::<Result<Vec<i32>>>()?;

        let k = labels.append_category(detector.name)?;

        let mut flagged = 0usize;
        let mut relabelled = 0usize;
        for (label, &flag) in labels.data.iter_mut().zip(&detector.mask.data) {
            if flag != 1.0 {
                continue;
            }
            flagged += 1;
            if suppressed.contains(label) {
                continue;
            }
            if self.policy == OverlapPolicy::KeepEarlier && *label >= self.fuzzy_categories {
                continue;
            }
            *label = k;
            relabelled += 1;
        }

        if flagged == 0 {
            warn!(category = detector.name, "override detector flags no gates");
        }
        debug!(
            category = detector.name,
            index = k,
            flagged,
            relabelled,
            "merged override detector"
        );
        Ok(k)
    }

    /// Merge detectors in order; returns the indices they were assigned.
    pub fn apply_all(&self, labels: &mut LabelField, detectors: &[Detector<'_>]) -> Result<Vec<i32>> {
        detectors.iter().map(|d| self.apply(labels, d)).collect()
    }
}

/// Merge the detectors named by `rules` from `store`. Rules whose detector
/// field is absent are skipped and add no category.
pub fn apply_override_rules(
    labels: &mut LabelField,
    store: &FieldStore,
    rules: &[OverrideRule],
    policy: OverlapPolicy,
) -> Result<Vec<(String, i32)>> {
    let layer = OverrideLayer::new(labels, policy);
    let mut applied = Vec::new();
    for rule in rules {
        let Some(mask) = store.get(&rule.field) else {
            debug!(category = rule.name.as_str(), field = rule.field.as_str(), "no detector field, skipping override");
            continue;
        };
        let detector = Detector::new(&rule.name, mask).suppressed_on(&rule.suppress_on);
        let k = layer.apply(labels, &detector)?;
        applied.push((rule.name.clone(), k));
    }
    if !applied.is_empty() {
        info!(notes = %labels.notes(), valid_max = labels.valid_max, "overrides merged");
    }
    Ok(applied)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    /// 0:multi_trip 1:rain 2:snow 3:no_scatter 4:melting
    fn labels() -> LabelField {
        LabelField::new(
            1,
            6,
            vec![0, 1, 2, 3, 4, 1],
            names(&["multi_trip", "rain", "snow", "no_scatter", "melting"]),
        )
    }

    fn mask(v: &[f32]) -> Field {
        Field::from_rows(&[v.to_vec()]).unwrap()
    }

    #[test]
    fn detector_appends_category_and_relabels() {
        let mut l = labels();
        let m = mask(&[0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        let layer = OverrideLayer::new(&l, OverlapPolicy::Overwrite);
        let k = layer.apply(&mut l, &Detector::new("clutter", &m)).unwrap();
        assert_eq!(k, 5);
        assert_eq!(l.data, vec![0, 5, 5, 3, 4, 1]);
        assert_eq!(l.valid_max, 5);
        assert!(l.notes().ends_with(",5:clutter"));
    }

    #[test]
    fn suppression_keeps_safe_categories() {
        let mut l = labels();
        let m = mask(&[1.0; 6]);
        let safe = names(&["multi_trip", "no_scatter"]);
        let layer = OverrideLayer::new(&l, OverlapPolicy::Overwrite);
        layer
            .apply(&mut l, &Detector::new("clutter", &m).suppressed_on(&safe))
            .unwrap();
        assert_eq!(l.data, vec![0, 5, 5, 3, 5, 5]);
    }

    #[test]
    fn overlap_policy_decides_shared_gates() {
        let clutter = mask(&[0.0, 1.0, 1.0, 0.0, 0.0, 0.0]);
        let terrain = mask(&[0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        let detectors = [
            Detector::new("clutter", &clutter),
            Detector::new("terrain_blockage", &terrain),
        ];

        let mut over = labels();
        let idx = OverrideLayer::new(&over, OverlapPolicy::Overwrite)
            .apply_all(&mut over, &detectors)
            .unwrap();
        assert_eq!(idx, vec![5, 6]);
        assert_eq!(over.data, vec![0, 5, 6, 6, 4, 1]);

        let mut keep = labels();
        OverrideLayer::new(&keep, OverlapPolicy::KeepEarlier)
            .apply_all(&mut keep, &detectors)
            .unwrap();
        assert_eq!(keep.data, vec![0, 5, 5, 6, 4, 1]);
        assert_eq!(keep.valid_max, 6);
        assert_eq!(
            keep.notes(),
            "0:multi_trip,1:rain,2:snow,3:no_scatter,4:melting,5:clutter,6:terrain_blockage"
        );
    }

    #[test]
    fn repeated_name_is_a_conflict_and_changes_nothing() {
        let mut l = labels();
        let m = mask(&[1.0; 6]);
        let layer = OverrideLayer::new(&l, OverlapPolicy::Overwrite);
        layer.apply(&mut l, &Detector::new("clutter", &m)).unwrap();
        let before = l.clone();
        assert_eq!(
            layer.apply(&mut l, &Detector::new("clutter", &m)),
            Err(GateIdError::OverrideConflict("clutter".into()))
        );
        assert_eq!(l, before);
    }

    #[test]
    fn wrong_shape_is_rejected() {
        let mut l = labels();
        let m = Field::new(2, 6, 1.0);
        let layer = OverrideLayer::new(&l, OverlapPolicy::Overwrite);
        assert!(matches!(
            layer.apply(&mut l, &Detector::new("clutter", &m)),
            Err(GateIdError::ShapeMismatch { .. })
        ));
        assert_eq!(l.categories.len(), 5);
    }

    #[test]
    fn unknown_suppression_category_is_rejected() {
        let mut l = labels();
        let m = mask(&[1.0; 6]);
        let bogus = names(&["hail"]);
        let layer = OverrideLayer::new(&l, OverlapPolicy::Overwrite);
        assert!(matches!(
            layer.apply(&mut l, &Detector::new("clutter", &m).suppressed_on(&bogus)),
            Err(GateIdError::UnknownCategory { .. })
        ));
        assert_eq!(l, labels());
    }

    #[test]
    fn nan_and_zero_are_not_flags() {
        let mut l = labels();
        let m = mask(&[f32::NAN, 0.0, 0.5, 1.0, 0.0, 0.0]);
        let layer = OverrideLayer::new(&l, OverlapPolicy::Overwrite);
        layer.apply(&mut l, &Detector::new("clutter", &m)).unwrap();
        assert_eq!(l.data, vec![0, 1, 2, 5, 4, 1]);
    }

    #[test]
    fn rules_skip_absent_detector_fields() {
        let mut store = FieldStore::new();
        store.insert("terrain_blockage", mask(&[0.0, 0.0, 0.0, 0.0, 1.0, 0.0])).unwrap();
        let rules = vec![
            OverrideRule::new("clutter", "clutter"),
            OverrideRule::new("terrain_blockage", "terrain_blockage"),
        ];
        let mut l = labels();
        let applied = apply_override_rules(&mut l, &store, &rules, OverlapPolicy::Overwrite).unwrap();
        assert_eq!(applied, vec![("terrain_blockage".to_string(), 5)]);
        assert_eq!(l.data, vec![0, 1, 2, 3, 5, 1]);
    }
}
