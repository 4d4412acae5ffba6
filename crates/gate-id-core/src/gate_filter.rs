//! Boolean "good gate" mask derived from labels, used to restrict
//! downstream retrievals to hydrometeor gates.

use crate::error::Result;
use crate::labels::LabelField;

/// Categories kept by [`GateFilter::hydrometeors`].
pub const HYDROMETEOR_CATEGORIES: [&str; 3] = ["rain", "melting", "snow"];

/// Per-gate exclusion mask; `true` means excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateFilter {
    excluded: Vec<bool>,
    rays: usize,
    gates: usize,
}

impl GateFilter {
    /// Every gate included.
    pub fn include_all(rays: usize, gates: usize) -> Self {
        Self {
            excluded: vec![false; rays * gates],
            rays,
            gates,
        }
    }

    /// Every gate excluded.
    pub fn exclude_all(rays: usize, gates: usize) -> Self {
        Self {
            excluded: vec![true; rays * gates],
            rays,
            gates,
        }
    }

    /// Include gates whose label equals `label`; other gates keep their state.
    pub fn include_equal(&mut self, labels: &LabelField, label: i32) {
        debug_assert_eq!(labels.shape(), self.shape());
        for (ex, &l) in self.excluded.iter_mut().zip(&labels.data) {
            if l == label {
                *ex = false;
            }
        }
    }

    /// Exclude gates whose label equals `label`; other gates keep their state.
    pub fn exclude_equal(&mut self, labels: &LabelField, label: i32) {
        debug_assert_eq!(labels.shape(), self.shape());
        for (ex, &l) in self.excluded.iter_mut().zip(&labels.data) {
            if l == label {
                *ex = true;
            }
        }
    }

    /// Start from all excluded and include each named category.
    pub fn include_categories(labels: &LabelField, names: &[&str]) -> Result<Self> {
        let indices = names
            .iter()
            .map(|n| labels.require(n))
            .collect::<Result<Vec<_>>>()?;
        let mut filter = Self::exclude_all(labels.rays, labels.gates);
        for idx in indices {
            filter.include_equal(labels, idx);
        }
        Ok(filter)
    }

    /// Rain, melting and snow gates.
    pub fn hydrometeors(labels: &LabelField) -> Result<Self> {
        Self::include_categories(labels, &HYDROMETEOR_CATEGORIES)
    }

    pub fn shape(&self) -> (usize, usize) {
        (self.rays, self.gates)
    }

    #[inline]
    pub fn gate_excluded(&self, ray: usize, gate: usize) -> bool {
        self.excluded[ray * self.gates + gate]
    }

    pub fn included_count(&self) -> usize {
        self.excluded.iter().filter(|&&ex| !ex).count()
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len() - self.included_count()
    }

    /// Row-major exclusion flags.
    pub fn as_slice(&self) -> &[bool] {
        &self.excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GateIdError;

    fn labels() -> LabelField {
        LabelField::new(
            2,
            3,
            vec![0, 1, 2, 3, 4, 5],
            ["multi_trip", "rain", "snow", "no_scatter", "melting", "clutter"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    #[test]
    fn hydrometeor_gates_are_included() {
        let f = GateFilter::hydrometeors(&labels()).unwrap();
        assert_eq!(f.included_count(), 3);
        assert_eq!(f.excluded_count(), 3);
        assert!(f.gate_excluded(0, 0));
        assert!(!f.gate_excluded(0, 1));
        assert!(!f.gate_excluded(0, 2));
        assert!(f.gate_excluded(1, 0));
        assert!(!f.gate_excluded(1, 1));
        assert!(f.gate_excluded(1, 2));
    }

    #[test]
    fn unknown_category_is_an_error() {
        assert_eq!(
            GateFilter::include_categories(&labels(), &["rain", "hail"]),
            Err(GateIdError::MissingCategory("hail".into()))
        );
    }

    #[test]
    fn include_then_exclude() {
        let l = labels();
        let mut f = GateFilter::include_all(2, 3);
        f.exclude_equal(&l, 5);
        assert_eq!(f.included_count(), 5);
        assert!(f.gate_excluded(1, 2));
        f.include_equal(&l, 5);
        assert_eq!(f.included_count(), 6);
    }

    #[test]
    fn empty_selection_excludes_everything() {
        let f = GateFilter::include_categories(&labels(), &[]).unwrap();
        assert_eq!(f.included_count(), 0);
        assert!(f.as_slice().iter().all(|&ex| ex));
    }
}
