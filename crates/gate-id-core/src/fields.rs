//! Feature fields and the field store consumed by the classifier.
//!
//! A field is a ray × gate grid of `f32` stored row-major (one row per ray,
//! near gate first). Missing samples are `NaN`; JSON `null` deserialises to
//! `NaN`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{GateIdError, Result};

/// A 2D ray × gate field, row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub data: Vec<f32>,
    pub rays: usize,
    pub gates: usize,
}

impl Field {
    /// Create a field filled with `fill`.
    pub fn new(rays: usize, gates: usize, fill: f32) -> Self {
        Self {
            data: vec![fill; rays * gates],
            rays,
            gates,
        }
    }

    /// Wrap row-major data. Returns `None` when `data` does not fill the grid.
    pub fn from_vec(rays: usize, gates: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == rays * gates).then_some(Self { data, rays, gates })
    }

    /// Build from per-ray rows. Returns `None` for ragged rows.
    pub fn from_rows(rows: &[Vec<f32>]) -> Option<Self> {
        let gates = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != gates) {
            return None;
        }
        let data = rows.iter().flat_map(|r| r.iter().copied()).collect();
        Some(Self {
            data,
            rays: rows.len(),
            gates,
        })
    }

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rays, self.gates)
    }

    #[inline]
    pub fn get(&self, ray: usize, gate: usize) -> f32 {
        self.data[ray * self.gates + gate]
    }

    #[inline]
    pub fn set(&mut self, ray: usize, gate: usize, val: f32) {
        self.data[ray * self.gates + gate] = val;
    }

    pub fn row(&self, ray: usize) -> &[f32] {
        &self.data[ray * self.gates..(ray + 1) * self.gates]
    }
}

/// Named feature fields sharing one ray × gate shape.
#[derive(Debug, Clone, Default)]
pub struct FieldStore {
    fields: BTreeMap<String, Field>,
    shape: Option<(usize, usize)>,
}

impl FieldStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert (or replace) a field. The first field inserted fixes the shape
    /// every later field must match.
    pub fn insert(&mut self, name: impl Into<String>, field: Field) -> Result<()> {
        let name = name.into();
        match self.shape {
            Some(expected) if expected != field.shape() => {
                return Err(GateIdError::ShapeMismatch {
                    field: name,
                    expected,
                    found: field.shape(),
                });
            }
            Some(_) => {}
            None => self.shape = Some(field.shape()),
        }
        self.fields.insert(name, field);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Field> {
        self.fields.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    /// Look up a field a category depends on.
    pub fn require(&self, category: &str, name: &str) -> Result<&Field> {
        self.get(name).ok_or_else(|| GateIdError::MissingField {
            category: category.to_string(),
            field: name.to_string(),
        })
    }

    /// Shared `(rays, gates)` shape, `None` while the store is empty.
    pub fn shape(&self) -> Option<(usize, usize)> {
        self.shape
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Parse a store from its JSON export:
    /// `{"rays": R, "gates": G, "fields": {"name": [row-major values or null]}}`.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let raw: RawFieldStore = serde_json::from_str(s)?;
        raw.try_into()
    }
}

// ── Serde helpers ─────────────────────────────────────────────────────────────

fn null_as_nan_vec<'de, D: serde::Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<f32>, D::Error> {
    let v: Vec<Option<f32>> = Vec::deserialize(d)?;
    Ok(v.into_iter().map(|x| x.unwrap_or(f32::NAN)).collect())
}

#[derive(Deserialize)]
struct RawField(#[serde(deserialize_with = "null_as_nan_vec")] Vec<f32>);

#[derive(Deserialize)]
struct RawFieldStore {
    rays: usize,
    gates: usize,
    fields: BTreeMap<String, RawField>,
}

impl TryFrom<RawFieldStore> for FieldStore {
    type Error = GateIdError;

    fn try_from(raw: RawFieldStore) -> Result<Self> {
        let mut store = FieldStore::new();
        for (name, RawField(data)) in raw.fields {
            let len = data.len();
            let field = Field::from_vec(raw.rays, raw.gates, data).ok_or_else(|| {
                GateIdError::BadFieldLength {
                    field: name.clone(),
                    len,
                    rays: raw.rays,
                    gates: raw.gates,
                }
            })?;
            store.insert(name, field)?;
        }
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_set_roundtrip() {
        let mut f = Field::new(3, 5, 0.0);
        f.set(2, 4, 7.5);
        assert_eq!(f.get(2, 4), 7.5);
        assert_eq!(f.row(2)[4], 7.5);
    }

    #[test]
    fn from_rows_rejects_ragged_input() {
        assert!(Field::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_none());
        let f = Field::from_rows(&[vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(f.shape(), (2, 2));
        assert_eq!(f.get(1, 0), 3.0);
    }

    #[test]
    fn store_rejects_mismatched_shape() {
        let mut store = FieldStore::new();
        store.insert("height", Field::new(4, 10, 0.0)).unwrap();
        let err = store.insert("snr", Field::new(4, 9, 0.0)).unwrap_err();
        assert_eq!(
            err,
            GateIdError::ShapeMismatch {
                field: "snr".into(),
                expected: (4, 10),
                found: (4, 9),
            }
        );
        assert!(!store.contains("snr"));
    }

    #[test]
    fn require_names_the_category() {
        let store = FieldStore::new();
        match store.require("rain", "height") {
            Err(GateIdError::MissingField { category, field }) => {
                assert_eq!(category, "rain");
                assert_eq!(field, "height");
            }
            other => panic!("expected MissingField, got {other:?}"),
        }
    }

    #[test]
    fn json_nulls_become_nan() {
        let json = r#"{"rays": 1, "gates": 3, "fields": {"snr": [1.0, null, 3.0]}}"#;
        let store = FieldStore::from_json_str(json).unwrap();
        let snr = store.get("snr").unwrap();
        assert_eq!(snr.get(0, 0), 1.0);
        assert!(snr.get(0, 1).is_nan());
        assert_eq!(store.shape(), Some((1, 3)));
    }

    #[test]
    fn json_with_short_field_is_rejected() {
        let json = r#"{"rays": 2, "gates": 2, "fields": {"snr": [1.0, 2.0, 3.0]}}"#;
        let err = FieldStore::from_json_str(json).unwrap_err();
        assert!(matches!(err, GateIdError::BadFieldLength { len: 3, .. }));
    }
}
