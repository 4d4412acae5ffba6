//! The label field: one category index per gate plus the index → name
//! mapping that travels with it.

use serde::{Deserialize, Serialize};

use crate::error::{GateIdError, Result};

/// Per-gate category indices, row-major (ray × gate).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelField {
    pub data: Vec<i32>,
    pub rays: usize,
    pub gates: usize,
    /// Category names; position is the label value.
    pub categories: Vec<String>,
    /// Declared upper bound of the valid label range.
    pub valid_max: i32,
}

impl LabelField {
    /// Wrap labels with their category list. `valid_max` starts at the
    /// largest label present (0 for an empty field).
    pub fn new(rays: usize, gates: usize, data: Vec<i32>, categories: Vec<String>) -> Self {
        let valid_max = data.iter().copied().max().unwrap_or(0);
        Self {
            data,
            rays,
            gates,
            categories,
            valid_max,
        }
    }

    pub const VALID_MIN: i32 = 0;

    #[inline]
    pub fn shape(&self) -> (usize, usize) {
        (self.rays, self.gates)
    }

    #[inline]
    pub fn get(&self, ray: usize, gate: usize) -> i32 {
        self.data[ray * self.gates + gate]
    }

    #[inline]
    pub fn set(&mut self, ray: usize, gate: usize, label: i32) {
        self.data[ray * self.gates + gate] = label;
    }

    pub fn row(&self, ray: usize) -> &[i32] {
        &self.data[ray * self.gates..(ray + 1) * self.gates]
    }

    pub fn index_of(&self, name: &str) -> Option<i32> {
        self.categories.iter().position(|c| c == name).map(|i| i as i32)
    }

    /// Like [`index_of`](Self::index_of) but a missing name is an error.
    pub fn require(&self, name: &str) -> Result<i32> {
        self.index_of(name)
            .ok_or_else(|| GateIdError::MissingCategory(name.to_string()))
    }

    pub fn name_of(&self, index: i32) -> Option<&str> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.categories.get(i))
            .map(String::as_str)
    }

    /// Register a new category after all existing ones and return its index.
    /// The index is never one already in use.
    pub fn append_category(&mut self, name: &str) -> Result<i32> {
        if self.index_of(name).is_some() {
            return Err(GateIdError::OverrideConflict(name.to_string()));
        }
        self.categories.push(name.to_string());
        let k = (self.categories.len() - 1) as i32;
        self.valid_max = k;
        Ok(k)
    }

    /// `"0:multi_trip,1:rain,…"`.
    pub fn notes(&self) -> String {
        self.categories
            .iter()
            .enumerate()
            .map(|(i, name)| format!("{i}:{name}"))
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Number of gates carrying each category, indexed like `categories`.
    pub fn counts(&self) -> Vec<usize> {
        let mut counts = vec![0usize; self.categories.len()];
        for &l in &self.data {
            if let Some(c) = usize::try_from(l).ok().and_then(|i| counts.get_mut(i)) {
                *c += 1;
            }
        }
        counts
    }
}

/// Parse `"0:a,1:b,…"` back into an ordered category list. Indices must be
/// exactly `0..n` (in any order) and names unique.
pub fn parse_notes(notes: &str) -> Result<Vec<String>> {
    if notes.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut pairs: Vec<(usize, String)> = Vec::new();
    for pair in notes.split(',') {
        let (idx, name) = pair
            .split_once(':')
            .ok_or_else(|| GateIdError::MalformedNotes(format!("`{pair}` is not index:name")))?;
        let idx: usize = idx
            .trim()
            .parse()
            .map_err(|_| GateIdError::MalformedNotes(format!("`{idx}` is not an index")))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(GateIdError::MalformedNotes(format!("index {idx} has no name")));
        }
        pairs.push((idx, name.to_string()));
    }
    pairs.sort_by_key(|(i, _)| *i);

    let mut out = Vec::with_capacity(pairs.len());
    for (expected, (idx, name)) in pairs.into_iter().enumerate() {
        if idx != expected {
            return Err(GateIdError::MalformedNotes(format!(
                "indices are not contiguous: expected {expected}, found {idx}"
            )));
        }
        if out.contains(&name) {
            return Err(GateIdError::MalformedNotes(format!("`{name}` appears twice")));
        }
        out.push(name);
    }
    Ok(out)
}

/// Serialisable gate-id record in the shape downstream radar tooling expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateIdRecord {
    pub standard_name: String,
    pub long_name: String,
    pub units: String,
    pub notes: String,
    pub valid_min: i32,
    pub valid_max: i32,
    pub rays: usize,
    pub gates: usize,
    pub data: Vec<i32>,
}

impl From<&LabelField> for GateIdRecord {
    fn from(labels: &LabelField) -> Self {
        Self {
            standard_name: "gate_id".to_string(),
            long_name: "Classification of dominant scatterer".to_string(),
            units: String::new(),
            notes: labels.notes(),
            valid_min: LabelField::VALID_MIN,
            valid_max: labels.valid_max,
            rays: labels.rays,
            gates: labels.gates,
            data: labels.data.clone(),
        }
    }
}

impl TryFrom<GateIdRecord> for LabelField {
    type Error = GateIdError;

    fn try_from(record: GateIdRecord) -> Result<Self> {
        if record.data.len() != record.rays * record.gates {
            return Err(GateIdError::BadFieldLength {
                field: record.standard_name,
                len: record.data.len(),
                rays: record.rays,
                gates: record.gates,
            });
        }
        let categories = parse_notes(&record.notes)?;
        let n = categories.len() as i32;
        if let Some(&bad) = record.data.iter().find(|&&l| l < 0 || l >= n) {
            return Err(GateIdError::MalformedNotes(format!(
                "label {bad} has no entry among {n} categories"
            )));
        }
        let top = record.data.iter().copied().max().unwrap_or(0);
        if record.valid_min != Self::VALID_MIN
            || record.valid_max < top
            || record.valid_max >= n.max(1)
        {
            return Err(GateIdError::MalformedNotes(format!(
                "valid range [{}, {}] does not fit labels up to {top} over {n} categories",
                record.valid_min, record.valid_max
            )));
        }
        Ok(Self {
            categories,
            data: record.data,
            rays: record.rays,
            gates: record.gates,
            valid_max: record.valid_max,
        })
    }
}
