//! Per-category fuzzy score: weighted membership sum followed by a median
//! filter that suppresses single-gate speckle from any one noisy feature.

use tracing::debug;

use crate::config::{Category, SmoothingWindow};
use crate::error::{GateIdError, Result};
use crate::fields::{Field, FieldStore};
use crate::membership::MembershipSpec;
use crate::rows::for_each_row_mut;

/// A category with every term bound to its field. Built once per run so
/// the per-gate loop never does a name lookup.
#[derive(Debug)]
pub struct ResolvedCategory<'a> {
    pub name: &'a str,
    pub terms: Vec<(&'a Field, MembershipSpec)>,
}

impl<'a> ResolvedCategory<'a> {
    /// Bind `category`'s terms to fields in `store`, checking that every
    /// field exists and has the expected shape.
    pub fn resolve(
        category: &'a Category,
        store: &'a FieldStore,
        shape: (usize, usize),
    ) -> Result<Self> {
        let mut terms = Vec::with_capacity(category.terms.len());
        for term in &category.terms {
            term.spec.validate(&category.name, &term.field)?;
            let field = store.require(&category.name, &term.field)?;
            if field.shape() != shape {
                return Err(GateIdError::ShapeMismatch {
                    field: term.field.clone(),
                    expected: shape,
                    found: field.shape(),
                });
            }
            terms.push((field, term.spec));
        }
        Ok(Self {
            name: &category.name,
            terms,
        })
    }
}

/// Unsmoothed score: `Σ weight · membership(x)`. Any `NaN` membership makes
/// the gate's score `NaN`.
pub fn raw_score(category: &ResolvedCategory<'_>, shape: (usize, usize)) -> Field {
    let (rays, gates) = shape;
    let mut out = Field::new(rays, gates, 0.0);
    for_each_row_mut(&mut out.data, gates, |ray, row| {
        for (field, spec) in &category.terms {
            let src = field.row(ray);
            for (acc, &x) in row.iter_mut().zip(src) {
                *acc += spec.weight * spec.membership(x);
            }
        }
    });
    out
}

/// Score one category over the whole grid.
pub fn score_category(
    category: &ResolvedCategory<'_>,
    shape: (usize, usize),
    window: SmoothingWindow,
) -> Field {
    let raw = raw_score(category, shape);
    debug!(
        category = category.name,
        terms = category.terms.len(),
        "scored category"
    );
    median_filter(&raw, window)
}

/// Resolve and score a category straight from a field store.
pub fn score_from_store(
    category: &Category,
    store: &FieldStore,
    window: SmoothingWindow,
) -> Result<Field> {
    let shape = store.shape().unwrap_or((0, 0));
    let resolved = ResolvedCategory::resolve(category, store, shape)?;
    Ok(score_category(&resolved, shape, window))
}

// ── Median filter ─────────────────────────────────────────────────────────────

/// Half-sample symmetric reflection (`d c b a | a b c d | d c b a`).
#[inline]
fn reflect(i: isize, n: usize) -> usize {
    let n = n as isize;
    let m = i.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}

/// Rectangular median filter over `window.rays × window.gates`.
///
/// The window spans offsets `-k/2 ..= (k-1)/2` along each axis, so an even
/// extent reaches one cell further back than forward. Edges reflect. The
/// median is the element of rank `n/2` among the window's finite values
/// (upper median for even `n`); a window with no finite value yields `NaN`.
pub fn median_filter(field: &Field, window: SmoothingWindow) -> Field {
    if window.is_identity() || field.data.is_empty() {
        return field.clone();
    }
    let (rays, gates) = field.shape();
    let back_r = (window.rays / 2) as isize;
    let back_g = (window.gates / 2) as isize;

    let mut out = Field::new(rays, gates, f32::NAN);
    for_each_row_mut(&mut out.data, gates, |ray, row| {
        let mut buf: Vec<f32> = Vec::with_capacity(window.rays * window.gates);
        for (gate, slot) in row.iter_mut().enumerate() {
            buf.clear();
            for dr in 0..window.rays as isize {
                let r = reflect(ray as isize - back_r + dr, rays);
                for dg in 0..window.gates as isize {
                    let g = reflect(gate as isize - back_g + dg, gates);
                    let v = field.get(r, g);
                    if v.is_finite() {
                        buf.push(v);
                    }
                }
            }
            if !buf.is_empty() {
                let mid = buf.len() / 2;
                let (_, m, _) = buf.select_nth_unstable_by(mid, f32::total_cmp);
                *slot = *m;
            }
        }
    });
    out
}
