//! Trapezoidal fuzzy membership.
//!
//! ```text
//!   1 |      b______c
//!     |     /        \
//!   0 |____/          \____
//!         a            d
//! ```
//!
//! Breakpoint handling follows the usual fuzzy-toolkit convention: `x == b`
//! and `x == c` are always 1, so a degenerate edge (`a == b` or `c == d`)
//! becomes a closed step. `NaN` in gives `NaN` out.

use serde::{Deserialize, Serialize};

use crate::error::{GateIdError, Result};
use crate::fields::Field;

/// Four non-decreasing breakpoints `[a, b, c, d]` and a non-negative weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MembershipSpec {
    pub breakpoints: [f32; 4],
    pub weight: f32,
}

impl MembershipSpec {
    pub fn new(breakpoints: [f32; 4], weight: f32) -> Self {
        Self { breakpoints, weight }
    }

    /// Reject non-monotone breakpoints and negative or non-finite weights.
    pub fn validate(&self, category: &str, field: &str) -> Result<()> {
        let [a, b, c, d] = self.breakpoints;
        if !(a <= b && b <= c && c <= d) {
            return Err(GateIdError::NonMonotonicBreakpoints {
                category: category.to_string(),
                field: field.to_string(),
                breakpoints: self.breakpoints,
            });
        }
        if !self.weight.is_finite() || self.weight < 0.0 {
            return Err(GateIdError::InvalidWeight {
                category: category.to_string(),
                field: field.to_string(),
                weight: self.weight,
            });
        }
        Ok(())
    }

    #[inline]
    pub fn membership(&self, x: f32) -> f32 {
        trapezoid(x, self.breakpoints)
    }
}

/// Trapezoid membership of a single value. Breakpoints are assumed validated.
#[inline]
pub fn trapezoid(x: f32, [a, b, c, d]: [f32; 4]) -> f32 {
    if x.is_nan() {
        return f32::NAN;
    }
    if x < a || x > d {
        return 0.0;
    }
    if x <= b {
        if x == b {
            1.0
        } else if x > a {
            (x - a) / (b - a)
        } else {
            0.0
        }
    } else if x >= c {
        if x == c {
            1.0
        } else if x < d {
            (d - x) / (d - c)
        } else {
            0.0
        }
    } else {
        1.0
    }
}

/// Element-wise membership over a whole field.
pub fn evaluate_field(field: &Field, breakpoints: [f32; 4]) -> Field {
    Field {
        data: field.data.iter().map(|&x| trapezoid(x, breakpoints)).collect(),
        rays: field.rays,
        gates: field.gates,
    }
}
