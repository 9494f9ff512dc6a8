//! Structural swing filtering.
//!
//! Zone generation only looks at swings that took part in a structure break:
//! the breaking swing and the opposite structural swing picked after it.
//! Everything else is treated as noise.

use super::analyzer::analyze_structure;
use crate::domain::SwingPoint;

/// Swings that participated in a structure break, deduplicated, in the order
/// they were first seen by the break fold.
pub fn structural_swings(swings: &[SwingPoint]) -> Vec<SwingPoint> {
    let analysis = analyze_structure(swings);
    let mut out: Vec<SwingPoint> = Vec::with_capacity(analysis.breaks.len() * 2);
    for brk in &analysis.breaks {
        for swing in std::iter::once(brk.swing).chain(brk.counterpart) {
            if !out.iter().any(|s| s.index == swing.index && s.kind == swing.kind) {
                out.push(swing);
            }
        }
    }
    out
}
