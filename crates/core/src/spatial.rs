//! Anchor membership tests.
//!
//! A fragment hits an anchor when any of its nodes lies inside the
//! axis-aligned cube of half-width `half` around the anchor, checked
//! independently on each axis.

use ahash::RandomState;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::graph::{Forest, Fragment};
use crate::model::Anchor;

/// Anchor indices hit by one fragment, ascending.
pub type Hits = SmallVec<[usize; 4]>;

#[inline]
pub fn in_cube(p: [f64; 3], c: [f64; 3], half: f64) -> bool {
    (p[0] - c[0]).abs() <= half && (p[1] - c[1]).abs() <= half && (p[2] - c[2]).abs() <= half
}

/// True when any node of `fragment` lies in the cube around `anchor`.
pub fn intersects(fragment: &Fragment, forest: &Forest, anchor: &Anchor, half: f64) -> bool {
    let c = anchor.center();
    fragment.nodes(forest).any(|n| in_cube(n.position(), c, half))
}

/// Brute-force scan of every anchor.
pub fn matching_anchors(fragment: &Fragment, forest: &Forest, anchors: &[Anchor], half: f64) -> Hits {
    anchors.iter().enumerate()
        .filter(|(_, a)| intersects(fragment, forest, a, half))
        .map(|(i, _)| i)
        .collect()
}

type Cell = (i64, i64, i64);

/// Uniform grid over anchor centres.
///
/// The cell edge is at least `2 * half`, so any anchor whose cube holds a
/// point sits in the point's cell or one of its 26 neighbours.
#[derive(Debug)]
pub struct AnchorGrid {
    half: f64,
    cell: f64,
    centers: Vec<[f64; 3]>,
    cells: HashMap<Cell, Vec<usize>, RandomState>,
}

impl AnchorGrid {
    pub fn new(anchors: &[Anchor], half: f64) -> Self {
        let cell = if half > 0.0 { 2.0 * half } else { 1.0 };
        let mut cells: HashMap<Cell, Vec<usize>, RandomState> = HashMap::with_hasher(RandomState::new());
        let centers: Vec<[f64; 3]> = anchors.iter().map(Anchor::center).collect();
        for (i, c) in centers.iter().enumerate() {
            cells.entry(Self::cell_of(*c, cell)).or_default().push(i);
        }
        Self { half, cell, centers, cells }
    }

    // far-out coordinates saturate to the outermost cells; the exact cube
    // test still decides membership
    #[inline]
    fn cell_of(p: [f64; 3], cell: f64) -> Cell {
        ((p[0] / cell).floor() as i64, (p[1] / cell).floor() as i64, (p[2] / cell).floor() as i64)
    }

    /// Anchors whose cube holds at least one node of `fragment`, ascending.
    pub fn matching_anchors(&self, fragment: &Fragment, forest: &Forest) -> Hits {
        let mut hit = vec![false; self.centers.len()];
        let mut remaining = self.centers.len();
        for n in fragment.nodes(forest) {
            if remaining == 0 { break; }
            let p = n.position();
            // a non-finite coordinate is never inside a finite cube
            if !p.iter().all(|v| v.is_finite()) { continue; }
            let (cx, cy, cz) = Self::cell_of(p, self.cell);
            for dx in -1..=1 { for dy in -1..=1 { for dz in -1..=1 {
                let Some(bucket) = self.cells.get(&(cx.saturating_add(dx), cy.saturating_add(dy), cz.saturating_add(dz))) else { continue };
                for &i in bucket {
                    if !hit[i] && in_cube(p, self.centers[i], self.half) {
                        hit[i] = true;
                        remaining -= 1;
                    }
                }
            }}}
        }
        hit.iter().enumerate().filter(|(_, h)| **h).map(|(i, _)| i).collect()
    }
}
