//! Standalone SWC output for a single fragment.
//!
//! Nodes are renumbered 1..N in the fragment's emission order. The root is
//! written with parent -1; every other node points at its renumbered parent.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use ahash::RandomState;
use hashbrown::HashMap;
use log::warn;
use serde::{Serialize, Deserialize};

use crate::error::{Result, SplitError};
use crate::graph::{Forest, Fragment};
use crate::model::{NodeId, TypeCode, NO_PARENT};

pub const SWC_HEADER: &str = "# id type x y z radius parent";

/// Type codes stamped on output lines. Input type codes are not kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCodes {
    pub root: TypeCode,
    pub neurite: TypeCode,
}

impl Default for TypeCodes {
    fn default() -> Self { Self { root: 1, neurite: 0 } }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct WriteStats {
    pub nodes: usize,
    /// Nodes whose parent was outside the fragment and got re-attached to
    /// the root.
    pub parent_fallbacks: usize,
}

/// Old ID -> new ID over the emission order, starting at 1.
pub fn renumber(fragment: &Fragment) -> HashMap<NodeId, NodeId, RandomState> {
    let mut map = HashMap::with_capacity_and_hasher(fragment.len(), RandomState::new());
    for (i, id) in fragment.ids().iter().enumerate() {
        map.insert(*id, i as NodeId + 1);
    }
    map
}

/// Writes the fragment as SWC text.
///
/// A non-root node whose parent has no new ID is attached to the root
/// instead. That only happens for malformed input and is counted in the
/// returned stats.
pub fn write_fragment<W: Write>(w: &mut W, forest: &Forest, fragment: &Fragment, types: TypeCodes) -> io::Result<WriteStats> {
    let new_id = renumber(fragment);
    let root = fragment.root();
    let new_root = new_id.get(&root).copied().unwrap_or(1);
    let mut stats = WriteStats::default();

    writeln!(w, "{SWC_HEADER}")?;
    for n in fragment.nodes(forest) {
        let (ty, parent) = if n.id == root {
            (types.root, NO_PARENT)
        } else {
            let p = match new_id.get(&n.parent) {
                Some(p) => *p,
                None => {
                    stats.parent_fallbacks += 1;
                    new_root
                }
            };
            (types.neurite, p)
        };
        writeln!(w, "{} {} {:.4} {:.4} {:.4} {:.4} {}", new_id[&n.id], ty, n.x, n.y, n.z, n.radius, parent)?;
        stats.nodes += 1;
    }
    Ok(stats)
}

/// Creates or truncates `path` and writes the fragment into it. The parent
/// directory must already exist.
pub fn save_fragment(path: &Path, forest: &Forest, fragment: &Fragment, types: TypeCodes) -> Result<WriteStats> {
    let f = File::create(path).map_err(|e| SplitError::io(path, e))?;
    let mut w = BufWriter::new(f);
    let stats = write_fragment(&mut w, forest, fragment, types).map_err(|e| SplitError::io(path, e))?;
    w.flush().map_err(|e| SplitError::io(path, e))?;
    if stats.parent_fallbacks > 0 {
        warn!(
            "root {}: {} node(s) re-attached to the root in {}",
            fragment.root(), stats.parent_fallbacks, path.display()
        );
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Node;

    fn node(id: NodeId, ty: TypeCode, p: [f64; 3], r: f64, parent: NodeId) -> Node {
        Node { id, type_code: ty, x: p[0], y: p[1], z: p[2], radius: r, parent }
    }

    fn render(forest: &Forest, fragment: &Fragment, types: TypeCodes) -> (String, WriteStats) {
        let mut buf = Vec::new();
        let stats = write_fragment(&mut buf, forest, fragment, types).unwrap();
        (String::from_utf8(buf).unwrap(), stats)
    }

    #[test]
    fn single_node_fragment() {
        let f = Forest::from_nodes([node(5, 1, [10.0, 20.0, 30.0], 2.5, -1)]);
        let (text, stats) = render(&f, &f.extract(5), TypeCodes::default());
        assert_eq!(text, "# id type x y z radius parent\n1 1 10.0000 20.0000 30.0000 2.5000 -1\n");
        assert_eq!(stats, WriteStats { nodes: 1, parent_fallbacks: 0 });
    }

    #[test]
    fn renumbers_and_restamps_types() {
        let f = Forest::from_nodes([
            node(100, 7, [0.0, 0.0, 0.0], 1.0, -1),
            node(300, 3, [1.0, 0.0, 0.0], 1.0, 100),
            node(200, 3, [0.0, 1.0, 0.0], 1.0, 100),
            node(150, 2, [0.0, 1.0, 1.0], 0.123456, 200),
        ]);
        let (text, _) = render(&f, &f.extract(100), TypeCodes { root: 1, neurite: 3 });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            "# id type x y z radius parent",
            "1 1 0.0000 0.0000 0.0000 1.0000 -1",
            "2 3 0.0000 1.0000 0.0000 1.0000 1",
            "3 3 1.0000 0.0000 0.0000 1.0000 1",
            "4 3 0.0000 1.0000 1.0000 0.1235 2",
        ]);
    }

    #[test]
    fn parents_precede_children() {
        let mut nodes = vec![node(50, 1, [0.0; 3], 1.0, -1)];
        for id in 1..50 {
            nodes.push(node(id, 3, [id as f64, 0.0, 0.0], 1.0, if id % 7 == 0 { 50 } else { id + 1 }));
        }
        let f = Forest::from_nodes(nodes);
        let frag = f.extract(50);
        let (text, stats) = render(&f, &frag, TypeCodes::default());
        assert_eq!(stats.nodes, frag.len());
        for (i, line) in text.lines().skip(1).enumerate() {
            let cols: Vec<i64> = line.split(' ').map(|c| c.parse::<f64>().unwrap() as i64).collect();
            assert_eq!(cols[0], i as i64 + 1);
            if i == 0 {
                assert_eq!(cols[6], -1);
            } else {
                assert!(cols[6] >= 1 && cols[6] < cols[0], "line {line}");
            }
        }
    }

    #[test]
    fn missing_parent_falls_back_to_root() {
        let f = Forest::from_nodes([
            node(1, 1, [0.0; 3], 1.0, -1),
            node(2, 3, [0.0; 3], 1.0, 1),
            node(3, 3, [0.0; 3], 1.0, 2),
        ]);
        // fragment that lost node 2 from its membership
        let frag = Fragment::from_ids(1, vec![1, 3]);
        let (text, stats) = render(&f, &frag, TypeCodes::default());
        assert_eq!(stats.parent_fallbacks, 1);
        assert_eq!(text.lines().nth(2), Some("2 0 0.0000 0.0000 0.0000 1.0000 1"));
    }

    #[test]
    fn output_is_deterministic() {
        let f = Forest::from_nodes([
            node(1, 1, [0.5, 0.25, 0.125], 1.0, -1),
            node(4, 3, [1.0, 2.0, 3.0], 0.5, 1),
            node(3, 3, [-1.0, -2.0, -3.0], 0.5, 1),
        ]);
        let a = render(&f, &f.extract(1), TypeCodes::default()).0;
        let b = render(&f, &f.extract(1), TypeCodes::default()).0;
        assert_eq!(a, b);
    }
}
