use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::str::FromStr;

use log::{debug, info};
use serde::Serialize;

use crate::error::{Result, SplitError};
use crate::graph::Forest;
use crate::model::{Node, NodeId, TypeCode};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ParseStats {
    pub nodes: usize,
    /// Records that replaced an earlier record with the same ID.
    pub duplicate_ids: usize,
    /// Non-comment lines with fewer than seven fields.
    pub short_lines: usize,
}

/// Reads a giant SWC file into a linked forest.
pub fn load_swc(path: &Path) -> Result<(Forest, ParseStats)> {
    let f = File::open(path).map_err(|e| SplitError::io(path, e))?;
    let (forest, stats) = read_swc(BufReader::new(f), path)?;
    info!("Parsed {} nodes ({} roots) from {}", stats.nodes, forest.roots().len(), path.display());
    Ok((forest, stats))
}

/// Parses SWC text from any reader. `path` only labels errors.
pub fn read_swc<R: BufRead>(r: R, path: &Path) -> Result<(Forest, ParseStats)> {
    let mut forest = Forest::new();
    let mut stats = ParseStats::default();
    for (i, line) in r.lines().enumerate() {
        let line = line.map_err(|e| SplitError::io(path, e))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') { continue; }
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 7 {
            stats.short_lines += 1;
            continue;
        }
        let node = parse_node(&parts, path, i + 1)?;
        if forest.insert(node) {
            debug!("{}:{}: node {} overwrites an earlier record", path.display(), i + 1, node.id);
            stats.duplicate_ids += 1;
        }
    }
    forest.link();
    stats.nodes = forest.len();
    Ok((forest, stats))
}

fn parse_node(parts: &[&str], path: &Path, line: usize) -> Result<Node> {
    let field = |idx: usize, name: &'static str| -> SplitError {
        SplitError::SwcField { path: path.to_path_buf(), line, field: name, value: parts[idx].to_string() }
    };
    fn num<T: FromStr>(s: &str) -> Option<T> { s.parse().ok() }

    let id: NodeId = num(parts[0]).ok_or_else(|| field(0, "id"))?;
    // type codes are sometimes written as floats ("3.0")
    let type_code: TypeCode = num::<f64>(parts[1])
        .filter(|t| t.is_finite())
        .map(|t| t.trunc() as TypeCode)
        .ok_or_else(|| field(1, "type"))?;
    let x: f64 = num(parts[2]).ok_or_else(|| field(2, "x"))?;
    let y: f64 = num(parts[3]).ok_or_else(|| field(3, "y"))?;
    let z: f64 = num(parts[4]).ok_or_else(|| field(4, "z"))?;
    let radius: f64 = num(parts[5]).ok_or_else(|| field(5, "radius"))?;
    let parent: NodeId = num(parts[6]).ok_or_else(|| field(6, "parent"))?;
    Ok(Node { id, type_code, x, y, z, radius, parent })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<(Forest, ParseStats)> {
        read_swc(text.as_bytes(), Path::new("test.swc"))
    }

    #[test]
    fn parses_fields_exactly() {
        let (f, stats) = parse("5 1 10.0 20.0 30.0 2.5 -1\n").unwrap();
        assert_eq!(stats.nodes, 1);
        let n = f.node(5).unwrap();
        assert_eq!(*n, Node { id: 5, type_code: 1, x: 10.0, y: 20.0, z: 30.0, radius: 2.5, parent: -1 });
        assert_eq!(f.roots(), &[5]);
    }

    #[test]
    fn skips_comments_blanks_and_short_lines() {
        let text = "# id type x y z radius parent\n\n   \n  # indented comment\n1 1 0 0 0 1 -1\n2 3 1 0 0\n3\t3\t1.5\t0\t0\t1\t1\textra\n";
        let (f, stats) = parse(text).unwrap();
        assert_eq!(stats.nodes, 2);
        assert_eq!(stats.short_lines, 1);
        assert_eq!(f.children(1), &[3]);
    }

    #[test]
    fn float_type_codes_truncate() {
        let (f, _) = parse("1 3.0 0 0 0 1 -1\n2 2.9 0 0 0 1 1\n").unwrap();
        assert_eq!(f.node(1).unwrap().type_code, 3);
        assert_eq!(f.node(2).unwrap().type_code, 2);
    }

    #[test]
    fn non_numeric_field_is_fatal() {
        let err = parse("1 1 0 0 0 1 -1\n2 1 abc 0 0 1 1\n").unwrap_err();
        match err {
            SplitError::SwcField { line, field, value, .. } => {
                assert_eq!(line, 2);
                assert_eq!(field, "x");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn fractional_id_is_fatal() {
        assert!(matches!(parse("1.5 1 0 0 0 1 -1\n"), Err(SplitError::SwcField { field: "id", .. })));
    }

    #[test]
    fn duplicates_are_counted_and_overwritten() {
        let (f, stats) = parse("1 1 0 0 0 1 -1\n1 1 7 0 0 1 -1\n").unwrap();
        assert_eq!(stats.nodes, 1);
        assert_eq!(stats.duplicate_ids, 1);
        assert_eq!(f.node(1).unwrap().x, 7.0);
    }
}
