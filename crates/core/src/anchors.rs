//! Anchor table loading.
//!
//! The x/y/z columns are picked from the header by name: an exact match
//! first, then a suffix or `_axis_` infix, then any header containing the
//! axis letter.

use std::io::Read;
use std::path::Path;

use log::info;

use crate::error::{Result, SplitError};
use crate::model::Anchor;

pub fn load_anchors(path: &Path) -> Result<Vec<Anchor>> {
    let reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|e| csv_error(path, e))?;
    let anchors = read_anchors(reader, path)?;
    info!("Loaded {} anchors from {}", anchors.len(), path.display());
    Ok(anchors)
}

pub fn read_anchors<R: Read>(mut reader: csv::Reader<R>, path: &Path) -> Result<Vec<Anchor>> {
    let headers: Vec<String> = reader.headers()
        .map_err(|e| csv_error(path, e))?
        .iter()
        .map(str::to_string)
        .collect();
    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(SplitError::NoHeader(path.to_path_buf()));
    }

    let mut cols = [0usize; 3];
    for (slot, axis) in cols.iter_mut().zip(['x', 'y', 'z']) {
        *slot = find_column(&headers, axis).ok_or_else(|| SplitError::MissingColumn {
            path: path.to_path_buf(),
            axis,
            headers: headers.clone(),
        })?;
    }

    let mut anchors = Vec::new();
    for (i, rec) in reader.records().enumerate() {
        let rec = rec.map_err(|e| csv_error(path, e))?;
        let row = i + 1;
        let mut xyz = [0.0f64; 3];
        for (v, &col) in xyz.iter_mut().zip(cols.iter()) {
            let raw = rec.get(col).unwrap_or("");
            // nan/inf parse as f64 but cannot name an output directory
            *v = raw.trim().parse::<f64>().ok().filter(|c| c.is_finite()).ok_or_else(|| SplitError::AnchorValue {
                path: path.to_path_buf(),
                row,
                column: headers[col].clone(),
                value: raw.to_string(),
            })?;
        }
        anchors.push(Anchor::new(xyz[0], xyz[1], xyz[2]));
    }
    if anchors.is_empty() {
        return Err(SplitError::NoAnchors(path.to_path_buf()));
    }
    Ok(anchors)
}

/// Index of the header naming `axis`, if any.
pub fn find_column(headers: &[String], axis: char) -> Option<usize> {
    let lower: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let target = axis.to_string();
    let suffix = format!("_{axis}");
    let infix = format!("_{axis}_");

    lower.iter().position(|h| *h == target)
        .or_else(|| lower.iter().position(|h| {
            h.contains(axis) && (h.ends_with(&suffix) || h.ends_with(axis) || h.contains(&infix))
        }))
        .or_else(|| lower.iter().position(|h| h.contains(axis)))
}

fn csv_error(path: &Path, source: csv::Error) -> SplitError {
    SplitError::Csv { path: path.to_path_buf(), source }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(text: &str) -> Result<Vec<Anchor>> {
        let r = csv::ReaderBuilder::new().has_headers(true).from_reader(text.as_bytes());
        read_anchors(r, Path::new("anchors.csv"))
    }

    fn cols(hs: &[&str]) -> Vec<String> { hs.iter().map(|s| s.to_string()).collect() }

    #[test]
    fn exact_names_win() {
        let h = cols(&["id", "pos_x", "X", "Y", "z"]);
        assert_eq!(find_column(&h, 'x'), Some(2));
        assert_eq!(find_column(&h, 'y'), Some(3));
        assert_eq!(find_column(&h, 'z'), Some(4));
    }

    #[test]
    fn suffix_then_substring() {
        let h = cols(&["Sample_X ", "coord_y_um", "zpos", "comment"]);
        assert_eq!(find_column(&h, 'x'), Some(0));
        assert_eq!(find_column(&h, 'y'), Some(1));
        assert_eq!(find_column(&h, 'z'), Some(2));
    }

    #[test]
    fn reads_rows_in_order() {
        let a = read("name,X,Y,Z\na,1.5,2,3\nb, -4 ,5,6e1\nc,1.5,2,3\n").unwrap();
        assert_eq!(a, vec![Anchor::new(1.5, 2.0, 3.0), Anchor::new(-4.0, 5.0, 60.0), Anchor::new(1.5, 2.0, 3.0)]);
    }

    #[test]
    fn missing_axis_is_fatal() {
        let err = read("a,b,c\n1,2,3\n").unwrap_err();
        assert!(matches!(err, SplitError::MissingColumn { axis: 'x', .. }));
    }

    #[test]
    fn zero_rows_is_fatal() {
        assert!(matches!(read("x,y,z\n"), Err(SplitError::NoAnchors(_))));
    }

    #[test]
    fn empty_input_has_no_header() {
        assert!(matches!(read(""), Err(SplitError::NoHeader(_))));
    }

    #[test]
    fn bad_coordinate_is_fatal() {
        let err = read("x,y,z\n1,2,3\n1,oops,3\n").unwrap_err();
        match err {
            SplitError::AnchorValue { row, column, value, .. } => {
                assert_eq!(row, 2);
                assert_eq!(column, "y");
                assert_eq!(value, "oops");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn non_finite_coordinate_is_fatal() {
        for bad in ["nan", "inf", "-Infinity"] {
            let err = read(&format!("x,y,z\n1,2,3\n4,5,{bad}\n")).unwrap_err();
            match err {
                SplitError::AnchorValue { row, column, value, .. } => {
                    assert_eq!(row, 2);
                    assert_eq!(column, "z");
                    assert_eq!(value, bad);
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }
}
