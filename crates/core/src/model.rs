use serde::{Serialize, Deserialize};

pub type NodeId = i64;
pub type TypeCode = i32;

/// Parent value marking a node with no parent.
pub const NO_PARENT: NodeId = -1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub type_code: TypeCode,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub radius: f64,
    pub parent: NodeId,
}

impl Node {
    #[inline]
    pub fn position(&self) -> [f64; 3] { [self.x, self.y, self.z] }
}

/// A sample point read from the anchor table, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Anchor {
    pub fn new(x: f64, y: f64, z: f64) -> Self { Self { x, y, z } }

    #[inline]
    pub fn center(&self) -> [f64; 3] { [self.x, self.y, self.z] }

    /// Output directory name, e.g. `10x-20y-30z`. Coordinates are rounded
    /// half-to-even.
    pub fn dir_name(&self) -> String {
        format!(
            "{}x-{}y-{}z",
            self.x.round_ties_even() as i64,
            self.y.round_ties_even() as i64,
            self.z.round_ties_even() as i64,
        )
    }
}

/// File name for a fragment, keyed by its original root ID.
pub fn fragment_file_name(root: NodeId) -> String {
    format!("root_{root:08}.swc")
}
