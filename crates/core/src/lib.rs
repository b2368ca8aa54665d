//! Split a giant SWC reconstruction into per-fragment files and assign each
//! fragment to the anchors whose bounding cube it touches.

pub mod anchors;
pub mod error;
pub mod export;
pub mod graph;
pub mod io;
pub mod model;
pub mod pipeline;
pub mod spatial;

pub use anchors::load_anchors;
pub use error::{Result, SplitError};
pub use export::{save_fragment, write_fragment, TypeCodes, WriteStats};
pub use graph::{Forest, Fragment};
pub use io::{load_swc, read_swc, ParseStats};
pub use model::{Anchor, Node, NodeId, TypeCode, NO_PARENT};
pub use pipeline::{anchor_dirs, NullProgress, ProgressSink, RunSummary, SplitConfig, Splitter};
pub use spatial::{in_cube, intersects, AnchorGrid};
