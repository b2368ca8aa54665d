//! Fragment-to-anchor assignment driver.
//!
//! For every root: extract its fragment, drop it when smaller than
//! `min_nodes`, find the anchors whose cube it touches and write one
//! renumbered copy into each matching anchor's directory.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use log::{debug, info};
use rayon::prelude::*;
use serde::{Serialize, Deserialize};

use crate::error::{Result, SplitError};
use crate::export::{save_fragment, TypeCodes};
use crate::graph::{Forest, Fragment};
use crate::io::ParseStats;
use crate::model::{fragment_file_name, Anchor, NodeId};
use crate::spatial::{matching_anchors, AnchorGrid, Hits};

pub const DEFAULT_MIN_NODES: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitConfig {
    /// Fragments with fewer nodes are skipped.
    pub min_nodes: usize,
    /// Half the edge length of the cube around each anchor.
    pub cube_half: f64,
    pub types: TypeCodes,
    /// 1 runs on the calling thread; more uses a rayon pool of that size.
    pub threads: usize,
    pub spatial_index: bool,
}

impl SplitConfig {
    pub fn new(cube_half: f64) -> Self {
        Self { min_nodes: DEFAULT_MIN_NODES, cube_half, types: TypeCodes::default(), threads: 1, spatial_index: true }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.cube_half.is_finite() || self.cube_half < 0.0 {
            return Err(SplitError::InvalidConfig(format!(
                "cube half-width must be a finite non-negative number, got {}", self.cube_half
            )));
        }
        if self.threads == 0 {
            return Err(SplitError::InvalidConfig("thread count must be at least 1".into()));
        }
        Ok(())
    }
}

/// Progress hooks for the driver.
pub trait ProgressSink: Sync {
    fn begin(&self, roots: usize);
    /// Called once per root after its files, if any, are written.
    fn root_done(&self, files_written_total: usize);
    fn finish(&self, summary: &RunSummary);
}

/// Progress sink that ignores everything.
pub struct NullProgress;

impl ProgressSink for NullProgress {
    #[inline]
    fn begin(&self, _roots: usize) {}
    #[inline]
    fn root_done(&self, _files_written_total: usize) {}
    #[inline]
    fn finish(&self, _summary: &RunSummary) {}
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub parse: ParseStats,
    pub anchors: usize,
    pub roots: usize,
    pub below_threshold: usize,
    pub unmatched: usize,
    pub matched: usize,
    pub files_written: usize,
    pub parent_fallbacks: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootOutcome {
    BelowThreshold,
    Unmatched,
    Written { files: usize, parent_fallbacks: usize },
}

/// Output directory for each anchor under `out_dir`, in anchor order.
pub fn anchor_dirs(out_dir: &Path, anchors: &[Anchor]) -> Vec<PathBuf> {
    anchors.iter().map(|a| out_dir.join(a.dir_name())).collect()
}

pub struct Splitter<'a> {
    forest: &'a Forest,
    anchors: &'a [Anchor],
    dirs: Vec<PathBuf>,
    config: SplitConfig,
    grid: Option<AnchorGrid>,
    parse: ParseStats,
    written: AtomicUsize,
}

impl<'a> Splitter<'a> {
    /// `dirs[i]` receives the fragments matching `anchors[i]` and must exist
    /// before `run`.
    pub fn new(forest: &'a Forest, anchors: &'a [Anchor], dirs: Vec<PathBuf>, config: SplitConfig) -> Result<Self> {
        config.validate()?;
        if anchors.is_empty() {
            return Err(SplitError::InvalidConfig("at least one anchor is required".into()));
        }
        if dirs.len() != anchors.len() {
            return Err(SplitError::InvalidConfig(format!(
                "{} anchors but {} output directories", anchors.len(), dirs.len()
            )));
        }
        let grid = config.spatial_index.then(|| AnchorGrid::new(anchors, config.cube_half));
        Ok(Self { forest, anchors, dirs, config, grid, parse: ParseStats::default(), written: AtomicUsize::new(0) })
    }

    /// Parser counters copied into the summary returned by `run`.
    pub fn with_parse_stats(mut self, parse: ParseStats) -> Self {
        self.parse = parse;
        self
    }

    /// Anchors touched by the fragment rooted at `root`, ascending.
    pub fn hits(&self, root: NodeId) -> Hits {
        let frag = self.forest.extract(root);
        self.match_fragment(&frag)
    }

    fn match_fragment(&self, frag: &Fragment) -> Hits {
        match &self.grid {
            Some(g) => g.matching_anchors(frag, self.forest),
            None => matching_anchors(frag, self.forest, self.anchors, self.config.cube_half),
        }
    }

    pub fn process_root(&self, root: NodeId) -> Result<RootOutcome> {
        let frag = self.forest.extract(root);
        if frag.len() < self.config.min_nodes {
            debug!("root {root}: {} nodes, below threshold", frag.len());
            return Ok(RootOutcome::BelowThreshold);
        }
        let hits = self.match_fragment(&frag);
        if hits.is_empty() {
            debug!("root {root}: no anchor in range");
            return Ok(RootOutcome::Unmatched);
        }
        let name = fragment_file_name(root);
        let mut fallbacks = 0;
        for &i in &hits {
            let stats = save_fragment(&self.dirs[i].join(&name), self.forest, &frag, self.config.types)?;
            fallbacks += stats.parent_fallbacks;
            let before = self.written.fetch_add(1, Ordering::Relaxed);
            if (before + 1) % 100 == 0 {
                info!("Written fragment files: {}", before + 1);
            }
        }
        Ok(RootOutcome::Written { files: hits.len(), parent_fallbacks: fallbacks })
    }

    pub fn run(&self, progress: &dyn ProgressSink) -> Result<RunSummary> {
        let roots = self.forest.roots();
        progress.begin(roots.len());
        let step = |root: &NodeId| -> Result<RootOutcome> {
            let out = self.process_root(*root)?;
            progress.root_done(self.written.load(Ordering::Relaxed));
            Ok(out)
        };

        let outcomes: Vec<RootOutcome> = if self.config.threads > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.config.threads)
                .build()
                .map_err(|e| SplitError::InvalidConfig(format!("thread pool: {e}")))?;
            pool.install(|| roots.par_iter().map(step).collect::<Result<Vec<_>>>())?
        } else {
            roots.iter().map(step).collect::<Result<Vec<_>>>()?
        };

        let mut summary = RunSummary { parse: self.parse, anchors: self.anchors.len(), roots: roots.len(), ..Default::default() };
        for o in outcomes {
            match o {
                RootOutcome::BelowThreshold => summary.below_threshold += 1,
                RootOutcome::Unmatched => summary.unmatched += 1,
                RootOutcome::Written { files, parent_fallbacks } => {
                    summary.matched += 1;
                    summary.files_written += files;
                    summary.parent_fallbacks += parent_fallbacks;
                }
            }
        }
        info!(
            "Roots: {} ({} below threshold, {} unmatched, {} matched); files written: {}",
            summary.roots, summary.below_threshold, summary.unmatched, summary.matched, summary.files_written
        );
        progress.finish(&summary);
        Ok(summary)
    }
}
