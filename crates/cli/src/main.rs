use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use std::path::PathBuf;
use swc_split_core::{
    anchor_dirs, load_anchors, load_swc, pipeline::DEFAULT_MIN_NODES, ProgressSink, RunSummary, SplitConfig, Splitter,
    TypeCodes,
};

#[derive(Parser, Debug)]
#[command(name = "swc-split", version, about = "Split a giant SWC into per-fragment files grouped by anchor")]
struct Args {
    /// Raw reconstruction (giant SWC)
    #[arg(long)]
    giant_swc: PathBuf,
    /// CSV with anchor coordinates (header row with x/y/z columns)
    #[arg(long)]
    anchors_csv: PathBuf,
    /// Output directory; one sub-directory per anchor
    #[arg(long)]
    out_dir: PathBuf,
    /// Skip fragments with fewer nodes than this
    #[arg(long, default_value_t = DEFAULT_MIN_NODES)]
    min_nodes: usize,
    /// Half-width of the cube around each anchor
    #[arg(long)]
    cube_half: f64,
    /// Type code written for each fragment root
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    root_type: i32,
    /// Type code written for every other node
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    neurite_type: i32,
    /// Worker threads (1 = sequential)
    #[arg(long, default_value_t = 1)]
    threads: usize,
    /// Test every anchor against every node instead of using the grid
    #[arg(long)]
    no_spatial_index: bool,
    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary: Option<PathBuf>,
}

struct Bar(ProgressBar);

impl ProgressSink for Bar {
    fn begin(&self, roots: usize) {
        self.0.set_length(roots as u64);
    }
    fn root_done(&self, files_written_total: usize) {
        self.0.inc(1);
        self.0.set_message(format!("{files_written_total} files"));
    }
    fn finish(&self, summary: &RunSummary) {
        self.0.finish_with_message(format!("{} files", summary.files_written));
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = SplitConfig {
        min_nodes: args.min_nodes,
        cube_half: args.cube_half,
        types: TypeCodes { root: args.root_type, neurite: args.neurite_type },
        threads: args.threads,
        spatial_index: !args.no_spatial_index,
    };
    config.validate()?;

    std::fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("creating {}", args.out_dir.display()))?;

    let anchors = load_anchors(&args.anchors_csv)?;
    let dirs = anchor_dirs(&args.out_dir, &anchors);
    for d in &dirs {
        std::fs::create_dir_all(d).with_context(|| format!("creating {}", d.display()))?;
    }

    let (forest, parse_stats) = load_swc(&args.giant_swc)
        .with_context(|| format!("reading {}", args.giant_swc.display()))?;

    let pb = ProgressBar::new(0).with_style(
        ProgressStyle::default_bar()
            .template("{bar:40} {pos}/{len} roots, {msg}")
            .context("progress template")?,
    );
    let splitter = Splitter::new(&forest, &anchors, dirs, config)?.with_parse_stats(parse_stats);
    let summary = splitter.run(&Bar(pb))?;

    info!(
        "Done: {} files for {} fragments ({} below threshold, {} unmatched, {} parent fallbacks)",
        summary.files_written, summary.matched, summary.below_threshold, summary.unmatched, summary.parent_fallbacks
    );
    if let Some(path) = &args.summary {
        let json = serde_json::to_string_pretty(&summary)?;
        std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))?;
        eprintln!("Saved summary to {}", path.display());
    }
    Ok(())
}
